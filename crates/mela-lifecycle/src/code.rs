//! The single-use completion code
//!
//! A 6-digit numeric code proving the customer was present when the job
//! finished. Generated when the provider requests completion, delivered to
//! the customer's phone out-of-band, and compared exactly on submission.
//! The stored code is cleared on first successful use; any transition away
//! from `awaiting_otp` also invalidates it.

use rand::Rng;
use thiserror::Error;

/// Codes are exactly this many ASCII digits
pub const CODE_LEN: usize = 6;

/// Why a submitted code was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    /// No code is stored for this booking (not in the awaiting-code window)
    #[error("no completion code is active for this booking")]
    Missing,

    /// Submitted value does not match the stored code
    #[error("completion code does not match")]
    Mismatch,
}

/// Generate a fresh 6-digit code, zero-padded ("004217" is valid)
pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}

/// Shape check for submitted codes: exactly six ASCII digits
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

/// Compare a submitted code against the stored one, format-exact
pub fn verify_code(stored: Option<&str>, submitted: &str) -> Result<(), CodeError> {
    let stored = stored.ok_or(CodeError::Missing)?;
    if stored == submitted {
        Ok(())
    } else {
        Err(CodeError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_codes_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let code = generate_code(&mut rng);
            assert!(is_well_formed(&code), "bad code {code}");
        }
    }

    #[test]
    fn test_zero_padding() {
        // gen_range can return small numbers; the format must pad
        let code = format!("{:06}", 42u32);
        assert_eq!(code, "000042");
        assert!(is_well_formed(&code));
    }

    #[test]
    fn test_well_formed_rejects_shape_errors() {
        assert!(!is_well_formed("12345"));
        assert!(!is_well_formed("1234567"));
        assert!(!is_well_formed("12a456"));
        assert!(!is_well_formed(""));
        // unicode digits are not ASCII digits
        assert!(!is_well_formed("１２３４５６"));
    }

    #[test]
    fn test_verify_exact_match_only() {
        assert_eq!(verify_code(Some("483920"), "483920"), Ok(()));
        assert_eq!(
            verify_code(Some("483920"), "483921"),
            Err(CodeError::Mismatch)
        );
        assert_eq!(verify_code(None, "483920"), Err(CodeError::Missing));
    }
}
