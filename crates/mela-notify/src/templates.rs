//! Message texts

/// Booking accepted by a provider
pub fn booking_accepted(provider_name: &str, scheduled: Option<&str>) -> String {
    match scheduled {
        Some(when) => format!(
            "Good news! {provider_name} has accepted your booking for {when}. They will contact you soon."
        ),
        None => format!(
            "Good news! {provider_name} has accepted your booking. They will contact you soon."
        ),
    }
}

/// Booking declined by a provider
pub fn booking_declined(provider_name: &str) -> String {
    format!("{provider_name} has declined your booking request. Please try booking with another provider.")
}

/// The completion code, sent when the provider requests it
pub fn service_code(code: &str) -> String {
    format!(
        "Your service completion code is {code}. Share it with your technician only once the work is done."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_mentions_schedule_when_known() {
        let msg = booking_accepted("Sharma Electricals", Some("tomorrow 10am"));
        assert!(msg.contains("Sharma Electricals"));
        assert!(msg.contains("tomorrow 10am"));

        let msg = booking_accepted("Sharma Electricals", None);
        assert!(!msg.contains("for "));
    }

    #[test]
    fn test_code_message_contains_code() {
        assert!(service_code("483920").contains("483920"));
    }
}
