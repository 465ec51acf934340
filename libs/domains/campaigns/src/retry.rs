//! Delivery failure classification and retry backoff
//!
//! Failures are matched against substring lists before falling back to
//! retry. Permanent failures describe addresses that will never accept
//! mail; transient ones describe provider or network conditions that
//! clear on their own.

use chrono::Duration;

const PERMANENT_FAILURES: &[&str] = &[
    "invalid email",
    "email address is invalid",
    "domain not found",
    "domain does not exist",
    "user not found",
    "mailbox not found",
    "recipient address rejected",
    "address rejected",
    "does not exist",
    "undeliverable",
    "permanent failure",
];

const TRANSIENT_FAILURES: &[&str] = &[
    "timeout",
    "temporary",
    "try again",
    "rate limit",
    "mailbox full",
    "quota exceeded",
    "service unavailable",
    "connection",
    "network",
];

/// Decide whether a failed delivery attempt should be requeued
///
/// `retry_count` is the attempt number under consideration, so the
/// ceiling check fires before any message classification.
pub fn should_retry(error: &str, retry_count: i32, max_retries: i32) -> bool {
    if retry_count >= max_retries {
        return false;
    }

    let lower = error.to_lowercase();
    if PERMANENT_FAILURES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    if TRANSIENT_FAILURES.iter().any(|p| lower.contains(p)) {
        return true;
    }

    // Unknown errors default to retry.
    true
}

/// Delay before the next attempt: doubles with each retry, starting at
/// one minute.
pub fn backoff(retry_count: i32) -> Duration {
    let exponent = (retry_count - 1).clamp(0, 20);
    Duration::minutes(1 << exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_overrides_classification() {
        assert!(!should_retry("timeout", 3, 3));
        assert!(!should_retry("anything at all", 5, 3));
    }

    #[test]
    fn test_permanent_failures_never_retry() {
        for msg in [
            "550 invalid email address",
            "Domain not found",
            "recipient address rejected: user unknown",
            "this mailbox does not exist",
            "permanent failure in delivery",
        ] {
            assert!(!should_retry(msg, 1, 3), "expected terminal: {}", msg);
        }
    }

    #[test]
    fn test_transient_failures_retry() {
        for msg in [
            "Connection timeout",
            "rate limit exceeded",
            "451 temporary local problem, try again later",
            "mailbox full",
            "network unreachable",
        ] {
            assert!(should_retry(msg, 1, 3), "expected retry: {}", msg);
        }
    }

    #[test]
    fn test_unknown_errors_retry_by_default() {
        assert!(should_retry("something nobody has seen before", 1, 3));
        assert!(should_retry("", 2, 3));
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert!(!should_retry("INVALID EMAIL", 1, 3));
        assert!(should_retry("CONNECTION refused", 1, 3));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        assert_eq!(backoff(1), Duration::minutes(1));
        assert_eq!(backoff(2), Duration::minutes(2));
        assert_eq!(backoff(3), Duration::minutes(4));
        assert_eq!(backoff(4), Duration::minutes(8));
    }

    #[test]
    fn test_backoff_floors_at_one_minute() {
        assert_eq!(backoff(0), Duration::minutes(1));
        assert_eq!(backoff(-3), Duration::minutes(1));
    }
}
