use rand::Rng;
use time::{Duration, OffsetDateTime};

/// How long a freshly issued email-verification code stays valid.
pub const VERIFICATION_OTP_TTL: Duration = Duration::hours(24);

/// How long a password-reset code stays valid.
pub const RESET_OTP_TTL: Duration = Duration::minutes(5);

/// 4-digit numeric code, uniform over [1000, 9999].
pub fn generate() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum OtpCheckError {
    #[error("Invalid OTP. Please check and try again.")]
    Mismatch,
    #[error("OTP has expired. Please request a new one.")]
    Expired,
}

/// Check a submitted verification code against the stored pair.
///
/// A user without a stored pair (already verified, or never issued) fails the
/// same way as a wrong code. The caller mutates state only on `Ok`.
pub fn check(
    stored: Option<&str>,
    expires_at: Option<OffsetDateTime>,
    submitted: &str,
    now: OffsetDateTime,
) -> Result<(), OtpCheckError> {
    let (code, expires_at) = match (stored, expires_at) {
        (Some(code), Some(expires_at)) => (code, expires_at),
        _ => return Err(OtpCheckError::Mismatch),
    };
    if code != submitted {
        return Err(OtpCheckError::Mismatch);
    }
    if now > expires_at {
        return Err(OtpCheckError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_four_digits_in_range() {
        for _ in 0..200 {
            let code = generate();
            assert_eq!(code.len(), 4);
            let n: u32 = code.parse().expect("numeric");
            assert!((1000..=9999).contains(&n));
        }
    }

    #[test]
    fn matching_unexpired_code_passes() {
        let now = OffsetDateTime::now_utc();
        let expires = now + VERIFICATION_OTP_TTL;
        assert_eq!(check(Some("1234"), Some(expires), "1234", now), Ok(()));
    }

    #[test]
    fn wrong_code_is_mismatch() {
        let now = OffsetDateTime::now_utc();
        let expires = now + VERIFICATION_OTP_TTL;
        assert_eq!(
            check(Some("1234"), Some(expires), "4321", now),
            Err(OtpCheckError::Mismatch)
        );
    }

    #[test]
    fn past_expiry_is_expired() {
        let now = OffsetDateTime::now_utc();
        let expires = now - Duration::seconds(1);
        assert_eq!(
            check(Some("1234"), Some(expires), "1234", now),
            Err(OtpCheckError::Expired)
        );
    }

    #[test]
    fn expiry_boundary_still_passes() {
        // now == expires_at is within the window.
        let now = OffsetDateTime::now_utc();
        assert_eq!(check(Some("1234"), Some(now), "1234", now), Ok(()));
    }

    #[test]
    fn missing_pair_is_mismatch() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(
            check(None, None, "1234", now),
            Err(OtpCheckError::Mismatch)
        );
        // A half-set pair must never exist; treat it as no pair at all.
        assert_eq!(
            check(Some("1234"), None, "1234", now),
            Err(OtpCheckError::Mismatch)
        );
    }

    #[test]
    fn wrong_code_reported_before_expiry() {
        // Mismatch wins over expiry so an attacker with an expired code
        // learns nothing extra.
        let now = OffsetDateTime::now_utc();
        let expires = now - Duration::hours(1);
        assert_eq!(
            check(Some("1234"), Some(expires), "9999", now),
            Err(OtpCheckError::Mismatch)
        );
    }

    #[test]
    fn ttl_windows() {
        assert_eq!(VERIFICATION_OTP_TTL, Duration::hours(24));
        assert_eq!(RESET_OTP_TTL, Duration::minutes(5));
    }
}
