//! Time bound verification codes sent to users by mail.
//!
//! Code has form `{timestamp}-{hex HMAC-SHA256}`, where MAC covers user id, username,
//! account nonce and the timestamp. Rotating the nonce invalidates all issued codes.

use std::time::{Duration, SystemTime};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::error::Result;

type HmacSha256 = Hmac<Sha256>;

/// Allowed clock difference for codes from the future
const MAX_CLOCK_SKEW: u64 = 60;

/// Account data the code is bound to
#[derive(Debug, Clone, Copy)]
pub struct CodeSubject<'a> {
    pub user_id: i64,
    pub username: &'a str,
    pub nonce: &'a str,
}

pub struct VerificationCodes {
    keyed_mac: HmacSha256,
    validity: Duration,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl VerificationCodes {
    pub fn new(secret: impl AsRef<[u8]>, validity: Duration) -> Result<Self> {
        Ok(VerificationCodes {
            keyed_mac: HmacSha256::new_from_slice(secret.as_ref())?,
            validity,
        })
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    fn mac(&self, subject: &CodeSubject<'_>, timestamp: u64) -> HmacSha256 {
        let mut mac = self.keyed_mac.clone();
        mac.update(&subject.user_id.to_be_bytes());
        mac.update(subject.username.to_lowercase().as_bytes());
        mac.update(b"\0");
        mac.update(subject.nonce.as_bytes());
        mac.update(b"\0");
        mac.update(&timestamp.to_be_bytes());
        mac
    }

    pub fn issue(&self, subject: CodeSubject<'_>) -> String {
        self.issue_at(subject, unix_now())
    }

    fn issue_at(&self, subject: CodeSubject<'_>, timestamp: u64) -> String {
        let tag = self.mac(&subject, timestamp).finalize().into_bytes();
        format!("{}-{}", timestamp, base16ct::lower::encode_string(&tag))
    }

    pub fn verify(&self, subject: CodeSubject<'_>, code: &str) -> bool {
        let Some((ts, tag)) = code.trim().split_once('-') else {
            debug!("Malformed verification code");
            return false;
        };
        let Ok(timestamp) = ts.parse::<u64>() else {
            debug!("Invalid timestamp in verification code");
            return false;
        };
        let now = unix_now();
        if timestamp > now + MAX_CLOCK_SKEW
            || now.saturating_sub(timestamp) > self.validity.as_secs()
        {
            debug!("Verification code expired");
            return false;
        }
        let Ok(tag) = base16ct::mixed::decode_vec(tag) else {
            debug!("Invalid hex in verification code");
            return false;
        };
        self.mac(&subject, timestamp).verify_slice(&tag).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    fn subject<'a>(nonce: &'a str) -> CodeSubject<'a> {
        CodeSubject {
            user_id: 7,
            username: "usak",
            nonce,
        }
    }

    #[test]
    fn test_code_roundtrip() {
        let codes = VerificationCodes::new("secret", Duration::from_secs(3600)).unwrap();
        let code = codes.issue(subject("abc"));
        assert!(codes.verify(subject("abc"), &code));
        assert!(codes.verify(subject("abc"), &code.to_uppercase()));
    }

    #[test]
    fn test_code_bound_to_subject() {
        let codes = VerificationCodes::new("secret", Duration::from_secs(3600)).unwrap();
        let code = codes.issue(subject("abc"));
        assert!(!codes.verify(subject("rotated"), &code));
        let other_user = CodeSubject {
            user_id: 8,
            ..subject("abc")
        };
        assert!(!codes.verify(other_user, &code));
        let other_secret = VerificationCodes::new("other", Duration::from_secs(3600)).unwrap();
        assert!(!other_secret.verify(subject("abc"), &code));
    }

    #[test]
    #[traced_test]
    fn test_code_expired() {
        let codes = VerificationCodes::new("secret", Duration::from_secs(60)).unwrap();
        let code = codes.issue_at(subject("abc"), unix_now() - 120);
        assert!(!codes.verify(subject("abc"), &code));
        let code = codes.issue_at(subject("abc"), unix_now() + 3600);
        assert!(!codes.verify(subject("abc"), &code));
        assert!(logs_contain("Verification code expired"));
    }

    #[test]
    #[traced_test]
    fn test_malformed_code() {
        let codes = VerificationCodes::new("secret", Duration::from_secs(60)).unwrap();
        for code in ["", "123", "abc-def", "123-zz", "-"] {
            assert!(!codes.verify(subject("abc"), code));
        }
        assert!(logs_contain("Malformed verification code"));
    }
}
