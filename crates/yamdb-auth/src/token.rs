use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use yamdb_types::claim::TimeLimited;

use crate::error::Result;

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

/// Issues and validates access tokens (HS256 JWT)
pub struct TokenManager {
    keys: Keys,
    default_validity: std::time::Duration,
    header: Header,
    validation: Validation,
}

impl TokenManager {
    pub fn new(secret: impl AsRef<[u8]>, default_validity: std::time::Duration) -> Self {
        let validation = Validation::default();
        let header = Header::default();
        Self {
            keys: Keys::new(secret),
            default_validity,
            header,
            validation,
        }
    }

    pub fn issue(&self, mut claims: impl serde::Serialize + TimeLimited) -> Result<String> {
        let validity = std::time::SystemTime::now() + self.default_validity;
        claims.set_validity(validity);
        let token = encode(&self.header, &claims, &self.keys.encoding)?;
        Ok(token)
    }

    #[cfg(test)]
    pub fn issue_expired(&self, mut claims: impl serde::Serialize + TimeLimited) -> Result<String> {
        let validity = std::time::SystemTime::now() - self.default_validity;
        claims.set_validity(validity);
        let token = encode(&self.header, &claims, &self.keys.encoding)?;
        Ok(token)
    }

    pub fn validate<T>(&self, token: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let data = decode::<T>(token, &self.keys.decoding, &self.validation)?;
        Ok(data.claims)
    }

    pub fn default_validity(&self) -> std::time::Duration {
        self.default_validity
    }
}

#[cfg(test)]
mod tests {
    use yamdb_types::claim::ApiClaim;

    use super::*;
    use crate::Error;

    #[test]
    fn test_token() {
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let token = manager.issue(ApiClaim::new_expired("123")).unwrap();
        let claim = manager.validate::<ApiClaim>(&token).unwrap();
        assert_eq!(claim.sub, "123");
        assert_eq!(claim.user_id(), Some(123));
        assert!(claim.check_validity());
    }

    #[test]
    fn test_token_expiration() {
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let token = manager.issue_expired(ApiClaim::new_expired("123")).unwrap();
        let res = manager.validate::<ApiClaim>(&token);
        match res {
            Err(Error::JwtError(e)) => assert!(matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            )),
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_token_other_secret() {
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let other = TokenManager::new("other secret", std::time::Duration::from_secs(3600));
        let token = manager.issue(ApiClaim::new_expired("1")).unwrap();
        assert!(other.validate::<ApiClaim>(&token).is_err());
    }
}
