use jsonwebtoken::errors::Error as JwtError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
    #[error("Invalid HMAC key: {0}")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
    #[error("SMTP transport error: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),
    #[error("Email address parse error: {0}")]
    AddressError(#[from] lettre::address::AddressError),
    #[error("Email build error: {0}")]
    MailBuildError(#[from] lettre::error::Error),
    #[error("Mail storage error: {0}")]
    MailStorageError(#[from] std::io::Error),
    #[error("Mail serialization error: {0}")]
    MailSerializationError(#[from] serde_json::Error),
}
