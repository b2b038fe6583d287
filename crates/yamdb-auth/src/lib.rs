pub mod code;
pub mod error;
pub mod mail;
pub mod token;

pub use code::{CodeSubject, VerificationCodes};
pub use error::{Error, Result};
pub use mail::{FileMailer, Mail, MailDispatcher, SmtpConfig, SmtpMailer};
pub use token::TokenManager;
