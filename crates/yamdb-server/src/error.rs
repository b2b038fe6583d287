#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Invalid listen address: {0}")]
    AddressError(#[from] std::net::AddrParseError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] yamdb_dal::Error),

    #[error("Auth setup error: {0}")]
    AuthError(#[from] yamdb_auth::Error),

    #[error("Secret file is corrupted, expected {expected} bytes, found {found}")]
    InvalidSecret { expected: usize, found: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
