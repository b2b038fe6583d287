//! Identity rules shared by signup, user management and own profile updates

use yamdb_dal::user::UserRepository;
use yamdb_types::general::{is_reserved_username, RESERVED_USERNAME};

use crate::error::{ApiError, ApiResult};

pub fn check_reserved(username: &str) -> ApiResult<()> {
    if is_reserved_username(username) {
        Err(ApiError::Validation {
            code: "reserved_username",
            message: format!("Username '{RESERVED_USERNAME}' is not allowed"),
        })
    } else {
        Ok(())
    }
}

/// Username must not be reserved, username and email must not be used by other account
/// than `exclude_id` (comparison is case insensitive)
pub async fn check_identity(
    repository: &UserRepository,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<i64>,
) -> ApiResult<()> {
    if let Some(username) = username {
        check_reserved(username)?;
    }
    let conflicts = repository.conflicts(username, email, exclude_id).await?;
    if conflicts.username {
        return Err(ApiError::Validation {
            code: "username_taken",
            message: "User with this username already exists".to_string(),
        });
    }
    if conflicts.email {
        return Err(ApiError::Validation {
            code: "email_taken",
            message: "User with this email already exists".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved() {
        assert!(matches!(
            check_reserved("me"),
            Err(ApiError::Validation {
                code: "reserved_username",
                ..
            })
        ));
        assert!(check_reserved("me2").is_ok());
    }
}
