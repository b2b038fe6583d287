use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row as _, sqlite::SqliteRow};
use time::OffsetDateTime;
use tracing::debug;
use yamdb_types::{
    claim::{Actor, Authorization, Role},
    general::ValidEmail,
};

use crate::{Batch, Error, ListingParams, MAX_LIMIT, error::Result};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, is_superuser, confirmed";
const VALID_ORDER_FIELDS: &[&str] = &["id", "username", "email", "role"];

fn new_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateUser {
    #[garde(length(min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(length(max = 150))]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    pub last_name: Option<String>,
    #[garde(length(max = 5000))]
    #[serde(default)]
    pub bio: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    #[garde(skip)]
    #[serde(default)]
    pub role: Role,
    /// Only settable from the admin CLI
    #[garde(skip)]
    #[serde(skip)]
    pub is_superuser: bool,
}

impl CreateUser {
    pub fn signup(username: String, email: ValidEmail) -> Self {
        CreateUser {
            username,
            email,
            first_name: None,
            last_name: None,
            bio: None,
            role: Role::User,
            is_superuser: false,
        }
    }
}

/// Partial update of an user, `None` leaves the field unchanged
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserChanges {
    #[garde(length(min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    #[garde(dive)]
    pub email: Option<ValidEmail>,
    #[garde(length(max = 150))]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    pub last_name: Option<String>,
    #[garde(length(max = 5000))]
    pub bio: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    #[garde(skip)]
    pub role: Option<Role>,
}

/// Changes a user can do to own profile - there is no role, so it is ignored
/// when present in the payload
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProfileChanges {
    #[garde(length(min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    #[garde(dive)]
    pub email: Option<ValidEmail>,
    #[garde(length(max = 150))]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    pub last_name: Option<String>,
    #[garde(length(max = 5000))]
    pub bio: Option<String>,
}

impl From<ProfileChanges> for UserChanges {
    fn from(value: ProfileChanges) -> Self {
        UserChanges {
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            bio: value.bio,
            role: None,
        }
    }
}

impl From<CreateUser> for UserChanges {
    fn from(value: CreateUser) -> Self {
        UserChanges {
            username: Some(value.username),
            email: Some(value.email),
            first_name: value.first_name,
            last_name: value.last_name,
            bio: Some(value.bio.unwrap_or_default()),
            role: Some(value.role),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub role: Role,
    pub is_superuser: bool,
    pub confirmed: bool,
}

impl sqlx::FromRow<'_, SqliteRow> for User {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let role: Role = row
            .try_get::<String, _>("role")?
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            bio: row.try_get("bio")?,
            role,
            is_superuser: row.try_get("is_superuser")?,
            confirmed: row.try_get("confirmed")?,
        })
    }
}

impl Authorization for User {
    fn role(&self) -> Role {
        self.role
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_superuser: user.is_superuser,
        }
    }
}

/// Data to which verification codes are bound
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationState {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub verification_nonce: String,
    pub confirmed: bool,
}

/// Which of the identity fields are already used by other account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityConflicts {
    pub username: bool,
    pub email: bool,
}

impl IdentityConflicts {
    pub fn any(&self) -> bool {
        self.username || self.email
    }
}

pub type UserRepository = UserRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, bio, role, is_superuser, confirmed, verification_nonce, created)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, FALSE, ?8, ?9)",
        )
        .bind(&payload.username)
        .bind(payload.email.as_str())
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(payload.bio.unwrap_or_default())
        .bind(payload.role.as_str())
        .bind(payload.is_superuser)
        .bind(new_nonce())
        .bind(OffsetDateTime::now_utc())
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn list(&self, params: ListingParams, search: Option<&str>) -> Result<Batch<User>> {
        let order = params.ordering(VALID_ORDER_FIELDS, None, "username")?;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE (?1 IS NULL OR username = ?1) {order} LIMIT ?2 OFFSET ?3"
        );
        let rows = sqlx::query_as::<_, User>(&sql)
            .bind(search)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        let total: i64 =
            sqlx::query_scalar("SELECT count(*) FROM users WHERE (?1 IS NULL OR username = ?1)")
                .bind(search)
                .fetch_one(&self.executor)
                .await?;
        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    /// Lookup is case insensitive
    pub async fn find_by_username(&self, username: &str) -> Result<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    /// Finds account matching both username and email
    pub async fn find_identity(&self, username: &str, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1 AND email = ?2");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.executor)
            .await?;
        Ok(user)
    }

    /// Checks if username or email are used by an account other then `exclude_id`
    pub async fn conflicts(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: Option<i64>,
    ) -> Result<IdentityConflicts> {
        let (username, email): (bool, bool) = sqlx::query_as(
            "SELECT
            EXISTS(SELECT 1 FROM users WHERE ?1 IS NOT NULL AND username = ?1 AND (?3 IS NULL OR id <> ?3)),
            EXISTS(SELECT 1 FROM users WHERE ?2 IS NOT NULL AND email = ?2 AND (?3 IS NULL OR id <> ?3))",
        )
        .bind(username)
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.executor)
        .await?;
        Ok(IdentityConflicts { username, email })
    }

    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<User> {
        let result = sqlx::query(
            "UPDATE users SET
            username = COALESCE(?1, username),
            email = COALESCE(?2, email),
            first_name = COALESCE(?3, first_name),
            last_name = COALESCE(?4, last_name),
            bio = COALESCE(?5, bio),
            role = COALESCE(?6, role)
            WHERE id = ?7",
        )
        .bind(&changes.username)
        .bind(changes.email.as_ref().map(ValidEmail::as_str))
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.bio)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            self.get(id).await
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn verification_state(&self, username: &str) -> Result<VerificationState> {
        sqlx::query_as::<_, VerificationState>(
            "SELECT id, username, email, verification_nonce, confirmed FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    /// Marks account as confirmed and rotates its nonce, so codes bound to `expected_nonce`
    /// stop being valid. Returns false if nonce was already rotated by other redemption.
    pub async fn confirm(&self, id: i64, expected_nonce: &str) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET confirmed = TRUE, verification_nonce = ?1 WHERE id = ?2 AND verification_nonce = ?3",
        )
        .bind(new_nonce())
        .bind(id)
        .bind(expected_nonce)
        .execute(&self.executor)
        .await?;
        if res.rows_affected() == 0 {
            debug!("Nonce for user {id} already rotated");
        }
        Ok(res.rows_affected() == 1)
    }
}
