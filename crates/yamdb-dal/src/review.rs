use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row as _, sqlite::SqliteRow};
use time::OffsetDateTime;
use tracing::debug;

use crate::{Batch, ChosenDB, Error, ListingParams, MAX_LIMIT, error::Result};

const VALID_ORDER_FIELDS: &[&str] = &["id", "score", "pub_date"];

const REVIEW_SELECT: &str = r#"
SELECT r.id, r.title_id, r.author_id, r.text, r.score, r.pub_date, u.username AS author
FROM review r
JOIN users u ON r.author_id = u.id
"#;

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateReview {
    #[garde(length(min = 1, max = 10_000))]
    pub text: String,
    #[garde(range(min = 1, max = 10))]
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PatchReview {
    #[garde(length(min = 1, max = 10_000))]
    pub text: Option<String>,
    #[garde(range(min = 1, max = 10))]
    pub score: Option<i64>,
}

impl From<CreateReview> for PatchReview {
    fn from(value: CreateReview) -> Self {
        PatchReview {
            text: Some(value.text),
            score: Some(value.score),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Review {
    pub id: i64,
    pub text: String,
    /// username of the author
    pub author: String,
    pub score: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(skip)]
    pub author_id: i64,
    #[serde(skip)]
    pub title_id: i64,
}

impl sqlx::FromRow<'_, SqliteRow> for Review {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Review {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            author: row.try_get("author")?,
            score: row.try_get("score")?,
            pub_date: row.try_get("pub_date")?,
            author_id: row.try_get("author_id")?,
            title_id: row.try_get("title_id")?,
        })
    }
}

pub type ReviewRepository = ReviewRepositoryImpl<Pool<ChosenDB>>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn has_reviewed(&self, title_id: i64, author_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM review WHERE title_id = ? AND author_id = ?)",
        )
        .bind(title_id)
        .bind(author_id)
        .fetch_one(&self.executor)
        .await?;
        Ok(exists)
    }

    /// Only one review per author and title is allowed. Existing review is checked first,
    /// concurrent insert is then caught by the unique index.
    pub async fn create(
        &self,
        title_id: i64,
        author_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        if self.has_reviewed(title_id, author_id).await? {
            debug!("User {author_id} already reviewed title {title_id}");
            return Err(Error::DuplicateReview);
        }
        self.insert(title_id, author_id, payload).await
    }

    /// Stores review without the pre-check, unique index rejects second review of same author
    pub async fn insert(
        &self,
        title_id: i64,
        author_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        let result = sqlx::query(
            "INSERT INTO review (title_id, author_id, text, score, pub_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(payload.score)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.executor)
        .await
        .map_err(|e| match Error::from(e) {
            Error::UniqueViolation(msg) => {
                debug!("Concurrent review insert rejected: {msg}");
                Error::DuplicateReview
            }
            other => other,
        })?;

        self.get(title_id, result.last_insert_rowid()).await
    }

    pub async fn get(&self, title_id: i64, id: i64) -> Result<Review> {
        let sql = format!("{REVIEW_SELECT} WHERE r.id = ? AND r.title_id = ?");
        sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(title_id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    pub async fn list(&self, title_id: i64, params: ListingParams) -> Result<Batch<Review>> {
        let order = params.ordering(VALID_ORDER_FIELDS, Some("r"), "id")?;
        let sql = format!("{REVIEW_SELECT} WHERE r.title_id = ? {order} LIMIT ? OFFSET ?");
        let rows = sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM review WHERE title_id = ?")
            .bind(title_id)
            .fetch_one(&self.executor)
            .await?;
        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    /// Author and publication date never change
    pub async fn update(&self, title_id: i64, id: i64, changes: PatchReview) -> Result<Review> {
        let result = sqlx::query(
            "UPDATE review SET text = COALESCE(?, text), score = COALESCE(?, score)
            WHERE id = ? AND title_id = ?",
        )
        .bind(&changes.text)
        .bind(changes.score)
        .bind(id)
        .bind(title_id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Review".to_string()))
        } else {
            self.get(title_id, id).await
        }
    }

    pub async fn delete(&self, title_id: i64, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM review WHERE id = ? AND title_id = ?")
            .bind(id)
            .bind(title_id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Review".to_string()))
        } else {
            Ok(())
        }
    }
}
