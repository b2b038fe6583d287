use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row as _, sqlite::SqliteRow};
use time::OffsetDateTime;

use crate::{Batch, ChosenDB, Error, ListingParams, MAX_LIMIT, error::Result};

const VALID_ORDER_FIELDS: &[&str] = &["id", "pub_date"];

// comment is addressed by title and review, both have to match
const COMMENT_SELECT: &str = r#"
SELECT c.id, c.review_id, c.author_id, c.text, c.pub_date, u.username AS author
FROM comment c
JOIN review r ON c.review_id = r.id
JOIN users u ON c.author_id = u.id
"#;

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateComment {
    #[garde(length(min = 1, max = 10_000))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PatchComment {
    #[garde(length(min = 1, max = 10_000))]
    pub text: Option<String>,
}

impl From<CreateComment> for PatchComment {
    fn from(value: CreateComment) -> Self {
        PatchComment {
            text: Some(value.text),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(skip)]
    pub author_id: i64,
    #[serde(skip)]
    pub review_id: i64,
}

impl sqlx::FromRow<'_, SqliteRow> for Comment {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Comment {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            author: row.try_get("author")?,
            pub_date: row.try_get("pub_date")?,
            author_id: row.try_get("author_id")?,
            review_id: row.try_get("review_id")?,
        })
    }
}

/// Identifies review under which comments live
#[derive(Debug, Clone, Copy)]
pub struct ReviewRef {
    pub title_id: i64,
    pub review_id: i64,
}

pub type CommentRepository = CommentRepositoryImpl<Pool<ChosenDB>>;

pub struct CommentRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CommentRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    async fn review_exists(&self, review: ReviewRef) -> Result<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM review WHERE id = ? AND title_id = ?)")
                .bind(review.review_id)
                .bind(review.title_id)
                .fetch_one(&self.executor)
                .await?;
        if exists {
            Ok(())
        } else {
            Err(Error::RecordNotFound("Review".to_string()))
        }
    }

    pub async fn create(
        &self,
        review: ReviewRef,
        author_id: i64,
        payload: CreateComment,
    ) -> Result<Comment> {
        self.review_exists(review).await?;
        let result = sqlx::query(
            "INSERT INTO comment (review_id, author_id, text, pub_date) VALUES (?, ?, ?, ?)",
        )
        .bind(review.review_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.executor)
        .await?;
        self.get(review, result.last_insert_rowid()).await
    }

    pub async fn get(&self, review: ReviewRef, id: i64) -> Result<Comment> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = ? AND c.review_id = ? AND r.title_id = ?");
        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(review.review_id)
            .bind(review.title_id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Comment".to_string()))
    }

    pub async fn list(&self, review: ReviewRef, params: ListingParams) -> Result<Batch<Comment>> {
        self.review_exists(review).await?;
        let order = params.ordering(VALID_ORDER_FIELDS, Some("c"), "id")?;
        let sql = format!(
            "{COMMENT_SELECT} WHERE c.review_id = ? AND r.title_id = ? {order} LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, Comment>(&sql)
            .bind(review.review_id)
            .bind(review.title_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM comment WHERE review_id = ?")
            .bind(review.review_id)
            .fetch_one(&self.executor)
            .await?;
        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    pub async fn update(&self, review: ReviewRef, id: i64, changes: PatchComment) -> Result<Comment> {
        let result = sqlx::query(
            "UPDATE comment SET text = COALESCE(?, text)
            WHERE id = ? AND review_id = ?
            AND EXISTS(SELECT 1 FROM review r WHERE r.id = comment.review_id AND r.title_id = ?)",
        )
        .bind(&changes.text)
        .bind(id)
        .bind(review.review_id)
        .bind(review.title_id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Comment".to_string()))
        } else {
            self.get(review, id).await
        }
    }

    pub async fn delete(&self, review: ReviewRef, id: i64) -> Result<()> {
        let res = sqlx::query(
            "DELETE FROM comment WHERE id = ? AND review_id = ?
            AND EXISTS(SELECT 1 FROM review r WHERE r.id = comment.review_id AND r.title_id = ?)",
        )
        .bind(id)
        .bind(review.review_id)
        .bind(review.title_id)
        .execute(&self.executor)
        .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Comment".to_string()))
        } else {
            Ok(())
        }
    }
}
