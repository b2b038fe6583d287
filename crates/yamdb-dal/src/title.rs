use std::collections::HashMap;

use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool, QueryBuilder, Row as _, SqliteConnection, sqlite::SqliteRow};
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    Batch, ChosenDB, Error, ListingParams, MAX_LIMIT, category::Category, error::Result,
    genre::Genre,
};

const VALID_ORDER_FIELDS: &[&str] = &["id", "name", "year"];

const TITLE_SELECT: &str = r#"
SELECT t.id, t.name, t.year, t.description,
COALESCE((SELECT AVG(r.score) FROM review r WHERE r.title_id = t.id), 0.0) AS rating,
c.name AS category_name, c.slug AS category_slug
FROM title t
LEFT JOIN category c ON t.category_id = c.id
"#;

const TITLE_FILTER: &str = r#"
WHERE (?1 IS NULL OR EXISTS (
    SELECT 1 FROM title_genres tg JOIN genre g ON g.id = tg.genre_id
    WHERE tg.title_id = t.id AND g.slug = ?1))
AND (?2 IS NULL OR c.slug = ?2)
AND (?3 IS NULL OR t.name LIKE ?3 ESCAPE '\')
AND (?4 IS NULL OR t.year = ?4)
"#;

fn valid_year(year: &i64, _ctx: &()) -> garde::Result {
    let current = OffsetDateTime::now_utc().year() as i64;
    if *year < 0 {
        Err(garde::Error::new("year cannot be negative"))
    } else if *year > current {
        Err(garde::Error::new(format!(
            "year cannot be greater than current year {current}"
        )))
    } else {
        Ok(())
    }
}

/// Full title payload, used for create and full update.
/// Genres and category are referenced by their slugs.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateTitle {
    #[garde(length(min = 1, max = 256))]
    pub name: String,
    #[garde(custom(valid_year))]
    pub year: i64,
    #[garde(length(max = 10_000))]
    #[serde(default)]
    pub description: Option<String>,
    #[garde(inner(length(min = 1, max = 50)))]
    #[serde(default)]
    pub genre: Vec<String>,
    #[garde(length(min = 1, max = 50))]
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PatchTitle {
    #[garde(length(min = 1, max = 256))]
    pub name: Option<String>,
    #[garde(inner(custom(valid_year)))]
    pub year: Option<i64>,
    #[garde(length(max = 10_000))]
    pub description: Option<String>,
    #[garde(inner(inner(length(min = 1, max = 50))))]
    pub genre: Option<Vec<String>>,
    #[garde(length(min = 1, max = 50))]
    pub category: Option<String>,
}

/// Changes applied to stored title, `None` keeps current value.
/// `category: Some(None)` removes the category.
#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<Option<String>>,
}

impl From<CreateTitle> for TitleChanges {
    fn from(value: CreateTitle) -> Self {
        TitleChanges {
            name: Some(value.name),
            year: Some(value.year),
            description: Some(value.description.unwrap_or_default()),
            genre: Some(value.genre),
            category: Some(value.category),
        }
    }
}

impl From<PatchTitle> for TitleChanges {
    fn from(value: PatchTitle) -> Self {
        TitleChanges {
            name: value.name,
            year: value.year,
            description: value.description,
            genre: value.genre,
            category: value.category.map(Some),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct TitleFilter {
    /// genre slug
    #[garde(length(max = 50))]
    pub genre: Option<String>,
    /// category slug
    #[garde(length(max = 50))]
    pub category: Option<String>,
    /// part of the name
    #[garde(length(max = 256))]
    pub name: Option<String>,
    #[garde(skip)]
    pub year: Option<i64>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub rating: f64,
    pub description: String,
    pub genre: Vec<Genre>,
    pub category: Option<Category>,
}

impl sqlx::FromRow<'_, SqliteRow> for Title {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let category = match row.try_get::<Option<String>, _>("category_slug")? {
            Some(slug) => Some(Category {
                name: row.try_get("category_name")?,
                slug,
            }),
            None => None,
        };
        Ok(Title {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            year: row.try_get("year")?,
            rating: row.try_get("rating")?,
            description: row.try_get("description")?,
            genre: Vec::new(),
            category,
        })
    }
}

async fn load_genres(
    conn: &mut SqliteConnection,
    title_ids: &[i64],
) -> Result<HashMap<i64, Vec<Genre>>> {
    let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
    if title_ids.is_empty() {
        return Ok(genres);
    }
    let mut query = QueryBuilder::<ChosenDB>::new(
        "SELECT tg.title_id, g.name, g.slug FROM title_genres tg JOIN genre g ON g.id = tg.genre_id WHERE tg.title_id IN (",
    );
    let mut ids = query.separated(", ");
    for id in title_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY g.name");

    let rows = query.build().fetch_all(&mut *conn).await?;
    for row in rows {
        let title_id: i64 = row.try_get("title_id")?;
        genres.entry(title_id).or_default().push(Genre {
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
        });
    }
    Ok(genres)
}

async fn get(id: i64, conn: &mut SqliteConnection) -> Result<Title> {
    let sql = format!("{TITLE_SELECT} WHERE t.id = ?");
    let mut title = sqlx::query_as::<_, Title>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Title".to_string()))?;
    title.genre = load_genres(conn, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();
    Ok(title)
}

async fn resolve_category(slug: &str, conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query_scalar("SELECT id FROM category WHERE slug = ?")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::UnknownReference {
            entity: "category",
            slug: slug.to_string(),
        })
}

async fn set_genres(title_id: i64, slugs: &[String], conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
        .bind(title_id)
        .execute(&mut *conn)
        .await?;
    for slug in slugs {
        let genre_id: i64 = sqlx::query_scalar("SELECT id FROM genre WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::UnknownReference {
                entity: "genre",
                slug: slug.clone(),
            })?;
        sqlx::query("INSERT OR IGNORE INTO title_genres (title_id, genre_id) VALUES (?, ?)")
            .bind(title_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub type TitleRepository = TitleRepositoryImpl<Pool<ChosenDB>>;

pub struct TitleRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> TitleRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateTitle) -> Result<Title> {
        let mut tx = self.executor.begin().await?;
        let category_id = match payload.category.as_deref() {
            Some(slug) => Some(resolve_category(slug, &mut tx).await?),
            None => None,
        };
        let result = sqlx::query(
            "INSERT INTO title (name, year, description, category_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(payload.description.as_deref().unwrap_or_default())
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();
        set_genres(id, &payload.genre, &mut tx).await?;
        let title = get(id, &mut tx).await?;
        tx.commit().await?;
        debug!("Created title {id}");
        Ok(title)
    }

    pub async fn update(&self, id: i64, changes: TitleChanges) -> Result<Title> {
        let mut tx = self.executor.begin().await?;
        let (set_category, category_id) = match changes.category.as_ref() {
            Some(Some(slug)) => (true, Some(resolve_category(slug, &mut tx).await?)),
            Some(None) => (true, None),
            None => (false, None),
        };
        let result = sqlx::query(
            "UPDATE title SET
            name = COALESCE(?1, name),
            year = COALESCE(?2, year),
            description = COALESCE(?3, description),
            category_id = CASE WHEN ?4 THEN ?5 ELSE category_id END
            WHERE id = ?6",
        )
        .bind(&changes.name)
        .bind(changes.year)
        .bind(&changes.description)
        .bind(set_category)
        .bind(category_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Title".to_string()));
        }
        if let Some(genres) = changes.genre.as_ref() {
            set_genres(id, genres, &mut tx).await?;
        }
        let title = get(id, &mut tx).await?;
        tx.commit().await?;
        Ok(title)
    }

    pub async fn get(&self, id: i64) -> Result<Title> {
        let mut conn = self.executor.acquire().await?;
        get(id, &mut conn).await
    }

    pub async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM title WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.executor)
            .await?;
        Ok(exists)
    }

    pub async fn list(&self, params: ListingParams, filter: &TitleFilter) -> Result<Batch<Title>> {
        let order = params.ordering(VALID_ORDER_FIELDS, Some("t"), "id")?;
        let name_pattern = filter.name.as_deref().map(crate::contains_pattern);
        let sql = format!("{TITLE_SELECT} {TITLE_FILTER} {order} LIMIT ?5 OFFSET ?6");
        let mut conn = self.executor.acquire().await?;
        let mut rows = sqlx::query_as::<_, Title>(&sql)
            .bind(&filter.genre)
            .bind(&filter.category)
            .bind(&name_pattern)
            .bind(filter.year)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&mut *conn)
            .take(MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;

        let count_sql = format!(
            "SELECT count(*) FROM title t LEFT JOIN category c ON t.category_id = c.id {TITLE_FILTER}"
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&filter.genre)
            .bind(&filter.category)
            .bind(&name_pattern)
            .bind(filter.year)
            .fetch_one(&mut *conn)
            .await?;

        let ids: Vec<i64> = rows.iter().map(|t| t.id).collect();
        let mut genres = load_genres(&mut conn, &ids).await?;
        for title in rows.iter_mut() {
            title.genre = genres.remove(&title.id).unwrap_or_default();
        }

        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM title WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Title".to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_validation() {
        let mut payload = CreateTitle {
            name: "Solaris".to_string(),
            year: 1972,
            description: None,
            genre: vec![],
            category: None,
        };
        assert!(payload.validate().is_ok());
        payload.year = -1;
        assert!(payload.validate().is_err());
        payload.year = OffsetDateTime::now_utc().year() as i64 + 1;
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_patch_into_changes() {
        let patch = PatchTitle {
            category: Some("film".to_string()),
            ..Default::default()
        };
        let changes: TitleChanges = patch.into();
        assert_eq!(changes.category, Some(Some("film".to_string())));
        assert!(changes.genre.is_none());

        let put = CreateTitle {
            name: "Stalker".to_string(),
            year: 1979,
            description: None,
            genre: vec![],
            category: None,
        };
        let changes: TitleChanges = put.into();
        assert_eq!(changes.category, Some(None));
        assert_eq!(changes.description.as_deref(), Some(""));
    }
}
