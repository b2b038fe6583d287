/// Generates payload, record and repository for a flat catalogue entity
/// identified by its slug (categories, genres)
macro_rules! taxonomy_repository {
    (
        table = $table:literal,
        label = $label:literal,
        create = $create:ident,
        record = $record:ident,
        repository = $repo:ident,
        repository_impl = $repo_impl:ident $(,)?
    ) => {
        use futures::{StreamExt as _, TryStreamExt as _};
        use garde::Validate;
        use serde::{Deserialize, Serialize};
        use sqlx::Pool;

        use crate::{Batch, Error, ListingParams, MAX_LIMIT, error::Result};

        const VALID_ORDER_FIELDS: &[&str] = &["name", "slug"];

        #[derive(Debug, Serialize, Deserialize, Clone, Validate)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub struct $create {
            #[garde(length(min = 1, max = 256))]
            pub name: String,
            #[garde(length(min = 1, max = 50), pattern(r"^[-a-zA-Z0-9_]+$"))]
            pub slug: String,
        }

        #[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub struct $record {
            pub name: String,
            pub slug: String,
        }

        pub type $repo = $repo_impl<Pool<crate::ChosenDB>>;

        pub struct $repo_impl<E> {
            executor: E,
        }

        impl<'c, E> $repo_impl<E>
        where
            for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
        {
            pub fn new(executor: E) -> Self {
                Self { executor }
            }

            pub async fn create(&self, payload: $create) -> Result<$record> {
                sqlx::query(concat!("INSERT INTO ", $table, " (name, slug) VALUES (?, ?)"))
                    .bind(&payload.name)
                    .bind(&payload.slug)
                    .execute(&self.executor)
                    .await?;
                self.get(&payload.slug).await
            }

            pub async fn get(&self, slug: &str) -> Result<$record> {
                sqlx::query_as::<_, $record>(concat!(
                    "SELECT name, slug FROM ",
                    $table,
                    " WHERE slug = ?"
                ))
                .bind(slug)
                .fetch_optional(&self.executor)
                .await?
                .ok_or_else(|| Error::RecordNotFound($label.to_string()))
            }

            /// `search` matches part of the name
            pub async fn list(
                &self,
                params: ListingParams,
                search: Option<&str>,
            ) -> Result<Batch<$record>> {
                let order = params.ordering(VALID_ORDER_FIELDS, None, "name")?;
                let pattern = search.map(crate::contains_pattern);
                let sql = format!(
                    concat!(
                        "SELECT name, slug FROM ",
                        $table,
                        " WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\') {} LIMIT ?2 OFFSET ?3"
                    ),
                    order
                );
                let rows = sqlx::query_as::<_, $record>(&sql)
                    .bind(&pattern)
                    .bind(params.limit)
                    .bind(params.offset)
                    .fetch(&self.executor)
                    .take(MAX_LIMIT)
                    .try_collect::<Vec<_>>()
                    .await?;
                let total: i64 = sqlx::query_scalar(concat!(
                    "SELECT count(*) FROM ",
                    $table,
                    " WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\')"
                ))
                .bind(&pattern)
                .fetch_one(&self.executor)
                .await?;
                Ok(Batch {
                    offset: params.offset,
                    total: total as u64,
                    rows,
                })
            }

            pub async fn delete(&self, slug: &str) -> Result<()> {
                let res = sqlx::query(concat!("DELETE FROM ", $table, " WHERE slug = ?"))
                    .bind(slug)
                    .execute(&self.executor)
                    .await?;

                if res.rows_affected() == 0 {
                    Err(Error::RecordNotFound($label.to_string()))
                } else {
                    Ok(())
                }
            }
        }
    };
}

pub(crate) use taxonomy_repository;
