/// Handlers and router for catalogue entities addressed by slug - list, create and delete.
/// Reading is public, changes go through the access policy.
#[macro_export]
macro_rules! taxonomy_api {
    (
        $repository:ty,
        $create_type:ident,
        $record:ident,
        $resource:expr,
        tag = $tag:tt,
        operations = ($list_op:tt, $create_op:tt, $delete_op:tt) $(,)?
    ) => {
        $crate::repository_from_request!($repository);

        #[cfg(feature = "openapi")]
        #[derive(utoipa::OpenApi)]
        #[openapi(paths(crud_api::list, crud_api::create, crud_api::delete))]
        struct ModuleDocs;

        #[cfg(feature = "openapi")]
        pub fn api_docs() -> utoipa::openapi::OpenApi {
            use utoipa::OpenApi as _;
            ModuleDocs::openapi()
        }

        pub mod crud_api {
            use super::*;
            use $crate::{
                auth::CurrentActor,
                error::ApiResult,
                rest_api::{Page, Paging, SearchQuery},
                state::AppState,
                validate::Valid,
            };
            use axum::{
                extract::{Path, Query, State},
                response::IntoResponse,
                Json,
            };
            use http::StatusCode;
            use yamdb_types::Verb;

            #[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = $tag, operation_id = $list_op,
                params(Paging, SearchQuery), responses((status = StatusCode::OK, description = "Paginated listing", body = Page<$record>))))]
            pub async fn list(
                actor: CurrentActor,
                repository: $repository,
                State(state): State<AppState>,
                Valid(Query(paging)): Valid<Query<Paging>>,
                Valid(Query(search)): Valid<Query<SearchQuery>>,
            ) -> ApiResult<impl IntoResponse> {
                actor.permit(Verb::List, $resource)?;
                let default_page_size = state.config().default_page_size;
                let page_size = paging.page_size(default_page_size);
                let listing_params = paging.into_listing_params(default_page_size)?;
                let batch = repository
                    .list(listing_params, search.search.as_deref())
                    .await?;
                Ok((StatusCode::OK, Json(Page::try_from_batch(batch, page_size)?)))
            }

            #[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = $tag, operation_id = $create_op,
                request_body = $create_type, responses((status = StatusCode::CREATED, description = "Created entry", body = $record))))]
            pub async fn create(
                actor: CurrentActor,
                repository: $repository,
                Valid(Json(payload)): Valid<Json<$create_type>>,
            ) -> ApiResult<impl IntoResponse> {
                actor.permit(Verb::Create, $resource)?;
                let record = repository.create(payload).await?;

                Ok((StatusCode::CREATED, Json(record)))
            }

            #[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{slug}", tag = $tag, operation_id = $delete_op,
                responses((status = StatusCode::NO_CONTENT, description = "Deleted successfully"))))]
            pub async fn delete(
                actor: CurrentActor,
                Path(slug): Path<String>,
                repository: $repository,
            ) -> ApiResult<impl IntoResponse> {
                actor.permit(Verb::Delete, $resource)?;
                repository.delete(&slug).await?;

                Ok((StatusCode::NO_CONTENT, ()))
            }
        }

        pub fn router() -> axum::Router<$crate::state::AppState> {
            use axum::routing::{delete, get};
            axum::Router::new()
                .route("/", get(crud_api::list).post(crud_api::create))
                .route("/{slug}", delete(crud_api::delete))
        }
    };
}
