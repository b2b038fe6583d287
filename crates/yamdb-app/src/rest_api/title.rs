use crate::{auth::CurrentActor, error::ApiResult, repository_from_request, state::AppState};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use tracing::info;
#[cfg_attr(not(feature = "openapi"), allow(unused_imports))]
use yamdb_dal::title::{CreateTitle, PatchTitle, Title, TitleFilter, TitleRepository};
use yamdb_types::{Resource, Verb};

use crate::{
    rest_api::{Page, Paging},
    validate::Valid,
};

repository_from_request!(TitleRepository);

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(list, get_title, create, update, partial_update, delete))]
struct ModuleDocs;

/// Includes nested reviews and comments
#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
        .merge_from(super::review::api_docs())
        .merge_from(super::comment::api_docs())
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = "Titles", operation_id = "listTitles",
    params(Paging, TitleFilter), responses((status = StatusCode::OK, description = "List of Titles paginated", body = Page<Title>))))]
pub async fn list(
    actor: CurrentActor,
    repository: TitleRepository,
    State(state): State<AppState>,
    Valid(Query(paging)): Valid<Query<Paging>>,
    Valid(Query(filter)): Valid<Query<TitleFilter>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::List, Resource::Title)?;
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(listing_params, &filter).await?;
    Ok((StatusCode::OK, Json(Page::try_from_batch(batch, page_size)?)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{title_id}", tag = "Titles", operation_id = "getTitle",
    responses((status = StatusCode::OK, description = "Title with rating", body = Title))))]
pub async fn get_title(
    actor: CurrentActor,
    Path(title_id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Retrieve, Resource::Title)?;
    let record = repository.get(title_id).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Titles", operation_id = "createTitle",
    request_body = CreateTitle, responses((status = StatusCode::CREATED, description = "Created Title", body = Title))))]
pub async fn create(
    actor: CurrentActor,
    repository: TitleRepository,
    Valid(Json(payload)): Valid<Json<CreateTitle>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Create, Resource::Title)?;
    let record = repository.create(payload).await?;
    info!("Title {} created", record.id);

    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(put, path = "/{title_id}", tag = "Titles", operation_id = "updateTitle",
    request_body = CreateTitle, responses((status = StatusCode::OK, description = "Updated Title", body = Title))))]
pub async fn update(
    actor: CurrentActor,
    Path(title_id): Path<i64>,
    repository: TitleRepository,
    Valid(Json(payload)): Valid<Json<CreateTitle>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Update, Resource::Title)?;
    let record = repository.update(title_id, payload.into()).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(patch, path = "/{title_id}", tag = "Titles", operation_id = "patchTitle",
    request_body = PatchTitle, responses((status = StatusCode::OK, description = "Updated Title", body = Title))))]
pub async fn partial_update(
    actor: CurrentActor,
    Path(title_id): Path<i64>,
    repository: TitleRepository,
    Valid(Json(payload)): Valid<Json<PatchTitle>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::PartialUpdate, Resource::Title)?;
    let record = repository.update(title_id, payload.into()).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{title_id}", tag = "Titles", operation_id = "deleteTitle",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted successfully"))))]
pub async fn delete(
    actor: CurrentActor,
    Path(title_id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Delete, Resource::Title)?;
    repository.delete(title_id).await?;
    info!("Title {title_id} deleted");

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{title_id}",
            get(get_title)
                .put(update)
                .patch(partial_update)
                .delete(delete),
        )
        .nest("/{title_id}/reviews", super::review::router())
}
