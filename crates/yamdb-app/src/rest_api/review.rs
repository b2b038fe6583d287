use crate::{
    auth::CurrentActor,
    error::ApiResult,
    repository_from_request,
    rest_api::{Page, Paging},
    state::AppState,
    validate::Valid,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use tracing::debug;
#[cfg_attr(not(feature = "openapi"), allow(unused_imports))]
use yamdb_dal::{
    review::{CreateReview, PatchReview, Review, ReviewRepository},
    title::TitleRepository,
};
use yamdb_types::{Resource, Verb};

repository_from_request!(ReviewRepository);

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(list, get_review, create, update, partial_update, delete))]
struct ModuleDocs;

/// Paths are relative to titles
#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

fn review_resource(author_id: i64) -> Resource {
    Resource::Review {
        author_id: Some(author_id),
    }
}

async fn ensure_title(titles: &TitleRepository, title_id: i64) -> ApiResult<()> {
    if titles.exists(title_id).await? {
        Ok(())
    } else {
        Err(yamdb_dal::Error::RecordNotFound("Title".to_string()).into())
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{title_id}/reviews", tag = "Reviews", operation_id = "listReviews",
    params(Paging), responses((status = StatusCode::OK, description = "List of Reviews paginated", body = Page<Review>))))]
pub async fn list(
    actor: CurrentActor,
    Path(title_id): Path<i64>,
    repository: ReviewRepository,
    titles: TitleRepository,
    State(state): State<AppState>,
    Valid(Query(paging)): Valid<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::List, Resource::Review { author_id: None })?;
    ensure_title(&titles, title_id).await?;
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(title_id, listing_params).await?;
    Ok((StatusCode::OK, Json(Page::try_from_batch(batch, page_size)?)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{title_id}/reviews/{review_id}", tag = "Reviews", operation_id = "getReview",
    responses((status = StatusCode::OK, description = "Review detail", body = Review))))]
pub async fn get_review(
    actor: CurrentActor,
    Path((title_id, id)): Path<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(title_id, id).await?;
    actor.permit(Verb::Retrieve, review_resource(record.author_id))?;
    Ok((StatusCode::OK, Json(record)))
}

/// One review per author and title, repeated attempt is `duplicate_review`
#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/{title_id}/reviews", tag = "Reviews", operation_id = "createReview",
    request_body = CreateReview, responses((status = StatusCode::CREATED, description = "Created Review", body = Review))))]
pub async fn create(
    actor: CurrentActor,
    Path(title_id): Path<i64>,
    repository: ReviewRepository,
    titles: TitleRepository,
    Valid(Json(payload)): Valid<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Create, Resource::Review { author_id: None })?;
    let author_id = actor.authenticated()?.id;
    ensure_title(&titles, title_id).await?;
    let record = repository.create(title_id, author_id, payload).await?;
    debug!("Review {} of title {title_id} created", record.id);

    Ok((StatusCode::CREATED, Json(record)))
}

async fn apply_update(
    actor: CurrentActor,
    verb: Verb,
    title_id: i64,
    id: i64,
    repository: ReviewRepository,
    changes: PatchReview,
) -> ApiResult<impl IntoResponse> {
    actor.authenticated()?;
    let existing = repository.get(title_id, id).await?;
    actor.permit(verb, review_resource(existing.author_id))?;
    let record = repository.update(title_id, id, changes).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(put, path = "/{title_id}/reviews/{review_id}", tag = "Reviews", operation_id = "updateReview",
    request_body = CreateReview, responses((status = StatusCode::OK, description = "Updated Review", body = Review))))]
pub async fn update(
    actor: CurrentActor,
    Path((title_id, id)): Path<(i64, i64)>,
    repository: ReviewRepository,
    Valid(Json(payload)): Valid<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    apply_update(actor, Verb::Update, title_id, id, repository, payload.into()).await
}

#[cfg_attr(feature = "openapi", utoipa::path(patch, path = "/{title_id}/reviews/{review_id}", tag = "Reviews", operation_id = "patchReview",
    request_body = PatchReview, responses((status = StatusCode::OK, description = "Updated Review", body = Review))))]
pub async fn partial_update(
    actor: CurrentActor,
    Path((title_id, id)): Path<(i64, i64)>,
    repository: ReviewRepository,
    Valid(Json(payload)): Valid<Json<PatchReview>>,
) -> ApiResult<impl IntoResponse> {
    apply_update(actor, Verb::PartialUpdate, title_id, id, repository, payload).await
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{title_id}/reviews/{review_id}", tag = "Reviews", operation_id = "deleteReview",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted successfully"))))]
pub async fn delete(
    actor: CurrentActor,
    Path((title_id, id)): Path<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    actor.authenticated()?;
    let existing = repository.get(title_id, id).await?;
    actor.permit(Verb::Delete, review_resource(existing.author_id))?;
    repository.delete(title_id, id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{review_id}",
            get(get_review)
                .put(update)
                .patch(partial_update)
                .delete(delete),
        )
        .nest("/{review_id}/comments", super::comment::router())
}
