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
#[cfg_attr(not(feature = "openapi"), allow(unused_imports))]
use yamdb_dal::comment::{Comment, CommentRepository, CreateComment, PatchComment, ReviewRef};
use yamdb_types::{Resource, Verb};

repository_from_request!(CommentRepository);

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(list, get_comment, create, update, partial_update, delete))]
struct ModuleDocs;

/// Paths are relative to titles
#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

fn scope(title_id: i64, review_id: i64) -> ReviewRef {
    ReviewRef {
        title_id,
        review_id,
    }
}

fn comment_resource(author_id: i64) -> Resource {
    Resource::Comment {
        author_id: Some(author_id),
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{title_id}/reviews/{review_id}/comments", tag = "Comments", operation_id = "listComments",
    params(Paging), responses((status = StatusCode::OK, description = "List of Comments paginated", body = Page<Comment>))))]
pub async fn list(
    actor: CurrentActor,
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: CommentRepository,
    State(state): State<AppState>,
    Valid(Query(paging)): Valid<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::List, Resource::Comment { author_id: None })?;
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository
        .list(scope(title_id, review_id), listing_params)
        .await?;
    Ok((StatusCode::OK, Json(Page::try_from_batch(batch, page_size)?)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{title_id}/reviews/{review_id}/comments/{comment_id}", tag = "Comments", operation_id = "getComment",
    responses((status = StatusCode::OK, description = "Comment detail", body = Comment))))]
pub async fn get_comment(
    actor: CurrentActor,
    Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(scope(title_id, review_id), id).await?;
    actor.permit(Verb::Retrieve, comment_resource(record.author_id))?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/{title_id}/reviews/{review_id}/comments", tag = "Comments", operation_id = "createComment",
    request_body = CreateComment, responses((status = StatusCode::CREATED, description = "Created Comment", body = Comment))))]
pub async fn create(
    actor: CurrentActor,
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: CommentRepository,
    Valid(Json(payload)): Valid<Json<CreateComment>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Create, Resource::Comment { author_id: None })?;
    let author_id = actor.authenticated()?.id;
    let record = repository
        .create(scope(title_id, review_id), author_id, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn apply_update(
    actor: CurrentActor,
    verb: Verb,
    review: ReviewRef,
    id: i64,
    repository: CommentRepository,
    changes: PatchComment,
) -> ApiResult<impl IntoResponse> {
    actor.authenticated()?;
    let existing = repository.get(review, id).await?;
    actor.permit(verb, comment_resource(existing.author_id))?;
    let record = repository.update(review, id, changes).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(put, path = "/{title_id}/reviews/{review_id}/comments/{comment_id}", tag = "Comments", operation_id = "updateComment",
    request_body = CreateComment, responses((status = StatusCode::OK, description = "Updated Comment", body = Comment))))]
pub async fn update(
    actor: CurrentActor,
    Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
    Valid(Json(payload)): Valid<Json<CreateComment>>,
) -> ApiResult<impl IntoResponse> {
    let review = scope(title_id, review_id);
    apply_update(actor, Verb::Update, review, id, repository, payload.into()).await
}

#[cfg_attr(feature = "openapi", utoipa::path(patch, path = "/{title_id}/reviews/{review_id}/comments/{comment_id}", tag = "Comments", operation_id = "patchComment",
    request_body = PatchComment, responses((status = StatusCode::OK, description = "Updated Comment", body = Comment))))]
pub async fn partial_update(
    actor: CurrentActor,
    Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
    Valid(Json(payload)): Valid<Json<PatchComment>>,
) -> ApiResult<impl IntoResponse> {
    let review = scope(title_id, review_id);
    apply_update(actor, Verb::PartialUpdate, review, id, repository, payload).await
}

/// Anonymous actor is denied before the comment is looked up
#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{title_id}/reviews/{review_id}/comments/{comment_id}", tag = "Comments", operation_id = "deleteComment",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted successfully"))))]
pub async fn delete(
    actor: CurrentActor,
    Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let review = scope(title_id, review_id);
    actor.authenticated()?;
    let existing = repository.get(review, id).await?;
    actor.permit(Verb::Delete, comment_resource(existing.author_id))?;
    repository.delete(review, id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{comment_id}",
            get(get_comment)
                .put(update)
                .patch(partial_update)
                .delete(delete),
        )
}
