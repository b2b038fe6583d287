use crate::{
    auth::CurrentActor,
    error::ApiResult,
    repository_from_request,
    rest_api::{Page, Paging, SearchQuery},
    validate::Valid,
};
#[cfg_attr(not(feature = "openapi"), allow(unused_imports))]
use yamdb_dal::user::{CreateUser, ProfileChanges, User, UserChanges, UserRepository};

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use tracing::info;
use yamdb_types::{Resource, Verb};

use crate::state::AppState;

pub mod validation;

repository_from_request!(UserRepository);

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(
    list_users,
    create_user,
    get_me,
    update_me,
    get_user,
    update_user,
    delete_user
))]
struct ModuleDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = "Users", operation_id = "listUsers",
    params(Paging, SearchQuery), responses((status = StatusCode::OK, description = "List of Users paginated", body = Page<User>))))]
async fn list_users(
    actor: CurrentActor,
    user_registry: UserRepository,
    State(state): State<AppState>,
    Valid(Query(paging)): Valid<Query<Paging>>,
    Valid(Query(search)): Valid<Query<SearchQuery>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::List, Resource::Users)?;
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = user_registry
        .list(listing_params, search.search.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(Page::try_from_batch(batch, page_size)?)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Users", operation_id = "createUser",
    request_body = CreateUser, responses((status = StatusCode::CREATED, description = "Created User", body = User))))]
async fn create_user(
    actor: CurrentActor,
    user_registry: UserRepository,
    Valid(Json(payload)): Valid<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Create, Resource::Users)?;
    validation::check_identity(
        &user_registry,
        Some(&payload.username),
        Some(payload.email.as_str()),
        None,
    )
    .await?;
    let user = user_registry.create(payload).await?;
    info!("User {} created", user.username);

    Ok((StatusCode::CREATED, Json(user)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{username}", tag = "Users", operation_id = "getUser",
    responses((status = StatusCode::OK, description = "User detail", body = User))))]
async fn get_user(
    actor: CurrentActor,
    Path(username): Path<String>,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Retrieve, Resource::Users)?;
    let user = user_registry.find_by_username(&username).await?;
    Ok((StatusCode::OK, Json(user)))
}

#[cfg_attr(feature = "openapi", utoipa::path(patch, path = "/{username}", tag = "Users", operation_id = "updateUser",
    request_body = UserChanges, responses((status = StatusCode::OK, description = "Updated User", body = User))))]
async fn update_user(
    actor: CurrentActor,
    Path(username): Path<String>,
    user_registry: UserRepository,
    Valid(Json(payload)): Valid<Json<UserChanges>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::PartialUpdate, Resource::Users)?;
    let user = user_registry.find_by_username(&username).await?;
    validation::check_identity(
        &user_registry,
        payload.username.as_deref(),
        payload.email.as_ref().map(|e| e.as_str()),
        Some(user.id),
    )
    .await?;
    let user = user_registry.update(user.id, payload).await?;
    Ok((StatusCode::OK, Json(user)))
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{username}", tag = "Users", operation_id = "deleteUser",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted successfully"))))]
async fn delete_user(
    actor: CurrentActor,
    Path(username): Path<String>,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Delete, Resource::Users)?;
    let user = user_registry.find_by_username(&username).await?;
    user_registry.delete(user.id).await?;
    info!("User {} deleted", user.username);

    Ok((StatusCode::NO_CONTENT, ()))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/me", tag = "Users", operation_id = "getMe",
    responses((status = StatusCode::OK, description = "Own profile", body = User))))]
async fn get_me(actor: CurrentActor, user_registry: UserRepository) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::Retrieve, Resource::OwnProfile)?;
    let id = actor.authenticated()?.id;
    let user = user_registry.get(id).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Role cannot be changed here, [`ProfileChanges`] has no role
#[cfg_attr(feature = "openapi", utoipa::path(patch, path = "/me", tag = "Users", operation_id = "updateMe",
    request_body = ProfileChanges, responses((status = StatusCode::OK, description = "Updated own profile", body = User))))]
async fn update_me(
    actor: CurrentActor,
    user_registry: UserRepository,
    Valid(Json(payload)): Valid<Json<ProfileChanges>>,
) -> ApiResult<impl IntoResponse> {
    actor.permit(Verb::PartialUpdate, Resource::OwnProfile)?;
    let id = actor.authenticated()?.id;
    validation::check_identity(
        &user_registry,
        payload.username.as_deref(),
        payload.email.as_ref().map(|e| e.as_str()),
        Some(id),
    )
    .await?;
    let user = user_registry.update(id, payload.into()).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_me).patch(update_me))
        .route(
            "/{username}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}
