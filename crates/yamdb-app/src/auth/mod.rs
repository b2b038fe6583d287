use axum::{extract::FromRequestParts, routing::post, RequestPartsExt};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use http::{header::AUTHORIZATION, request::Parts};
use tracing::debug;
use yamdb_dal::user::UserRepository;
use yamdb_types::{
    authorize,
    claim::{Actor, ApiClaim},
    Resource, Verb,
};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub mod signup;

/// Actor making the request, `None` for anonymous requests.
///
/// Bearer token carries only user id, the user is loaded from the database on every
/// request, so role changes apply immediately. Invalid token or unknown user is rejected
/// with 401.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Option<Actor>);

impl CurrentActor {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }

    /// Anonymous actor is denied with `not_authenticated`
    pub fn authenticated(&self) -> ApiResult<&Actor> {
        self.actor()
            .ok_or(ApiError::Forbidden(yamdb_types::DenyReason::Unauthenticated))
    }

    /// Checks access policy for this actor
    pub fn permit(&self, verb: Verb, resource: Resource) -> ApiResult<()> {
        permit(self.actor(), verb, resource)
    }
}

pub fn permit(actor: Option<&Actor>, verb: Verb, resource: Resource) -> ApiResult<()> {
    authorize(actor, verb, resource).into_result().map_err(|reason| {
        debug!(
            actor = actor.map(|a| a.username.as_str()),
            "Denied {verb:?} on {resource:?}: {reason:?}"
        );
        ApiError::Forbidden(reason)
    })
}

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(CurrentActor(None));
        }
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| ApiError::Unauthorized(format!("Invalid authorization header: {e}")))?;

        let claim = state
            .tokens()
            .validate::<ApiClaim>(bearer.token())
            .map_err(|e| ApiError::Unauthorized(format!("Failed to validate token: {e}")))?;
        let user_id = claim
            .user_id()
            .ok_or_else(|| ApiError::Unauthorized(format!("Invalid subject {}", claim.sub)))?;

        let user = UserRepository::new(state.pool().clone())
            .get(user_id)
            .await
            .map_err(|e| match e {
                yamdb_dal::Error::RecordNotFound(_) => {
                    ApiError::Unauthorized(format!("User {user_id} does not exist"))
                }
                other => other.into(),
            })?;
        Ok(CurrentActor(Some(Actor::from(&user))))
    }
}

/// Builds authentication router - must be nested on /auth path!
#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(signup::signup, signup::token))]
struct ModuleDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/signup", post(signup::signup))
        .route("/token", post(signup::token))
}
