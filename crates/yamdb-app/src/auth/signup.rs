//! Signup by email - account is confirmed by redeeming code, which is sent by mail,
//! for an access token.

use axum::{extract::State, response::IntoResponse, Json};
use garde::Validate;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use yamdb_auth::{CodeSubject, Mail};
use yamdb_dal::user::{CreateUser, UserRepository, VerificationState};
use yamdb_types::{claim::ApiClaim, general::ValidEmail};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    user::validation::{check_identity, check_reserved},
};

#[derive(Debug, Deserialize, Serialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SignupRequest {
    #[garde(length(min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    #[garde(dive)]
    pub email: ValidEmail,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenRequest {
    #[garde(length(min = 1, max = 150))]
    pub username: String,
    #[garde(length(min = 1, max = 255))]
    pub confirmation_code: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenResponse {
    pub token: String,
}

fn send_code(state: &AppState, verification: &VerificationState) -> ApiResult<()> {
    let code = state.codes().issue(CodeSubject {
        user_id: verification.id,
        username: &verification.username,
        nonce: &verification.verification_nonce,
    });
    let token_url = state.build_url("api/v1/auth/token")?;
    let mail = Mail {
        to: verification.email.clone(),
        subject: "YaMDb confirmation code".to_string(),
        body: format!(
            "Hello {},\n\nyour confirmation code is:\n\n{}\n\nExchange it for an access token at {}\nThe code is valid for {}.\n",
            verification.username,
            code,
            token_url,
            humanize(state.codes().validity())
        ),
    };
    let mailer = state.mailer();
    let username = verification.username.clone();
    tokio::spawn(async move {
        match mailer.send(mail).await {
            Ok(()) => debug!("Confirmation code for {username} dispatched"),
            Err(e) => error!("Failed to send confirmation code to {username}: {e}"),
        }
    });
    Ok(())
}

fn humanize(validity: std::time::Duration) -> String {
    let minutes = validity.as_secs() / 60;
    if minutes >= 60 && minutes % 60 == 0 {
        format!("{} hours", minutes / 60)
    } else {
        format!("{minutes} minutes")
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/signup", tag = "Auth", operation_id = "signup",
    request_body = SignupRequest, responses((status = StatusCode::OK, description = "Confirmation code sent by mail", body = SignupRequest))))]
pub async fn signup(
    State(state): State<AppState>,
    repository: UserRepository,
    payload: Result<Json<SignupRequest>, axum::extract::rejection::JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    // reserved username is refused before anything else
    check_reserved(&payload.username)?;
    payload.validate()?;

    let existing = repository
        .find_identity(&payload.username, payload.email.as_str())
        .await?;
    if existing.is_some() {
        info!("Repeated signup of {}, issuing new code", payload.username);
    } else {
        check_identity(
            &repository,
            Some(&payload.username),
            Some(payload.email.as_str()),
            None,
        )
        .await?;
        let user = repository
            .create(CreateUser::signup(
                payload.username.clone(),
                payload.email.clone(),
            ))
            .await?;
        info!("New user {} signed up", user.username);
    }

    let verification = repository.verification_state(&payload.username).await?;
    send_code(&state, &verification)?;

    Ok((StatusCode::OK, Json(payload)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/token", tag = "Auth", operation_id = "token",
    request_body = TokenRequest, responses((status = StatusCode::OK, description = "Access token", body = TokenResponse))))]
pub async fn token(
    State(state): State<AppState>,
    repository: UserRepository,
    crate::validate::Valid(Json(payload)): crate::validate::Valid<Json<TokenRequest>>,
) -> ApiResult<impl IntoResponse> {
    let verification = repository.verification_state(&payload.username).await?;
    let subject = CodeSubject {
        user_id: verification.id,
        username: &verification.username,
        nonce: &verification.verification_nonce,
    };
    if !state.codes().verify(subject, &payload.confirmation_code) {
        debug!("Invalid code for {}", payload.username);
        return Err(ApiError::InvalidCode);
    }
    if !repository
        .confirm(verification.id, &verification.verification_nonce)
        .await?
    {
        debug!("Code for {} already redeemed", payload.username);
        return Err(ApiError::InvalidCode);
    }

    let token = state
        .tokens()
        .issue(ApiClaim::new_expired(verification.id.to_string()))?;
    info!("User {} confirmed and got token", verification.username);
    Ok((StatusCode::OK, Json(TokenResponse { token })))
}
