use axum::Router;

use crate::state::AppState;

pub mod category;
pub mod comment;
pub mod genre;
mod macros;
mod paging;
pub mod review;
pub mod title;

pub use paging::{Page, Paging, SearchQuery};

/// All API routes, to be nested under versioned prefix
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", crate::auth::auth_router())
        .nest("/users", crate::user::router())
        .nest("/categories", category::router())
        .nest("/genres", genre::router())
        .nest("/titles", title::router())
}

/// Documentation of [`api_router`], paths relative to its prefix
#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    utoipa::openapi::OpenApiBuilder::new()
        .build()
        .nest("/auth", crate::auth::api_docs())
        .nest("/users", crate::user::api_docs())
        .nest("/categories", category::api_docs())
        .nest("/genres", genre::api_docs())
        .nest("/titles", title::api_docs())
}
