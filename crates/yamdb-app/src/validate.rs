use axum::extract::{FromRequest, FromRequestParts, Request};
use garde::Validate;
use http::request::Parts;
use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor wrapper, which validates extracted payload with `garde`.
///
/// Both rejection of the inner extractor (malformed JSON, bad query) and failed
/// validation are turned into `validation_error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<E>(pub E);

impl<E> Deref for Valid<E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<E> DerefMut for Valid<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<E: Display> Display for Valid<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> Valid<E> {
    pub fn into_inner(self) -> E {
        self.0
    }
}

fn rejected(rejection: impl Display) -> ApiError {
    debug!("Request rejected: {rejection}");
    ApiError::validation(rejection.to_string())
}

impl<Extractor, T> FromRequest<AppState> for Valid<Extractor>
where
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequest<AppState>,
    <Extractor as FromRequest<AppState>>::Rejection: Display,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request(req, state)
            .await
            .map_err(rejected)?;

        inner.deref().validate()?;
        Ok(Valid(inner))
    }
}

impl<Extractor, T> FromRequestParts<AppState> for Valid<Extractor>
where
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequestParts<AppState>,
    <Extractor as FromRequestParts<AppState>>::Rejection: Display,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request_parts(parts, state)
            .await
            .map_err(rejected)?;

        inner.deref().validate()?;
        Ok(Valid(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garde::{Path, Report};

    #[test]
    fn test_deref_and_into_inner() {
        let mut v = Valid(String::from("garde"));
        v.deref_mut().push('!');
        assert_eq!(v.deref(), "garde!");
        assert_eq!(v.to_string(), "garde!");
        assert_eq!(v.into_inner(), "garde!");
    }

    #[test]
    fn test_report_is_validation_error() {
        let mut report = Report::new();
        report.append(Path::empty(), garde::Error::new("length is lower than 1"));
        let err: ApiError = report.into();
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }
}
