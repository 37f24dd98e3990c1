// scope.rs
// Extractor resolving the company every request is scoped to.

use std::str::FromStr;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use mongodb::bson::oid::ObjectId;

pub const COMPANY_HEADER: &str = "x-company-id";

/// Company id taken from the `x-company-id` header.
///
/// A missing header is rejected with 401, a malformed one with 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyScope(pub ObjectId);

impl CompanyScope {
    pub fn company_id(&self) -> &ObjectId {
        &self.0
    }
}

#[allow(refining_impl_trait)]
impl<S> FromRequestParts<S> for CompanyScope
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> BoxFuture<'static, Result<Self, Self::Rejection>> {
        let scope = company_from_parts(parts);
        Box::pin(async move { scope })
    }
}

fn company_from_parts(parts: &Parts) -> Result<CompanyScope, Response> {
    let raw = parts
        .headers
        .get(COMPANY_HEADER)
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "missing company scope").into_response())?;
    raw.to_str()
        .ok()
        .and_then(|value| ObjectId::from_str(value.trim()).ok())
        .map(CompanyScope)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "invalid company scope").into_response())
}
