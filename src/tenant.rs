// Tenant scope extractor for discount routes

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::discounts::DiscountError;

/// Header carrying the tenant every discount request is scoped to
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Tenant identifier taken from the `X-Tenant-Id` header
///
/// Authentication of the tenant happens upstream; this only requires that a
/// non-blank scope is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = DiscountError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(DiscountError::MissingTenant)?;

        Ok(TenantId(tenant.to_string()))
    }
}
