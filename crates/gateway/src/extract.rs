//! Request extractors
//!
//! - [`ResolvedTenant`]: chamber bound to the request host
//! - [`AuthContext`]: caller credentials, checked against that chamber
//!
//! Handlers that serve both the public and the staff take
//! `Option<AuthContext>`: no credentials yields `None`, bad credentials are
//! still rejected.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use plenario_common::{
    auth::{extract_bearer, hash_token, tokens::is_integration_token, AuthContext, Principal, TokenPurpose},
    errors::{AppError, Result},
    tenancy::ResolvedTenant,
};

use crate::AppState;

const TENANT_OVERRIDE_HEADER: &str = "x-tenant-slug";
const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

impl FromRequestParts<AppState> for ResolvedTenant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        if let Some(tenant) = parts.extensions.get::<ResolvedTenant>() {
            return Ok(tenant.clone());
        }

        let host = header_str(parts, FORWARDED_HOST_HEADER)
            .or_else(|| header_str(parts, header::HOST.as_str()))
            .or_else(|| parts.uri.host());
        let override_slug = header_str(parts, TENANT_OVERRIDE_HEADER);

        let tenant = state.tenants.resolve(host, override_slug).await?;
        parts.extensions.insert(tenant.clone());
        Ok(tenant)
    }
}

/// Credential presented with the request, if any
enum Credential<'a> {
    Integration(&'a str),
    Jwt(&'a str),
}

fn credential<'a>(parts: &'a Parts, state: &AppState) -> Option<Credential<'a>> {
    let integration_header = state.config.auth.integration_token_header.as_str();
    if let Some(token) = header_str(parts, integration_header).map(str::trim) {
        return Some(Credential::Integration(token));
    }

    let bearer = header_str(parts, header::AUTHORIZATION.as_str()).and_then(extract_bearer)?;
    if is_integration_token(bearer) {
        Some(Credential::Integration(bearer))
    } else {
        Some(Credential::Jwt(bearer))
    }
}

async fn authenticate(
    credential: Credential<'_>,
    tenant: &ResolvedTenant,
    state: &AppState,
) -> Result<AuthContext> {
    match credential {
        Credential::Jwt(token) => {
            let claims = state.jwt.validate(token, TokenPurpose::Access)?;
            if claims.tenant_id()? != tenant.id {
                tracing::warn!(tenant = %tenant.slug, "JWT presented to another chamber");
                return Err(AppError::TenantMismatch);
            }
            Ok(AuthContext {
                tenant_id: tenant.id,
                principal: Principal::User {
                    id: claims.user_id()?,
                    role: claims.role()?,
                },
            })
        }
        Credential::Integration(token) => {
            let repo = state.repo();
            let stored = repo
                .find_integration_token_by_hash(&hash_token(token))
                .await?
                .filter(|t| t.is_usable())
                .ok_or(AppError::InvalidToken)?;

            if stored.tenant_id != tenant.id {
                tracing::warn!(tenant = %tenant.slug, token = %stored.prefixo, "Integration token presented to another chamber");
                return Err(AppError::TenantMismatch);
            }

            repo.touch_integration_token(stored.id).await?;
            Ok(AuthContext {
                tenant_id: tenant.id,
                principal: Principal::Integration {
                    token_id: stored.id,
                    permissions: stored.permissions(),
                },
            })
        }
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let tenant = ResolvedTenant::from_request_parts(parts, state).await?;
        let credential = credential(parts, state).ok_or_else(|| AppError::Unauthorized {
            message: "Missing Authorization header".to_string(),
        })?;
        authenticate(credential, &tenant, state).await
    }
}

impl OptionalFromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        let tenant = ResolvedTenant::from_request_parts(parts, state).await?;
        match credential(parts, state) {
            Some(credential) => authenticate(credential, &tenant, state).await.map(Some),
            None => Ok(None),
        }
    }
}
