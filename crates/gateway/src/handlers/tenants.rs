//! Chamber management, superadmin only

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{Tenant, TenantActiveModel},
    errors::{AppError, Result},
    response::{ApiResponse, Pagination},
    tenancy::normalize_host,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, Created};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 2, max = 63))]
    pub slug: String,

    #[validate(length(min = 1, max = 200))]
    pub nome: String,

    pub dominio: Option<String>,

    pub cidade: Option<String>,

    #[validate(length(equal = 2))]
    pub uf: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub dominio: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub cidade: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub uf: Option<Option<String>>,

    pub ativo: Option<bool>,
}

/// Slugs become DNS labels
fn validate_slug(slug: &str) -> Result<String> {
    let slug = slug.trim().to_ascii_lowercase();
    let valid = !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid && !slug.is_empty() {
        Ok(slug)
    } else {
        Err(AppError::invalid_field(
            "slug",
            "use lowercase letters, digits and inner hyphens",
        ))
    }
}

fn clean_domain(dominio: Option<String>) -> Result<Option<String>> {
    match dominio {
        None => Ok(None),
        Some(d) if d.trim().is_empty() => Ok(None),
        Some(d) => normalize_host(&d)
            .filter(|h| h.contains('.'))
            .map(Some)
            .ok_or_else(|| AppError::invalid_field("dominio", "not a valid host name")),
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<Tenant>>>> {
    auth.require_role(Role::Superadmin)?;
    let (tenants, total) = state.repo().list_tenants(&pagination).await?;
    Ok(Json(ApiResponse::page(tenants, &pagination, total)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateTenantRequest>,
) -> Result<Created<Tenant>> {
    auth.require_role(Role::Superadmin)?;
    request.validate()?;

    let now = Utc::now();
    let model = TenantActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(validate_slug(&request.slug)?),
        nome: Set(request.nome.trim().to_string()),
        dominio: Set(clean_domain(request.dominio)?),
        cidade: Set(request.cidade),
        uf: Set(request.uf.map(|uf| uf.to_ascii_uppercase())),
        ativo: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let tenant = state.repo().insert(model).await?;

    tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, "Chamber created");
    Ok(created(tenant))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTenantRequest>,
) -> Result<Json<ApiResponse<Tenant>>> {
    auth.require_role(Role::Superadmin)?;
    request.validate()?;

    let repo = state.repo();
    let tenant = repo
        .find_tenant_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Tenant", id))?;

    let mut active: TenantActiveModel = tenant.into();
    if let Some(nome) = request.nome {
        active.nome = Set(nome.trim().to_string());
    }
    if let Some(dominio) = request.dominio {
        active.dominio = Set(clean_domain(dominio)?);
    }
    if let Some(cidade) = request.cidade {
        active.cidade = Set(cidade);
    }
    if let Some(uf) = request.uf {
        active.uf = Set(uf.map(|uf| uf.to_ascii_uppercase()));
    }
    if let Some(ativo) = request.ativo {
        active.ativo = Set(ativo);
    }
    active.updated_at = Set(Utc::now().into());

    let tenant = repo.update(active).await?;
    state.tenants.invalidate(tenant.id);

    tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, ativo = tenant.ativo, "Chamber updated");
    Ok(ok(tenant))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert_eq!(validate_slug(" Ourinhos ").unwrap(), "ourinhos");
        assert_eq!(validate_slug("sao-jose-2").unwrap(), "sao-jose-2");
        assert!(validate_slug("-ourinhos").is_err());
        assert!(validate_slug("são-paulo").is_err());
        assert!(validate_slug("a_b").is_err());
    }

    #[test]
    fn test_clean_domain() {
        assert_eq!(
            clean_domain(Some("WWW.CamaraOurinhos.sp.gov.br".into())).unwrap().as_deref(),
            Some("camaraourinhos.sp.gov.br")
        );
        assert_eq!(clean_domain(Some(" ".into())).unwrap(), None);
        assert!(clean_domain(Some("localhost".into())).is_err());
    }
}
