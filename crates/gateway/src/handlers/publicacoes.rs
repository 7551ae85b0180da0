//! Transparency portal documents (LRF reports, contracts, payroll...)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{Publicacao, PublicacaoActiveModel, PublicacaoEntity},
    errors::{AppError, Result},
    legislative::CategoriaPublicacao,
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, parse_filter, parse_label, sees_drafts, Created};
use crate::AppState;

const READ: &str = "publicacoes:read";
const WRITE: &str = "publicacoes:write";

#[derive(Debug, Default, Deserialize)]
pub struct PublicacaoFiltro {
    pub categoria: Option<String>,
    pub ano: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePublicacaoRequest {
    pub categoria: String,

    #[validate(length(min = 1, max = 300))]
    pub titulo: String,

    pub descricao: Option<String>,

    #[validate(range(min = 1900, max = 2200))]
    pub ano: i32,

    #[validate(url)]
    pub arquivo_url: String,

    #[serde(default)]
    pub publicada: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePublicacaoRequest {
    pub categoria: Option<String>,

    #[validate(length(min = 1, max = 300))]
    pub titulo: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub descricao: Option<Option<String>>,

    #[validate(range(min = 1900, max = 2200))]
    pub ano: Option<i32>,

    #[validate(url)]
    pub arquivo_url: Option<String>,

    pub publicada: Option<bool>,
}

/// Publishing stamps the first publication time, unpublishing clears it
pub(crate) fn publication_stamp(
    publicada: bool,
    current: Option<DateTime<FixedOffset>>,
    now: DateTime<Utc>,
) -> Option<DateTime<FixedOffset>> {
    if publicada {
        Some(current.unwrap_or_else(|| now.into()))
    } else {
        None
    }
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    auth: Option<AuthContext>,
    Query(pagination): Query<Pagination>,
    Query(filtro): Query<PublicacaoFiltro>,
) -> Result<Json<ApiResponse<Vec<Publicacao>>>> {
    let categoria = parse_filter::<CategoriaPublicacao>("categoria", filtro.categoria)?;
    let somente_publicadas = !sees_drafts(&auth, Role::Editor, READ);
    let (publicacoes, total) = state
        .repo()
        .list_publicacoes(tenant.id, categoria, filtro.ano, somente_publicadas, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(publicacoes, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    auth: Option<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Publicacao>>> {
    let publicacao = state
        .repo()
        .find_scoped::<PublicacaoEntity>(tenant.id, id)
        .await?
        .filter(|p| p.publicada || sees_drafts(&auth, Role::Editor, READ))
        .ok_or_else(|| AppError::not_found("Publicacao", id))?;
    Ok(ok(publicacao))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreatePublicacaoRequest>,
) -> Result<Created<Publicacao>> {
    auth.authorize(Role::Editor, WRITE)?;
    request.validate()?;
    let categoria: CategoriaPublicacao = parse_label("categoria", &request.categoria)?;

    let now = Utc::now();
    let model = PublicacaoActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        categoria: Set(categoria.into()),
        titulo: Set(request.titulo.trim().to_string()),
        descricao: Set(request.descricao),
        ano: Set(request.ano),
        arquivo_url: Set(request.arquivo_url),
        publicada: Set(request.publicada),
        publicada_em: Set(publication_stamp(request.publicada, None, now)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let publicacao = state.repo().insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        publicacao_id = %publicacao.id,
        categoria = %categoria,
        lrf = categoria.is_lrf(),
        "Transparency document created"
    );
    Ok(created(publicacao))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePublicacaoRequest>,
) -> Result<Json<ApiResponse<Publicacao>>> {
    auth.authorize(Role::Editor, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let publicacao = repo.get_scoped::<PublicacaoEntity>(auth.tenant_id, id).await?;
    let current_stamp = publicacao.publicada_em;

    let mut active: PublicacaoActiveModel = publicacao.into();
    if let Some(categoria) = request.categoria.as_deref() {
        active.categoria = Set(parse_label::<CategoriaPublicacao>("categoria", categoria)?.into());
    }
    if let Some(titulo) = request.titulo {
        active.titulo = Set(titulo.trim().to_string());
    }
    if let Some(descricao) = request.descricao {
        active.descricao = Set(descricao);
    }
    if let Some(ano) = request.ano {
        active.ano = Set(ano);
    }
    if let Some(arquivo_url) = request.arquivo_url {
        active.arquivo_url = Set(arquivo_url);
    }
    if let Some(publicada) = request.publicada {
        active.publicada = Set(publicada);
        active.publicada_em = Set(publication_stamp(publicada, current_stamp, Utc::now()));
    }
    active.updated_at = Set(Utc::now().into());

    let publicacao = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, publicacao_id = %id, publicada = publicacao.publicada, "Transparency document updated");
    Ok(ok(publicacao))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Editor, WRITE)?;
    state
        .repo()
        .delete_scoped::<PublicacaoEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, publicacao_id = %id, "Transparency document deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_publication_stamp() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let earlier: DateTime<FixedOffset> = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap().into();

        assert_eq!(publication_stamp(true, None, now), Some(now.into()));
        // republishing keeps the original date
        assert_eq!(publication_stamp(true, Some(earlier), now), Some(earlier));
        assert_eq!(publication_stamp(false, Some(earlier), now), None);
    }
}
