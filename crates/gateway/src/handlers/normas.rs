//! Enacted norms (laws, resolutions, decrees)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{NormaJuridica, NormaJuridicaActiveModel, NormaJuridicaEntity, ProposicaoEntity},
    errors::{AppError, Result},
    legislative::{NormaSituacao, NormaTipo},
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, parse_filter, parse_label, Created};
use crate::AppState;

const WRITE: &str = "normas:write";

#[derive(Debug, Default, Deserialize)]
pub struct NormaFiltro {
    pub tipo: Option<String>,
    pub ano: Option<i32>,
    pub situacao: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNormaRequest {
    pub tipo: String,

    #[validate(range(min = 1))]
    pub numero: i32,

    #[validate(range(min = 1800, max = 2200))]
    pub ano: i32,

    #[validate(length(min = 1, max = 5000))]
    pub ementa: String,

    pub texto: Option<String>,

    pub data_publicacao: Option<NaiveDate>,

    /// `VIGENTE` when absent
    pub situacao: Option<String>,

    /// Bill the norm originated from
    pub proposicao_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNormaRequest {
    #[validate(length(min = 1, max = 5000))]
    pub ementa: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub texto: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub data_publicacao: Option<Option<NaiveDate>>,

    pub situacao: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub proposicao_id: Option<Option<Uuid>>,
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Query(pagination): Query<Pagination>,
    Query(filtro): Query<NormaFiltro>,
) -> Result<Json<ApiResponse<Vec<NormaJuridica>>>> {
    let tipo = parse_filter::<NormaTipo>("tipo", filtro.tipo)?;
    let situacao = parse_filter::<NormaSituacao>("situacao", filtro.situacao)?;
    let (normas, total) = state
        .repo()
        .list_normas(tenant.id, tipo, filtro.ano, situacao, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(normas, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<NormaJuridica>>> {
    let norma = state
        .repo()
        .find_scoped::<NormaJuridicaEntity>(tenant.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("NormaJuridica", id))?;
    Ok(ok(norma))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateNormaRequest>,
) -> Result<Created<NormaJuridica>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;
    let tipo: NormaTipo = parse_label("tipo", &request.tipo)?;
    let situacao = match request.situacao.as_deref() {
        Some(s) => parse_label::<NormaSituacao>("situacao", s)?,
        None => NormaSituacao::Vigente,
    };

    let repo = state.repo();
    if let Some(proposicao_id) = request.proposicao_id {
        repo.get_scoped::<ProposicaoEntity>(auth.tenant_id, proposicao_id)
            .await?;
    }

    let now = Utc::now();
    let model = NormaJuridicaActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        tipo: Set(tipo.into()),
        numero: Set(request.numero),
        ano: Set(request.ano),
        ementa: Set(request.ementa.trim().to_string()),
        texto: Set(request.texto),
        data_publicacao: Set(request.data_publicacao),
        situacao: Set(situacao.into()),
        proposicao_id: Set(request.proposicao_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let norma = repo.insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        norma_id = %norma.id,
        tipo = %tipo,
        numero = norma.numero,
        ano = norma.ano,
        "Norm registered"
    );
    Ok(created(norma))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateNormaRequest>,
) -> Result<Json<ApiResponse<NormaJuridica>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    if let Some(Some(proposicao_id)) = request.proposicao_id {
        repo.get_scoped::<ProposicaoEntity>(auth.tenant_id, proposicao_id)
            .await?;
    }

    let mut active: NormaJuridicaActiveModel = repo
        .get_scoped::<NormaJuridicaEntity>(auth.tenant_id, id)
        .await?
        .into();
    if let Some(ementa) = request.ementa {
        active.ementa = Set(ementa.trim().to_string());
    }
    if let Some(texto) = request.texto {
        active.texto = Set(texto);
    }
    if let Some(data_publicacao) = request.data_publicacao {
        active.data_publicacao = Set(data_publicacao);
    }
    if let Some(situacao) = request.situacao.as_deref() {
        active.situacao = Set(parse_label::<NormaSituacao>("situacao", situacao)?.into());
    }
    if let Some(proposicao_id) = request.proposicao_id {
        active.proposicao_id = Set(proposicao_id);
    }
    active.updated_at = Set(Utc::now().into());

    let norma = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, norma_id = %id, "Norm updated");
    Ok(ok(norma))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Admin, WRITE)?;
    state
        .repo()
        .delete_scoped::<NormaJuridicaEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, norma_id = %id, "Norm deleted");
    Ok(StatusCode::NO_CONTENT)
}
