//! Bills and motions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{ParlamentarEntity, Proposicao, ProposicaoActiveModel, ProposicaoEntity},
    db::ProposicaoFiltro,
    errors::{AppError, Result},
    legislative::{ProposicaoStatus, ProposicaoTipo},
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, parse_filter, parse_label, Created};
use crate::AppState;

const WRITE: &str = "proposicoes:write";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProposicaoRequest {
    pub tipo: String,

    #[validate(length(min = 1, max = 5000))]
    pub ementa: String,

    pub texto: Option<String>,

    /// Authoring member
    pub autor_id: Option<Uuid>,

    /// Author outside the chamber (mayor, citizens' initiative)
    #[validate(length(max = 200))]
    pub autor_externo: Option<String>,

    /// Today when absent; its year numbers the bill
    pub data_apresentacao: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProposicaoRequest {
    #[validate(length(min = 1, max = 5000))]
    pub ementa: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub texto: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub autor_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "nullable")]
    pub autor_externo: Option<Option<String>>,

    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProposicaoDetalhe {
    #[serde(flatten)]
    pub proposicao: Proposicao,
    /// e.g. `PL 12/2024`
    pub identificador: String,
}

impl From<Proposicao> for ProposicaoDetalhe {
    fn from(proposicao: Proposicao) -> Self {
        Self {
            identificador: proposicao.identificador(),
            proposicao,
        }
    }
}

fn require_author(autor_id: Option<Uuid>, autor_externo: Option<&str>) -> Result<()> {
    let externo = autor_externo.is_some_and(|a| !a.trim().is_empty());
    if autor_id.is_none() && !externo {
        return Err(AppError::invalid_field(
            "autor_id",
            "either autor_id or autor_externo is required",
        ));
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Query(pagination): Query<Pagination>,
    Query(filtro): Query<ProposicaoFiltro>,
) -> Result<Json<ApiResponse<Vec<ProposicaoDetalhe>>>> {
    let filtro = ProposicaoFiltro {
        tipo: parse_filter::<ProposicaoTipo>("tipo", filtro.tipo)?,
        status: parse_filter::<ProposicaoStatus>("status", filtro.status)?,
        ..filtro
    };
    let (proposicoes, total) = state
        .repo()
        .list_proposicoes(tenant.id, filtro, &pagination)
        .await?;
    let proposicoes = proposicoes.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::page(proposicoes, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProposicaoDetalhe>>> {
    let proposicao = state
        .repo()
        .find_scoped::<ProposicaoEntity>(tenant.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Proposicao", id))?;
    Ok(ok(proposicao.into()))
}

/// Numbered per type and year from the chamber's counter
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateProposicaoRequest>,
) -> Result<Created<ProposicaoDetalhe>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;
    let tipo: ProposicaoTipo = parse_label("tipo", &request.tipo)?;
    require_author(request.autor_id, request.autor_externo.as_deref())?;

    let repo = state.repo();
    if let Some(autor_id) = request.autor_id {
        repo.get_scoped::<ParlamentarEntity>(auth.tenant_id, autor_id)
            .await?;
    }

    let data_apresentacao = request
        .data_apresentacao
        .unwrap_or_else(|| Utc::now().date_naive());
    let ano = data_apresentacao.year();
    let numero = state
        .nomenclature
        .next_proposicao_numero(auth.tenant_id, tipo, ano)
        .await?;

    let now = Utc::now();
    let model = ProposicaoActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        tipo: Set(tipo.into()),
        numero: Set(numero),
        ano: Set(ano),
        ementa: Set(request.ementa.trim().to_string()),
        texto: Set(request.texto),
        autor_id: Set(request.autor_id),
        autor_externo: Set(request.autor_externo),
        status: Set(ProposicaoStatus::EmTramitacao.into()),
        data_apresentacao: Set(data_apresentacao),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let proposicao = repo.insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        proposicao_id = %proposicao.id,
        identificador = %proposicao.identificador(),
        "Proposicao created"
    );
    Ok(created(proposicao.into()))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProposicaoRequest>,
) -> Result<Json<ApiResponse<ProposicaoDetalhe>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let proposicao = repo.get_scoped::<ProposicaoEntity>(auth.tenant_id, id).await?;

    let autor_id = request.autor_id.unwrap_or(proposicao.autor_id);
    let autor_externo = request
        .autor_externo
        .clone()
        .unwrap_or_else(|| proposicao.autor_externo.clone());
    require_author(autor_id, autor_externo.as_deref())?;
    if let Some(Some(autor_id)) = request.autor_id {
        repo.get_scoped::<ParlamentarEntity>(auth.tenant_id, autor_id)
            .await?;
    }

    let mut active: ProposicaoActiveModel = proposicao.into();
    if let Some(ementa) = request.ementa {
        active.ementa = Set(ementa.trim().to_string());
    }
    if let Some(texto) = request.texto {
        active.texto = Set(texto);
    }
    if let Some(autor_id) = request.autor_id {
        active.autor_id = Set(autor_id);
    }
    if let Some(autor_externo) = request.autor_externo {
        active.autor_externo = Set(autor_externo);
    }
    if let Some(status) = request.status.as_deref() {
        active.status = Set(parse_label::<ProposicaoStatus>("status", status)?.into());
    }
    active.updated_at = Set(Utc::now().into());

    let proposicao = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, proposicao_id = %id, "Proposicao updated");
    Ok(ok(proposicao.into()))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Admin, WRITE)?;
    state
        .repo()
        .delete_scoped::<ProposicaoEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, proposicao_id = %id, "Proposicao deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_required() {
        assert!(require_author(Some(Uuid::new_v4()), None).is_ok());
        assert!(require_author(None, Some("Prefeito Municipal")).is_ok());
        assert!(require_author(None, Some("  ")).is_err());
        assert!(require_author(None, None).is_err());
    }
}
