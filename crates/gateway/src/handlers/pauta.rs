//! Session agenda items

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{PautaItem, PautaItemActiveModel, PautaItemEntity, ProposicaoEntity, SessaoEntity},
    errors::{AppError, Result},
    legislative::{workflow::check_item_transition, PautaStatus, QuorumTipo, SessaoStatus},
    response::ApiResponse,
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, parse_label, Created};
use crate::AppState;

const WRITE: &str = "pauta:write";

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePautaRequest {
    #[validate(length(min = 1, max = 2000))]
    pub descricao: String,

    pub proposicao_id: Option<Uuid>,

    /// Appended to the end of the agenda when absent
    #[validate(range(min = 1))]
    pub ordem: Option<i32>,

    /// `MAIORIA_SIMPLES` when absent
    pub quorum: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePautaRequest {
    #[validate(length(min = 1, max = 2000))]
    pub descricao: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub proposicao_id: Option<Option<Uuid>>,

    #[validate(range(min = 1))]
    pub ordem: Option<i32>,

    pub quorum: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

/// Items already on the floor keep their definition
fn editable(status: PautaStatus) -> bool {
    matches!(
        status,
        PautaStatus::Agendada | PautaStatus::Convocada | PautaStatus::Adiada
    )
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(sessao_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PautaItem>>>> {
    let repo = state.repo();
    repo.find_scoped::<SessaoEntity>(tenant.id, sessao_id)
        .await?
        .ok_or_else(|| AppError::not_found("Sessao", sessao_id))?;
    Ok(ok(repo.list_pauta(tenant.id, sessao_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(sessao_id): Path<Uuid>,
    Json(request): Json<CreatePautaRequest>,
) -> Result<Created<PautaItem>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let quorum = match request.quorum.as_deref() {
        Some(q) => parse_label::<QuorumTipo>("quorum", q)?,
        None => QuorumTipo::MaioriaSimples,
    };

    let repo = state.repo();
    let sessao = repo.get_scoped::<SessaoEntity>(auth.tenant_id, sessao_id).await?;
    let sessao_status = sessao.status()?;
    if matches!(sessao_status, SessaoStatus::Concluida | SessaoStatus::Cancelada) {
        return Err(AppError::Conflict {
            message: format!("cannot add items to a session that is {}", sessao_status),
        });
    }
    if let Some(proposicao_id) = request.proposicao_id {
        repo.get_scoped::<ProposicaoEntity>(auth.tenant_id, proposicao_id)
            .await?;
    }

    let ordem = match request.ordem {
        Some(ordem) => ordem,
        None => repo.next_pauta_ordem(auth.tenant_id, sessao_id).await?,
    };

    let now = Utc::now();
    let model = PautaItemActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        sessao_id: Set(sessao_id),
        proposicao_id: Set(request.proposicao_id),
        ordem: Set(ordem),
        descricao: Set(request.descricao.trim().to_string()),
        status: Set(PautaStatus::Agendada.into()),
        quorum: Set(quorum.into()),
        apuracao: Set(None),
        resultado: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let item = repo.insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        sessao_id = %sessao_id,
        pauta_id = %item.id,
        ordem = item.ordem,
        "Agenda item created"
    );
    Ok(created(item))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePautaRequest>,
) -> Result<Json<ApiResponse<PautaItem>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let item = repo.get_scoped::<PautaItemEntity>(auth.tenant_id, id).await?;
    let status = item.status()?;
    if !editable(status) {
        return Err(AppError::Conflict {
            message: format!("agenda item is {} and can no longer be edited", status),
        });
    }
    if let Some(Some(proposicao_id)) = request.proposicao_id {
        repo.get_scoped::<ProposicaoEntity>(auth.tenant_id, proposicao_id)
            .await?;
    }

    let mut active: PautaItemActiveModel = item.into();
    if let Some(descricao) = request.descricao {
        active.descricao = Set(descricao.trim().to_string());
    }
    if let Some(proposicao_id) = request.proposicao_id {
        active.proposicao_id = Set(proposicao_id);
    }
    if let Some(ordem) = request.ordem {
        active.ordem = Set(ordem);
    }
    if let Some(quorum) = request.quorum.as_deref() {
        active.quorum = Set(parse_label::<QuorumTipo>("quorum", quorum)?.into());
    }
    active.updated_at = Set(Utc::now().into());

    let item = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, pauta_id = %id, "Agenda item updated");
    Ok(ok(item))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Secretaria, WRITE)?;

    let repo = state.repo();
    let item = repo.get_scoped::<PautaItemEntity>(auth.tenant_id, id).await?;
    let status = item.status()?;
    if !editable(status) {
        return Err(AppError::Conflict {
            message: format!("agenda item is {} and can no longer be removed", status),
        });
    }

    repo.delete_scoped::<PautaItemEntity>(auth.tenant_id, id).await?;
    tracing::info!(tenant_id = %auth.tenant_id, pauta_id = %id, "Agenda item deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Moves through the agenda workflow; concluding goes through `encerrar`
pub async fn change_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<ApiResponse<PautaItem>>> {
    auth.authorize(Role::Operador, WRITE)?;
    let target: PautaStatus = parse_label("status", &request.status)?;
    if target == PautaStatus::Concluida {
        return Err(AppError::Conflict {
            message: "agenda items are concluded by closing their vote".to_string(),
        });
    }

    let repo = state.repo();
    let found = repo.get_pauta_com_sessao(auth.tenant_id, id).await?;
    let from = found.item.status()?;
    let to = check_item_transition(found.sessao.status()?, from, target)?;

    let mut active: PautaItemActiveModel = found.item.into();
    active.status = Set(to.into());
    active.updated_at = Set(Utc::now().into());
    let item = repo.update(active).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        pauta_id = %id,
        from = %from,
        to = %to,
        "Agenda item status changed"
    );
    Ok(ok(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editable_states() {
        assert!(editable(PautaStatus::Agendada));
        assert!(editable(PautaStatus::Adiada));
        assert!(!editable(PautaStatus::Votacao));
        assert!(!editable(PautaStatus::Concluida));
        assert!(!editable(PautaStatus::EmAndamento));
    }
}
