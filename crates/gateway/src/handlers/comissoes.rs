//! Committees, their members and meetings

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{
        Comissao, ComissaoActiveModel, ComissaoEntity, MembroComissao, MembroComissaoActiveModel,
        MembroComissaoEntity, ParlamentarEntity, ReuniaoComissao, ReuniaoComissaoActiveModel,
        ReuniaoComissaoEntity,
    },
    errors::{AppError, Result},
    legislative::{CargoComissao, ReuniaoStatus},
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, parse_label, Created};
use crate::AppState;

const WRITE: &str = "comissoes:write";

#[derive(Debug, Default, Deserialize)]
pub struct ComissaoFiltro {
    pub ativa: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateComissaoRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: String,

    #[validate(length(max = 20))]
    pub sigla: Option<String>,

    pub descricao: Option<String>,

    #[serde(default = "default_true")]
    pub permanente: bool,

    pub data_criacao: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateComissaoRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub sigla: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub descricao: Option<Option<String>>,

    pub permanente: Option<bool>,

    pub ativa: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddMembroRequest {
    pub parlamentar_id: Uuid,

    /// `MEMBRO` when absent
    pub cargo: Option<String>,

    /// Today when absent
    pub data_inicio: Option<NaiveDate>,

    pub data_fim: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReuniaoRequest {
    pub data: DateTime<Utc>,

    #[validate(length(max = 200))]
    pub local: Option<String>,

    pub pauta: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReuniaoRequest {
    pub data: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "nullable")]
    pub local: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub pauta: Option<Option<String>>,

    /// Minutes, usually filled once the meeting is held
    #[serde(default, deserialize_with = "nullable")]
    pub ata: Option<Option<String>>,

    pub status: Option<String>,
}

/// Presidency, vice-presidency and rapporteur have a single holder
fn single_seat(cargo: CargoComissao) -> bool {
    cargo != CargoComissao::Membro
}

/// Meetings are scheduled, then either held or cancelled
fn check_reuniao_transition(from: ReuniaoStatus, to: ReuniaoStatus) -> Result<()> {
    let allowed = from == to
        || (from == ReuniaoStatus::Agendada
            && matches!(to, ReuniaoStatus::Realizada | ReuniaoStatus::Cancelada));
    if allowed {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            entity: "reuniao".to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

// ============================================================================
// Comissoes
// ============================================================================

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Query(pagination): Query<Pagination>,
    Query(filtro): Query<ComissaoFiltro>,
) -> Result<Json<ApiResponse<Vec<Comissao>>>> {
    let (comissoes, total) = state
        .repo()
        .list_comissoes(tenant.id, filtro.ativa, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(comissoes, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Comissao>>> {
    let comissao = state
        .repo()
        .find_scoped::<ComissaoEntity>(tenant.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Comissao", id))?;
    Ok(ok(comissao))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateComissaoRequest>,
) -> Result<Created<Comissao>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let now = Utc::now();
    let model = ComissaoActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        nome: Set(request.nome.trim().to_string()),
        sigla: Set(request.sigla.map(|s| s.trim().to_uppercase())),
        descricao: Set(request.descricao),
        permanente: Set(request.permanente),
        ativa: Set(true),
        data_criacao: Set(request.data_criacao),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let comissao = state.repo().insert(model).await?;

    tracing::info!(tenant_id = %auth.tenant_id, comissao_id = %comissao.id, nome = %comissao.nome, "Committee created");
    Ok(created(comissao))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateComissaoRequest>,
) -> Result<Json<ApiResponse<Comissao>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let mut active: ComissaoActiveModel = repo
        .get_scoped::<ComissaoEntity>(auth.tenant_id, id)
        .await?
        .into();
    if let Some(nome) = request.nome {
        active.nome = Set(nome.trim().to_string());
    }
    if let Some(sigla) = request.sigla {
        active.sigla = Set(sigla.map(|s| s.trim().to_uppercase()));
    }
    if let Some(descricao) = request.descricao {
        active.descricao = Set(descricao);
    }
    if let Some(permanente) = request.permanente {
        active.permanente = Set(permanente);
    }
    if let Some(ativa) = request.ativa {
        active.ativa = Set(ativa);
    }
    active.updated_at = Set(Utc::now().into());

    let comissao = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, comissao_id = %id, "Committee updated");
    Ok(ok(comissao))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Admin, WRITE)?;
    state
        .repo()
        .delete_scoped::<ComissaoEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, comissao_id = %id, "Committee deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Membros
// ============================================================================

pub async fn list_membros(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MembroComissao>>>> {
    let repo = state.repo();
    repo.find_scoped::<ComissaoEntity>(tenant.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Comissao", id))?;
    Ok(ok(repo.list_membros(tenant.id, id).await?))
}

pub async fn add_membro(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<AddMembroRequest>,
) -> Result<Created<MembroComissao>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    let cargo = match request.cargo.as_deref() {
        Some(c) => parse_label::<CargoComissao>("cargo", c)?,
        None => CargoComissao::Membro,
    };
    let data_inicio = request.data_inicio.unwrap_or_else(|| Utc::now().date_naive());
    if request.data_fim.is_some_and(|fim| fim < data_inicio) {
        return Err(AppError::invalid_field("data_fim", "membership ends before it starts"));
    }

    let repo = state.repo();
    let comissao = repo.get_scoped::<ComissaoEntity>(auth.tenant_id, id).await?;
    if !comissao.ativa {
        return Err(AppError::Conflict {
            message: format!("committee {} is inactive", comissao.nome),
        });
    }
    let parlamentar = repo
        .get_scoped::<ParlamentarEntity>(auth.tenant_id, request.parlamentar_id)
        .await?;
    if !parlamentar.ativo {
        return Err(AppError::invalid_field("parlamentar_id", "parlamentar is inactive"));
    }

    let membros = repo.list_membros(auth.tenant_id, id).await?;
    if membros.iter().any(|m| m.parlamentar_id == parlamentar.id) {
        return Err(AppError::Duplicate {
            message: format!("{} already sits on this committee", parlamentar.nome_parlamentar),
        });
    }
    if single_seat(cargo) {
        if let Some(holder) = membros.iter().find(|m| m.cargo == cargo.as_str()) {
            return Err(AppError::Conflict {
                message: format!("{} is already held by member {}", cargo, holder.parlamentar_id),
            });
        }
    }

    let model = MembroComissaoActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        comissao_id: Set(id),
        parlamentar_id: Set(parlamentar.id),
        cargo: Set(cargo.into()),
        data_inicio: Set(data_inicio),
        data_fim: Set(request.data_fim),
        created_at: Set(Utc::now().into()),
    };
    let membro = repo.insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        comissao_id = %id,
        parlamentar_id = %parlamentar.id,
        cargo = %cargo,
        "Committee member added"
    );
    Ok(created(membro))
}

pub async fn remove_membro(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, membro_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    auth.authorize(Role::Secretaria, WRITE)?;

    let repo = state.repo();
    let membro = repo
        .get_scoped::<MembroComissaoEntity>(auth.tenant_id, membro_id)
        .await?;
    if membro.comissao_id != id {
        return Err(AppError::not_found("MembroComissao", membro_id));
    }

    repo.delete_scoped::<MembroComissaoEntity>(auth.tenant_id, membro_id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, comissao_id = %id, membro_id = %membro_id, "Committee member removed");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Reunioes
// ============================================================================

pub async fn list_reunioes(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ReuniaoComissao>>>> {
    let repo = state.repo();
    repo.find_scoped::<ComissaoEntity>(tenant.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Comissao", id))?;
    Ok(ok(repo.list_reunioes(tenant.id, id).await?))
}

pub async fn create_reuniao(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateReuniaoRequest>,
) -> Result<Created<ReuniaoComissao>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    repo.get_scoped::<ComissaoEntity>(auth.tenant_id, id).await?;

    let now = Utc::now();
    let model = ReuniaoComissaoActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        comissao_id: Set(id),
        data: Set(request.data.into()),
        local: Set(request.local),
        pauta: Set(request.pauta),
        ata: Set(None),
        status: Set(ReuniaoStatus::Agendada.into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let reuniao = repo.insert(model).await?;

    tracing::info!(tenant_id = %auth.tenant_id, comissao_id = %id, reuniao_id = %reuniao.id, "Committee meeting scheduled");
    Ok(created(reuniao))
}

pub async fn update_reuniao(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReuniaoRequest>,
) -> Result<Json<ApiResponse<ReuniaoComissao>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let reuniao = repo
        .get_scoped::<ReuniaoComissaoEntity>(auth.tenant_id, id)
        .await?;
    let from: ReuniaoStatus = reuniao.status.parse()?;

    let mut active: ReuniaoComissaoActiveModel = reuniao.into();
    if let Some(status) = request.status.as_deref() {
        let to = parse_label::<ReuniaoStatus>("status", status)?;
        check_reuniao_transition(from, to)?;
        active.status = Set(to.into());
    }
    if let Some(data) = request.data {
        active.data = Set(data.into());
    }
    if let Some(local) = request.local {
        active.local = Set(local);
    }
    if let Some(pauta) = request.pauta {
        active.pauta = Set(pauta);
    }
    if let Some(ata) = request.ata {
        active.ata = Set(ata);
    }
    active.updated_at = Set(Utc::now().into());

    let reuniao = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, reuniao_id = %id, status = %reuniao.status, "Committee meeting updated");
    Ok(ok(reuniao))
}
