//! Plenary sessions: numbering, lifecycle and public listing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{Legislatura, LegislaturaEntity, PautaItem, Sessao, SessaoActiveModel, SessaoEntity},
    db::SessaoFiltro,
    errors::{AppError, Result},
    legislative::{
        workflow::transition, NumberedTitle, SessaoStatus, SessaoTipo, Template,
    },
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
    Repository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, parse_filter, parse_label, Created};
use crate::AppState;

const READ: &str = "sessoes:read";
const WRITE: &str = "sessoes:write";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessaoRequest {
    pub tipo: String,

    pub data: DateTime<Utc>,

    /// Defaults to the term containing `data`, then to the current one
    pub legislatura_id: Option<Uuid>,

    #[validate(length(max = 200))]
    pub local: Option<String>,

    pub observacoes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSessaoRequest {
    pub data: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "nullable")]
    pub local: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub observacoes: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub tipo: String,
    /// Session date, today when absent
    pub data: Option<NaiveDate>,
    pub legislatura_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SessaoDetalhe {
    #[serde(flatten)]
    pub sessao: Sessao,
    pub pauta: Vec<PautaItem>,
}

#[derive(Debug, Serialize)]
pub struct TitlePreview {
    #[serde(flatten)]
    pub title: NumberedTitle,
    pub legislatura: i32,
    pub template: String,
}

/// The chamber's template for `tipo`, or the built-in one
pub(crate) async fn template_for(
    repo: &Repository,
    tenant_id: Uuid,
    tipo: SessaoTipo,
) -> Result<Template> {
    let Some(stored) = repo.find_template(tenant_id, tipo.as_str()).await? else {
        return Ok(Template::default_for(tipo));
    };
    match Template::parse(&stored.template) {
        Ok(template) => Ok(template),
        Err(e) => {
            tracing::warn!(
                tenant_id = %tenant_id,
                tipo = %tipo,
                error = %e,
                "Stored session template is invalid, using the default"
            );
            Ok(Template::default_for(tipo))
        }
    }
}

/// Explicit term, else the one containing `date`, else the current one
pub(crate) async fn legislatura_for(
    repo: &Repository,
    tenant_id: Uuid,
    legislatura_id: Option<Uuid>,
    date: NaiveDate,
) -> Result<Legislatura> {
    if let Some(id) = legislatura_id {
        return repo.get_scoped::<LegislaturaEntity>(tenant_id, id).await;
    }
    if let Some(legislatura) = repo.legislatura_for_date(tenant_id, date).await? {
        return Ok(legislatura);
    }
    repo.current_legislatura(tenant_id)
        .await?
        .ok_or_else(|| AppError::invalid_field("legislatura_id", "no legislature covers this date"))
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Query(pagination): Query<Pagination>,
    Query(filtro): Query<SessaoFiltro>,
) -> Result<Json<ApiResponse<Vec<Sessao>>>> {
    let filtro = SessaoFiltro {
        tipo: parse_filter::<SessaoTipo>("tipo", filtro.tipo)?,
        status: parse_filter::<SessaoStatus>("status", filtro.status)?,
        ..filtro
    };
    let (sessoes, total) = state
        .repo()
        .list_sessoes(tenant.id, filtro, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(sessoes, &pagination, total)))
}

/// Session with its agenda and results
pub async fn get(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessaoDetalhe>>> {
    let repo = state.repo();
    let sessao = repo
        .find_scoped::<SessaoEntity>(tenant.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Sessao", id))?;
    let pauta = repo.list_pauta(tenant.id, id).await?;
    Ok(ok(SessaoDetalhe { sessao, pauta }))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateSessaoRequest>,
) -> Result<Created<Sessao>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;
    let tipo: SessaoTipo = parse_label("tipo", &request.tipo)?;

    let repo = state.repo();
    let date = request.data.date_naive();
    let legislatura = legislatura_for(&repo, auth.tenant_id, request.legislatura_id, date).await?;
    let template = template_for(&repo, auth.tenant_id, tipo).await?;

    let title = state
        .nomenclature
        .next_session_title(
            auth.tenant_id,
            tipo,
            legislatura.reference(),
            request.data.year(),
            &template,
        )
        .await?;
    let numero = i32::try_from(title.numero).map_err(|_| AppError::Internal {
        message: format!("session counter overflow: {}", title.numero),
    })?;

    let now = Utc::now();
    let model = SessaoActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        legislatura_id: Set(legislatura.id),
        tipo: Set(tipo.into()),
        numero: Set(numero),
        titulo: Set(title.titulo),
        data: Set(request.data.into()),
        local: Set(request.local),
        status: Set(SessaoStatus::Agendada.into()),
        iniciada_em: Set(None),
        encerrada_em: Set(None),
        observacoes: Set(request.observacoes),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let sessao = repo.insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        sessao_id = %sessao.id,
        titulo = %sessao.titulo,
        "Session created"
    );
    Ok(created(sessao))
}

/// Title the next session of `tipo` would get, without allocating a number
pub async fn preview_title(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<ApiResponse<TitlePreview>>> {
    auth.authorize(Role::Operador, READ)?;
    let tipo: SessaoTipo = parse_label("tipo", &query.tipo)?;
    let date = query.data.unwrap_or_else(|| Utc::now().date_naive());

    let repo = state.repo();
    let legislatura = legislatura_for(&repo, auth.tenant_id, query.legislatura_id, date).await?;
    let template = template_for(&repo, auth.tenant_id, tipo).await?;

    let title = state
        .nomenclature
        .preview_session_title(
            auth.tenant_id,
            tipo,
            legislatura.reference(),
            date.year(),
            &template,
        )
        .await?;

    Ok(ok(TitlePreview {
        title,
        legislatura: legislatura.numero,
        template: template.as_str().to_string(),
    }))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSessaoRequest>,
) -> Result<Json<ApiResponse<Sessao>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let sessao = repo.get_scoped::<SessaoEntity>(auth.tenant_id, id).await?;
    let status = sessao.status()?;

    if request.data.is_some() && status != SessaoStatus::Agendada {
        return Err(AppError::Conflict {
            message: format!("cannot reschedule a session that is {}", status),
        });
    }

    let mut active: SessaoActiveModel = sessao.into();
    if let Some(data) = request.data {
        active.data = Set(data.into());
    }
    if let Some(local) = request.local {
        active.local = Set(local);
    }
    if let Some(observacoes) = request.observacoes {
        active.observacoes = Set(observacoes);
    }
    active.updated_at = Set(Utc::now().into());

    let sessao = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, sessao_id = %id, "Session updated");
    Ok(ok(sessao))
}

/// Only sessions that never started can be deleted
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Admin, WRITE)?;

    let repo = state.repo();
    let sessao = repo.get_scoped::<SessaoEntity>(auth.tenant_id, id).await?;
    let status = sessao.status()?;
    if !matches!(status, SessaoStatus::Agendada | SessaoStatus::Cancelada) {
        return Err(AppError::Conflict {
            message: format!("cannot delete a session that is {}", status),
        });
    }

    repo.delete_scoped::<SessaoEntity>(auth.tenant_id, id).await?;
    tracing::info!(tenant_id = %auth.tenant_id, sessao_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<ApiResponse<Sessao>>> {
    auth.authorize(Role::Operador, WRITE)?;
    let target: SessaoStatus = parse_label("status", &request.status)?;

    let repo = state.repo();
    let sessao = repo.get_scoped::<SessaoEntity>(auth.tenant_id, id).await?;
    let from = sessao.status()?;
    let to = transition(from, target)?;

    if to == SessaoStatus::Concluida {
        let open = repo.count_open_pauta(auth.tenant_id, id).await?;
        if open > 0 {
            return Err(AppError::Conflict {
                message: format!("{} agenda item(s) still under discussion or voting", open),
            });
        }
    }

    let now = Utc::now();
    let first_start = to == SessaoStatus::EmAndamento && sessao.iniciada_em.is_none();
    let mut active: SessaoActiveModel = sessao.into();
    active.status = Set(to.into());
    if first_start {
        active.iniciada_em = Set(Some(now.into()));
    }
    if to == SessaoStatus::Concluida {
        active.encerrada_em = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());

    let sessao = repo.update(active).await?;
    tracing::info!(
        tenant_id = %auth.tenant_id,
        sessao_id = %id,
        from = %from,
        to = %to,
        "Session status changed"
    );
    Ok(ok(sessao))
}
