//! Citizen participation: public consultations and suggestions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{
        ConsultaPublica, ConsultaPublicaActiveModel, ConsultaPublicaEntity, OpiniaoConsulta,
        OpiniaoConsultaActiveModel, ProposicaoEntity, Sugestao, SugestaoActiveModel,
        SugestaoEntity,
    },
    errors::{AppError, Result},
    legislative::{Opiniao, SugestaoStatus},
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, parse_filter, parse_label, sees_drafts, Created};
use crate::AppState;

const CONSULTAS_READ: &str = "consultas:read";
const CONSULTAS_WRITE: &str = "consultas:write";
const SUGESTOES_READ: &str = "sugestoes:read";
const SUGESTOES_WRITE: &str = "sugestoes:write";

#[derive(Debug, Default, Deserialize)]
pub struct ConsultaFiltro {
    /// Staff only; the public listing is always restricted to open consultations
    pub abertas: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConsultaRequest {
    #[validate(length(min = 1, max = 300))]
    pub titulo: String,

    #[validate(length(min = 1))]
    pub descricao: String,

    pub proposicao_id: Option<Uuid>,

    pub abertura: DateTime<FixedOffset>,

    pub encerramento: DateTime<FixedOffset>,

    #[serde(default = "default_true")]
    pub ativa: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConsultaRequest {
    #[validate(length(min = 1, max = 300))]
    pub titulo: Option<String>,

    #[validate(length(min = 1))]
    pub descricao: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub proposicao_id: Option<Option<Uuid>>,

    pub abertura: Option<DateTime<FixedOffset>>,

    pub encerramento: Option<DateTime<FixedOffset>>,

    pub ativa: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OpiniaoRequest {
    pub opiniao: String,

    #[validate(length(max = 200))]
    pub nome: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 5000))]
    pub comentario: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultadoConsulta {
    pub consulta_id: Uuid,
    pub aberta: bool,
    pub total: i64,
    /// Every option is present, zero when nobody chose it
    pub opinioes: BTreeMap<String, i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SugestaoFiltro {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SugestaoRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 300))]
    pub assunto: String,

    #[validate(length(min = 1, max = 10000))]
    pub mensagem: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ModerarSugestaoRequest {
    pub status: String,

    #[validate(length(min = 1, max = 10000))]
    pub resposta: Option<String>,
}

fn check_window(abertura: DateTime<FixedOffset>, encerramento: DateTime<FixedOffset>) -> Result<()> {
    if encerramento <= abertura {
        return Err(AppError::invalid_field(
            "encerramento",
            "consultation must close after it opens",
        ));
    }
    Ok(())
}

/// Zero-filled counts per option
fn contagem(counts: BTreeMap<String, i64>) -> (i64, BTreeMap<String, i64>) {
    let opinioes: BTreeMap<String, i64> = Opiniao::ALL
        .iter()
        .map(|o| (o.to_string(), counts.get(o.as_str()).copied().unwrap_or(0)))
        .collect();
    (opinioes.values().sum(), opinioes)
}

fn moderation_status(status: SugestaoStatus, resposta: Option<&str>) -> Result<()> {
    match status {
        SugestaoStatus::Pendente => Err(AppError::invalid_field(
            "status",
            "a suggestion cannot be moved back to PENDENTE",
        )),
        SugestaoStatus::Respondida if resposta.map_or(true, |r| r.trim().is_empty()) => Err(
            AppError::invalid_field("resposta", "RESPONDIDA requires a resposta"),
        ),
        _ => Ok(()),
    }
}

async fn check_proposicao(state: &AppState, tenant_id: Uuid, id: Option<Uuid>) -> Result<()> {
    if let Some(id) = id {
        state
            .repo()
            .find_scoped::<ProposicaoEntity>(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Proposicao", id))?;
    }
    Ok(())
}

// ============================================================================
// Consultas
// ============================================================================

pub async fn list_consultas(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    auth: Option<AuthContext>,
    Query(pagination): Query<Pagination>,
    Query(filtro): Query<ConsultaFiltro>,
) -> Result<Json<ApiResponse<Vec<ConsultaPublica>>>> {
    let somente_abertas =
        !sees_drafts(&auth, Role::Editor, CONSULTAS_READ) || filtro.abertas.unwrap_or(false);
    let (consultas, total) = state
        .repo()
        .list_consultas(tenant.id, somente_abertas.then(Utc::now), &pagination)
        .await?;
    Ok(Json(ApiResponse::page(consultas, &pagination, total)))
}

pub async fn get_consulta(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    auth: Option<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsultaPublica>>> {
    let consulta = state
        .repo()
        .find_scoped::<ConsultaPublicaEntity>(tenant.id, id)
        .await?
        .filter(|c| c.ativa || sees_drafts(&auth, Role::Editor, CONSULTAS_READ))
        .ok_or_else(|| AppError::not_found("ConsultaPublica", id))?;
    Ok(ok(consulta))
}

pub async fn create_consulta(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateConsultaRequest>,
) -> Result<Created<ConsultaPublica>> {
    auth.authorize(Role::Editor, CONSULTAS_WRITE)?;
    request.validate()?;
    check_window(request.abertura, request.encerramento)?;
    check_proposicao(&state, auth.tenant_id, request.proposicao_id).await?;

    let now = Utc::now();
    let consulta = state
        .repo()
        .insert(ConsultaPublicaActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(auth.tenant_id),
            titulo: Set(request.titulo.trim().to_string()),
            descricao: Set(request.descricao),
            proposicao_id: Set(request.proposicao_id),
            abertura: Set(request.abertura),
            encerramento: Set(request.encerramento),
            ativa: Set(request.ativa),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        consulta_id = %consulta.id,
        encerramento = %consulta.encerramento,
        "Public consultation created"
    );
    Ok(created(consulta))
}

pub async fn update_consulta(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateConsultaRequest>,
) -> Result<Json<ApiResponse<ConsultaPublica>>> {
    auth.authorize(Role::Editor, CONSULTAS_WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let consulta = repo
        .get_scoped::<ConsultaPublicaEntity>(auth.tenant_id, id)
        .await?;
    check_window(
        request.abertura.unwrap_or(consulta.abertura),
        request.encerramento.unwrap_or(consulta.encerramento),
    )?;
    if let Some(proposicao_id) = request.proposicao_id {
        check_proposicao(&state, auth.tenant_id, proposicao_id).await?;
    }

    let mut active: ConsultaPublicaActiveModel = consulta.into();
    if let Some(titulo) = request.titulo {
        active.titulo = Set(titulo.trim().to_string());
    }
    if let Some(descricao) = request.descricao {
        active.descricao = Set(descricao);
    }
    if let Some(proposicao_id) = request.proposicao_id {
        active.proposicao_id = Set(proposicao_id);
    }
    if let Some(abertura) = request.abertura {
        active.abertura = Set(abertura);
    }
    if let Some(encerramento) = request.encerramento {
        active.encerramento = Set(encerramento);
    }
    if let Some(ativa) = request.ativa {
        active.ativa = Set(ativa);
    }
    active.updated_at = Set(Utc::now().into());

    let consulta = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, consulta_id = %id, "Public consultation updated");
    Ok(ok(consulta))
}

pub async fn remove_consulta(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Editor, CONSULTAS_WRITE)?;
    state
        .repo()
        .delete_scoped::<ConsultaPublicaEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, consulta_id = %id, "Public consultation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Citizen opinion, accepted only inside the consultation window
pub async fn submit_opiniao(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
    Json(request): Json<OpiniaoRequest>,
) -> Result<Created<OpiniaoConsulta>> {
    request.validate()?;
    let opiniao: Opiniao = parse_label("opiniao", &request.opiniao)?;

    let repo = state.repo();
    let consulta = repo
        .find_scoped::<ConsultaPublicaEntity>(tenant.id, id)
        .await?
        .filter(|c| c.ativa)
        .ok_or_else(|| AppError::not_found("ConsultaPublica", id))?;

    let now = Utc::now();
    if !consulta.is_open_at(now.into()) {
        return Err(AppError::ConsultationClosed { id: id.to_string() });
    }

    let registro = repo
        .insert(OpiniaoConsultaActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.id),
            consulta_id: Set(id),
            nome: Set(request.nome.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())),
            email: Set(request.email.map(|e| e.trim().to_lowercase())),
            opiniao: Set(opiniao.to_string()),
            comentario: Set(request.comentario),
            created_at: Set(now.into()),
        })
        .await
        .map_err(|e| match e {
            AppError::Duplicate { .. } => AppError::Duplicate {
                message: "an opinion from this e-mail was already recorded".to_string(),
            },
            other => other,
        })?;

    tracing::info!(tenant_id = %tenant.id, consulta_id = %id, opiniao = %opiniao, "Opinion recorded");
    Ok(created(registro))
}

/// Tally of a published consultation, drafts only for editors
pub async fn resultado(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    auth: Option<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ResultadoConsulta>>> {
    let repo = state.repo();
    let consulta = repo
        .find_scoped::<ConsultaPublicaEntity>(tenant.id, id)
        .await?
        .filter(|c| c.ativa || sees_drafts(&auth, Role::Editor, CONSULTAS_READ))
        .ok_or_else(|| AppError::not_found("ConsultaPublica", id))?;

    let (total, opinioes) = contagem(repo.count_opinioes(tenant.id, id).await?);
    Ok(ok(ResultadoConsulta {
        consulta_id: id,
        aberta: consulta.is_open_at(Utc::now().into()),
        total,
        opinioes,
    }))
}

// ============================================================================
// Sugestoes
// ============================================================================

pub async fn list_sugestoes(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(pagination): Query<Pagination>,
    Query(filtro): Query<SugestaoFiltro>,
) -> Result<Json<ApiResponse<Vec<Sugestao>>>> {
    auth.authorize(Role::Editor, SUGESTOES_READ)?;
    let status = parse_filter::<SugestaoStatus>("status", filtro.status)?;
    let (sugestoes, total) = state
        .repo()
        .list_sugestoes(auth.tenant_id, status, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(sugestoes, &pagination, total)))
}

pub async fn submit_sugestao(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Json(request): Json<SugestaoRequest>,
) -> Result<Created<Sugestao>> {
    request.validate()?;

    let now = Utc::now();
    let sugestao = state
        .repo()
        .insert(SugestaoActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.id),
            nome: Set(request.nome.trim().to_string()),
            email: Set(request.email.map(|e| e.trim().to_lowercase())),
            assunto: Set(request.assunto.trim().to_string()),
            mensagem: Set(request.mensagem),
            status: Set(SugestaoStatus::Pendente.to_string()),
            resposta: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .await?;

    tracing::info!(tenant_id = %tenant.id, sugestao_id = %sugestao.id, "Suggestion received");
    Ok(created(sugestao))
}

pub async fn moderate_sugestao(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ModerarSugestaoRequest>,
) -> Result<Json<ApiResponse<Sugestao>>> {
    auth.authorize(Role::Editor, SUGESTOES_WRITE)?;
    request.validate()?;
    let status: SugestaoStatus = parse_label("status", &request.status)?;
    moderation_status(status, request.resposta.as_deref())?;

    let repo = state.repo();
    let sugestao = repo.get_scoped::<SugestaoEntity>(auth.tenant_id, id).await?;
    let previous = sugestao.status.clone();

    let mut active: SugestaoActiveModel = sugestao.into();
    active.status = Set(status.to_string());
    if request.resposta.is_some() {
        active.resposta = Set(request.resposta);
    }
    active.updated_at = Set(Utc::now().into());

    let sugestao = repo.update(active).await?;
    tracing::info!(
        tenant_id = %auth.tenant_id,
        sugestao_id = %id,
        from = %previous,
        to = %status,
        "Suggestion moderated"
    );
    Ok(ok(sugestao))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_must_be_positive() {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        let abre = tz.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let fecha = tz.with_ymd_and_hms(2026, 3, 15, 18, 0, 0).unwrap();
        assert!(check_window(abre, fecha).is_ok());
        assert!(check_window(fecha, abre).is_err());
        assert!(check_window(abre, abre).is_err());
    }

    #[test]
    fn test_resultado_fills_missing_options() {
        let mut counts = BTreeMap::new();
        counts.insert("FAVORAVEL".to_string(), 12);
        counts.insert("NEUTRA".to_string(), 3);

        let (total, opinioes) = contagem(counts);
        assert_eq!(total, 15);
        assert_eq!(opinioes.len(), 3);
        assert_eq!(opinioes["CONTRARIA"], 0);
        assert_eq!(opinioes["FAVORAVEL"], 12);
    }

    #[test]
    fn test_moderation_rules() {
        assert!(moderation_status(SugestaoStatus::Aprovada, None).is_ok());
        assert!(moderation_status(SugestaoStatus::Pendente, None).is_err());
        assert!(moderation_status(SugestaoStatus::Respondida, Some("  ")).is_err());
        assert!(moderation_status(SugestaoStatus::Respondida, Some("Obrigado")).is_ok());
    }
}
