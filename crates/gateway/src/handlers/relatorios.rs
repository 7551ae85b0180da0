//! Scheduled report definitions and their run history
//!
//! The scheduler binary executes due reports; these routes only manage the
//! schedule and expose stored runs.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{
        RelatorioAgendado, RelatorioAgendadoActiveModel, RelatorioAgendadoEntity,
        RelatorioExecucao,
    },
    errors::{AppError, Result},
    reports::{Frequencia, RelatorioTipo},
    response::{ApiResponse, Pagination},
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use super::{created, ok, parse_label, Created};
use crate::AppState;

const READ: &str = "relatorios:read";
const WRITE: &str = "relatorios:write";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRelatorioRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: String,

    pub tipo: String,

    pub frequencia: String,

    #[serde(default)]
    pub parametros: Option<serde_json::Value>,

    #[serde(default)]
    pub destinatarios: Vec<String>,

    /// First run; one period from now when omitted
    pub proximo_envio: Option<DateTime<FixedOffset>>,

    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRelatorioRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: Option<String>,

    pub frequencia: Option<String>,

    pub parametros: Option<serde_json::Value>,

    pub destinatarios: Option<Vec<String>>,

    pub proximo_envio: Option<DateTime<FixedOffset>>,

    pub ativo: Option<bool>,
}

/// Lowercased, deduplicated recipient list
fn clean_destinatarios(destinatarios: Vec<String>) -> Result<serde_json::Value> {
    let mut cleaned: Vec<String> = Vec::with_capacity(destinatarios.len());
    for email in destinatarios {
        let email = email.trim().to_lowercase();
        if !email.validate_email() {
            return Err(AppError::invalid_field(
                "destinatarios",
                format!("'{}' is not a valid e-mail address", email),
            ));
        }
        if !cleaned.contains(&email) {
            cleaned.push(email);
        }
    }
    Ok(serde_json::Value::from(cleaned))
}

fn clean_parametros(parametros: Option<serde_json::Value>) -> Result<serde_json::Value> {
    match parametros {
        None | Some(serde_json::Value::Null) => Ok(serde_json::json!({})),
        Some(value @ serde_json::Value::Object(_)) => Ok(value),
        Some(_) => Err(AppError::invalid_field("parametros", "must be a JSON object")),
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<RelatorioAgendado>>>> {
    auth.authorize(Role::Secretaria, READ)?;
    let (relatorios, total) = state
        .repo()
        .list_relatorios(auth.tenant_id, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(relatorios, &pagination, total)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateRelatorioRequest>,
) -> Result<Created<RelatorioAgendado>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;
    let tipo: RelatorioTipo = parse_label("tipo", &request.tipo)?;
    let frequencia: Frequencia = parse_label("frequencia", &request.frequencia)?;

    let now = Utc::now();
    let proximo_envio = request
        .proximo_envio
        .unwrap_or_else(|| frequencia.advance(now).into());

    let relatorio = state
        .repo()
        .insert(RelatorioAgendadoActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(auth.tenant_id),
            nome: Set(request.nome.trim().to_string()),
            tipo: Set(tipo.to_string()),
            frequencia: Set(frequencia.to_string()),
            parametros: Set(clean_parametros(request.parametros)?),
            destinatarios: Set(clean_destinatarios(request.destinatarios)?),
            ativo: Set(request.ativo),
            proximo_envio: Set(proximo_envio),
            dia_envio: Set(proximo_envio.with_timezone(&Utc).day() as i16),
            ultimo_envio: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        relatorio_id = %relatorio.id,
        tipo = %tipo,
        frequencia = %frequencia,
        proximo_envio = %relatorio.proximo_envio,
        "Scheduled report created"
    );
    Ok(created(relatorio))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRelatorioRequest>,
) -> Result<Json<ApiResponse<RelatorioAgendado>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let relatorio = repo
        .get_scoped::<RelatorioAgendadoEntity>(auth.tenant_id, id)
        .await?;

    let mut active: RelatorioAgendadoActiveModel = relatorio.into();
    if let Some(nome) = request.nome {
        active.nome = Set(nome.trim().to_string());
    }
    if let Some(frequencia) = request.frequencia {
        let frequencia: Frequencia = parse_label("frequencia", &frequencia)?;
        active.frequencia = Set(frequencia.to_string());
    }
    if request.parametros.is_some() {
        active.parametros = Set(clean_parametros(request.parametros)?);
    }
    if let Some(destinatarios) = request.destinatarios {
        active.destinatarios = Set(clean_destinatarios(destinatarios)?);
    }
    if let Some(proximo_envio) = request.proximo_envio {
        active.proximo_envio = Set(proximo_envio);
        active.dia_envio = Set(proximo_envio.with_timezone(&Utc).day() as i16);
    }
    if let Some(ativo) = request.ativo {
        active.ativo = Set(ativo);
    }
    active.updated_at = Set(Utc::now().into());

    let relatorio = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, relatorio_id = %id, ativo = relatorio.ativo, "Scheduled report updated");
    Ok(ok(relatorio))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Secretaria, WRITE)?;
    state
        .repo()
        .delete_scoped::<RelatorioAgendadoEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, relatorio_id = %id, "Scheduled report deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Stored runs, newest first, payload included
pub async fn list_execucoes(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<RelatorioExecucao>>>> {
    auth.authorize(Role::Secretaria, READ)?;
    let repo = state.repo();
    repo.get_scoped::<RelatorioAgendadoEntity>(auth.tenant_id, id)
        .await?;
    let (execucoes, total) = repo
        .list_execucoes(auth.tenant_id, id, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(execucoes, &pagination, total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destinatarios_are_normalized() {
        let value = clean_destinatarios(vec![
            " Secretaria@Camara.sp.gov.br ".into(),
            "secretaria@camara.sp.gov.br".into(),
            "presidencia@camara.sp.gov.br".into(),
        ])
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!(["secretaria@camara.sp.gov.br", "presidencia@camara.sp.gov.br"])
        );
        assert!(clean_destinatarios(vec!["not-an-email".into()]).is_err());
    }

    #[test]
    fn test_parametros_must_be_an_object() {
        assert_eq!(clean_parametros(None).unwrap(), serde_json::json!({}));
        assert_eq!(
            clean_parametros(Some(serde_json::json!({"partido": "PV"}))).unwrap(),
            serde_json::json!({"partido": "PV"})
        );
        assert!(clean_parametros(Some(serde_json::json!([1, 2]))).is_err());
    }
}
