//! Session attendance

use axum::{
    extract::{Path, State},
    Json,
};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{Presenca, SessaoEntity},
    errors::{AppError, Result},
    legislative::SessaoStatus,
    response::ApiResponse,
    tenancy::ResolvedTenant,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use super::ok;
use crate::AppState;

const WRITE: &str = "presencas:write";

#[derive(Debug, Deserialize, Validate)]
pub struct RegistrarPresencasRequest {
    #[validate(length(min = 1, max = 200))]
    pub registros: Vec<RegistroRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistroRequest {
    pub parlamentar_id: Uuid,
    pub presente: bool,
    pub justificativa: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ResumoPresenca {
    pub presentes: u32,
    pub ausentes: u32,
    /// Active members without a record yet
    pub sem_registro: u32,
    pub total_ativos: u32,
}

#[derive(Debug, Serialize)]
pub struct PresencasResponse {
    pub registros: Vec<Presenca>,
    pub resumo: ResumoPresenca,
}

fn resumir(registros: &[Presenca], ativos: &HashSet<Uuid>) -> ResumoPresenca {
    let presentes = registros.iter().filter(|r| r.presente).count() as u32;
    let ausentes = registros.len() as u32 - presentes;
    let registrados: HashSet<Uuid> = registros.iter().map(|r| r.parlamentar_id).collect();
    let sem_registro = ativos.difference(&registrados).count() as u32;
    ResumoPresenca {
        presentes,
        ausentes,
        sem_registro,
        total_ativos: ativos.len() as u32,
    }
}

async fn response(state: &AppState, tenant_id: Uuid, sessao_id: Uuid) -> Result<PresencasResponse> {
    let repo = state.repo();
    let registros = repo.list_presencas(tenant_id, sessao_id).await?;
    let ativos: HashSet<Uuid> = repo
        .active_parlamentares(tenant_id)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    let resumo = resumir(&registros, &ativos);
    Ok(PresencasResponse { registros, resumo })
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(sessao_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PresencasResponse>>> {
    state
        .repo()
        .find_scoped::<SessaoEntity>(tenant.id, sessao_id)
        .await?
        .ok_or_else(|| AppError::not_found("Sessao", sessao_id))?;
    Ok(ok(response(&state, tenant.id, sessao_id).await?))
}

/// Record a batch; a member's earlier record for the session is replaced
pub async fn record(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(sessao_id): Path<Uuid>,
    Json(request): Json<RegistrarPresencasRequest>,
) -> Result<Json<ApiResponse<PresencasResponse>>> {
    auth.authorize(Role::Operador, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let sessao = repo.get_scoped::<SessaoEntity>(auth.tenant_id, sessao_id).await?;
    let status = sessao.status()?;
    if status == SessaoStatus::Cancelada {
        return Err(AppError::Conflict {
            message: "attendance cannot be recorded for a cancelled session".to_string(),
        });
    }

    let ativos: HashSet<Uuid> = repo
        .active_parlamentares(auth.tenant_id)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    if let Some(unknown) = request
        .registros
        .iter()
        .find(|r| !ativos.contains(&r.parlamentar_id))
    {
        return Err(AppError::invalid_field(
            "parlamentar_id",
            format!("{} is not an active member of this chamber", unknown.parlamentar_id),
        ));
    }

    let total = request.registros.len();
    for registro in request.registros {
        repo.upsert_presenca(
            auth.tenant_id,
            sessao_id,
            registro.parlamentar_id,
            registro.presente,
            registro.justificativa.filter(|j| !j.trim().is_empty()),
        )
        .await?;
    }

    tracing::info!(
        tenant_id = %auth.tenant_id,
        sessao_id = %sessao_id,
        registros = total,
        "Attendance recorded"
    );
    Ok(ok(response(&state, auth.tenant_id, sessao_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn presenca(parlamentar_id: Uuid, presente: bool) -> Presenca {
        Presenca {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            sessao_id: Uuid::nil(),
            parlamentar_id,
            presente,
            justificativa: None,
            registrado_em: Utc::now().into(),
        }
    }

    #[test]
    fn test_resumo_counts_missing_records() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let ativos: HashSet<Uuid> = ids.iter().copied().collect();
        let registros = vec![
            presenca(ids[0], true),
            presenca(ids[1], true),
            presenca(ids[2], false),
        ];
        assert_eq!(
            resumir(&registros, &ativos),
            ResumoPresenca {
                presentes: 2,
                ausentes: 1,
                sem_registro: 2,
                total_ativos: 5,
            }
        );
    }
}
