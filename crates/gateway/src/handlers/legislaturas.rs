//! Legislative terms

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{Legislatura, LegislaturaActiveModel, LegislaturaEntity},
    errors::{AppError, Result},
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{created, ok, Created};
use crate::AppState;

const WRITE: &str = "legislaturas:write";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLegislaturaRequest {
    #[validate(range(min = 1))]
    pub numero: i32,

    pub data_inicio: NaiveDate,

    pub data_fim: NaiveDate,

    /// Marks this term as the current one, unmarking the previous
    #[serde(default)]
    pub atual: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLegislaturaRequest {
    #[validate(range(min = 1))]
    pub numero: Option<i32>,

    pub data_inicio: Option<NaiveDate>,

    pub data_fim: Option<NaiveDate>,

    pub atual: Option<bool>,
}

fn check_term(inicio: NaiveDate, fim: NaiveDate) -> Result<()> {
    if fim <= inicio {
        return Err(AppError::invalid_field(
            "data_fim",
            "the term must end after it starts",
        ));
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<Legislatura>>>> {
    let (legislaturas, total) = state.repo().list_legislaturas(tenant.id, &pagination).await?;
    Ok(Json(ApiResponse::page(legislaturas, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Legislatura>>> {
    let legislatura = state
        .repo()
        .find_scoped::<LegislaturaEntity>(tenant.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Legislatura", id))?;
    Ok(ok(legislatura))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateLegislaturaRequest>,
) -> Result<Created<Legislatura>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;
    check_term(request.data_inicio, request.data_fim)?;

    let repo = state.repo();
    let id = Uuid::new_v4();
    if request.atual {
        repo.clear_current_legislatura(auth.tenant_id, id).await?;
    }

    let model = LegislaturaActiveModel {
        id: Set(id),
        tenant_id: Set(auth.tenant_id),
        numero: Set(request.numero),
        data_inicio: Set(request.data_inicio),
        data_fim: Set(request.data_fim),
        atual: Set(request.atual),
        created_at: Set(Utc::now().into()),
    };
    let legislatura = repo.insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        legislatura_id = %id,
        numero = legislatura.numero,
        atual = legislatura.atual,
        "Legislatura created"
    );
    Ok(created(legislatura))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLegislaturaRequest>,
) -> Result<Json<ApiResponse<Legislatura>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let current = repo.get_scoped::<LegislaturaEntity>(auth.tenant_id, id).await?;
    check_term(
        request.data_inicio.unwrap_or(current.data_inicio),
        request.data_fim.unwrap_or(current.data_fim),
    )?;

    if request.atual == Some(true) && !current.atual {
        repo.clear_current_legislatura(auth.tenant_id, id).await?;
    }

    let mut active: LegislaturaActiveModel = current.into();
    if let Some(numero) = request.numero {
        active.numero = Set(numero);
    }
    if let Some(data_inicio) = request.data_inicio {
        active.data_inicio = Set(data_inicio);
    }
    if let Some(data_fim) = request.data_fim {
        active.data_fim = Set(data_fim);
    }
    if let Some(atual) = request.atual {
        active.atual = Set(atual);
    }

    let legislatura = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, legislatura_id = %id, "Legislatura updated");
    Ok(ok(legislatura))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Admin, WRITE)?;
    state
        .repo()
        .delete_scoped::<LegislaturaEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, legislatura_id = %id, "Legislatura deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_must_end_after_start() {
        let inicio = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let fim = NaiveDate::from_ymd_opt(2028, 12, 31).unwrap();
        assert!(check_term(inicio, fim).is_ok());
        assert!(check_term(fim, inicio).is_err());
        assert!(check_term(inicio, inicio).is_err());
    }
}
