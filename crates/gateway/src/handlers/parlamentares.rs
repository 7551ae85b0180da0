//! Members of the chamber

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{Parlamentar, ParlamentarActiveModel, ParlamentarEntity},
    errors::{AppError, Result},
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, Created};
use crate::AppState;

const WRITE: &str = "parlamentares:write";

#[derive(Debug, Default, Deserialize)]
pub struct ParlamentarFiltro {
    pub ativo: Option<bool>,
    pub partido: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateParlamentarRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: String,

    /// Name used in the chamber, unique per tenant
    #[validate(length(min = 1, max = 100))]
    pub nome_parlamentar: String,

    #[validate(length(max = 20))]
    pub partido: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    pub telefone: Option<String>,

    #[validate(url)]
    pub foto_url: Option<String>,

    pub biografia: Option<String>,

    /// Seat on the board (Presidente, 1º Secretário...)
    pub cargo_mesa: Option<String>,

    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateParlamentarRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub nome_parlamentar: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub partido: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub telefone: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub foto_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub biografia: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub cargo_mesa: Option<Option<String>>,

    pub ativo: Option<bool>,
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Query(pagination): Query<Pagination>,
    Query(filtro): Query<ParlamentarFiltro>,
) -> Result<Json<ApiResponse<Vec<Parlamentar>>>> {
    let (parlamentares, total) = state
        .repo()
        .list_parlamentares(tenant.id, filtro.ativo, filtro.partido, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(parlamentares, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Parlamentar>>> {
    let parlamentar = state
        .repo()
        .find_scoped::<ParlamentarEntity>(tenant.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Parlamentar", id))?;
    Ok(ok(parlamentar))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateParlamentarRequest>,
) -> Result<Created<Parlamentar>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let now = Utc::now();
    let model = ParlamentarActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        nome: Set(request.nome.trim().to_string()),
        nome_parlamentar: Set(request.nome_parlamentar.trim().to_string()),
        partido: Set(request.partido.map(|p| p.trim().to_uppercase())),
        email: Set(request.email.map(|e| e.trim().to_lowercase())),
        telefone: Set(request.telefone),
        foto_url: Set(request.foto_url),
        biografia: Set(request.biografia),
        cargo_mesa: Set(request.cargo_mesa),
        ativo: Set(request.ativo),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let parlamentar = state.repo().insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        parlamentar_id = %parlamentar.id,
        nome = %parlamentar.nome_parlamentar,
        "Parlamentar created"
    );
    Ok(created(parlamentar))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateParlamentarRequest>,
) -> Result<Json<ApiResponse<Parlamentar>>> {
    auth.authorize(Role::Secretaria, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let mut active: ParlamentarActiveModel = repo
        .get_scoped::<ParlamentarEntity>(auth.tenant_id, id)
        .await?
        .into();

    if let Some(nome) = request.nome {
        active.nome = Set(nome.trim().to_string());
    }
    if let Some(nome_parlamentar) = request.nome_parlamentar {
        active.nome_parlamentar = Set(nome_parlamentar.trim().to_string());
    }
    if let Some(partido) = request.partido {
        active.partido = Set(partido.map(|p| p.trim().to_uppercase()));
    }
    if let Some(email) = request.email {
        active.email = Set(email.map(|e| e.trim().to_lowercase()));
    }
    if let Some(telefone) = request.telefone {
        active.telefone = Set(telefone);
    }
    if let Some(foto_url) = request.foto_url {
        active.foto_url = Set(foto_url);
    }
    if let Some(biografia) = request.biografia {
        active.biografia = Set(biografia);
    }
    if let Some(cargo_mesa) = request.cargo_mesa {
        active.cargo_mesa = Set(cargo_mesa);
    }
    if let Some(ativo) = request.ativo {
        active.ativo = Set(ativo);
    }
    active.updated_at = Set(Utc::now().into());

    let parlamentar = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, parlamentar_id = %id, "Parlamentar updated");
    Ok(ok(parlamentar))
}

/// Members with votes or attendance cannot be deleted, deactivate them instead
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Secretaria, WRITE)?;
    state
        .repo()
        .delete_scoped::<ParlamentarEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, parlamentar_id = %id, "Parlamentar deleted");
    Ok(StatusCode::NO_CONTENT)
}
