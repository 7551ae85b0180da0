//! Integration tokens for external systems

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use plenario_common::{
    auth::{generate_integration_token, hash_token, token_prefix, AuthContext, Role},
    db::models::{IntegrationToken, IntegrationTokenActiveModel, IntegrationTokenEntity},
    errors::{AppError, Result},
    response::ApiResponse,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{created, ok, Created};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTokenRequest {
    #[validate(length(min = 1, max = 100))]
    pub nome: String,

    /// e.g. `sessoes:read`, `votacao:write`, `sessoes:*`
    #[validate(length(min = 1, max = 50))]
    pub permissoes: Vec<String>,

    pub expires_at: Option<DateTime<Utc>>,
}

/// Returned once, on creation
#[derive(Debug, Serialize)]
pub struct CreatedToken {
    #[serde(flatten)]
    pub info: IntegrationToken,

    /// Plain token, never shown again
    pub token: String,
}

fn valid_permission(permission: &str) -> bool {
    if permission == "*" {
        return true;
    }
    let Some((scope, action)) = permission.split_once(':') else {
        return false;
    };
    !scope.is_empty()
        && scope.chars().all(|c| c.is_ascii_lowercase() || c == '_')
        && matches!(action, "read" | "write" | "*")
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<IntegrationToken>>>> {
    auth.require_role(Role::Admin)?;
    let tokens = state.repo().list_integration_tokens(auth.tenant_id).await?;
    Ok(ok(tokens))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateTokenRequest>,
) -> Result<Created<CreatedToken>> {
    auth.require_role(Role::Admin)?;
    request.validate()?;

    if let Some(bad) = request.permissoes.iter().find(|p| !valid_permission(p)) {
        return Err(AppError::invalid_field(
            "permissoes",
            format!("invalid permission '{}'", bad),
        ));
    }
    if request.expires_at.is_some_and(|exp| exp <= Utc::now()) {
        return Err(AppError::invalid_field("expires_at", "expiry must be in the future"));
    }

    let token = generate_integration_token();
    let model = IntegrationTokenActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        nome: Set(request.nome.trim().to_string()),
        token_hash: Set(hash_token(&token)),
        prefixo: Set(token_prefix(&token)),
        permissoes: Set(serde_json::to_value(&request.permissoes)?),
        criado_por: Set(auth.user_id()),
        last_used_at: Set(None),
        expires_at: Set(request.expires_at.map(Into::into)),
        revogado: Set(false),
        created_at: Set(Utc::now().into()),
    };
    let info = state.repo().insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        token_id = %info.id,
        prefixo = %info.prefixo,
        "Integration token created"
    );
    Ok(created(CreatedToken { info, token }))
}

pub async fn revoke(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_role(Role::Admin)?;
    let repo = state.repo();
    if !repo.revoke_integration_token(auth.tenant_id, id).await? {
        // already revoked is fine, unknown is not
        repo.get_scoped::<IntegrationTokenEntity>(auth.tenant_id, id)
            .await?;
    }
    tracing::info!(tenant_id = %auth.tenant_id, token_id = %id, "Integration token revoked");
    Ok(StatusCode::NO_CONTENT)
}
