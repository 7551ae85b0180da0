//! Staff accounts of the chamber

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use plenario_common::{
    auth::{hash_password, validate_password_strength, AuthContext, Role},
    db::models::{ParlamentarEntity, Usuario, UsuarioActiveModel, UsuarioEntity},
    errors::{AppError, Result},
    response::{ApiResponse, Pagination},
    Repository,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{auth::require_user, created, nullable, ok, parse_label, Created};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUsuarioRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: String,

    #[validate(email)]
    pub email: String,

    pub senha: String,

    pub role: String,

    pub parlamentar_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUsuarioRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: Option<String>,

    pub role: Option<String>,

    pub ativo: Option<bool>,

    /// New password, replaces the current one
    pub senha: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub parlamentar_id: Option<Option<Uuid>>,
}

/// Nobody hands out a role above their own
fn ensure_can_grant(actor: Role, target: Role) -> Result<()> {
    if actor.at_least(target) {
        Ok(())
    } else {
        Err(AppError::InsufficientRole {
            required: target.to_string(),
            actual: actor.to_string(),
        })
    }
}

fn actor_role(auth: &AuthContext) -> Result<Role> {
    auth.role().ok_or_else(|| AppError::Forbidden {
        message: "integration tokens cannot manage users".to_string(),
    })
}

/// Refuse to leave the chamber without an active administrator
async fn ensure_not_last_admin(repo: &Repository, usuario: &Usuario) -> Result<()> {
    if usuario.role() == Role::Admin
        && usuario.ativo
        && repo
            .count_usuarios_with_role(usuario.tenant_id, Role::Admin.as_str())
            .await?
            <= 1
    {
        return Err(AppError::Conflict {
            message: "the chamber must keep at least one active administrator".to_string(),
        });
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<Usuario>>>> {
    auth.require_role(Role::Admin)?;
    let (usuarios, total) = state.repo().list_usuarios(auth.tenant_id, &pagination).await?;
    Ok(Json(ApiResponse::page(usuarios, &pagination, total)))
}

/// Admins see everyone, other users only themselves
pub async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Usuario>>> {
    if auth.user_id() != Some(id) {
        auth.require_role(Role::Admin)?;
    }
    let usuario = state.repo().get_scoped::<UsuarioEntity>(auth.tenant_id, id).await?;
    Ok(ok(usuario))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateUsuarioRequest>,
) -> Result<Created<Usuario>> {
    auth.require_role(Role::Admin)?;
    request.validate()?;

    let role: Role = parse_label("role", &request.role)?;
    ensure_can_grant(actor_role(&auth)?, role)?;
    validate_password_strength(&request.senha, state.config.auth.password_min_length)?;

    let repo = state.repo();
    if let Some(parlamentar_id) = request.parlamentar_id {
        repo.get_scoped::<ParlamentarEntity>(auth.tenant_id, parlamentar_id)
            .await?;
    }

    let now = Utc::now();
    let model = UsuarioActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        nome: Set(request.nome.trim().to_string()),
        email: Set(request.email.trim().to_lowercase()),
        senha_hash: Set(hash_password(&request.senha)?),
        role: Set(role.into()),
        ativo: Set(true),
        totp_secret: Set(None),
        totp_enabled: Set(false),
        totp_ultimo_passo: Set(None),
        parlamentar_id: Set(request.parlamentar_id),
        ultimo_login_em: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let usuario = repo.insert(model).await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        usuario_id = %usuario.id,
        role = %role,
        "User created"
    );
    Ok(created(usuario))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUsuarioRequest>,
) -> Result<Json<ApiResponse<Usuario>>> {
    auth.require_role(Role::Admin)?;
    request.validate()?;
    let actor = actor_role(&auth)?;

    let repo = state.repo();
    let usuario = repo.get_scoped::<UsuarioEntity>(auth.tenant_id, id).await?;
    // editing someone above you is as bad as promoting them
    ensure_can_grant(actor, usuario.role())?;

    let new_role = request
        .role
        .as_deref()
        .map(|r| parse_label::<Role>("role", r))
        .transpose()?;
    if let Some(role) = new_role {
        ensure_can_grant(actor, role)?;
        if auth.user_id() == Some(id) && role != usuario.role() {
            return Err(AppError::Forbidden {
                message: "users cannot change their own role".to_string(),
            });
        }
    }

    let demoted = new_role.is_some_and(|r| r != usuario.role());
    let deactivated = request.ativo == Some(false);
    if demoted || deactivated {
        ensure_not_last_admin(&repo, &usuario).await?;
    }

    if let Some(Some(parlamentar_id)) = request.parlamentar_id {
        repo.get_scoped::<ParlamentarEntity>(auth.tenant_id, parlamentar_id)
            .await?;
    }

    let mut active: UsuarioActiveModel = usuario.into();
    if let Some(nome) = request.nome {
        active.nome = Set(nome.trim().to_string());
    }
    if let Some(role) = new_role {
        active.role = Set(role.into());
    }
    if let Some(ativo) = request.ativo {
        active.ativo = Set(ativo);
    }
    if let Some(senha) = request.senha {
        validate_password_strength(&senha, state.config.auth.password_min_length)?;
        active.senha_hash = Set(hash_password(&senha)?);
    }
    if let Some(parlamentar_id) = request.parlamentar_id {
        active.parlamentar_id = Set(parlamentar_id);
    }
    active.updated_at = Set(Utc::now().into());

    let usuario = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, usuario_id = %id, "User updated");
    Ok(ok(usuario))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_role(Role::Admin)?;
    if require_user(&auth)? == id {
        return Err(AppError::Forbidden {
            message: "users cannot delete their own account".to_string(),
        });
    }

    let repo = state.repo();
    let usuario = repo.get_scoped::<UsuarioEntity>(auth.tenant_id, id).await?;
    ensure_can_grant(actor_role(&auth)?, usuario.role())?;
    ensure_not_last_admin(&repo, &usuario).await?;

    repo.delete_scoped::<UsuarioEntity>(auth.tenant_id, id).await?;
    tracing::info!(tenant_id = %auth.tenant_id, usuario_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_up_to_own_role() {
        assert!(ensure_can_grant(Role::Admin, Role::Admin).is_ok());
        assert!(ensure_can_grant(Role::Admin, Role::Parlamentar).is_ok());
        assert!(matches!(
            ensure_can_grant(Role::Admin, Role::Superadmin),
            Err(AppError::InsufficientRole { .. })
        ));
    }

    #[test]
    fn test_update_request_parses_partial_body() {
        let req: UpdateUsuarioRequest =
            serde_json::from_str(r#"{"ativo": false, "parlamentar_id": null}"#).unwrap();
        assert_eq!(req.ativo, Some(false));
        assert_eq!(req.parlamentar_id, Some(None));
        assert!(req.role.is_none());
    }
}
