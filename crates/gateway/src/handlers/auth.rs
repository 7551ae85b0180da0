//! Login, second factor and the current caller

use axum::{extract::State, Json};
use plenario_common::{
    auth::{verify_password, AuthContext, Principal, TokenPurpose, Totp},
    db::models::{Usuario, UsuarioActiveModel, UsuarioEntity},
    errors::{AppError, Result},
    metrics,
    response::ApiResponse,
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::ok;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 256))]
    pub senha: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyTwoFactorRequest {
    pub challenge_token: String,

    #[validate(length(equal = 6))]
    pub codigo: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TwoFactorCodeRequest {
    #[validate(length(equal = 6))]
    pub codigo: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub requires_2fa: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usuario: Option<Usuario>,
}

#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    pub secret: String,
    pub otpauth_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum MeResponse {
    Usuario {
        usuario: Usuario,
        tenant: ResolvedTenant,
    },
    Integracao {
        token_id: Uuid,
        permissoes: Vec<String>,
        tenant: ResolvedTenant,
    },
}

impl LoginResponse {
    fn challenge(token: String) -> Self {
        Self {
            requires_2fa: true,
            challenge_token: Some(token),
            access_token: None,
            token_type: None,
            expires_in: None,
            usuario: None,
        }
    }

    fn access(token: String, expires_in: i64, usuario: Usuario) -> Self {
        Self {
            requires_2fa: false,
            challenge_token: None,
            access_token: Some(token),
            token_type: Some("Bearer"),
            expires_in: Some(expires_in),
            usuario: Some(usuario),
        }
    }
}

/// The caller must be a staff user, not an integration
pub(crate) fn require_user(auth: &AuthContext) -> Result<Uuid> {
    auth.user_id().ok_or_else(|| AppError::Forbidden {
        message: "this action requires a user session".to_string(),
    })
}

async fn issue_access(state: &AppState, usuario: Usuario) -> Result<LoginResponse> {
    let token = state.jwt.issue_access(usuario.id, usuario.tenant_id, usuario.role())?;
    state.repo().touch_login(usuario.id).await?;
    metrics::record_login("success");
    Ok(LoginResponse::access(token, state.jwt.access_ttl_secs(), usuario))
}

fn totp_of(usuario: &Usuario) -> Result<Totp> {
    let secret = usuario.totp_secret.as_deref().ok_or(AppError::TwoFactorRequired)?;
    Totp::from_base32(secret)
}

/// A code is accepted once; replayed or older steps are refused
async fn accept_code(state: &AppState, usuario: &Usuario, codigo: &str) -> Result<()> {
    let last_used = usuario.totp_ultimo_passo.and_then(|s| u64::try_from(s).ok());
    let step = totp_of(usuario)?
        .accept(codigo, last_used)
        .ok_or(AppError::InvalidTwoFactorCode)?;
    if !state.repo().claim_totp_step(usuario.id, step).await? {
        return Err(AppError::InvalidTwoFactorCode);
    }
    Ok(())
}

/// Email and password; users with 2FA get a challenge instead of a token
pub async fn login(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    request.validate()?;

    let usuario = state
        .repo()
        .find_usuario_by_email(tenant.id, &request.email)
        .await?
        .filter(|u| u.ativo);

    let Some(usuario) = usuario else {
        metrics::record_login("failure");
        tracing::info!(tenant = %tenant.slug, "Login rejected: unknown or inactive user");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&request.senha, &usuario.senha_hash)? {
        metrics::record_login("failure");
        tracing::info!(tenant = %tenant.slug, usuario_id = %usuario.id, "Login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    if usuario.totp_enabled {
        let challenge = state
            .jwt
            .issue_challenge(usuario.id, tenant.id, usuario.role())?;
        metrics::record_login("challenge");
        tracing::info!(tenant = %tenant.slug, usuario_id = %usuario.id, "Second factor required");
        return Ok(ok(LoginResponse::challenge(challenge)));
    }

    tracing::info!(tenant = %tenant.slug, usuario_id = %usuario.id, "User logged in");
    Ok(ok(issue_access(&state, usuario).await?))
}

/// Exchange a challenge token and a TOTP code for an access token
pub async fn verify_two_factor(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Json(request): Json<VerifyTwoFactorRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    request.validate()?;

    let claims = state
        .jwt
        .validate(&request.challenge_token, TokenPurpose::TwoFactor)?;
    if claims.tenant_id()? != tenant.id {
        return Err(AppError::TenantMismatch);
    }
    let usuario_id = claims.user_id()?;
    if !state.login_limiter.check_account(usuario_id) {
        tracing::warn!(tenant = %tenant.slug, usuario_id = %usuario_id, "Second factor attempts exceeded");
        return Err(AppError::RateLimited);
    }

    let usuario = state
        .repo()
        .get_scoped::<UsuarioEntity>(tenant.id, usuario_id)
        .await?;
    if !usuario.ativo || !usuario.totp_enabled {
        return Err(AppError::InvalidToken);
    }

    if let Err(e) = accept_code(&state, &usuario, &request.codigo).await {
        metrics::record_login("failure");
        tracing::info!(tenant = %tenant.slug, usuario_id = %usuario.id, "Second factor rejected");
        return Err(e);
    }

    tracing::info!(tenant = %tenant.slug, usuario_id = %usuario.id, "User logged in with second factor");
    Ok(ok(issue_access(&state, usuario).await?))
}

pub async fn me(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MeResponse>>> {
    let response = match auth.principal {
        Principal::User { id, .. } => MeResponse::Usuario {
            usuario: state.repo().get_scoped::<UsuarioEntity>(tenant.id, id).await?,
            tenant,
        },
        Principal::Integration {
            token_id,
            permissions,
        } => MeResponse::Integracao {
            token_id,
            permissoes: permissions,
            tenant,
        },
    };
    Ok(ok(response))
}

/// Generate a secret; 2FA stays off until confirmed with a code
pub async fn setup_two_factor(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<TwoFactorSetupResponse>>> {
    let user_id = require_user(&auth)?;
    let repo = state.repo();
    let usuario = repo.get_scoped::<UsuarioEntity>(auth.tenant_id, user_id).await?;

    if usuario.totp_enabled {
        return Err(AppError::Conflict {
            message: "two-factor authentication is already enabled".to_string(),
        });
    }

    let totp = Totp::generate();
    let secret = totp.secret_base32();
    let otpauth_uri = totp.otpauth_uri(&state.config.auth.totp_issuer, &usuario.email);

    let mut active: UsuarioActiveModel = usuario.into();
    active.totp_secret = Set(Some(secret.clone()));
    active.updated_at = Set(chrono::Utc::now().into());
    repo.update(active).await?;

    tracing::info!(usuario_id = %user_id, "Two-factor secret generated");
    Ok(ok(TwoFactorSetupResponse {
        secret,
        otpauth_uri,
    }))
}

pub async fn enable_two_factor(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<TwoFactorCodeRequest>,
) -> Result<Json<ApiResponse<Usuario>>> {
    request.validate()?;
    let user_id = require_user(&auth)?;
    let repo = state.repo();
    let usuario = repo.get_scoped::<UsuarioEntity>(auth.tenant_id, user_id).await?;

    if usuario.totp_enabled {
        return Err(AppError::Conflict {
            message: "two-factor authentication is already enabled".to_string(),
        });
    }
    accept_code(&state, &usuario, &request.codigo).await?;

    let mut active: UsuarioActiveModel = usuario.into();
    active.totp_enabled = Set(true);
    active.updated_at = Set(chrono::Utc::now().into());
    let usuario = repo.update(active).await?;

    tracing::info!(usuario_id = %user_id, "Two-factor authentication enabled");
    Ok(ok(usuario))
}

pub async fn disable_two_factor(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<TwoFactorCodeRequest>,
) -> Result<Json<ApiResponse<Usuario>>> {
    request.validate()?;
    let user_id = require_user(&auth)?;
    let repo = state.repo();
    let usuario = repo.get_scoped::<UsuarioEntity>(auth.tenant_id, user_id).await?;

    if !usuario.totp_enabled {
        return Err(AppError::Conflict {
            message: "two-factor authentication is not enabled".to_string(),
        });
    }
    accept_code(&state, &usuario, &request.codigo).await?;

    let mut active: UsuarioActiveModel = usuario.into();
    active.totp_enabled = Set(false);
    active.totp_secret = Set(None);
    active.totp_ultimo_passo = Set(None);
    active.updated_at = Set(chrono::Utc::now().into());
    let usuario = repo.update(active).await?;

    tracing::info!(usuario_id = %user_id, "Two-factor authentication disabled");
    Ok(ok(usuario))
}
