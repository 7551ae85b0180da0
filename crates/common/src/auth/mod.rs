//! Authentication and authorization utilities
//!
//! Provides:
//! - Role hierarchy for chamber staff
//! - JWT access and two-factor challenge tokens
//! - Password hashing (argon2id)
//! - TOTP second factor
//! - Integration tokens for external systems

pub mod password;
pub mod tokens;
pub mod totp;

use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub use password::{hash_password, validate_password_strength, verify_password};
pub use tokens::{extract_bearer, generate_integration_token, hash_token, token_prefix};
pub use totp::Totp;

string_enum! {
    /// Staff roles, most privileged first
    pub enum Role {
        /// Operates the whole deployment, every chamber
        Superadmin => "SUPERADMIN",
        Admin => "ADMIN",
        Secretaria => "SECRETARIA",
        Editor => "EDITOR",
        Operador => "OPERADOR",
        Parlamentar => "PARLAMENTAR",
    }
}

impl Role {
    fn rank(&self) -> u8 {
        match self {
            Role::Superadmin => 60,
            Role::Admin => 50,
            Role::Secretaria => 40,
            Role::Editor => 30,
            Role::Operador => 20,
            Role::Parlamentar => 10,
        }
    }

    /// Whether this role includes everything `required` may do
    pub fn at_least(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

/// Who is calling
#[derive(Debug, Clone)]
pub enum Principal {
    User { id: Uuid, role: Role },
    Integration { token_id: Uuid, permissions: Vec<String> },
}

/// Authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Chamber the credentials belong to
    pub tenant_id: Uuid,

    pub principal: Principal,
}

impl AuthContext {
    pub fn user_id(&self) -> Option<Uuid> {
        match self.principal {
            Principal::User { id, .. } => Some(id),
            Principal::Integration { .. } => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self.principal {
            Principal::User { role, .. } => Some(role),
            Principal::Integration { .. } => None,
        }
    }

    /// Require a staff role; integration tokens never pass
    pub fn require_role(&self, required: Role) -> Result<()> {
        match &self.principal {
            Principal::User { role, .. } if role.at_least(required) => Ok(()),
            Principal::User { role, .. } => Err(AppError::InsufficientRole {
                required: required.to_string(),
                actual: role.to_string(),
            }),
            Principal::Integration { .. } => Err(AppError::Forbidden {
                message: "integration tokens cannot perform this action".to_string(),
            }),
        }
    }

    /// Users pass by role, integration tokens by explicit permission
    pub fn authorize(&self, required: Role, permission: &str) -> Result<()> {
        match &self.principal {
            Principal::User { .. } => self.require_role(required),
            Principal::Integration { permissions, .. } => {
                if has_permission(permissions, permission) {
                    Ok(())
                } else {
                    Err(AppError::Forbidden {
                        message: format!("Missing required permission: {}", permission),
                    })
                }
            }
        }
    }
}

/// `sessoes:*` grants every `sessoes:` permission, `*` grants all
pub fn has_permission(granted: &[String], required: &str) -> bool {
    granted.iter().any(|p| {
        p == "*"
            || p == required
            || p.strip_suffix('*')
                .map(|prefix| prefix.ends_with(':') && required.starts_with(prefix))
                .unwrap_or(false)
    })
}

/// What a JWT may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    /// Password verified, waiting for the TOTP code
    #[serde(rename = "2fa")]
    TwoFactor,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Tenant ID
    pub tenant_id: String,

    pub role: String,

    pub purpose: TokenPurpose,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }

    pub fn tenant_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.tenant_id).map_err(|_| AppError::InvalidToken)
    }

    pub fn role(&self) -> Result<Role> {
        Role::from_str(&self.role).map_err(|_| AppError::InvalidToken)
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
    challenge_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64, challenge_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
            challenge_secs: challenge_secs as i64,
        }
    }

    fn issue(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        role: Role,
        purpose: TokenPurpose,
        lifetime_secs: i64,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            role: role.to_string(),
            purpose,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Token used on every authenticated request
    pub fn issue_access(&self, user_id: Uuid, tenant_id: Uuid, role: Role) -> Result<String> {
        self.issue(user_id, tenant_id, role, TokenPurpose::Access, self.expiration_secs)
    }

    /// Short-lived token exchanged for an access token with a TOTP code
    pub fn issue_challenge(&self, user_id: Uuid, tenant_id: Uuid, role: Role) -> Result<String> {
        self.issue(user_id, tenant_id, role, TokenPurpose::TwoFactor, self.challenge_secs)
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.expiration_secs
    }

    /// Validate and decode a JWT token issued for `purpose`
    pub fn validate(&self, token: &str, purpose: TokenPurpose) -> Result<JwtClaims> {
        let claims = decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })?;

        if claims.purpose != purpose {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthContext {
        AuthContext {
            tenant_id: Uuid::new_v4(),
            principal: Principal::User {
                id: Uuid::new_v4(),
                role,
            },
        }
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.at_least(Role::Editor));
        assert!(Role::Editor.at_least(Role::Editor));
        assert!(!Role::Operador.at_least(Role::Secretaria));
        assert!(Role::Superadmin.at_least(Role::Admin));
    }

    #[test]
    fn test_require_role() {
        assert!(user(Role::Secretaria).require_role(Role::Operador).is_ok());
        let err = user(Role::Parlamentar).require_role(Role::Secretaria).unwrap_err();
        assert!(matches!(err, AppError::InsufficientRole { .. }));
    }

    #[test]
    fn test_integration_permissions() {
        let ctx = AuthContext {
            tenant_id: Uuid::new_v4(),
            principal: Principal::Integration {
                token_id: Uuid::new_v4(),
                permissions: vec!["sessoes:*".into(), "votacao:read".into()],
            },
        };
        assert!(ctx.authorize(Role::Operador, "sessoes:write").is_ok());
        assert!(ctx.authorize(Role::Operador, "votacao:read").is_ok());
        assert!(ctx.authorize(Role::Operador, "votacao:write").is_err());
        assert!(ctx.require_role(Role::Parlamentar).is_err());
    }

    #[test]
    fn test_has_permission_wildcards() {
        let all = vec!["*".to_string()];
        assert!(has_permission(&all, "anything:write"));
        // a bare trailing star without the colon is not a scope wildcard
        let odd = vec!["sess*".to_string()];
        assert!(!has_permission(&odd, "sessoes:read"));
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600, 300);
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();

        let token = manager.issue_access(user_id, tenant_id, Role::Editor).unwrap();
        let claims = manager.validate(&token, TokenPurpose::Access).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.tenant_id().unwrap(), tenant_id);
        assert_eq!(claims.role().unwrap(), Role::Editor);
    }

    #[test]
    fn test_challenge_token_is_not_an_access_token() {
        let manager = JwtManager::new("test_secret", 3600, 300);
        let token = manager
            .issue_challenge(Uuid::new_v4(), Uuid::new_v4(), Role::Admin)
            .unwrap();
        assert!(matches!(
            manager.validate(&token, TokenPurpose::Access),
            Err(AppError::InvalidToken)
        ));
        assert!(manager.validate(&token, TokenPurpose::TwoFactor).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let a = JwtManager::new("a", 3600, 300);
        let b = JwtManager::new("b", 3600, 300);
        let token = a.issue_access(Uuid::new_v4(), Uuid::new_v4(), Role::Admin).unwrap();
        assert!(b.validate(&token, TokenPurpose::Access).is_err());
    }
}
