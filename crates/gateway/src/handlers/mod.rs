//! API handlers module
//!
//! Handlers take the resolved tenant and, for staff operations, an
//! [`AuthContext`]; public reads take `Option<AuthContext>` and widen what
//! they return when staff credentials are present.

pub mod auth;
pub mod comissoes;
pub mod configuracao;
pub mod health;
pub mod legislaturas;
pub mod normas;
pub mod noticias;
pub mod parlamentares;
pub mod participacao;
pub mod pauta;
pub mod presencas;
pub mod proposicoes;
pub mod publicacoes;
pub mod relatorios;
pub mod sessoes;
pub mod tenants;
pub mod tokens;
pub mod usuarios;
pub mod votacao;

use axum::{http::StatusCode, Json};
use plenario_common::{
    auth::{AuthContext, Role},
    errors::{AppError, Result},
    response::ApiResponse,
};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// `201 Created` with the envelope
pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn created<T>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(ApiResponse::ok(data)))
}

pub fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}

/// Parse a label from the request, blaming `field` on failure
pub fn parse_label<E>(field: &str, value: &str) -> Result<E>
where
    E: FromStr<Err = AppError>,
{
    E::from_str(value.trim()).map_err(|e| AppError::invalid_field(field, e.to_string()))
}

/// Same as [`parse_label`] for optional query filters
pub fn parse_filter<E>(field: &str, value: Option<String>) -> Result<Option<String>>
where
    E: FromStr<Err = AppError> + Into<String>,
{
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_label::<E>(field, &v).map(Into::into))
        .transpose()
}

/// For update payloads: a missing field stays `None`, an explicit `null`
/// becomes `Some(None)`
pub fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Staff at `role` or above (or an integration token) sees unpublished records
pub fn sees_drafts(auth: &Option<AuthContext>, role: Role, permission: &str) -> bool {
    auth.as_ref()
        .map(|a| a.authorize(role, permission).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plenario_common::{auth::Principal, legislative::SessaoTipo};
    use uuid::Uuid;

    #[test]
    fn test_parse_label_names_the_field() {
        let err = parse_label::<SessaoTipo>("tipo", "NOTURNA").unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("tipo")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(parse_label::<SessaoTipo>("tipo", " SOLENE ").unwrap(), SessaoTipo::Solene);
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter::<SessaoTipo>("tipo", None).unwrap(), None);
        assert_eq!(parse_filter::<SessaoTipo>("tipo", Some("".into())).unwrap(), None);
        assert_eq!(
            parse_filter::<SessaoTipo>("tipo", Some("ORDINARIA".into())).unwrap().as_deref(),
            Some("ORDINARIA")
        );
        assert!(parse_filter::<SessaoTipo>("tipo", Some("x".into())).is_err());
    }

    #[derive(Debug, serde::Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        partido: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.partido, None);
        let cleared: Patch = serde_json::from_str(r#"{"partido": null}"#).unwrap();
        assert_eq!(cleared.partido, Some(None));
        let set: Patch = serde_json::from_str(r#"{"partido": "PV"}"#).unwrap();
        assert_eq!(set.partido, Some(Some("PV".to_string())));
    }

    #[test]
    fn test_sees_drafts() {
        let editor = Some(AuthContext {
            tenant_id: Uuid::new_v4(),
            principal: Principal::User {
                id: Uuid::new_v4(),
                role: Role::Editor,
            },
        });
        assert!(sees_drafts(&editor, Role::Editor, "noticias:read"));
        assert!(!sees_drafts(&editor, Role::Admin, "noticias:read"));
        assert!(!sees_drafts(&None, Role::Editor, "noticias:read"));
    }
}
