//! News posts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{Noticia, NoticiaActiveModel, NoticiaEntity},
    errors::{AppError, Result},
    response::{ApiResponse, Pagination},
    tenancy::ResolvedTenant,
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{created, nullable, ok, publicacoes::publication_stamp, sees_drafts, Created};
use crate::AppState;

const READ: &str = "noticias:read";
const WRITE: &str = "noticias:write";

const MAX_SLUG_LEN: usize = 80;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNoticiaRequest {
    #[validate(length(min = 1, max = 300))]
    pub titulo: String,

    #[validate(length(max = 1000))]
    pub resumo: Option<String>,

    #[validate(length(min = 1))]
    pub conteudo: String,

    #[validate(url)]
    pub imagem_url: Option<String>,

    #[serde(default)]
    pub publicada: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNoticiaRequest {
    /// The slug is kept so published links stay valid
    #[validate(length(min = 1, max = 300))]
    pub titulo: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub resumo: Option<Option<String>>,

    #[validate(length(min = 1))]
    pub conteudo: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub imagem_url: Option<Option<String>>,

    pub publicada: Option<bool>,
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// URL slug: lowercase ASCII words joined by hyphens
pub fn slugify(titulo: &str) -> String {
    let mut slug = String::with_capacity(titulo.len());
    for c in titulo.chars().flat_map(char::to_lowercase).map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "noticia".to_string()
    } else {
        slug
    }
}

pub async fn list(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    auth: Option<AuthContext>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<Noticia>>>> {
    let somente_publicadas = !sees_drafts(&auth, Role::Editor, READ);
    let (noticias, total) = state
        .repo()
        .list_noticias(tenant.id, somente_publicadas, &pagination)
        .await?;
    Ok(Json(ApiResponse::page(noticias, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    auth: Option<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Noticia>>> {
    let noticia = state
        .repo()
        .find_scoped::<NoticiaEntity>(tenant.id, id)
        .await?
        .filter(|n| n.publicada || sees_drafts(&auth, Role::Editor, READ))
        .ok_or_else(|| AppError::not_found("Noticia", id))?;
    Ok(ok(noticia))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateNoticiaRequest>,
) -> Result<Created<Noticia>> {
    auth.authorize(Role::Editor, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let now = Utc::now();
    let base_slug = slugify(&request.titulo);
    let model = |slug: String| NoticiaActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(auth.tenant_id),
        titulo: Set(request.titulo.trim().to_string()),
        slug: Set(slug),
        resumo: Set(request.resumo.clone()),
        conteudo: Set(request.conteudo.clone()),
        imagem_url: Set(request.imagem_url.clone()),
        publicada: Set(request.publicada),
        publicada_em: Set(publication_stamp(request.publicada, None, now)),
        autor_id: Set(auth.user_id()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let noticia = match repo.insert(model(base_slug.clone())).await {
        Err(AppError::Duplicate { .. }) => {
            let suffix = Uuid::new_v4().simple().to_string();
            repo.insert(model(format!("{}-{}", base_slug, &suffix[..6])))
                .await?
        }
        other => other?,
    };

    tracing::info!(tenant_id = %auth.tenant_id, noticia_id = %noticia.id, slug = %noticia.slug, "News post created");
    Ok(created(noticia))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateNoticiaRequest>,
) -> Result<Json<ApiResponse<Noticia>>> {
    auth.authorize(Role::Editor, WRITE)?;
    request.validate()?;

    let repo = state.repo();
    let noticia = repo.get_scoped::<NoticiaEntity>(auth.tenant_id, id).await?;
    let current_stamp = noticia.publicada_em;

    let mut active: NoticiaActiveModel = noticia.into();
    if let Some(titulo) = request.titulo {
        active.titulo = Set(titulo.trim().to_string());
    }
    if let Some(resumo) = request.resumo {
        active.resumo = Set(resumo);
    }
    if let Some(conteudo) = request.conteudo {
        active.conteudo = Set(conteudo);
    }
    if let Some(imagem_url) = request.imagem_url {
        active.imagem_url = Set(imagem_url);
    }
    if let Some(publicada) = request.publicada {
        active.publicada = Set(publicada);
        active.publicada_em = Set(publication_stamp(publicada, current_stamp, Utc::now()));
    }
    active.updated_at = Set(Utc::now().into());

    let noticia = repo.update(active).await?;
    tracing::info!(tenant_id = %auth.tenant_id, noticia_id = %id, publicada = noticia.publicada, "News post updated");
    Ok(ok(noticia))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.authorize(Role::Editor, WRITE)?;
    state
        .repo()
        .delete_scoped::<NoticiaEntity>(auth.tenant_id, id)
        .await?;
    tracing::info!(tenant_id = %auth.tenant_id, noticia_id = %id, "News post deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("Câmara aprova Orçamento de 2026!"),
            "camara-aprova-orcamento-de-2026"
        );
        assert_eq!(slugify("  Sessão   Solene  "), "sessao-solene");
        assert_eq!(slugify("???"), "noticia");
    }

    #[test]
    fn test_slug_is_bounded() {
        let slug = slugify(&"palavra ".repeat(40));
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }
}
