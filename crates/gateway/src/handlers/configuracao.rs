//! Per-chamber session title templates

use axum::{extract::State, Json};
use chrono::{Datelike, NaiveDate, Utc};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::ConfiguracaoNomenclatura,
    errors::{AppError, Result},
    legislative::{
        nomenclature::{Template, TitleContext},
        ProposicaoTipo, SequenceKey, SessaoTipo,
    },
    response::ApiResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ok, parse_label, sessoes::legislatura_for};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NomenclaturaTipo {
    pub tipo: SessaoTipo,
    pub template: String,
    /// False when the built-in default applies
    pub personalizado: bool,
    /// Title the template renders for the first session of the current year
    pub exemplo: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NomenclaturaRequest {
    pub tipo: String,

    #[validate(length(min = 1, max = 200))]
    pub template: String,
}

/// Administrative correction of a numbering counter
#[derive(Debug, Deserialize, Validate)]
pub struct SequenciaRequest {
    /// `SESSAO` or `PROPOSICAO`
    pub escopo: String,

    /// Session or bill type
    pub tipo: String,

    /// Session counters only; defaults to the legislature covering `ano`
    pub legislatura_id: Option<Uuid>,

    #[validate(range(min = 1900, max = 2200))]
    pub ano: i32,

    /// Last number already used; the next allocation returns `valor + 1`
    #[validate(range(min = 0))]
    pub valor: i64,
}

#[derive(Debug, Serialize)]
pub struct SequenciaResponse {
    pub escopo: String,
    pub legislatura: i32,
    pub ano: i32,
    pub valor: i64,
    pub proximo: i64,
}

fn exemplo(template: &Template, tipo: SessaoTipo, ano: i32) -> String {
    template.render(&TitleContext {
        numero: 1,
        tipo,
        ano,
        legislatura_numero: 1,
        legislatura_inicio: ano,
    })
}

/// One entry per session type; stored templates that no longer parse fall back
fn describe(stored: &[ConfiguracaoNomenclatura], ano: i32) -> Vec<NomenclaturaTipo> {
    SessaoTipo::ALL
        .iter()
        .map(|&tipo| {
            let custom = stored
                .iter()
                .find(|c| c.tipo_sessao == tipo.as_str())
                .and_then(|c| Template::parse(&c.template).ok());
            let personalizado = custom.is_some();
            let template = custom.unwrap_or_else(|| Template::default_for(tipo));
            NomenclaturaTipo {
                tipo,
                template: template.as_str().to_string(),
                personalizado,
                exemplo: exemplo(&template, tipo, ano),
            }
        })
        .collect()
}

pub async fn get_nomenclatura(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<NomenclaturaTipo>>>> {
    auth.authorize(Role::Secretaria, "configuracao:read")?;
    let stored = state.repo().list_templates(auth.tenant_id).await?;
    Ok(ok(describe(&stored, Utc::now().year())))
}

pub async fn put_nomenclatura(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<NomenclaturaRequest>,
) -> Result<Json<ApiResponse<NomenclaturaTipo>>> {
    auth.require_role(Role::Admin)?;
    request.validate()?;
    let tipo: SessaoTipo = parse_label("tipo", &request.tipo)?;
    let template = Template::parse(request.template.trim())?;

    state
        .repo()
        .upsert_template(auth.tenant_id, tipo.as_str(), template.as_str())
        .await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        tipo = %tipo,
        template = %template.as_str(),
        "Session title template updated"
    );
    Ok(ok(NomenclaturaTipo {
        tipo,
        template: template.as_str().to_string(),
        personalizado: true,
        exemplo: exemplo(&template, tipo, Utc::now().year()),
    }))
}

pub async fn put_sequencia(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<SequenciaRequest>,
) -> Result<Json<ApiResponse<SequenciaResponse>>> {
    auth.require_role(Role::Admin)?;
    request.validate()?;

    let key = match request.escopo.trim() {
        "SESSAO" => {
            let tipo: SessaoTipo = parse_label("tipo", &request.tipo)?;
            let inicio_do_ano = NaiveDate::from_ymd_opt(request.ano, 1, 1)
                .ok_or_else(|| AppError::invalid_field("ano", "invalid year"))?;
            let legislatura =
                legislatura_for(&state.repo(), auth.tenant_id, request.legislatura_id, inicio_do_ano)
                    .await?;
            SequenceKey::sessao(auth.tenant_id, tipo, legislatura.numero, request.ano)
        }
        "PROPOSICAO" => {
            let tipo: ProposicaoTipo = parse_label("tipo", &request.tipo)?;
            SequenceKey::proposicao(auth.tenant_id, tipo, request.ano)
        }
        _ => {
            return Err(AppError::invalid_field(
                "escopo",
                "escopo must be SESSAO or PROPOSICAO",
            ))
        }
    };

    state.nomenclature.reset(&key, request.valor).await?;
    tracing::warn!(
        tenant_id = %auth.tenant_id,
        escopo = %key.escopo,
        legislatura = key.legislatura,
        ano = key.ano,
        valor = request.valor,
        "Numbering counter reset"
    );

    Ok(ok(SequenciaResponse {
        escopo: key.escopo,
        legislatura: key.legislatura,
        ano: key.ano,
        valor: request.valor,
        proximo: request.valor + 1,
    }))
}
