//! Session and bill numbering
//!
//! Titles are rendered from per-chamber templates such as
//! `{ordinal} Sessão {tipo} de {ano}`. The number comes from a counter keyed
//! by `(tenant, tipo, legislatura, ano)` held by a [`SequenceStore`].
//!
//! Supported placeholders:
//!
//! | placeholder | value |
//! |---|---|
//! | `{numero}` | sequence number |
//! | `{numero:N}` | sequence number zero-padded to N digits |
//! | `{ordinal}` | `1ª`, `2ª`, ... |
//! | `{tipo}` | session type label (`Ordinária`) |
//! | `{ano}` | calendar year of the session |
//! | `{legislatura}` | legislature number |
//! | `{sessao_legislativa}` | year inside the legislature, starting at 1 |

use crate::errors::{AppError, Result};
use crate::legislative::types::{ProposicaoTipo, SessaoTipo};
use async_trait::async_trait;
use dashmap::DashMap;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Widest zero padding accepted by `{numero:N}`
const MAX_PADDING: usize = 6;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{([a-z_]+)(?::(\d+))?\}").expect("placeholder pattern is valid")
    })
}

/// One piece of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Numero { width: Option<usize> },
    Ordinal,
    Tipo,
    Ano,
    Legislatura,
    SessaoLegislativa,
}

/// A validated title template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct TitleContext {
    pub numero: i64,
    pub tipo: SessaoTipo,
    pub ano: i32,
    pub legislatura_numero: i32,
    /// Calendar year the legislature started
    pub legislatura_inicio: i32,
}

impl Template {
    /// Parse and validate a template
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(AppError::InvalidTemplate {
                message: "template is empty".to_string(),
            });
        }

        let mut segments = Vec::new();
        let mut last = 0;
        let mut has_numero = false;

        for caps in placeholder_regex().captures_iter(source) {
            let whole = caps.get(0).expect("group 0 always matches");
            push_literal(&mut segments, &source[last..whole.start()])?;
            last = whole.end();

            let name = &caps[1];
            let width = caps.get(2).map(|m| m.as_str());
            let segment = match (name, width) {
                ("numero", None) => Segment::Numero { width: None },
                ("numero", Some(w)) => {
                    let width: usize = w.parse().map_err(|_| AppError::InvalidTemplate {
                        message: format!("invalid padding in {}", whole.as_str()),
                    })?;
                    if width == 0 || width > MAX_PADDING {
                        return Err(AppError::InvalidTemplate {
                            message: format!("padding must be between 1 and {}", MAX_PADDING),
                        });
                    }
                    Segment::Numero { width: Some(width) }
                }
                ("ordinal", None) => Segment::Ordinal,
                ("tipo", None) => Segment::Tipo,
                ("ano", None) => Segment::Ano,
                ("legislatura", None) => Segment::Legislatura,
                ("sessao_legislativa", None) => Segment::SessaoLegislativa,
                _ => {
                    return Err(AppError::InvalidTemplate {
                        message: format!("unknown placeholder {}", whole.as_str()),
                    })
                }
            };
            has_numero |= matches!(segment, Segment::Numero { .. } | Segment::Ordinal);
            segments.push(segment);
        }
        push_literal(&mut segments, &source[last..])?;

        if !has_numero {
            return Err(AppError::InvalidTemplate {
                message: "template must contain {numero} or {ordinal}".to_string(),
            });
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Default template for a session type
    pub fn default_for(tipo: SessaoTipo) -> Self {
        let source = match tipo {
            SessaoTipo::Ordinaria | SessaoTipo::Extraordinaria => "{ordinal} Sessão {tipo} de {ano}",
            SessaoTipo::Solene | SessaoTipo::Especial => "{ordinal} Sessão {tipo} da {legislatura}ª Legislatura",
        };
        Self::parse(source).expect("built-in templates are valid")
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute every placeholder
    pub fn render(&self, ctx: &TitleContext) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Numero { width: None } => out.push_str(&ctx.numero.to_string()),
                Segment::Numero { width: Some(w) } => {
                    out.push_str(&format!("{:0width$}", ctx.numero, width = *w))
                }
                Segment::Ordinal => out.push_str(&ordinal(ctx.numero)),
                Segment::Tipo => out.push_str(ctx.tipo.label()),
                Segment::Ano => out.push_str(&ctx.ano.to_string()),
                Segment::Legislatura => out.push_str(&ctx.legislatura_numero.to_string()),
                Segment::SessaoLegislativa => out.push_str(
                    &sessao_legislativa(ctx.legislatura_inicio, ctx.ano).to_string(),
                ),
            }
        }
        out
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) -> Result<()> {
    if text.contains('{') || text.contains('}') {
        return Err(AppError::InvalidTemplate {
            message: format!("unbalanced or malformed placeholder near '{}'", text),
        });
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

/// Feminine ordinal, matching "Sessão"
pub fn ordinal(n: i64) -> String {
    format!("{}ª", n)
}

/// 1-based year of the legislature the session falls in
pub fn sessao_legislativa(legislatura_inicio: i32, ano: i32) -> i32 {
    (ano - legislatura_inicio + 1).max(1)
}

/// Counter identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    pub tenant_id: Uuid,
    /// `sessao:ORDINARIA`, `proposicao:PL`, ...
    pub escopo: String,
    /// Legislature number, 0 for counters that only reset yearly
    pub legislatura: i32,
    pub ano: i32,
}

impl SequenceKey {
    pub fn sessao(tenant_id: Uuid, tipo: SessaoTipo, legislatura: i32, ano: i32) -> Self {
        Self {
            tenant_id,
            escopo: format!("sessao:{}", tipo.as_str()),
            legislatura,
            ano,
        }
    }

    pub fn proposicao(tenant_id: Uuid, tipo: ProposicaoTipo, ano: i32) -> Self {
        Self {
            tenant_id,
            escopo: format!("proposicao:{}", tipo.as_str()),
            legislatura: 0,
            ano,
        }
    }
}

/// Storage for numbering counters
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Allocate and return the next value
    async fn next(&self, key: &SequenceKey) -> Result<i64>;

    /// The value `next` would return, without allocating it
    async fn peek(&self, key: &SequenceKey) -> Result<i64>;

    /// Set the last allocated value
    async fn set(&self, key: &SequenceKey, value: i64) -> Result<()>;
}

/// Process-local counters for tests and single-node development
#[derive(Debug, Default, Clone)]
pub struct InMemorySequenceStore {
    counters: Arc<DashMap<SequenceKey, i64>>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn next(&self, key: &SequenceKey) -> Result<i64> {
        let mut entry = self.counters.entry(key.clone()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn peek(&self, key: &SequenceKey) -> Result<i64> {
        Ok(self.counters.get(key).map(|v| *v).unwrap_or(0) + 1)
    }

    async fn set(&self, key: &SequenceKey, value: i64) -> Result<()> {
        if value < 0 {
            return Err(AppError::invalid_field("valor", "sequence value cannot be negative"));
        }
        self.counters.insert(key.clone(), value);
        Ok(())
    }
}

/// Legislature data needed to number a session
#[derive(Debug, Clone, Copy)]
pub struct LegislaturaRef {
    pub numero: i32,
    pub ano_inicio: i32,
}

/// A numbered session title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberedTitle {
    pub numero: i64,
    pub titulo: String,
}

/// Combines a counter store with templates
pub struct NomenclatureService<S: SequenceStore + ?Sized> {
    store: Arc<S>,
}

impl<S: SequenceStore + ?Sized> Clone for NomenclatureService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: SequenceStore + ?Sized> NomenclatureService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn context(numero: i64, tipo: SessaoTipo, legislatura: LegislaturaRef, ano: i32) -> TitleContext {
        TitleContext {
            numero,
            tipo,
            ano,
            legislatura_numero: legislatura.numero,
            legislatura_inicio: legislatura.ano_inicio,
        }
    }

    /// Allocate the next number for a session and render its title
    pub async fn next_session_title(
        &self,
        tenant_id: Uuid,
        tipo: SessaoTipo,
        legislatura: LegislaturaRef,
        ano: i32,
        template: &Template,
    ) -> Result<NumberedTitle> {
        let key = SequenceKey::sessao(tenant_id, tipo, legislatura.numero, ano);
        let numero = self.store.next(&key).await?;
        let titulo = template.render(&Self::context(numero, tipo, legislatura, ano));

        tracing::debug!(tenant_id = %tenant_id, escopo = %key.escopo, numero, "Session number allocated");
        crate::metrics::record_session_numbered(tipo.as_str());

        Ok(NumberedTitle { numero, titulo })
    }

    /// Title the next session would receive
    pub async fn preview_session_title(
        &self,
        tenant_id: Uuid,
        tipo: SessaoTipo,
        legislatura: LegislaturaRef,
        ano: i32,
        template: &Template,
    ) -> Result<NumberedTitle> {
        let key = SequenceKey::sessao(tenant_id, tipo, legislatura.numero, ano);
        let numero = self.store.peek(&key).await?;
        Ok(NumberedTitle {
            numero,
            titulo: template.render(&Self::context(numero, tipo, legislatura, ano)),
        })
    }

    /// Allocate the next bill number for a type and year
    pub async fn next_proposicao_numero(
        &self,
        tenant_id: Uuid,
        tipo: ProposicaoTipo,
        ano: i32,
    ) -> Result<i32> {
        let key = SequenceKey::proposicao(tenant_id, tipo, ano);
        let numero = self.store.next(&key).await?;
        i32::try_from(numero).map_err(|_| AppError::Internal {
            message: format!("bill counter overflow for {}", key.escopo),
        })
    }

    /// Administrative reset of a counter
    pub async fn reset(&self, key: &SequenceKey, value: i64) -> Result<()> {
        self.store.set(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(numero: i64) -> TitleContext {
        TitleContext {
            numero,
            tipo: SessaoTipo::Ordinaria,
            ano: 2026,
            legislatura_numero: 19,
            legislatura_inicio: 2025,
        }
    }

    #[test]
    fn test_render_all_placeholders() {
        let t = Template::parse(
            "{numero:3} - {ordinal} Sessão {tipo} ({sessao_legislativa}º ano da {legislatura}ª legislatura, {ano})",
        )
        .unwrap();
        assert_eq!(
            t.render(&ctx(7)),
            "007 - 7ª Sessão Ordinária (2º ano da 19ª legislatura, 2026)"
        );
    }

    #[test]
    fn test_default_templates() {
        assert_eq!(
            Template::default_for(SessaoTipo::Ordinaria).render(&ctx(12)),
            "12ª Sessão Ordinária de 2026"
        );
        let mut c = ctx(1);
        c.tipo = SessaoTipo::Solene;
        assert_eq!(
            Template::default_for(SessaoTipo::Solene).render(&c),
            "1ª Sessão Solene da 19ª Legislatura"
        );
    }

    #[test]
    fn test_rejects_unknown_placeholder() {
        let err = Template::parse("{numero} {presidente}").unwrap_err();
        assert!(err.to_string().contains("{presidente}"));
    }

    #[test]
    fn test_rejects_unbalanced_braces() {
        assert!(Template::parse("{numero} Sessão {tipo").is_err());
        assert!(Template::parse("{numero}} Sessão").is_err());
    }

    #[test]
    fn test_requires_number() {
        assert!(Template::parse("Sessão {tipo} de {ano}").is_err());
        assert!(Template::parse("Sessão {numero:0}").is_err());
        assert!(Template::parse("Sessão {numero:9}").is_err());
    }

    #[test]
    fn test_sessao_legislativa_floor() {
        assert_eq!(sessao_legislativa(2025, 2025), 1);
        assert_eq!(sessao_legislativa(2025, 2028), 4);
        assert_eq!(sessao_legislativa(2025, 2020), 1);
    }

    #[tokio::test]
    async fn test_counters_are_independent_per_key() {
        let service = NomenclatureService::new(Arc::new(InMemorySequenceStore::new()));
        let tenant = Uuid::new_v4();
        let leg = LegislaturaRef { numero: 19, ano_inicio: 2025 };
        let template = Template::default_for(SessaoTipo::Ordinaria);

        let first = service
            .next_session_title(tenant, SessaoTipo::Ordinaria, leg, 2026, &template)
            .await
            .unwrap();
        let second = service
            .next_session_title(tenant, SessaoTipo::Ordinaria, leg, 2026, &template)
            .await
            .unwrap();
        assert_eq!(first.numero, 1);
        assert_eq!(second.titulo, "2ª Sessão Ordinária de 2026");

        // new year restarts the count
        let next_year = service
            .next_session_title(tenant, SessaoTipo::Ordinaria, leg, 2027, &template)
            .await
            .unwrap();
        assert_eq!(next_year.numero, 1);

        // other type, other tenant
        let extra = service
            .next_session_title(tenant, SessaoTipo::Extraordinaria, leg, 2026, &template)
            .await
            .unwrap();
        assert_eq!(extra.numero, 1);
        let other = service
            .next_session_title(Uuid::new_v4(), SessaoTipo::Ordinaria, leg, 2026, &template)
            .await
            .unwrap();
        assert_eq!(other.numero, 1);
    }

    #[tokio::test]
    async fn test_preview_does_not_allocate() {
        let service = NomenclatureService::new(Arc::new(InMemorySequenceStore::new()));
        let tenant = Uuid::new_v4();
        let leg = LegislaturaRef { numero: 19, ano_inicio: 2025 };
        let template = Template::default_for(SessaoTipo::Ordinaria);

        for _ in 0..2 {
            let preview = service
                .preview_session_title(tenant, SessaoTipo::Ordinaria, leg, 2026, &template)
                .await
                .unwrap();
            assert_eq!(preview.numero, 1);
        }
        let allocated = service
            .next_session_title(tenant, SessaoTipo::Ordinaria, leg, 2026, &template)
            .await
            .unwrap();
        assert_eq!(allocated.numero, 1);
    }

    #[tokio::test]
    async fn test_reset_and_bill_numbers() {
        let store = Arc::new(InMemorySequenceStore::new());
        let service = NomenclatureService::new(store.clone());
        let tenant = Uuid::new_v4();

        let key = SequenceKey::proposicao(tenant, ProposicaoTipo::ProjetoLei, 2026);
        service.reset(&key, 41).await.unwrap();
        assert_eq!(
            service
                .next_proposicao_numero(tenant, ProposicaoTipo::ProjetoLei, 2026)
                .await
                .unwrap(),
            42
        );
        assert_eq!(
            service
                .next_proposicao_numero(tenant, ProposicaoTipo::Requerimento, 2026)
                .await
                .unwrap(),
            1
        );
        assert!(store.set(&key, -1).await.is_err());
    }
}
