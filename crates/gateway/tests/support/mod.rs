//! Router harness shared by the integration suites
//!
//! Cases decided before any query run against a disconnected handle. Routes
//! that reach the repository get a `MockDatabase` loaded with the rows the
//! handler reads, and the statements it issued are inspected afterwards.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use plenario_common::{
    auth::Role,
    config::AppConfig,
    db::models::{Parlamentar, PautaItem, Sessao, Usuario, Voto},
    db::DbPool,
    errors::Result,
    legislative::{InMemorySequenceStore, SequenceStore},
    tenancy::{ResolvedTenant, TenantSource},
};
use plenario_gateway::{create_router, AppState};
use sea_orm::{
    prelude::DateTimeWithTimeZone, DatabaseBackend, DatabaseConnection, MockDatabase,
    MockExecResult, Value,
};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_test::assert_ok;
use uuid::Uuid;

pub const HOST_HEADER: &str = "x-forwarded-host";
pub const OURINHOS: &str = "ourinhos.plenario.test";

pub struct StaticTenants(Vec<ResolvedTenant>);

#[async_trait]
impl TenantSource for StaticTenants {
    async fn by_slug(&self, slug: &str) -> Result<Option<ResolvedTenant>> {
        Ok(self.0.iter().find(|t| t.slug == slug).cloned())
    }

    async fn by_domain(&self, domain: &str) -> Result<Option<ResolvedTenant>> {
        Ok(self
            .0
            .iter()
            .find(|t| t.dominio.as_deref() == Some(domain))
            .cloned())
    }
}

pub fn chamber(slug: &str, ativo: bool) -> ResolvedTenant {
    ResolvedTenant {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        nome: format!("Câmara Municipal de {}", slug),
        dominio: None,
        ativo,
    }
}

/// The chambers every harness serves; `extinta` is inactive
#[derive(Clone)]
pub struct Chambers {
    pub ourinhos: ResolvedTenant,
    pub marilia: ResolvedTenant,
}

impl Chambers {
    pub fn new() -> Self {
        Self {
            ourinhos: chamber("ourinhos", true),
            marilia: chamber("marilia", true),
        }
    }
}

pub struct Harness {
    pub server: TestServer,
    pub state: AppState,
    pub ourinhos: ResolvedTenant,
    pub marilia: ResolvedTenant,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(Chambers::new(), DatabaseConnection::Disconnected, tweak)
    }

    /// Harness whose repository answers from `db`
    pub fn with_database(chambers: &Chambers, db: DatabaseConnection) -> Self {
        Self::build(chambers.clone(), db, |_| {})
    }

    pub fn build(
        chambers: Chambers,
        db: DatabaseConnection,
        tweak: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let mut config = AppConfig::default();
        config.tenancy.base_domain = Some("plenario.test".to_string());
        config.observability.metrics_enabled = false;
        tweak(&mut config);

        let Chambers { ourinhos, marilia } = chambers;
        let tenants = StaticTenants(vec![ourinhos.clone(), marilia.clone(), chamber("extinta", false)]);
        let sequences: Arc<dyn SequenceStore> = Arc::new(InMemorySequenceStore::new());

        let state = AppState::with_sources(
            Arc::new(config),
            DbPool::from_connection(db),
            Arc::new(tenants),
            sequences,
        );
        let server = assert_ok!(TestServer::new(create_router(state.clone())));

        Self {
            server,
            state,
            ourinhos,
            marilia,
        }
    }

    pub fn token(&self, tenant: &ResolvedTenant, role: Role) -> String {
        self.token_for(Uuid::new_v4(), tenant, role)
    }

    pub fn token_for(&self, user_id: Uuid, tenant: &ResolvedTenant, role: Role) -> String {
        self.state.jwt.issue_access(user_id, tenant.id, role).unwrap()
    }
}

pub fn error_code(body: &Json) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

// ============================================================================
// Mock database
// ============================================================================

pub fn mock() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

/// Result row of a `COUNT(*)` query
pub fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
}

pub fn affected(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

/// Every statement the handlers ran, values inlined
pub fn statements(db: DatabaseConnection) -> Vec<String> {
    db.into_transaction_log()
        .iter()
        .flat_map(|t| t.statements())
        .map(|s| s.to_string())
        .collect()
}

pub fn ran(log: &[String], needle: &str) -> bool {
    log.iter().any(|s| s.contains(needle))
}

// ============================================================================
// Rows
// ============================================================================

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

pub fn usuario(tenant: &ResolvedTenant, role: Role) -> Usuario {
    Usuario {
        id: Uuid::new_v4(),
        tenant_id: tenant.id,
        nome: "Ana Lúcia Prado".to_string(),
        email: "ana@ourinhos.sp.gov.br".to_string(),
        senha_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        role: role.to_string(),
        ativo: true,
        totp_secret: None,
        totp_enabled: false,
        totp_ultimo_passo: None,
        parlamentar_id: None,
        ultimo_login_em: None,
        created_at: now(),
        updated_at: now(),
    }
}

pub fn sessao(tenant: &ResolvedTenant, status: &str) -> Sessao {
    Sessao {
        id: Uuid::new_v4(),
        tenant_id: tenant.id,
        legislatura_id: Uuid::new_v4(),
        tipo: "ORDINARIA".to_string(),
        numero: 7,
        titulo: "7ª Sessão Ordinária de 2026".to_string(),
        data: now(),
        local: Some("Plenário Vereador João Batista".to_string()),
        status: status.to_string(),
        iniciada_em: None,
        encerrada_em: None,
        observacoes: None,
        created_at: now(),
        updated_at: now(),
    }
}

pub fn pauta_item(sessao: &Sessao, status: &str, proposicao_id: Option<Uuid>) -> PautaItem {
    PautaItem {
        id: Uuid::new_v4(),
        tenant_id: sessao.tenant_id,
        sessao_id: sessao.id,
        proposicao_id,
        ordem: 1,
        descricao: "Projeto de Lei nº 12/2026".to_string(),
        status: status.to_string(),
        quorum: "MAIORIA_SIMPLES".to_string(),
        apuracao: None,
        resultado: None,
        created_at: now(),
        updated_at: now(),
    }
}

pub fn parlamentar(tenant: &ResolvedTenant, ativo: bool) -> Parlamentar {
    Parlamentar {
        id: Uuid::new_v4(),
        tenant_id: tenant.id,
        nome: "Carlos Eduardo Nogueira".to_string(),
        nome_parlamentar: "Cadu Nogueira".to_string(),
        partido: Some("PSB".to_string()),
        email: None,
        telefone: None,
        foto_url: None,
        biografia: None,
        cargo_mesa: None,
        ativo,
        created_at: now(),
        updated_at: now(),
    }
}

pub fn voto(item: &PautaItem, opcao: &str) -> Voto {
    Voto {
        id: Uuid::new_v4(),
        tenant_id: item.tenant_id,
        pauta_item_id: item.id,
        parlamentar_id: Uuid::new_v4(),
        opcao: opcao.to_string(),
        registrado_em: now(),
        registrado_por: None,
    }
}
