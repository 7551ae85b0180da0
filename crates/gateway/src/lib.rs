//! Plenário API Gateway
//!
//! The HTTP surface of the chamber portal. Every request is bound to a
//! chamber (tenant) resolved from its host; writes additionally require a
//! staff JWT or an integration token.

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use plenario_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{DbPool, DbTenantSource, PgSequenceStore, Repository},
    legislative::{NomenclatureService, SequenceStore},
    tenancy::{TenantResolver, TenantSource},
};
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use middleware::{
    metrics::track_metrics,
    rate_limit::{login_rate_limit, LoginRateLimiter},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub tenants: TenantResolver,
    pub jwt: Arc<JwtManager>,
    pub nomenclature: NomenclatureService<dyn SequenceStore>,
    pub login_limiter: Arc<LoginRateLimiter>,
    /// Absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State backed entirely by the database
    pub fn new(config: Arc<AppConfig>, db: DbPool) -> Self {
        let source: Arc<dyn TenantSource> =
            Arc::new(DbTenantSource::new(Repository::new(db.clone())));
        let sequences: Arc<dyn SequenceStore> = Arc::new(PgSequenceStore::new(db.clone()));
        Self::with_sources(config, db, source, sequences)
    }

    /// State with explicit tenant and counter backends
    pub fn with_sources(
        config: Arc<AppConfig>,
        db: DbPool,
        tenant_source: Arc<dyn TenantSource>,
        sequences: Arc<dyn SequenceStore>,
    ) -> Self {
        let jwt = Arc::new(JwtManager::new(
            config.jwt_secret(),
            config.auth.jwt_expiration_secs,
            config.auth.two_factor_challenge_secs,
        ));
        let tenants = TenantResolver::new(tenant_source, config.tenancy.clone());
        let login_limiter = Arc::new(LoginRateLimiter::new(&config.rate_limit));

        Self {
            config,
            db,
            tenants,
            jwt,
            nomenclature: NomenclatureService::new(sequences),
            login_limiter,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn repo(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    use handlers::*;

    let cors = cors_layer(&state.config.server.cors_origins);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let login = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/2fa/verify", post(auth::verify_two_factor))
        .route_layer(from_fn_with_state(state.clone(), login_rate_limit));

    let api_routes = Router::new()
        .merge(login)
        // Authentication
        .route("/auth/me", get(auth::me))
        .route("/auth/2fa/setup", post(auth::setup_two_factor))
        .route("/auth/2fa/enable", post(auth::enable_two_factor))
        .route("/auth/2fa/disable", post(auth::disable_two_factor))
        // Staff accounts and integrations
        .route("/usuarios", get(usuarios::list).post(usuarios::create))
        .route(
            "/usuarios/{id}",
            get(usuarios::get).put(usuarios::update).delete(usuarios::remove),
        )
        .route("/tokens", get(tokens::list).post(tokens::create))
        .route("/tokens/{id}", delete(tokens::revoke))
        .route("/tenants", get(tenants::list).post(tenants::create))
        .route("/tenants/{id}", put(tenants::update))
        // Members and terms
        .route("/parlamentares", get(parlamentares::list).post(parlamentares::create))
        .route(
            "/parlamentares/{id}",
            get(parlamentares::get)
                .put(parlamentares::update)
                .delete(parlamentares::remove),
        )
        .route("/legislaturas", get(legislaturas::list).post(legislaturas::create))
        .route(
            "/legislaturas/{id}",
            get(legislaturas::get)
                .put(legislaturas::update)
                .delete(legislaturas::remove),
        )
        // Sessions, agenda and voting
        .route("/sessoes", get(sessoes::list).post(sessoes::create))
        .route("/sessoes/nomenclatura/preview", get(sessoes::preview_title))
        .route(
            "/sessoes/{id}",
            get(sessoes::get).put(sessoes::update).delete(sessoes::remove),
        )
        .route("/sessoes/{id}/status", post(sessoes::change_status))
        .route("/sessoes/{id}/pauta", get(pauta::list).post(pauta::create))
        .route("/sessoes/{id}/presencas", get(presencas::list).post(presencas::record))
        .route("/pauta/{id}", put(pauta::update).delete(pauta::remove))
        .route("/pauta/{id}/status", post(pauta::change_status))
        .route("/pauta/{id}/votos", get(votacao::list_votes).post(votacao::cast_vote))
        .route("/pauta/{id}/encerrar", post(votacao::close))
        .route("/pauta/{id}/apuracao", get(votacao::apuracao))
        // Bills, committees, norms
        .route("/proposicoes", get(proposicoes::list).post(proposicoes::create))
        .route(
            "/proposicoes/{id}",
            get(proposicoes::get)
                .put(proposicoes::update)
                .delete(proposicoes::remove),
        )
        .route("/comissoes", get(comissoes::list).post(comissoes::create))
        .route(
            "/comissoes/{id}",
            get(comissoes::get).put(comissoes::update).delete(comissoes::remove),
        )
        .route(
            "/comissoes/{id}/membros",
            get(comissoes::list_membros).post(comissoes::add_membro),
        )
        .route(
            "/comissoes/{id}/membros/{membro_id}",
            delete(comissoes::remove_membro),
        )
        .route(
            "/comissoes/{id}/reunioes",
            get(comissoes::list_reunioes).post(comissoes::create_reuniao),
        )
        .route("/reunioes/{id}", put(comissoes::update_reuniao))
        .route("/normas", get(normas::list).post(normas::create))
        .route(
            "/normas/{id}",
            get(normas::get).put(normas::update).delete(normas::remove),
        )
        // Transparency and news
        .route("/publicacoes", get(publicacoes::list).post(publicacoes::create))
        .route(
            "/publicacoes/{id}",
            get(publicacoes::get)
                .put(publicacoes::update)
                .delete(publicacoes::remove),
        )
        .route("/noticias", get(noticias::list).post(noticias::create))
        .route(
            "/noticias/{id}",
            get(noticias::get).put(noticias::update).delete(noticias::remove),
        )
        // Citizen participation
        .route("/consultas", get(participacao::list_consultas).post(participacao::create_consulta))
        .route(
            "/consultas/{id}",
            get(participacao::get_consulta)
                .put(participacao::update_consulta)
                .delete(participacao::remove_consulta),
        )
        .route("/consultas/{id}/opinioes", post(participacao::submit_opiniao))
        .route("/consultas/{id}/resultado", get(participacao::resultado))
        .route(
            "/sugestoes",
            get(participacao::list_sugestoes).post(participacao::submit_sugestao),
        )
        .route("/sugestoes/{id}/status", put(participacao::moderate_sugestao))
        // Scheduled reports
        .route("/relatorios", get(relatorios::list).post(relatorios::create))
        .route("/relatorios/{id}", put(relatorios::update).delete(relatorios::remove))
        .route("/relatorios/{id}/execucoes", get(relatorios::list_execucoes))
        // Configuration
        .route(
            "/configuracao/nomenclatura",
            get(configuracao::get_nomenclatura).put(configuracao::put_nomenclatura),
        )
        .route("/configuracao/sequencias", put(configuracao::put_sequencia));

    let timeout = state.config.request_timeout();
    let max_concurrent = state.config.server.max_concurrent_requests;

    // Compose the app
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics))
        .nest("/api", api_routes)
        .route_layer(from_fn(track_metrics))
        .layer(TimeoutLayer::new(timeout))
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        HeaderName::from_static("x-integration-token"),
        HeaderName::from_static("x-tenant-slug"),
        HeaderName::from_static("x-request-id"),
    ];
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(allowed_headers)
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
