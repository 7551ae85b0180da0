//! Hostname → chamber (tenant) resolution
//!
//! Each municipal chamber is reached through its own host: either a custom
//! domain (`camara.cidade.gov.br`) or a subdomain of the shared base domain
//! (`cidade.plenario.app`). Resolution order:
//!
//! 1. `X-Tenant-Slug` header, when the deployment allows overrides
//! 2. exact custom-domain match
//! 3. the label right under `base_domain` taken as slug
//! 4. `default_tenant_slug`

mod cache;

pub use cache::TenantCache;

use crate::config::TenancyConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// The chamber a request belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTenant {
    pub id: Uuid,
    pub slug: String,
    pub nome: String,
    pub dominio: Option<String>,
    pub ativo: bool,
}

/// Where tenants are looked up on a cache miss
#[async_trait]
pub trait TenantSource: Send + Sync {
    async fn by_slug(&self, slug: &str) -> Result<Option<ResolvedTenant>>;
    async fn by_domain(&self, domain: &str) -> Result<Option<ResolvedTenant>>;
}

/// Lowercase, drop the port and a leading `www.`
pub fn normalize_host(host: &str) -> Option<String> {
    let host = host.trim().to_ascii_lowercase();
    // IPv6 literals keep their brackets, the port follows them
    let without_port = if let Some(rest) = host.strip_prefix('[') {
        rest.split(']').next().unwrap_or_default().to_string()
    } else {
        host.split(':').next().unwrap_or_default().to_string()
    };
    let without_port = without_port.trim_end_matches('.');
    let normalized = without_port.strip_prefix("www.").unwrap_or(without_port);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Slug encoded in a subdomain of `base_domain`, if any
pub fn subdomain_slug<'a>(host: &'a str, base_domain: &str) -> Option<&'a str> {
    let base = base_domain.trim_start_matches('.');
    let prefix = host.strip_suffix(base)?.strip_suffix('.')?;
    // left-most label names the tenant
    let slug = prefix.split('.').next()?;
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Resolves and caches the tenant for each request
#[derive(Clone)]
pub struct TenantResolver {
    source: Arc<dyn TenantSource>,
    cache: Arc<TenantCache>,
    config: TenancyConfig,
}

impl TenantResolver {
    pub fn new(source: Arc<dyn TenantSource>, config: TenancyConfig) -> Self {
        let cache = Arc::new(TenantCache::new(Duration::from_secs(config.cache_ttl_secs)));
        Self {
            source,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &TenantCache {
        &self.cache
    }

    /// Resolve from the Host header and an optional override slug
    pub async fn resolve(
        &self,
        host: Option<&str>,
        override_slug: Option<&str>,
    ) -> Result<ResolvedTenant> {
        let tenant = self.lookup(host, override_slug).await?;
        if !tenant.ativo {
            return Err(AppError::TenantInactive { slug: tenant.slug });
        }
        Ok(tenant)
    }

    async fn lookup(
        &self,
        host: Option<&str>,
        override_slug: Option<&str>,
    ) -> Result<ResolvedTenant> {
        if self.config.allow_header_override {
            if let Some(slug) = override_slug.map(str::trim).filter(|s| !s.is_empty()) {
                let slug = slug.to_ascii_lowercase();
                return self.cached_slug(&slug).await?.ok_or(AppError::TenantNotFound {
                    host: format!("slug {}", slug),
                });
            }
        }

        let host = host.and_then(normalize_host);
        let Some(host) = host else {
            return self.fallback("<missing host>").await;
        };

        let key = format!("host:{}", host);
        if let Some(tenant) = self.cache.get(&key) {
            return Ok(tenant);
        }

        let mut found = self.source.by_domain(&host).await?;
        if found.is_none() {
            if let Some(slug) = self
                .config
                .base_domain
                .as_deref()
                .and_then(|base| subdomain_slug(&host, base))
            {
                found = self.source.by_slug(slug).await?;
            }
        }

        match found {
            Some(tenant) => {
                debug!(host = %host, tenant = %tenant.slug, "Tenant resolved");
                self.cache.insert(&key, tenant.clone());
                Ok(tenant)
            }
            None => {
                let tenant = self.fallback(&host).await?;
                self.cache.insert(&key, tenant.clone());
                Ok(tenant)
            }
        }
    }

    async fn cached_slug(&self, slug: &str) -> Result<Option<ResolvedTenant>> {
        let key = format!("slug:{}", slug);
        if let Some(tenant) = self.cache.get(&key) {
            return Ok(Some(tenant));
        }
        let found = self.source.by_slug(slug).await?;
        if let Some(ref tenant) = found {
            self.cache.insert(&key, tenant.clone());
        }
        Ok(found)
    }

    async fn fallback(&self, host: &str) -> Result<ResolvedTenant> {
        let not_found = || AppError::TenantNotFound {
            host: host.to_string(),
        };
        let Some(slug) = self.config.default_tenant_slug.as_deref() else {
            warn!(host, "No tenant for host and no default configured");
            return Err(not_found());
        };
        debug!(host, default = slug, "Falling back to default tenant");
        self.cached_slug(slug).await?.ok_or_else(not_found)
    }

    /// Forget a tenant after it was edited
    pub fn invalidate(&self, tenant_id: Uuid) {
        self.cache.invalidate_tenant(tenant_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        tenants: Vec<ResolvedTenant>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TenantSource for StaticSource {
        async fn by_slug(&self, slug: &str) -> Result<Option<ResolvedTenant>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tenants.iter().find(|t| t.slug == slug).cloned())
        }

        async fn by_domain(&self, domain: &str) -> Result<Option<ResolvedTenant>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .tenants
                .iter()
                .find(|t| t.dominio.as_deref() == Some(domain))
                .cloned())
        }
    }

    fn tenant(slug: &str, dominio: Option<&str>, ativo: bool) -> ResolvedTenant {
        ResolvedTenant {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            nome: format!("Câmara Municipal de {}", slug),
            dominio: dominio.map(String::from),
            ativo,
        }
    }

    fn build(config: TenancyConfig) -> (TenantResolver, Arc<StaticSource>) {
        let source = Arc::new(StaticSource {
            tenants: vec![
                tenant("itapeva", Some("camaraitapeva.sp.gov.br"), true),
                tenant("ourinhos", None, true),
                tenant("fechada", None, false),
            ],
            calls: AtomicUsize::new(0),
        });
        (TenantResolver::new(source.clone(), config), source)
    }

    fn test_config() -> TenancyConfig {
        TenancyConfig {
            base_domain: Some("plenario.app".into()),
            default_tenant_slug: None,
            cache_ttl_secs: 300,
            allow_header_override: false,
        }
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("WWW.Camara.gov.br:8080").as_deref(), Some("camara.gov.br"));
        assert_eq!(normalize_host("localhost:3000").as_deref(), Some("localhost"));
        assert_eq!(normalize_host("[::1]:8080").as_deref(), Some("::1"));
        assert_eq!(normalize_host("camara.gov.br.").as_deref(), Some("camara.gov.br"));
        assert_eq!(normalize_host("  "), None);
    }

    #[test]
    fn test_subdomain_slug() {
        assert_eq!(subdomain_slug("ourinhos.plenario.app", "plenario.app"), Some("ourinhos"));
        assert_eq!(subdomain_slug("admin.ourinhos.plenario.app", "plenario.app"), Some("admin"));
        assert_eq!(subdomain_slug("www.ourinhos.plenario.app", "plenario.app"), Some("www"));
        assert_eq!(subdomain_slug("plenario.app", "plenario.app"), None);
        assert_eq!(subdomain_slug("xplenario.app", "plenario.app"), None);
    }

    #[tokio::test]
    async fn test_resolve_custom_domain_and_cache() {
        let (resolver, source) = build(test_config());
        let t = resolver.resolve(Some("www.camaraitapeva.sp.gov.br"), None).await.unwrap();
        assert_eq!(t.slug, "itapeva");
        let calls = source.calls.load(Ordering::SeqCst);

        let again = resolver.resolve(Some("camaraitapeva.sp.gov.br:443"), None).await.unwrap();
        assert_eq!(again, t);
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_resolve_subdomain() {
        let (resolver, _) = build(test_config());
        let t = resolver.resolve(Some("ourinhos.plenario.app"), None).await.unwrap();
        assert_eq!(t.slug, "ourinhos");
    }

    #[tokio::test]
    async fn test_unknown_host_without_default() {
        let (resolver, _) = build(test_config());
        let err = resolver.resolve(Some("nada.example.com"), None).await.unwrap_err();
        assert!(matches!(err, AppError::TenantNotFound { .. }));
        // misses are not cached
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_default_tenant_fallback() {
        let mut cfg = test_config();
        cfg.default_tenant_slug = Some("ourinhos".into());
        let (resolver, _) = build(cfg);
        assert_eq!(resolver.resolve(Some("localhost:3000"), None).await.unwrap().slug, "ourinhos");
        assert_eq!(resolver.resolve(None, None).await.unwrap().slug, "ourinhos");
    }

    #[tokio::test]
    async fn test_inactive_tenant_is_forbidden() {
        let (resolver, _) = build(test_config());
        let err = resolver.resolve(Some("fechada.plenario.app"), None).await.unwrap_err();
        assert!(matches!(err, AppError::TenantInactive { .. }));
    }

    #[tokio::test]
    async fn test_header_override_only_when_enabled() {
        let (resolver, _) = build(test_config());
        let t = resolver.resolve(Some("ourinhos.plenario.app"), Some("itapeva")).await.unwrap();
        assert_eq!(t.slug, "ourinhos");

        let mut cfg = test_config();
        cfg.allow_header_override = true;
        let (resolver, _) = build(cfg);
        let t = resolver.resolve(Some("ourinhos.plenario.app"), Some("Itapeva")).await.unwrap();
        assert_eq!(t.slug, "itapeva");
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let (resolver, source) = build(test_config());
        let t = resolver.resolve(Some("ourinhos.plenario.app"), None).await.unwrap();
        let calls = source.calls.load(Ordering::SeqCst);

        resolver.invalidate(t.id);
        resolver.resolve(Some("ourinhos.plenario.app"), None).await.unwrap();
        assert!(source.calls.load(Ordering::SeqCst) > calls);
    }
}
