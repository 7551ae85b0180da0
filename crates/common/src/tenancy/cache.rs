//! In-memory TTL cache of resolved tenants

use super::ResolvedTenant;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct CacheEntry {
    tenant: ResolvedTenant,
    expires_at: Instant,
}

/// Host → tenant map with a fixed time-to-live.
///
/// Only successful lookups are stored. Entries expire lazily on read and
/// can be dropped early when a tenant changes.
#[derive(Debug)]
pub struct TenantCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl TenantCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<ResolvedTenant> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<ResolvedTenant> {
        let hit = self.entries.get(key).map(|e| (e.tenant.clone(), e.expires_at));
        match hit {
            Some((tenant, expires_at)) if expires_at > now => {
                crate::metrics::record_cache(true, "tenant");
                Some(tenant)
            }
            Some(_) => {
                self.evict_expired(key, now);
                debug!(key, "Tenant cache entry expired");
                crate::metrics::record_cache(false, "tenant");
                None
            }
            None => {
                crate::metrics::record_cache(false, "tenant");
                None
            }
        }
    }

    // a concurrent insert may have refreshed the entry since it was read
    fn evict_expired(&self, key: &str, now: Instant) -> bool {
        self.entries.remove_if(key, |_, e| e.expires_at <= now).is_some()
    }

    pub fn insert(&self, key: &str, tenant: ResolvedTenant) {
        self.insert_at(key, tenant, Instant::now());
    }

    fn insert_at(&self, key: &str, tenant: ResolvedTenant, now: Instant) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                tenant,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop every entry pointing at a tenant, returns how many were removed
    pub fn invalidate_tenant(&self, tenant_id: Uuid) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.tenant.id != tenant_id);
        let removed = before.saturating_sub(self.entries.len());
        debug!(tenant_id = %tenant_id, removed, "Tenant cache invalidated");
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries, returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(slug: &str) -> ResolvedTenant {
        ResolvedTenant {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            nome: format!("Câmara de {}", slug),
            dominio: None,
            ativo: true,
        }
    }

    #[test]
    fn test_hit_then_expiry() {
        let cache = TenantCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.insert_at("host:a.example", tenant("a"), now);

        assert!(cache.get_at("host:a.example", now + Duration::from_secs(59)).is_some());
        assert!(cache.get_at("host:a.example", now + Duration::from_secs(61)).is_none());
        // expired entries are removed on read
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_spares_refreshed_entry() {
        let cache = TenantCache::new(Duration::from_secs(60));
        let start = Instant::now();
        let late = start + Duration::from_secs(61);
        cache.insert_at("host:a.example", tenant("a"), start);
        // refreshed between the stale read and the eviction
        cache.insert_at("host:a.example", tenant("a"), late);

        assert!(!cache.evict_expired("host:a.example", late));
        assert_eq!(cache.get_at("host:a.example", late).map(|t| t.slug), Some("a".to_string()));

        assert!(cache.evict_expired("host:a.example", late + Duration::from_secs(60)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_by_tenant() {
        let cache = TenantCache::new(Duration::from_secs(60));
        let a = tenant("a");
        cache.insert("host:a.example", a.clone());
        cache.insert("slug:a", a.clone());
        cache.insert("host:b.example", tenant("b"));

        assert_eq!(cache.invalidate_tenant(a.id), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("slug:a").is_none());
    }

    #[test]
    fn test_purge_expired() {
        let cache = TenantCache::new(Duration::from_secs(0));
        cache.insert("host:a.example", tenant("a"));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.purge_expired(), 1);
    }
}
