use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use leasegate_application::RolePermissionCache;
use leasegate_core::{AppResult, TenantId};
use leasegate_domain::Permission;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct RolePermissionCacheEntry {
    permissions: Vec<Permission>,
    expires_at: Instant,
}

/// Bounded in-memory cache adapter for per-role permission sets.
pub struct InMemoryRolePermissionCache {
    entries: RwLock<HashMap<(TenantId, String), RolePermissionCacheEntry>>,
    capacity: usize,
}

impl InMemoryRolePermissionCache {
    /// Creates an empty cache holding at most `capacity` roles.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl RolePermissionCache for InMemoryRolePermissionCache {
    async fn get_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: &str,
    ) -> AppResult<Option<Vec<Permission>>> {
        let key = (tenant_id, role_id.to_owned());
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.permissions.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(&key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(&key);
        }

        Ok(None)
    }

    async fn set_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: &str,
        permissions: Vec<Permission>,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);
        let key = (tenant_id, role_id.to_owned());

        let mut entries = self.entries.write().await;
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            entries.retain(|_, entry| entry.expires_at > now);
        }
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let soonest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            if let Some(soonest) = soonest {
                entries.remove(&soonest);
            }
        }

        entries.insert(
            key,
            RolePermissionCacheEntry {
                permissions,
                expires_at,
            },
        );

        Ok(())
    }

    async fn invalidate_role(&self, tenant_id: TenantId, role_id: &str) -> AppResult<()> {
        self.entries
            .write()
            .await
            .remove(&(tenant_id, role_id.to_owned()));
        Ok(())
    }
}
