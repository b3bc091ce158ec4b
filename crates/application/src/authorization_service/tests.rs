use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use leasegate_core::{AppError, AppResult, TenantId};
use leasegate_domain::{Action, ConditionOperator, Permission, PermissionCondition};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use crate::{AuthorizationRepository, PrincipalContext, RoleAssignment, RolePermissionCache};

use super::AuthorizationService;

#[derive(Default)]
struct FakeAuthorizationRepository {
    assignments: HashMap<(TenantId, String), Vec<RoleAssignment>>,
    permissions: Mutex<HashMap<String, Vec<Permission>>>,
    permission_lookups: AtomicUsize,
    unavailable: AtomicBool,
    stalled: AtomicBool,
}

impl FakeAuthorizationRepository {
    async fn revoke_all(&self, role_id: &str) {
        self.permissions.lock().await.remove(role_id);
    }
}

#[async_trait]
impl AuthorizationRepository for FakeAuthorizationRepository {
    async fn list_role_assignments_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal("connection refused".to_owned()));
        }

        Ok(self
            .assignments
            .get(&(tenant_id, subject.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_permissions_for_roles(
        &self,
        _tenant_id: TenantId,
        role_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<Permission>>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal("connection refused".to_owned()));
        }
        if self.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }

        self.permission_lookups.fetch_add(1, Ordering::SeqCst);
        let permissions = self.permissions.lock().await;
        Ok(role_ids
            .iter()
            .filter_map(|role_id| {
                permissions
                    .get(role_id)
                    .map(|granted| (role_id.clone(), granted.clone()))
            })
            .collect())
    }
}

#[derive(Default)]
struct FakeRolePermissionCache {
    entries: Mutex<HashMap<(TenantId, String), Vec<Permission>>>,
}

impl FakeRolePermissionCache {
    async fn expire_all(&self) {
        self.entries.lock().await.clear();
    }
}

#[async_trait]
impl RolePermissionCache for FakeRolePermissionCache {
    async fn get_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: &str,
    ) -> AppResult<Option<Vec<Permission>>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(&(tenant_id, role_id.to_owned()))
            .cloned())
    }

    async fn set_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: &str,
        permissions: Vec<Permission>,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .insert((tenant_id, role_id.to_owned()), permissions);
        Ok(())
    }

    async fn invalidate_role(&self, tenant_id: TenantId, role_id: &str) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .remove(&(tenant_id, role_id.to_owned()));
        Ok(())
    }
}

fn permission(resource: &str, action: Action, conditions: Vec<PermissionCondition>) -> Permission {
    match Permission::new(
        format!("{resource}.{action}"),
        resource,
        action,
        None,
        conditions,
    ) {
        Ok(permission) => permission,
        Err(error) => panic!("invalid test permission: {error}"),
    }
}

fn condition(field: &str, operator: ConditionOperator, value: Value) -> PermissionCondition {
    match PermissionCondition::new(field, operator, value) {
        Ok(condition) => condition,
        Err(error) => panic!("invalid test condition: {error}"),
    }
}

fn assignment(subject: &str, role_id: &str) -> RoleAssignment {
    RoleAssignment {
        subject: subject.to_owned(),
        role_id: role_id.to_owned(),
        role_name: role_id.to_owned(),
        is_primary: true,
        is_active: true,
        expires_at: None,
        assigned_at: Utc::now(),
    }
}

fn entity(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn subject_context(subject: &str) -> PrincipalContext {
    PrincipalContext {
        subject: subject.to_owned(),
        ..PrincipalContext::default()
    }
}

#[tokio::test]
async fn subject_without_assignments_is_denied() {
    let tenant_id = TenantId::new();
    let repository = FakeAuthorizationRepository::default();
    repository.permissions.lock().await.insert(
        "manager".to_owned(),
        vec![permission("contracts", Action::Read, Vec::new())],
    );
    let service = AuthorizationService::new(Arc::new(repository));

    for action in [Action::Create, Action::Read, Action::Update, Action::Delete, Action::List] {
        let allowed = service
            .can(tenant_id, "contracts", &action, &subject_context("nobody"))
            .await;
        assert_eq!(allowed.ok(), Some(false));
    }

    let required = service
        .require_permission(tenant_id, "contracts", &Action::Read, &subject_context("nobody"))
        .await;
    assert!(matches!(required, Err(AppError::Forbidden(message)) if message == "not authorized"));
}

#[tokio::test]
async fn unconditioned_grant_allows_pre_resolved_role() {
    let tenant_id = TenantId::new();
    let repository = FakeAuthorizationRepository::default();
    repository.permissions.lock().await.insert(
        "manager".to_owned(),
        vec![permission("contracts", Action::Read, Vec::new())],
    );
    let service = AuthorizationService::new(Arc::new(repository));

    let allowed = service
        .can(
            tenant_id,
            "contracts",
            &Action::Read,
            &PrincipalContext::for_role("manager"),
        )
        .await;
    assert_eq!(allowed.ok(), Some(true));

    let denied = service
        .can(
            tenant_id,
            "contracts",
            &Action::Delete,
            &PrincipalContext::for_role("manager"),
        )
        .await;
    assert_eq!(denied.ok(), Some(false));
}

#[tokio::test]
async fn assignments_are_resolved_and_batched_across_roles() {
    let tenant_id = TenantId::new();
    let mut expired = assignment("alice", "auditor");
    expired.expires_at = Some(Utc::now() - chrono::Duration::minutes(1));

    let repository = Arc::new(FakeAuthorizationRepository {
        assignments: HashMap::from([(
            (tenant_id, "alice".to_owned()),
            vec![assignment("alice", "tenant"), assignment("alice", "maintenance"), expired],
        )]),
        ..FakeAuthorizationRepository::default()
    });
    {
        let mut permissions = repository.permissions.lock().await;
        permissions.insert(
            "tenant".to_owned(),
            vec![permission("applications", Action::Create, Vec::new())],
        );
        permissions.insert(
            "maintenance".to_owned(),
            vec![permission("maintenance", Action::Update, Vec::new())],
        );
        permissions.insert(
            "auditor".to_owned(),
            vec![permission("financial_reports", Action::Read, Vec::new())],
        );
    }
    let service = AuthorizationService::new(repository.clone());

    let allowed = service
        .can(tenant_id, "maintenance", &Action::Update, &subject_context("alice"))
        .await;
    assert_eq!(allowed.ok(), Some(true));
    assert_eq!(repository.permission_lookups.load(Ordering::SeqCst), 1);

    let expired_grant = service
        .can(
            tenant_id,
            "financial_reports",
            &Action::Read,
            &subject_context("alice"),
        )
        .await;
    assert_eq!(expired_grant.ok(), Some(false));
}

#[tokio::test]
async fn flipping_any_condition_denies_access() {
    let tenant_id = TenantId::new();
    let repository = FakeAuthorizationRepository::default();
    repository.permissions.lock().await.insert(
        "landlord".to_owned(),
        vec![permission(
            "contracts",
            Action::Update,
            vec![
                condition("status", ConditionOperator::Eq, json!("draft")),
                condition("landlord_id", ConditionOperator::Eq, json!("alice")),
            ],
        )],
    );
    let service = AuthorizationService::new(Arc::new(repository));

    let matching = PrincipalContext::for_role("landlord")
        .with_entity(entity(json!({"status": "draft", "landlord_id": "alice"})));
    let allowed = service
        .can(tenant_id, "contracts", &Action::Update, &matching)
        .await;
    assert_eq!(allowed.ok(), Some(true));

    for flipped in [
        json!({"status": "signed", "landlord_id": "alice"}),
        json!({"status": "draft", "landlord_id": "bob"}),
    ] {
        let context = PrincipalContext::for_role("landlord").with_entity(entity(flipped));
        let allowed = service
            .can(tenant_id, "contracts", &Action::Update, &context)
            .await;
        assert_eq!(allowed.ok(), Some(false));
    }
}

#[tokio::test]
async fn failing_conditional_grant_does_not_hide_other_matching_grant() {
    let tenant_id = TenantId::new();
    let repository = FakeAuthorizationRepository::default();
    repository.permissions.lock().await.insert(
        "agent".to_owned(),
        vec![
            permission(
                "applications",
                Action::Read,
                vec![condition("region", ConditionOperator::Eq, json!("north"))],
            ),
            permission(
                "applications",
                Action::Read,
                vec![condition("region", ConditionOperator::In, json!(["south", "west"]))],
            ),
        ],
    );
    let service = AuthorizationService::new(Arc::new(repository));

    let context =
        PrincipalContext::for_role("agent").with_entity(entity(json!({"region": "west"})));
    let allowed = service
        .can(tenant_id, "applications", &Action::Read, &context)
        .await;
    assert_eq!(allowed.ok(), Some(true));
}

#[tokio::test]
async fn store_failure_fails_closed_with_internal_error() {
    let tenant_id = TenantId::new();
    let repository = FakeAuthorizationRepository::default();
    repository.unavailable.store(true, Ordering::SeqCst);
    let service = AuthorizationService::new(Arc::new(repository));

    let result = service
        .can(tenant_id, "contracts", &Action::Read, &subject_context("alice"))
        .await;
    assert!(matches!(result, Err(AppError::Internal(_))));

    let required = service
        .require_permission(tenant_id, "contracts", &Action::Read, &PrincipalContext::for_role("x"))
        .await;
    assert!(matches!(required, Err(AppError::Internal(_))));
}

#[tokio::test(start_paused = true)]
async fn stalled_store_times_out_as_internal_error() {
    let tenant_id = TenantId::new();
    let repository = FakeAuthorizationRepository::default();
    repository.stalled.store(true, Ordering::SeqCst);
    let service = AuthorizationService::new(Arc::new(repository))
        .with_store_timeout(Duration::from_millis(100));

    let result = service
        .can(
            tenant_id,
            "contracts",
            &Action::Read,
            &PrincipalContext::for_role("manager"),
        )
        .await;
    assert!(matches!(result, Err(AppError::Internal(message)) if message.contains("timed out")));
}

#[tokio::test]
async fn cached_permissions_serve_repeat_checks() {
    let tenant_id = TenantId::new();
    let repository = Arc::new(FakeAuthorizationRepository::default());
    repository.permissions.lock().await.insert(
        "manager".to_owned(),
        vec![permission("documents", Action::List, Vec::new())],
    );
    let cache = Arc::new(FakeRolePermissionCache::default());
    let service =
        AuthorizationService::new(repository.clone()).with_permission_cache(cache, 30);

    for _ in 0..3 {
        let allowed = service
            .can(
                tenant_id,
                "documents",
                &Action::List,
                &PrincipalContext::for_role("manager"),
            )
            .await;
        assert_eq!(allowed.ok(), Some(true));
    }

    assert_eq!(repository.permission_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn revocation_is_visible_once_cached_entry_expires() {
    let tenant_id = TenantId::new();
    let repository = Arc::new(FakeAuthorizationRepository::default());
    repository.permissions.lock().await.insert(
        "manager".to_owned(),
        vec![permission("contracts", Action::Delete, Vec::new())],
    );
    let cache = Arc::new(FakeRolePermissionCache::default());
    let service = AuthorizationService::new(repository.clone())
        .with_permission_cache(cache.clone(), 30);
    let context = PrincipalContext::for_role("manager");

    let before = service
        .can(tenant_id, "contracts", &Action::Delete, &context)
        .await;
    assert_eq!(before.ok(), Some(true));

    repository.revoke_all("manager").await;
    let stale = service
        .can(tenant_id, "contracts", &Action::Delete, &context)
        .await;
    assert_eq!(stale.ok(), Some(true));

    cache.expire_all().await;
    let after = service
        .can(tenant_id, "contracts", &Action::Delete, &context)
        .await;
    assert_eq!(after.ok(), Some(false));
}

#[tokio::test]
async fn invalidation_drops_cached_role() {
    let tenant_id = TenantId::new();
    let repository = Arc::new(FakeAuthorizationRepository::default());
    repository.permissions.lock().await.insert(
        "manager".to_owned(),
        vec![permission("contracts", Action::Delete, Vec::new())],
    );
    let cache = Arc::new(FakeRolePermissionCache::default());
    let service = AuthorizationService::new(repository.clone())
        .with_permission_cache(cache.clone(), 30);
    let context = PrincipalContext::for_role("manager");

    let before = service
        .can(tenant_id, "contracts", &Action::Delete, &context)
        .await;
    assert_eq!(before.ok(), Some(true));

    repository.revoke_all("manager").await;
    service.invalidate_role(tenant_id, "manager").await;

    let after = service
        .can(tenant_id, "contracts", &Action::Delete, &context)
        .await;
    assert_eq!(after.ok(), Some(false));
}
