use leasegate_application::{
    AssignRoleInput, AuthorizationRepository, CreatePermissionInput, CreateRoleInput,
    SecurityAdminRepository,
};
use leasegate_core::{AppError, TenantId};
use leasegate_domain::{Action, ConditionOperator, PermissionCondition};
use serde_json::json;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::{PostgresSecurityAdminRepository, TENANT_ADMIN_ROLE};
use crate::PostgresAuthorizationRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres security admin tests: {error}");
    }

    Some(pool)
}

fn owner_condition() -> PermissionCondition {
    match PermissionCondition::new("landlord_id", ConditionOperator::Eq, json!("alice")) {
        Ok(condition) => condition,
        Err(error) => panic!("invalid test condition: {error}"),
    }
}

#[tokio::test]
async fn tenant_admin_bootstrap_is_idempotent() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSecurityAdminRepository::new(pool.clone());
    let tenant_id = TenantId::new();

    let first = repository.ensure_tenant_admin(tenant_id, "root").await;
    let second = repository.ensure_tenant_admin(tenant_id, "root").await;
    assert!(first.is_ok());
    assert_eq!(first.ok(), second.ok());

    let roles = repository.list_roles(tenant_id).await.unwrap_or_default();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].name, TENANT_ADMIN_ROLE);
    assert!(roles[0].is_system);
    assert_eq!(roles[0].permissions.len(), 6);

    let catalog = repository.list_permissions(tenant_id).await.unwrap_or_default();
    assert_eq!(catalog.len(), 6);
}

#[tokio::test]
async fn conditional_grants_round_trip_through_role_lookup() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSecurityAdminRepository::new(pool.clone());
    let authorization = PostgresAuthorizationRepository::new(pool);
    let tenant_id = TenantId::new();

    let permission = repository
        .create_permission(
            tenant_id,
            CreatePermissionInput {
                resource: "contracts".to_owned(),
                action: Action::Update,
                description: Some("edit own drafts".to_owned()),
                conditions: vec![owner_condition()],
            },
        )
        .await;
    let Ok(permission) = permission else {
        panic!("permission creation failed");
    };

    let role = repository
        .create_role(
            tenant_id,
            CreateRoleInput {
                name: "landlord".to_owned(),
                level: Some(20),
                permission_ids: vec![permission.permission_id().to_owned()],
            },
        )
        .await;
    let Ok(role) = role else {
        panic!("role creation failed");
    };
    assert_eq!(role.permissions, vec![permission.clone()]);

    let duplicate = repository
        .create_role(
            tenant_id,
            CreateRoleInput {
                name: "landlord".to_owned(),
                level: None,
                permission_ids: Vec::new(),
            },
        )
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let grants = authorization
        .list_permissions_for_roles(tenant_id, std::slice::from_ref(&role.role_id))
        .await
        .unwrap_or_default();
    assert_eq!(grants.get(&role.role_id), Some(&vec![permission.clone()]));

    let uppercase_role_id = role.role_id.to_uppercase();
    let grants = authorization
        .list_permissions_for_roles(tenant_id, std::slice::from_ref(&uppercase_role_id))
        .await
        .unwrap_or_default();
    assert_eq!(grants.get(&uppercase_role_id), Some(&vec![permission.clone()]));

    let other_tenant = authorization
        .list_permissions_for_roles(TenantId::new(), std::slice::from_ref(&role.role_id))
        .await
        .unwrap_or_default();
    assert!(other_tenant.is_empty());

    let revoked = repository
        .revoke_permission(tenant_id, &role.role_id, permission.permission_id())
        .await;
    assert!(revoked.is_ok());
    let grants = authorization
        .list_permissions_for_roles(tenant_id, std::slice::from_ref(&role.role_id))
        .await
        .unwrap_or_default();
    assert!(grants.is_empty());
}

#[tokio::test]
async fn new_primary_assignment_demotes_previous_and_blocks_deletion() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSecurityAdminRepository::new(pool.clone());
    let authorization = PostgresAuthorizationRepository::new(pool);
    let tenant_id = TenantId::new();

    let mut role_ids = Vec::new();
    for name in ["tenant", "maintenance"] {
        let role = repository
            .create_role(
                tenant_id,
                CreateRoleInput {
                    name: name.to_owned(),
                    level: None,
                    permission_ids: Vec::new(),
                },
            )
            .await;
        let Ok(role) = role else {
            panic!("role creation failed");
        };
        role_ids.push(role.role_id);
    }

    for role_id in &role_ids {
        let assigned = repository
            .assign_role(
                tenant_id,
                AssignRoleInput {
                    subject: "alice".to_owned(),
                    role_id: role_id.clone(),
                    is_primary: true,
                    expires_at: None,
                },
            )
            .await;
        assert!(assigned.is_ok());
    }

    let assignments = authorization
        .list_role_assignments_for_subject(tenant_id, "alice")
        .await
        .unwrap_or_default();
    assert_eq!(assignments.len(), 2);
    let primaries = assignments
        .iter()
        .filter(|assignment| assignment.is_primary)
        .map(|assignment| assignment.role_id.clone())
        .collect::<Vec<_>>();
    assert_eq!(primaries, vec![role_ids[1].clone()]);

    let blocked = repository.delete_role(tenant_id, &role_ids[0]).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));
    assert_eq!(
        repository
            .count_active_assignments(tenant_id, &role_ids[0])
            .await
            .ok(),
        Some(1)
    );

    let revoked = repository.revoke_role(tenant_id, "alice", &role_ids[0]).await;
    assert!(revoked.is_ok());
    let deleted = repository.delete_role(tenant_id, &role_ids[0]).await;
    assert!(deleted.is_ok());

    let filtered = repository
        .list_role_assignments(tenant_id, Some("alice"))
        .await
        .unwrap_or_default();
    assert_eq!(filtered.len(), 1);
}
