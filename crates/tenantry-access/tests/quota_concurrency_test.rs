mod common;

use tenantry_access::{
    AccessRequest, Action, AuditEventType, NewProjectInput, NewUserInput, QuotaStore,
};
use tenantry_core::models::{ResourceKind, Role};
use tenantry_core::AppError;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_project_creation_never_exceeds_limit() {
    const ATTEMPTS: usize = 40;
    const LIMIT: i64 = 7;

    let h = common::harness().await;
    let (tenant, admin_token) = h.tenant("race", None, Some(LIMIT)).await;

    let mut handles = Vec::with_capacity(ATTEMPTS);
    for i in 0..ATTEMPTS {
        let gateway = h.gateway.clone();
        let token = admin_token.clone();
        let tenant_id = tenant.id;
        handles.push(tokio::spawn(async move {
            let grant = gateway
                .guard(&token, AccessRequest::tenant(Action::ProjectCreate, tenant_id))
                .await?;
            grant
                .create_project(NewProjectInput {
                    name: format!("Project {}", i),
                    description: None,
                    assignee_ids: vec![],
                })
                .await
        }));
    }

    let mut created = 0;
    let mut exceeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::QuotaExceeded { resource, limit, .. }) => {
                assert_eq!(resource, ResourceKind::Project);
                assert_eq!(limit, LIMIT);
                exceeded += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, LIMIT as usize);
    assert_eq!(exceeded, ATTEMPTS - LIMIT as usize);
    assert_eq!(
        h.store
            .count_resources(tenant.id, ResourceKind::Project)
            .await
            .unwrap(),
        LIMIT
    );

    let grant = h
        .gateway
        .guard(&admin_token, AccessRequest::tenant(Action::ProjectRead, tenant.id))
        .await
        .unwrap();
    assert_eq!(grant.projects().await.unwrap().len(), LIMIT as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_user_creation_counts_the_admin() {
    const ATTEMPTS: usize = 10;

    let h = common::harness().await;
    // Three seats, one already taken by the tenant admin.
    let (tenant, admin_token) = h.tenant("seats", Some(3), None).await;

    let mut handles = Vec::with_capacity(ATTEMPTS);
    for i in 0..ATTEMPTS {
        let gateway = h.gateway.clone();
        let token = admin_token.clone();
        let tenant_id = tenant.id;
        handles.push(tokio::spawn(async move {
            let grant = gateway
                .guard(&token, AccessRequest::tenant(Action::UserCreate, tenant_id))
                .await?;
            grant
                .create_user(NewUserInput {
                    email: format!("user{}@seats.test", i),
                    password: common::PASSWORD.to_string(),
                    role: Role::StandardUser,
                })
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            created += 1;
        }
    }

    assert_eq!(created, 2);
    assert_eq!(
        h.store
            .count_resources(tenant.id, ResourceKind::User)
            .await
            .unwrap(),
        3
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tenants_do_not_share_capacity() {
    let h = common::harness().await;
    let (demo, demo_token) = h.tenant("demo", None, Some(1)).await;
    let (acme, acme_token) = h.tenant("acme", None, Some(1)).await;

    for (tenant_id, token) in [(demo.id, &demo_token), (acme.id, &acme_token)] {
        let grant = h
            .gateway
            .guard(token, AccessRequest::tenant(Action::ProjectCreate, tenant_id))
            .await
            .unwrap();
        grant
            .create_project(NewProjectInput {
                name: "Only one".to_string(),
                description: None,
                assignee_ids: vec![],
            })
            .await
            .unwrap();
    }

    let err = h
        .gateway
        .guard(&demo_token, AccessRequest::tenant(Action::ProjectCreate, demo.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded { current: 1, limit: 1, .. }));
}

#[tokio::test]
async fn test_failed_creation_releases_reservation() {
    let h = common::harness().await;
    let (tenant, admin_token) = h.tenant("release", Some(5), None).await;

    let grant = h
        .gateway
        .guard(&admin_token, AccessRequest::tenant(Action::UserCreate, tenant.id))
        .await
        .unwrap();
    // Duplicate email: the store rejects the insert after the slot was reserved.
    let err = grant
        .create_user(NewUserInput {
            email: "admin@release.test".to_string(),
            password: common::PASSWORD.to_string(),
            role: Role::StandardUser,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert_eq!(
        h.store
            .count_resources(tenant.id, ResourceKind::User)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_quota_denial_names_actor_and_action() {
    let h = common::harness().await;
    let (demo, demo_token) = h.tenant("demo", None, Some(0)).await;
    let ctx = h.gateway.resolve(&demo_token).await.unwrap();

    let err = h
        .gateway
        .guard(&demo_token, AccessRequest::tenant(Action::ProjectCreate, demo.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded { current: 0, limit: 0, .. }));

    let exceeded = h.audit.entries_of(AuditEventType::QuotaExceeded);
    assert_eq!(exceeded.len(), 1);
    assert_eq!(exceeded[0].actor_user_id, Some(ctx.user_id()));
    assert_eq!(exceeded[0].actor_tenant_id, Some(demo.id));
    assert_eq!(exceeded[0].action, Some(Action::ProjectCreate));
    assert_eq!(exceeded[0].target_tenant_id, Some(demo.id));
    assert!(!exceeded[0].success);
}
