mod common;

use tenantry_access::{
    AccessRequest, Action, AuditEventType, NewProjectInput, NewTaskInput, NewUserInput,
    QuotaStore,
};
use tenantry_core::models::{ResourceKind, Role, TenantStatus};
use tenantry_core::AppError;

#[tokio::test]
async fn test_demo_and_acme_scenario() {
    let h = common::harness().await;
    let (demo, demo_admin) = h.tenant("demo", None, Some(5)).await;
    let (acme, _) = h.tenant("acme", None, None).await;

    for i in 0..5 {
        let grant = h
            .gateway
            .guard(&demo_admin, AccessRequest::tenant(Action::ProjectCreate, demo.id))
            .await
            .unwrap();
        grant
            .create_project(NewProjectInput {
                name: format!("Project {}", i),
                description: None,
                assignee_ids: vec![],
            })
            .await
            .unwrap();
    }

    // Sixth project is rejected before anything is written.
    let err = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::ProjectCreate, demo.id))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::QuotaExceeded { resource: ResourceKind::Project, current: 5, limit: 5 }
    ));
    assert_eq!(
        h.store.count_resources(demo.id, ResourceKind::Project).await.unwrap(),
        5
    );

    // A demo standard user cannot list acme's projects.
    let grant = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::UserCreate, demo.id))
        .await
        .unwrap();
    grant
        .create_user(NewUserInput {
            email: "member@demo.test".to_string(),
            password: common::PASSWORD.to_string(),
            role: Role::StandardUser,
        })
        .await
        .unwrap();
    let member = h
        .gateway
        .login("member@demo.test", common::PASSWORD)
        .await
        .unwrap()
        .token;
    let err = h
        .gateway
        .guard(&member, AccessRequest::tenant(Action::ProjectRead, acme.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // The super admin lists every tenant, with one audit record per tenant.
    h.audit.clear();
    let grant = h
        .gateway
        .guard(&h.root_token, AccessRequest::system(Action::TenantList))
        .await
        .unwrap();
    let tenants = grant.list_tenants().await.unwrap();
    assert_eq!(tenants.len(), 2);

    let cross: Vec<_> = h
        .audit
        .entries_of(AuditEventType::CrossTenantAccess)
        .into_iter()
        .filter_map(|e| e.target_tenant_id)
        .collect();
    assert!(cross.contains(&demo.id));
    assert!(cross.contains(&acme.id));
}

#[tokio::test]
async fn test_every_action_on_foreign_tenant_is_forbidden() {
    let h = common::harness().await;
    let (_, demo_admin) = h.tenant("demo", None, None).await;
    let (acme, _) = h.tenant("acme", None, None).await;

    h.audit.clear();
    for action in Action::ALL {
        let err = h
            .gateway
            .guard(
                &demo_admin,
                AccessRequest::tenant(action, acme.id).owned(true),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Forbidden(_)),
            "{action} on a foreign tenant returned {err:?}"
        );
    }

    let denied = h.audit.entries_of(AuditEventType::AccessDenied);
    assert_eq!(denied.len(), Action::ALL.len());
    assert!(denied.iter().all(|e| e.target_tenant_id == Some(acme.id)));
    for kind in ResourceKind::ALL {
        let expected = if kind == ResourceKind::User { 1 } else { 0 };
        assert_eq!(h.store.count_resources(acme.id, kind).await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_task_cannot_link_project_of_other_tenant() {
    let h = common::harness().await;
    let (demo, demo_admin) = h.tenant("demo", None, None).await;
    let (acme, acme_admin) = h.tenant("acme", None, None).await;

    let acme_project = h
        .gateway
        .guard(&acme_admin, AccessRequest::tenant(Action::ProjectCreate, acme.id))
        .await
        .unwrap()
        .create_project(NewProjectInput {
            name: "Secret".to_string(),
            description: None,
            assignee_ids: vec![],
        })
        .await
        .unwrap();

    let grant = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::TaskCreate, demo.id))
        .await
        .unwrap();
    let err = grant
        .create_task(NewTaskInput {
            project_id: acme_project.id,
            title: "Sneaky".to_string(),
            status: None,
            assignee_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(h
        .audit
        .entries_of(AuditEventType::AccessDenied)
        .iter()
        .any(|e| e.reason.as_deref() == Some("task linked to a project of another tenant")));
}

#[tokio::test]
async fn test_suspending_tenant_revokes_access_on_next_request() {
    let h = common::harness().await;
    let (demo, demo_admin) = h.tenant("demo", None, None).await;

    assert!(h.gateway.resolve(&demo_admin).await.is_ok());

    let grant = h
        .gateway
        .guard(&h.root_token, AccessRequest::tenant(Action::TenantSetStatus, demo.id))
        .await
        .unwrap();
    grant.set_tenant_status(TenantStatus::Suspended).await.unwrap();

    assert!(matches!(
        h.gateway.resolve(&demo_admin).await,
        Err(AppError::Unauthenticated(_))
    ));
    assert!(matches!(
        h.gateway.login("admin@demo.test", common::PASSWORD).await,
        Err(AppError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_standard_user_needs_assignment_to_update_project() {
    let h = common::harness().await;
    let (demo, demo_admin) = h.tenant("demo", None, None).await;

    let member = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::UserCreate, demo.id))
        .await
        .unwrap()
        .create_user(NewUserInput {
            email: "member@demo.test".to_string(),
            password: common::PASSWORD.to_string(),
            role: Role::StandardUser,
        })
        .await
        .unwrap();
    let member_token = h
        .gateway
        .login("member@demo.test", common::PASSWORD)
        .await
        .unwrap()
        .token;

    let project = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::ProjectCreate, demo.id))
        .await
        .unwrap()
        .create_project(NewProjectInput {
            name: "Roadmap".to_string(),
            description: None,
            assignee_ids: vec![],
        })
        .await
        .unwrap();

    let unassigned = project.clone();
    let err = h
        .gateway
        .guard(
            &member_token,
            AccessRequest::tenant(Action::ProjectUpdate, demo.id)
                .owned_if(move |ctx| unassigned.is_assigned(ctx.user_id())),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    h.gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::ProjectUpdate, demo.id))
        .await
        .unwrap()
        .update_project(
            project.id,
            tenantry_core::models::ProjectUpdate {
                assignee_ids: Some(vec![member.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let project = h
        .gateway
        .guard(&member_token, AccessRequest::tenant(Action::ProjectRead, demo.id))
        .await
        .unwrap()
        .project(project.id)
        .await
        .unwrap();
    let assigned = project.clone();
    let grant = h
        .gateway
        .guard(
            &member_token,
            AccessRequest::tenant(Action::ProjectUpdate, demo.id)
                .owned_if(move |ctx| assigned.is_assigned(ctx.user_id())),
        )
        .await
        .unwrap();
    let renamed = grant
        .update_project(
            project.id,
            tenantry_core::models::ProjectUpdate {
                name: Some("Roadmap 2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Roadmap 2");

    // Deleting stays admin-only.
    assert!(h
        .gateway
        .guard(
            &member_token,
            AccessRequest::tenant(Action::ProjectDelete, demo.id).owned(true)
        )
        .await
        .is_err());
}

#[tokio::test]
async fn test_grant_refuses_operations_outside_its_action() {
    let h = common::harness().await;
    let (demo, demo_admin) = h.tenant("demo", None, None).await;

    let read = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::ProjectRead, demo.id))
        .await
        .unwrap();
    h.audit.clear();
    let err = read.delete_project(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(read.users().await.is_err());

    let denials = h.audit.entries_of(AuditEventType::AccessDenied);
    assert_eq!(denials.len(), 2);
    assert!(denials
        .iter()
        .all(|r| r.action == Some(Action::ProjectRead) && r.target_tenant_id == Some(demo.id)));
}

#[tokio::test]
async fn test_super_admin_role_grants_are_denied_and_audited() {
    let h = common::harness().await;
    let (demo, demo_admin) = h.tenant("demo", None, None).await;
    let admin_ctx = h.gateway.resolve(&demo_admin).await.unwrap();

    h.audit.clear();
    let create = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::UserCreate, demo.id))
        .await
        .unwrap();
    let err = create
        .create_user(NewUserInput {
            email: "root2@demo.test".to_string(),
            password: common::PASSWORD.to_string(),
            role: Role::SuperAdmin,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let member = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::UserCreate, demo.id))
        .await
        .unwrap()
        .create_user(NewUserInput {
            email: "member@demo.test".to_string(),
            password: common::PASSWORD.to_string(),
            role: Role::StandardUser,
        })
        .await
        .unwrap();
    let err = h
        .gateway
        .guard(&demo_admin, AccessRequest::tenant(Action::UserUpdateRole, demo.id))
        .await
        .unwrap()
        .update_user_role(member.id, Role::SuperAdmin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let denials = h.audit.entries_of(AuditEventType::AccessDenied);
    assert_eq!(denials.len(), 2);
    for (record, action) in denials
        .iter()
        .zip([Action::UserCreate, Action::UserUpdateRole])
    {
        assert_eq!(record.action, Some(action));
        assert_eq!(record.actor_user_id, Some(admin_ctx.user_id()));
        assert_eq!(record.actor_tenant_id, Some(demo.id));
        assert_eq!(record.target_tenant_id, Some(demo.id));
        assert!(!record.success);
    }

    // The refused creation gave its user slot back: admin plus member.
    assert_eq!(
        h.store
            .count_resources(demo.id, ResourceKind::User)
            .await
            .unwrap(),
        2
    );
}
