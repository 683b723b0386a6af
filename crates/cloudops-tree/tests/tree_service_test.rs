//! Integration tests for the tree service against in-memory SurrealDB.

use cloudops_core::error::{CloudOpsError, ErrorKind, InvariantViolation};
use cloudops_core::models::resource::{CloudResource, CreateResource, ResourceKind, UpdateResource};
use cloudops_core::models::tree_node::CreateTreeNode;
use cloudops_core::models::user::CreateUser;
use cloudops_core::repository::UserRepository;
use cloudops_db::repository::{
    SurrealResourceRepository, SurrealTreeNodeRepository, SurrealUserRepository,
};
use cloudops_tree::hash::resource_hash;
use cloudops_tree::{BindingChange, TreeConfig, TreeService, UpdateTreeNodeInput};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Service = TreeService<
    SurrealTreeNodeRepository<Db>,
    SurrealResourceRepository<Db>,
    SurrealUserRepository<Db>,
>;

async fn setup_with(config: TreeConfig) -> (Service, SurrealUserRepository<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    cloudops_db::run_migrations(&db).await.unwrap();

    let service = TreeService::new(
        SurrealTreeNodeRepository::new(db.clone()),
        SurrealResourceRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        config,
    );
    (service, SurrealUserRepository::new(db))
}

async fn setup() -> Service {
    setup_with(TreeConfig::default()).await.0
}

fn node(pid: i64, level: i64, title: &str, is_leaf: bool) -> CreateTreeNode {
    CreateTreeNode {
        pid,
        level,
        title: title.into(),
        description: String::new(),
        is_leaf,
    }
}

fn ecs(name: &str, ip: &str) -> CreateResource {
    CreateResource {
        kind: ResourceKind::Ecs,
        instance_name: name.into(),
        ip_addr: ip.into(),
        vendor: "aliyun".into(),
        region: "cn-hangzhou".into(),
        description: String::new(),
        metadata: None,
    }
}

/// Root 1 with leaves 2 and 3.
async fn seed_tree(service: &Service) -> (i64, i64, i64) {
    let root = service.create_node(node(0, 1, "platform", false)).await.unwrap();
    let a = service.create_node(node(root.id, 2, "billing", true)).await.unwrap();
    let b = service.create_node(node(root.id, 2, "search", true)).await.unwrap();
    (root.id, a.id, b.id)
}

fn ids(resources: &[CloudResource]) -> Vec<i64> {
    resources.iter().map(|r| r.id).collect()
}

fn violation(err: &CloudOpsError) -> &InvariantViolation {
    err.violation().expect("expected an invariant violation")
}

// ---------------------------------------------------------------------------
// Tree queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tree_is_assembled_from_stored_nodes() {
    let service = setup().await;
    let (root, a, b) = seed_tree(&service).await;

    let forest = service.get_tree().await.unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].item.id, root);
    let kids: Vec<i64> = forest[0].children.iter().map(|c| c.item.id).collect();
    assert_eq!(kids, vec![a, b]);

    let leaves = service.leaf_descendants(root).await.unwrap();
    assert_eq!(leaves.len(), 2);
    assert!(leaves.contains(&a) && leaves.contains(&b));
    assert!(service.leaf_descendants(999).await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_helpers() {
    let service = setup().await;
    let (root, a, _) = seed_tree(&service).await;

    assert_eq!(service.top_nodes().await.unwrap().len(), 1);
    assert_eq!(service.leaf_nodes().await.unwrap().len(), 2);
    assert_eq!(service.children_of(root).await.unwrap().len(), 2);
    assert_eq!(service.get_node(a).await.unwrap().title, "billing");

    let selected = service.select_nodes(2, 0).await.unwrap();
    assert_eq!(selected.len(), 2);
    assert!(selected.iter().all(|s| s.value == s.node.id));
}

// ---------------------------------------------------------------------------
// Node lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_creation_always_succeeds() {
    let service = setup().await;
    service.create_node(node(0, 1, "a", false)).await.unwrap();
    service.create_node(node(0, 1, "b", true)).await.unwrap();
}

#[tokio::test]
async fn root_with_wrong_level_is_rejected() {
    let service = setup().await;
    let err = service.create_node(node(0, 3, "a", false)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn child_of_missing_parent_is_not_found() {
    let service = setup().await;
    let err = service.create_node(node(42, 2, "a", true)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn too_deep_child_is_rejected() {
    let service = setup().await;
    let root = service.create_node(node(0, 1, "root", false)).await.unwrap();

    let err = service.create_node(node(root.id, 3, "deep", true)).await.unwrap_err();
    assert_eq!(
        violation(&err),
        &InvariantViolation::LevelExceeded { level: 3, max: 2 }
    );
    assert_eq!(service.children_of(root.id).await.unwrap().len(), 0);
}

#[tokio::test]
async fn child_under_leaf_is_rejected() {
    let service = setup().await;
    let (_, leaf, _) = seed_tree(&service).await;

    let err = service.create_node(node(leaf, 3, "x", true)).await.unwrap_err();
    assert_eq!(
        violation(&err),
        &InvariantViolation::ParentIsLeaf { parent_id: leaf }
    );
}

#[tokio::test]
async fn configured_depth_limit_is_enforced() {
    let (service, _) = setup_with(TreeConfig {
        max_level: Some(2),
        ..Default::default()
    })
    .await;
    let root = service.create_node(node(0, 1, "root", false)).await.unwrap();
    let mid = service.create_node(node(root.id, 2, "mid", false)).await.unwrap();

    let err = service.create_node(node(mid.id, 3, "leaf", true)).await.unwrap_err();
    assert_eq!(
        violation(&err),
        &InvariantViolation::DepthLimitExceeded { level: 3, max: 2 }
    );
}

#[tokio::test]
async fn missing_parent_is_reported_before_depth_limit() {
    let (service, _) = setup_with(TreeConfig {
        max_level: Some(2),
        ..Default::default()
    })
    .await;

    let err = service.create_node(node(999, 5, "deep", true)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_with_children_changes_nothing() {
    let service = setup().await;
    let (root, _, _) = seed_tree(&service).await;

    let err = service.delete_node(root).await.unwrap_err();
    assert_eq!(
        violation(&err),
        &InvariantViolation::HasChildren { node_id: root }
    );
    assert_eq!(service.get_tree().await.unwrap()[0].subtree_size(), 3);
}

#[tokio::test]
async fn delete_childless_node() {
    let service = setup().await;
    let (root, a, _) = seed_tree(&service).await;

    service.delete_node(a).await.unwrap();
    assert_eq!(service.children_of(root).await.unwrap().len(), 1);
    assert_eq!(
        service.delete_node(a).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn delete_bound_node_is_blocked_by_default() {
    let service = setup().await;
    let (_, a, _) = seed_tree(&service).await;
    let res = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();
    service.bind_resource(ResourceKind::Ecs, res.id, a).await.unwrap();

    let err = service.delete_node(a).await.unwrap_err();
    assert_eq!(
        violation(&err),
        &InvariantViolation::NodeBound {
            node_id: a,
            bindings: 1
        }
    );
    assert!(service.get_node(a).await.is_ok());
}

#[tokio::test]
async fn delete_bound_node_drops_edges_when_allowed() {
    let (service, _) = setup_with(TreeConfig {
        block_delete_bound_nodes: false,
        ..Default::default()
    })
    .await;
    let (_, a, _) = seed_tree(&service).await;
    let res = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();
    service.bind_resource(ResourceKind::Ecs, res.id, a).await.unwrap();

    service.delete_node(a).await.unwrap();

    let res = service.get_resource(ResourceKind::Ecs, res.id).await.unwrap();
    assert!(res.bind_nodes.is_empty());
    service.delete_resource(ResourceKind::Ecs, res.id).await.unwrap();
}

#[tokio::test]
async fn update_resolves_usernames() {
    let (service, users) = setup_with(TreeConfig::default()).await;
    let (_, a, _) = seed_tree(&service).await;
    users
        .create(CreateUser {
            username: "alice".into(),
            real_name: "Alice".into(),
            email: "alice@example.com".into(),
        })
        .await
        .unwrap();

    let updated = service
        .update_node(
            a,
            UpdateTreeNodeInput {
                title: "billing-core".into(),
                is_leaf: true,
                ops_admins: vec!["alice".into()],
                rd_members: vec!["alice".into(), "alice".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "billing-core");
    assert_eq!(updated.ops_admins[0].username, "alice");
    assert_eq!(updated.rd_members.len(), 1);
}

#[tokio::test]
async fn update_with_unknown_user_writes_nothing() {
    let service = setup().await;
    let (_, a, _) = seed_tree(&service).await;

    let err = service
        .update_node(
            a,
            UpdateTreeNodeInput {
                title: "renamed".into(),
                is_leaf: true,
                rd_admins: vec!["ghost".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CloudOpsError::NotFound { ref entity, .. } if entity == "user"));
    assert_eq!(service.get_node(a).await.unwrap().title, "billing");
}

#[tokio::test]
async fn parent_cannot_become_leaf() {
    let service = setup().await;
    let (root, _, _) = seed_tree(&service).await;

    let err = service
        .update_node(
            root,
            UpdateTreeNodeInput {
                title: "platform".into(),
                is_leaf: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        violation(&err),
        &InvariantViolation::HasChildren { node_id: root }
    );
}

// ---------------------------------------------------------------------------
// Resources and bindings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_resource_stores_hash() {
    let service = setup().await;

    let res = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();
    assert_eq!(res.hash, resource_hash("web-01", "10.0.0.1"));
}

#[tokio::test]
async fn update_resource_recomputes_hash_on_identity_change() {
    let service = setup().await;
    let res = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();

    let described = service
        .update_resource(
            ResourceKind::Ecs,
            res.id,
            UpdateResource {
                description: Some("frontend".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(described.hash, res.hash);

    let moved = service
        .update_resource(
            ResourceKind::Ecs,
            res.id,
            UpdateResource {
                ip_addr: Some("10.0.0.2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.hash, resource_hash("web-01", "10.0.0.2"));
    assert_eq!(moved.description, "frontend");
}

#[tokio::test]
async fn bind_then_unbind_restores_bindings() {
    let service = setup().await;
    let (_, a, _) = seed_tree(&service).await;
    let res = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();

    assert_eq!(
        service.bind_resource(ResourceKind::Ecs, res.id, a).await.unwrap(),
        BindingChange::Applied
    );
    assert_eq!(
        service.bind_resource(ResourceKind::Ecs, res.id, a).await.unwrap(),
        BindingChange::Unchanged
    );
    assert_eq!(
        service
            .get_resource(ResourceKind::Ecs, res.id)
            .await
            .unwrap()
            .bind_nodes,
        vec![a]
    );

    assert_eq!(
        service.unbind_resource(ResourceKind::Ecs, res.id, a).await.unwrap(),
        BindingChange::Applied
    );
    assert_eq!(
        service.unbind_resource(ResourceKind::Ecs, res.id, a).await.unwrap(),
        BindingChange::Unchanged
    );
    assert!(
        service
            .get_resource(ResourceKind::Ecs, res.id)
            .await
            .unwrap()
            .bind_nodes
            .is_empty()
    );
}

#[tokio::test]
async fn concurrent_binds_of_one_pair_never_error() {
    let service = setup().await;
    let (_, a, _) = seed_tree(&service).await;
    let res = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();

    for _ in 0..20 {
        let (first, second, third) = tokio::join!(
            service.bind_resource(ResourceKind::Ecs, res.id, a),
            service.bind_resource(ResourceKind::Ecs, res.id, a),
            service.bind_resource(ResourceKind::Ecs, res.id, a),
        );
        let changes = [first.unwrap(), second.unwrap(), third.unwrap()];
        let applied = changes
            .iter()
            .filter(|c| **c == BindingChange::Applied)
            .count();
        assert_eq!(applied, 1, "exactly one bind creates the edge: {changes:?}");

        let bound = service.get_resource(ResourceKind::Ecs, res.id).await.unwrap();
        assert_eq!(bound.bind_nodes, vec![a]);

        service
            .unbind_resource(ResourceKind::Ecs, res.id, a)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn bind_with_missing_side_is_not_found() {
    let service = setup().await;
    let (_, a, _) = seed_tree(&service).await;
    let res = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();

    let err = service.bind_resource(ResourceKind::Ecs, 77, a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.bind_resource(ResourceKind::Ecs, res.id, 77).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.bind_resource(ResourceKind::Rds, res.id, a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn subtree_aggregation_follows_bindings() {
    let service = setup().await;
    let (root, a, b) = seed_tree(&service).await;
    let e1 = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();
    service.bind_resource(ResourceKind::Ecs, e1.id, a).await.unwrap();

    let under_root = service
        .resources_in_subtree(root, ResourceKind::Ecs, 1, 10)
        .await
        .unwrap();
    assert_eq!(under_root.total, 1);
    assert_eq!(ids(&under_root.items), vec![e1.id]);

    let under_a = service
        .resources_in_subtree(a, ResourceKind::Ecs, 1, 10)
        .await
        .unwrap();
    assert_eq!(ids(&under_a.items), vec![e1.id]);

    let under_b = service
        .resources_in_subtree(b, ResourceKind::Ecs, 1, 10)
        .await
        .unwrap();
    assert!(under_b.items.is_empty());

    let other_kind = service
        .resources_in_subtree(root, ResourceKind::Rds, 1, 10)
        .await
        .unwrap();
    assert_eq!(other_kind.total, 0);
}

#[tokio::test]
async fn subtree_aggregation_pages_are_stable() {
    let service = setup().await;
    let (root, a, b) = seed_tree(&service).await;
    let mut created = Vec::new();
    for i in 1..=5 {
        let res = service
            .create_resource(ecs(&format!("web-{i}"), &format!("10.0.0.{i}")))
            .await
            .unwrap();
        let node = if i % 2 == 0 { a } else { b };
        service.bind_resource(ResourceKind::Ecs, res.id, node).await.unwrap();
        created.push(res.id);
    }

    let mut paged = Vec::new();
    for page in 1..=3 {
        let window = service
            .resources_in_subtree(root, ResourceKind::Ecs, page, 2)
            .await
            .unwrap();
        assert_eq!(window.total, 5);
        paged.extend(window.items.into_iter().map(|r| r.id));
    }
    assert_eq!(paged, created);

    let past_end = service
        .resources_in_subtree(root, ResourceKind::Ecs, 9, 2)
        .await
        .unwrap();
    assert!(past_end.items.is_empty());
}

#[tokio::test]
async fn bound_resource_cannot_be_deleted() {
    let service = setup().await;
    let (_, a, _) = seed_tree(&service).await;
    let res = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();
    service.bind_resource(ResourceKind::Ecs, res.id, a).await.unwrap();

    let err = service
        .delete_resource(ResourceKind::Ecs, res.id)
        .await
        .unwrap_err();
    assert_eq!(
        violation(&err),
        &InvariantViolation::ResourceBound {
            resource_id: res.id,
            nodes: 1
        }
    );
    assert!(service.get_resource(ResourceKind::Ecs, res.id).await.is_ok());

    service.unbind_resource(ResourceKind::Ecs, res.id, a).await.unwrap();
    service.delete_resource(ResourceKind::Ecs, res.id).await.unwrap();
    assert_eq!(
        service
            .get_resource(ResourceKind::Ecs, res.id)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn unbound_listing_excludes_bound_resources() {
    let service = setup().await;
    let (_, a, _) = seed_tree(&service).await;
    let bound = service.create_resource(ecs("web-01", "10.0.0.1")).await.unwrap();
    let free = service.create_resource(ecs("web-02", "10.0.0.2")).await.unwrap();
    service.bind_resource(ResourceKind::Ecs, bound.id, a).await.unwrap();

    let unbound = service.list_unbound_resources(ResourceKind::Ecs).await.unwrap();
    assert_eq!(unbound.len(), 1);
    assert_eq!(unbound[0].id, free.id);
    assert_eq!(service.list_resources(ResourceKind::Ecs).await.unwrap().len(), 2);
}
