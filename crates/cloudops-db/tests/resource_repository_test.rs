//! Integration tests for the cloud resource repository and its
//! `bound_to` edges using in-memory SurrealDB.

use cloudops_core::error::CloudOpsError;
use cloudops_core::models::resource::{CreateResource, ResourceKind, UpdateResource};
use cloudops_core::models::tree_node::CreateTreeNode;
use cloudops_core::repository::{ResourceRepository, TreeNodeRepository};
use cloudops_db::repository::{SurrealResourceRepository, SurrealTreeNodeRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> (SurrealResourceRepository<Db>, SurrealTreeNodeRepository<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    cloudops_db::run_migrations(&db).await.unwrap();
    (
        SurrealResourceRepository::new(db.clone()),
        SurrealTreeNodeRepository::new(db),
    )
}

fn ecs(name: &str, ip: &str) -> CreateResource {
    CreateResource {
        kind: ResourceKind::Ecs,
        instance_name: name.into(),
        ip_addr: ip.into(),
        vendor: "aliyun".into(),
        region: "cn-hangzhou".into(),
        description: String::new(),
        metadata: Some(serde_json::json!({ "instance_type": "ecs.g6.large" })),
    }
}

async fn leaf(nodes: &SurrealTreeNodeRepository<Db>, title: &str) -> i64 {
    nodes
        .create(CreateTreeNode {
            pid: 0,
            level: 1,
            title: title.into(),
            description: String::new(),
            is_leaf: true,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn create_and_get_resource() {
    let (resources, _) = setup().await;

    let created = resources
        .create(ecs("web-01", "10.0.0.1"), "abc123".into())
        .await
        .unwrap();
    assert_eq!(created.kind, ResourceKind::Ecs);
    assert_eq!(created.hash, "abc123");
    assert!(created.bind_nodes.is_empty());

    let fetched = resources.get_by_id(ResourceKind::Ecs, created.id).await.unwrap();
    assert_eq!(fetched.instance_name, "web-01");
    assert_eq!(fetched.metadata["instance_type"], "ecs.g6.large");
}

#[tokio::test]
async fn get_with_wrong_kind_is_not_found() {
    let (resources, _) = setup().await;

    let created = resources
        .create(ecs("web-01", "10.0.0.1"), "h".into())
        .await
        .unwrap();

    let err = resources
        .get_by_id(ResourceKind::Rds, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CloudOpsError::NotFound { ref entity, .. } if entity == "rds"));
}

#[tokio::test]
async fn get_all_filters_by_kind() {
    let (resources, _) = setup().await;

    resources.create(ecs("web-01", "10.0.0.1"), "a".into()).await.unwrap();
    resources.create(ecs("web-02", "10.0.0.2"), "b".into()).await.unwrap();
    resources
        .create(
            CreateResource {
                kind: ResourceKind::Rds,
                metadata: None,
                ..ecs("db-01", "10.0.1.1")
            },
            "c".into(),
        )
        .await
        .unwrap();

    assert_eq!(resources.get_all(ResourceKind::Ecs).await.unwrap().len(), 2);
    assert_eq!(resources.get_all(ResourceKind::Rds).await.unwrap().len(), 1);
    assert!(resources.get_all(ResourceKind::Elb).await.unwrap().is_empty());
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() {
    let (resources, _) = setup().await;

    let created = resources
        .create(ecs("web-01", "10.0.0.1"), "old".into())
        .await
        .unwrap();

    let updated = resources
        .update(
            ResourceKind::Ecs,
            created.id,
            UpdateResource {
                ip_addr: Some("10.0.0.9".into()),
                ..Default::default()
            },
            Some("new".into()),
        )
        .await
        .unwrap();

    assert_eq!(updated.ip_addr, "10.0.0.9");
    assert_eq!(updated.instance_name, "web-01");
    assert_eq!(updated.hash, "new");
}

#[tokio::test]
async fn binding_edges_are_idempotent() {
    let (resources, nodes) = setup().await;
    let node_id = leaf(&nodes, "billing").await;
    let res = resources
        .create(ecs("web-01", "10.0.0.1"), "h".into())
        .await
        .unwrap();

    assert!(resources.add_bind_node(res.id, node_id).await.unwrap());
    assert!(!resources.add_bind_node(res.id, node_id).await.unwrap());
    assert_eq!(resources.count_bound_to_node(node_id).await.unwrap(), 1);

    let fetched = resources.get_by_id(ResourceKind::Ecs, res.id).await.unwrap();
    assert_eq!(fetched.bind_nodes, vec![node_id]);
    let bare = resources
        .get_by_id_no_preload(ResourceKind::Ecs, res.id)
        .await
        .unwrap();
    assert!(bare.bind_nodes.is_empty());

    assert!(resources.remove_bind_node(res.id, node_id).await.unwrap());
    assert!(!resources.remove_bind_node(res.id, node_id).await.unwrap());
    assert_eq!(resources.count_bound_to_node(node_id).await.unwrap(), 0);
}

#[tokio::test]
async fn racing_edge_inserts_report_one_creation() {
    let (resources, nodes) = setup().await;
    let node_id = leaf(&nodes, "billing").await;
    let res = resources
        .create(ecs("web-01", "10.0.0.1"), "h".into())
        .await
        .unwrap();

    for _ in 0..20 {
        let (first, second) = tokio::join!(
            resources.add_bind_node(res.id, node_id),
            resources.add_bind_node(res.id, node_id),
        );
        let created = [first.unwrap(), second.unwrap()];
        assert_eq!(created.iter().filter(|c| **c).count(), 1);
        assert_eq!(resources.count_bound_to_node(node_id).await.unwrap(), 1);

        assert!(resources.remove_bind_node(res.id, node_id).await.unwrap());
    }
}

#[tokio::test]
async fn get_all_groups_bound_nodes_per_resource() {
    let (resources, nodes) = setup().await;
    let a = leaf(&nodes, "a").await;
    let b = leaf(&nodes, "b").await;

    let web = resources
        .create(ecs("web-01", "10.0.0.1"), "h1".into())
        .await
        .unwrap();
    let idle = resources
        .create(ecs("web-02", "10.0.0.2"), "h2".into())
        .await
        .unwrap();

    resources.add_bind_node(web.id, b).await.unwrap();
    resources.add_bind_node(web.id, a).await.unwrap();

    let all = resources.get_all(ResourceKind::Ecs).await.unwrap();
    let web = all.iter().find(|r| r.id == web.id).unwrap();
    let idle = all.iter().find(|r| r.id == idle.id).unwrap();
    assert_eq!(web.bind_nodes, vec![a, b]);
    assert!(!idle.is_bound());
}

#[tokio::test]
async fn deleting_node_drops_its_edges() {
    let (resources, nodes) = setup().await;
    let node_id = leaf(&nodes, "billing").await;
    let res = resources
        .create(ecs("web-01", "10.0.0.1"), "h".into())
        .await
        .unwrap();
    resources.add_bind_node(res.id, node_id).await.unwrap();

    nodes.delete(node_id).await.unwrap();

    let fetched = resources.get_by_id(ResourceKind::Ecs, res.id).await.unwrap();
    assert!(fetched.bind_nodes.is_empty());
}
