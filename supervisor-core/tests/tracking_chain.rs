//! Integration test for the tracking-chain scenario: three appends to the same doc must land
//! as three chained resources with `NEXT_PART` edges between consecutive ones, and the mapping's
//! `last_node_by_doc` entry must point at the last one.

use std::sync::Arc;

use goc_client::KnowledgeStoreClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use supervisor_core::goc::{GocCoordinator, GocMapping};

async fn mock_store_for_chain() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET")).and(path("/threads")).respond_with(ResponseTemplate::new(200).set_body_json(json!([]))).mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread-1", "title": "job:abc"})))
        .mount(&server)
        .await;
    Mock::given(method("GET")).and(path("/threads/thread-1/context-sets")).respond_with(ResponseTemplate::new(200).set_body_json(json!([]))).mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/threads/thread-1/context-sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cs-1", "thread_id": "thread-1", "name": "shared"})))
        .mount(&server)
        .await;
    Mock::given(method("GET")).and(path("/resources")).respond_with(ResponseTemplate::new(200).set_body_json(json!([]))).mount(&server).await;

    // job_config resource, provisioned once by ensure_job_thread.
    Mock::given(method("POST"))
        .and(path("/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "res-config", "name": "job_config", "context_set_id": "cs-1", "auto_activate": true})))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Three tracking-chunk resources, in append order.
    for (n, id) in [(1, "res-1"), (2, "res-2"), (3, "res-3")] {
        Mock::given(method("POST"))
            .and(path("/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id, "name": format!("plan.md@chunk{n}"), "context_set_id": "cs-1", "auto_activate": true})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("POST")).and(path("/edges")).respond_with(ResponseTemplate::new(200).set_body_json(json!({}))).mount(&server).await;
    server
}

#[tokio::test]
async fn three_appends_chain_into_two_next_part_edges() {
    let server = mock_store_for_chain().await;
    let client = Arc::new(KnowledgeStoreClient::new(server.uri(), "key"));
    let coordinator = GocCoordinator::new(client);
    let dir = tempfile::tempdir().unwrap();

    coordinator.ensure_job_thread(dir.path(), "abc").await.unwrap();
    tokio::fs::create_dir_all(dir.path().join("shared")).await.unwrap();

    let t0 = chrono::Utc::now();
    supervisor_core::job::tracking::append(dir.path(), "plan.md", "chunk-x", t0, Some(&coordinator)).await.unwrap();
    supervisor_core::job::tracking::append(dir.path(), "plan.md", "chunk-y", t0 + chrono::Duration::seconds(1), Some(&coordinator)).await.unwrap();
    supervisor_core::job::tracking::append(dir.path(), "plan.md", "chunk-z", t0 + chrono::Duration::seconds(2), Some(&coordinator)).await.unwrap();

    let saved = tokio::fs::read_to_string(dir.path().join("goc.json")).await.unwrap();
    let mapping: GocMapping = serde_json::from_str(&saved).unwrap();
    assert_eq!(mapping.last_node_by_doc.get("plan.md"), Some(&"res-3".to_string()));

    // Two /edges POSTs: res-1 -> res-2 and res-2 -> res-3.
    let requests = server.received_requests().await.unwrap();
    let edge_posts = requests.iter().filter(|r| r.url.path() == "/edges" && r.method.as_str() == "POST").count();
    assert_eq!(edge_posts, 2);

    // Three tracking-chunk resources plus the one job_config resource were created.
    let resource_posts = requests.iter().filter(|r| r.url.path() == "/resources" && r.method.as_str() == "POST").count();
    assert_eq!(resource_posts, 4);

    // The local plan.md mirrors the same three appends, in the same order, independent of goc.
    let content = tokio::fs::read_to_string(dir.path().join("shared/plan.md")).await.unwrap();
    let x_pos = content.find("chunk-x").unwrap();
    let y_pos = content.find("chunk-y").unwrap();
    let z_pos = content.find("chunk-z").unwrap();
    assert!(x_pos < y_pos && y_pos < z_pos);
}
