//! Tests against a running server.
//!
//! Run with `DOCKET_TEST_MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`.

use std::time::Duration;

use docket_mongodb::prelude::*;
use pretty_assertions::assert_eq;

async fn repository(name: &str) -> Option<(MongoClient, MongoRepository)> {
    let uri = std::env::var("DOCKET_TEST_MONGODB_URI").ok()?;
    let config = MongoConfig::builder()
        .uri(uri)
        .database("docket_live_test")
        .server_selection_timeout(Duration::from_secs(5))
        .max_retries(1)
        .build()
        .ok()?;
    let client = MongoClient::new(config).await.ok()?;
    let collection = format!("{}_{}", name, ObjectId::new().to_hex());
    let repo = MongoRepository::new(client.clone(), collection);
    Some((client, repo))
}

#[tokio::test]
#[ignore = "requires DOCKET_TEST_MONGODB_URI"]
async fn test_crud_round_trip() {
    let Some((client, repo)) = repository("crud").await else {
        return;
    };

    let ids = repo
        .insert_many(vec![
            doc! { "name": "Apple", "price": 1.50 },
            doc! { "name": "Banana", "price": 0.75 },
            doc! { "name": "Carrot", "price": 0.50 },
        ])
        .await
        .unwrap();
    assert_eq!(ids.len(), 3);

    let query = StructuredQuery::new().filter(WhereClause::and(vec![Condition::new(
        "name",
        Operator::Contains,
        "an",
    )]));
    let found = repo.execute_query(&query).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_str("name").unwrap(), "Banana");
    assert!(found[0].created_at().is_some());

    let banana = found[0].id().unwrap().to_string();
    assert_eq!(repo.find_by_id(&banana).await.unwrap().get_f64("price").unwrap(), 0.75);

    let modified = repo
        .update_one(doc! { "name": "Banana" }, doc! { "price": 0.80 })
        .await
        .unwrap();
    assert_eq!(modified, 1);

    assert_eq!(repo.delete_many(doc! { "price": { "$lt": 1.0 } }).await.unwrap(), 2);
    assert_eq!(repo.count(doc! {}).await.unwrap(), 1);
    assert!(repo.find_one(doc! { "name": "Banana" }).await.unwrap_err().is_not_found());

    client.drop_collection(repo.name()).await.unwrap();
    client.close().await;
}

#[tokio::test]
#[ignore = "requires DOCKET_TEST_MONGODB_URI"]
async fn test_unique_index_rejects_duplicates() {
    let Some((client, repo)) = repository("unique").await else {
        return;
    };

    repo.ensure_indexes(&[IndexDeclaration::new(["email"]).unique()])
        .await
        .unwrap();
    repo.insert_one(doc! { "email": "a@example.com" }).await.unwrap();

    let err = repo
        .insert_one(doc! { "email": "a@example.com" })
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());
    assert_eq!(repo.count(doc! {}).await.unwrap(), 1);

    client.drop_collection(repo.name()).await.unwrap();
    client.close().await;
}

#[tokio::test]
#[ignore = "requires DOCKET_TEST_MONGODB_URI"]
async fn test_health_report() {
    let Some((client, _repo)) = repository("health").await else {
        return;
    };

    let checker = HealthChecker::new(client.clone());
    let report = checker.check_readiness().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert!(report.details.is_some_and(|d| d.version.is_some()));

    client.close().await;
    assert!(!checker.is_healthy().await);
}
