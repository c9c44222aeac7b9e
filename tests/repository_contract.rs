//! The facade's repository contract, exercised without a server.

use std::time::Duration;

use docket::prelude::*;
use pretty_assertions::assert_eq;

async fn closed_products() -> MongoRepository {
    let config = MongoConfig::builder()
        .uri("mongodb://127.0.0.1:1/?directConnection=true")
        .database("docket_contract")
        .server_selection_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = MongoClient::unverified(config).await.unwrap();
    let products = MongoRepository::new(client.clone(), "products");
    client.close().await;
    products
}

/// Written against the contract only, as application repositories are.
async fn cheapest<R>(repo: &R) -> QueryResult<Vec<R::Document>>
where
    R: DocumentRepository,
{
    let query = StructuredQuery::new()
        .filter(WhereClause::and(vec![Condition::new(
            "price",
            Operator::LessThan,
            1.0,
        )]))
        .order_by(OrderByField::asc("price"))
        .limit(3);
    repo.execute_query(&query).await
}

#[tokio::test]
async fn test_contract_surfaces_closed_client() {
    let products = closed_products().await;
    let err = cheapest(&products).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ClientClosed);
    assert_eq!(err.code.code(), "D3006");
    assert!(err.is_client_closed());
}

#[tokio::test]
async fn test_contract_default_exists_uses_count() {
    let products = closed_products().await;
    let err = DocumentRepository::exists(&products, doc! { "sku": "A-1" })
        .await
        .unwrap_err();
    assert!(err.is_client_closed());
    assert_eq!(DocumentRepository::name(&products), "products");
}

#[test]
fn test_facade_reexports() {
    let filter = FilterBuilder::new().eq("status", "active").gt("price", 2).build();
    assert_eq!(filter, doc! { "status": "active", "price": { "$gt": 2 } });

    let id = DocumentId::parse("65a1f0c2e4b0a1b2c3d4e5f6");
    assert!(id.is_object_id());
    assert!(!DocumentId::parse("order-1").is_object_id());

    let err: docket::QueryError = docket::MongoError::ClientClosed.into();
    assert!(err.is_client_closed());
}
