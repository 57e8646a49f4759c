//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p maws-db --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `maws_test`)
//!   `TEST_DB_PASSWORD` (default: `maws_test`)
//!   `TEST_DB_NAME` (default: `maws_test`)

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use maws_common::AppError;
use maws_db::entities::{client, client_column, gallery, tag};
use maws_db::repositories::{
    ClientColumnRepository, ClientRepository, GalleryRepository, TagRepository,
};
use maws_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::Set;
use serde_json::json;

fn new_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

async fn seed_gallery(repo: &GalleryRepository, name: &str) -> gallery::Model {
    repo.create(gallery::ActiveModel {
        id: Set(new_id()),
        name: Set(name.to_string()),
        registration_code: Set(None),
        signup_method: Set(gallery::SignupMethod::Manual),
        verified_phone: Set(None),
        phone_verified_at: Set(None),
        auto_generated: Set(false),
        address: Set(None),
        phone: Set(None),
        email: Set(None),
        website: Set(None),
        description: Set(None),
        max_users: Set(10),
        subscription_expires_at: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    })
    .await
    .unwrap()
}

fn column_model(gallery_id: &str, accessor: &str, order: i32) -> client_column::ActiveModel {
    client_column::ActiveModel {
        id: Set(new_id()),
        gallery_id: Set(gallery_id.to_string()),
        header: Set(accessor.to_string()),
        accessor: Set(accessor.to_string()),
        column_type: Set("text".to_string()),
        order: Set(order),
        created_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_migrations_apply_on_fresh_database() {
    let db = TestDatabase::create_migrated().await;
    assert!(db.is_ok(), "Migration failed: {:?}", db.err());
    db.unwrap().drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_column_accessor_unique_per_gallery() {
    let db = TestDatabase::create_migrated().await.unwrap();
    let conn = db.conn_arc();
    let galleries = GalleryRepository::new(conn.clone());
    let columns = ClientColumnRepository::new(conn);

    let first = seed_gallery(&galleries, "첫번째 갤러리").await;
    let second = seed_gallery(&galleries, "두번째 갤러리").await;

    columns.create(column_model(&first.id, "직업", 0)).await.unwrap();
    let duplicate = columns.create(column_model(&first.id, "직업", 1)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    // Same accessor in another gallery is fine.
    columns.create(column_model(&second.id, "직업", 0)).await.unwrap();

    drop((galleries, columns));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_client_tags_roundtrip() {
    let db = TestDatabase::create_migrated().await.unwrap();
    let conn = db.conn_arc();
    let galleries = GalleryRepository::new(conn.clone());
    let clients = ClientRepository::new(conn.clone());
    let tags = TagRepository::new(conn);

    let g = seed_gallery(&galleries, "태그 갤러리").await;
    let c = clients
        .create(client::ActiveModel {
            id: Set(new_id()),
            gallery_id: Set(g.id.clone()),
            name: Set(Some("홍길동".to_string())),
            phone: Set(Some("010-1234-5678".to_string())),
            data: Set(json!({})),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();
    let t = tags
        .create(tag::ActiveModel {
            id: Set(new_id()),
            gallery_id: Set(g.id.clone()),
            name: Set("일반고객".to_string()),
            color: Set("#6B7280".to_string()),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    tags.attach(&c.id, &[t.id.clone()]).await.unwrap();
    // Attaching twice leaves a single link.
    tags.attach(&c.id, &[t.id.clone()]).await.unwrap();
    assert_eq!(tags.count_for_client(&c.id).await.unwrap(), 1);

    let found = tags.find_for_client(&c.id).await.unwrap();
    assert_eq!(found[0].name, "일반고객");

    db.cleanup().await.unwrap();
    assert_eq!(tags.count_for_client(&c.id).await.unwrap(), 0);

    drop((galleries, clients, tags));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let result = TestDatabase::with_config(TestDbConfig::default()).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
