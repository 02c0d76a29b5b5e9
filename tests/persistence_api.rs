mod common;

use std::collections::BTreeMap;

use axum::http::{Method, StatusCode};
use school_api::{api::router, config::Config, db, state::AppState};
use serde_json::json;
use sqlx::SqlitePool;

use common::{delete, get, post, put, send, test_app_with_pool};

async fn fail_writes_on(pool: &SqlitePool, table: &str, event: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER fail_{event}_{table} BEFORE {event} ON {table} \
         BEGIN SELECT RAISE(ABORT, 'store unavailable'); END",
        event = event,
        table = table,
    ))
    .execute(pool)
    .await
    .expect("Failed to create trigger");
}

async fn restore_writes_on(pool: &SqlitePool, table: &str, event: &str) {
    sqlx::query(&format!("DROP TRIGGER fail_{}_{}", event, table))
        .execute(pool)
        .await
        .expect("Failed to drop trigger");
}

fn assert_database_error(status: StatusCode, body: &serde_json::Value) {
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Database error occurred");
}

#[tokio::test]
async fn test_failed_course_insert_returns_500_and_persists_nothing() {
    let (app, pool) = test_app_with_pool().await;
    fail_writes_on(&pool, "courses", "INSERT").await;

    let (status, body) = post(&app, "/courses", json!({"name": "Lost"})).await;
    assert_database_error(status, &body);

    restore_writes_on(&pool, "courses", "INSERT").await;
    let (_, list) = get(&app, "/courses").await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_failed_course_delete_returns_500_and_keeps_row() {
    let (app, pool) = test_app_with_pool().await;

    let (_, created) = post(&app, "/courses", json!({"name": "Kept"})).await;
    let uri = format!("/courses/{}", created["data"]["id"]);

    fail_writes_on(&pool, "courses", "DELETE").await;
    let (status, body) = delete(&app, &uri).await;
    assert_database_error(status, &body);

    restore_writes_on(&pool, "courses", "DELETE").await;
    let (status, fetched) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"], created["data"]);
}

#[tokio::test]
async fn test_failed_course_update_returns_500_and_keeps_row() {
    let (app, pool) = test_app_with_pool().await;

    let (_, created) = post(&app, "/courses", json!({"name": "Stable"})).await;
    let uri = format!("/courses/{}", created["data"]["id"]);

    fail_writes_on(&pool, "courses", "UPDATE").await;
    let (status, body) = put(&app, &uri, json!({"name": "Changed"})).await;
    assert_database_error(status, &body);

    let (_, fetched) = get(&app, &uri).await;
    assert_eq!(fetched["data"], created["data"]);
}

#[tokio::test]
async fn test_failed_student_writes_return_500() {
    let (app, pool) = test_app_with_pool().await;

    let (_, created) = post(&app, "/students", json!({"name": "Ada", "email": "ada@example.com"})).await;
    let uri = format!("/students/{}", created["data"]["id"]);

    fail_writes_on(&pool, "students", "INSERT").await;
    let (status, body) = post(&app, "/students", json!({"name": "Grace", "email": "grace@example.com"})).await;
    assert_database_error(status, &body);

    fail_writes_on(&pool, "students", "DELETE").await;
    let (status, body) = delete(&app, &uri).await;
    assert_database_error(status, &body);

    let (_, list) = get(&app, "/students").await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["data"][0], created["data"]);
}

#[tokio::test]
async fn test_missing_table_returns_500() {
    let (app, pool) = test_app_with_pool().await;

    sqlx::query("DROP TABLE courses").execute(&pool).await.unwrap();

    let (status, body) = get(&app, "/courses").await;
    assert_database_error(status, &body);

    let (status, body) = post(&app, "/courses", json!({"name": "Nowhere"})).await;
    assert_database_error(status, &body);

    let (status, body) = delete(&app, "/courses/1").await;
    assert_database_error(status, &body);
}

/// Many requests against a file-backed pool with several connections, so
/// transactions on different connections interleave.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_on_shared_file_database() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config {
        database_url: format!("sqlite://{}", dir.path().join("school.db").display()),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        max_connections: 5,
    };
    let pool = db::connect(&config).await.expect("Failed to connect");
    let app = router(AppState { db: pool });

    let mut ids = Vec::new();
    for i in 0..20 {
        let (status, body) = post(&app, "/courses", json!({ "name": format!("Course {}", i) })).await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["data"]["id"].as_i64().unwrap());
    }

    let mut tasks = Vec::new();
    for round in 0..100 {
        let app = app.clone();
        let id = ids[round % ids.len()];
        tasks.push(tokio::spawn(async move {
            let body = json!({ "description": format!("revision {}", round) });
            send(&app, Method::PUT, &format!("/courses/{}", id), Some(body)).await
        }));
    }

    let mut statuses = BTreeMap::new();
    for task in tasks {
        let (status, _) = task.await.unwrap();
        *statuses.entry(status.as_u16()).or_insert(0) += 1;
    }
    assert_eq!(statuses, BTreeMap::from([(200, 100)]));

    let mut tasks = Vec::new();
    for id in ids.clone() {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let (put_status, _) = send(
                &app,
                Method::PUT,
                &format!("/courses/{}", id),
                Some(json!({"name": "Renamed"})),
            )
            .await;
            let (delete_status, _) = send(&app, Method::DELETE, &format!("/courses/{}", id), None).await;
            (put_status, delete_status)
        }));
    }

    for task in tasks {
        let (put_status, delete_status) = task.await.unwrap();
        assert_eq!(put_status, StatusCode::OK);
        assert_eq!(delete_status, StatusCode::OK);
    }

    let (_, list) = get(&app, "/courses").await;
    assert_eq!(list["count"], 0);
}
