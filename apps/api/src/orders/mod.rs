//! Order model and persistence.
//!
//! The generation pipeline treats orders as nearly opaque: after creation it
//! only writes `status` and `full_tex`. Everything else belongs to whoever
//! fronts the service.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Generating,
    Completed,
    Failed,
}

/// A row of the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OrderRow {
    pub id: i64,
    pub theme: String,
    pub pages: i64,
    pub work_type: String,
    pub model: String,
    pub status: OrderStatus,
    pub full_tex: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inserts a new order in `created` status and returns its id.
pub async fn create_order(
    pool: &SqlitePool,
    theme: &str,
    pages: u32,
    work_type: &str,
    model: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (theme, pages, work_type, model, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(theme)
    .bind(pages as i64)
    .bind(work_type)
    .bind(model)
    .bind(OrderStatus::Created)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_order(pool: &SqlitePool, id: i64) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update_order_status(
    pool: &SqlitePool,
    id: i64,
    status: OrderStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = ?1 WHERE id = ?2")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn save_full_tex(pool: &SqlitePool, id: i64, full_tex: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET full_tex = ?1 WHERE id = ?2")
        .bind(full_tex)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    // A single connection: every pooled connection to :memory: would open its
    // own empty database.
    async fn memory_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_and_fetch_order() {
        let pool = memory_pool().await;
        let id = create_order(&pool, "Graph Databases", 20, "coursework", "test-model")
            .await
            .unwrap();

        let order = get_order(&pool, id).await.unwrap().unwrap();
        assert_eq!(order.theme, "Graph Databases");
        assert_eq!(order.pages, 20);
        assert_eq!(order.status, OrderStatus::Created);
        assert!(order.full_tex.is_none());
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let pool = memory_pool().await;
        let id = create_order(&pool, "T", 5, "essay", "m").await.unwrap();

        update_order_status(&pool, id, OrderStatus::Generating)
            .await
            .unwrap();
        let order = get_order(&pool, id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Generating);

        update_order_status(&pool, id, OrderStatus::Completed)
            .await
            .unwrap();
        let order = get_order(&pool, id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_save_full_tex() {
        let pool = memory_pool().await;
        let id = create_order(&pool, "T", 5, "essay", "m").await.unwrap();

        save_full_tex(&pool, id, "\\documentclass{article}")
            .await
            .unwrap();
        let order = get_order(&pool, id).await.unwrap().unwrap();
        assert_eq!(order.full_tex.as_deref(), Some("\\documentclass{article}"));
    }

    #[tokio::test]
    async fn test_get_missing_order_is_none() {
        let pool = memory_pool().await;
        assert!(get_order(&pool, 9999).await.unwrap().is_none());
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Generating).unwrap(),
            "\"generating\""
        );
        let status: OrderStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, OrderStatus::Failed);
    }
}
