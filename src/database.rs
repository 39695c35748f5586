use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, error, info, warn};

use crate::config::Config;

// 持久化使用的键
pub const HISTORY_KEY: &str = "lexicruxx_history";
pub const FAVORITES_KEY: &str = "lexicruxx_favorites";
pub const WORD_OF_DAY_KEY: &str = "lexicruxx_word_of_day";

/// 基于 SQLite 的键值存储，值统一保存为 JSON 文本。
///
/// 读写都不会向调用方返回错误：读到损坏的数据视为不存在，写入失败只记录日志。
#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &Config) -> Result<Self> {
        // 创建数据库文件路径
        let db_path = std::env::current_dir()?.join(&config.database.db_file);
        let db_url = format!("sqlite:{}", db_path.display());

        info!(path = %db_path.display(), "opening database");

        let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let manager = DatabaseManager { pool };
        manager.initialize_tables().await?;

        Ok(manager)
    }

    /// 内存数据库只能使用单个连接，否则每个连接看到的是不同的库
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let manager = DatabaseManager { pool };
        manager.initialize_tables().await?;

        Ok(manager)
    }

    async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT (datetime('now'))
            )
            "#
        ).execute(&self.pool).await?;

        Ok(())
    }

    /// 读取并解析指定键；不存在、读取失败或 JSON 损坏时都返回 None
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                error!(key, error = %e, "failed to read from storage");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "stored value is corrupt, treating as absent");
                None
            }
        }
    }

    /// 序列化后写入；失败只记录日志
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!(key, error = %e, "failed to serialize value for storage");
                return;
            }
        };

        if let Err(e) = self.set_raw(key, &raw).await {
            error!(key, error = %e, "failed to save to storage");
        } else {
            debug!(key, bytes = raw.len(), "saved to storage");
        }
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.0))
    }

    pub async fn set_raw(&self, key: &str, raw: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#
        )
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryItem;

    #[tokio::test]
    async fn missing_key_is_absent() {
        let db = DatabaseManager::in_memory().await.unwrap();
        assert_eq!(db.get::<Vec<HistoryItem>>(HISTORY_KEY).await, None);
    }

    #[tokio::test]
    async fn read_after_write_sees_new_value() {
        let db = DatabaseManager::in_memory().await.unwrap();
        let first = vec![HistoryItem { word: "cat".into(), timestamp: 100 }];
        db.set(HISTORY_KEY, &first).await;
        assert_eq!(db.get::<Vec<HistoryItem>>(HISTORY_KEY).await, Some(first));

        let second = vec![HistoryItem { word: "dog".into(), timestamp: 200 }];
        db.set(HISTORY_KEY, &second).await;
        assert_eq!(db.get::<Vec<HistoryItem>>(HISTORY_KEY).await, Some(second));
    }

    #[tokio::test]
    async fn corrupt_json_is_treated_as_absent() {
        let db = DatabaseManager::in_memory().await.unwrap();
        db.set_raw(HISTORY_KEY, "{not json").await.unwrap();
        assert_eq!(db.get::<Vec<HistoryItem>>(HISTORY_KEY).await, None);
    }

    #[tokio::test]
    async fn wrong_shape_is_treated_as_absent() {
        let db = DatabaseManager::in_memory().await.unwrap();
        db.set_raw(HISTORY_KEY, r#"{"word": "cat"}"#).await.unwrap();
        assert_eq!(db.get::<Vec<HistoryItem>>(HISTORY_KEY).await, None);
    }

    #[tokio::test]
    async fn failed_write_is_swallowed() {
        let db = DatabaseManager::in_memory().await.unwrap();
        db.close().await;
        db.set(FAVORITES_KEY, &Vec::<HistoryItem>::new()).await;
        assert_eq!(db.get::<Vec<HistoryItem>>(FAVORITES_KEY).await, None);
    }

    #[tokio::test]
    async fn file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.db_file = dir.path().join("store.db").display().to_string();

        let db = DatabaseManager::new(&config).await.unwrap();
        db.set(WORD_OF_DAY_KEY, &serde_json::json!({"date": "x", "data": []})).await;
        db.close().await;

        let reopened = DatabaseManager::new(&config).await.unwrap();
        let value: Option<serde_json::Value> = reopened.get(WORD_OF_DAY_KEY).await;
        assert_eq!(value.unwrap()["date"], "x");
    }
}
