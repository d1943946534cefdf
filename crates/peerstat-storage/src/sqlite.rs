//! SQLite 상태 저장소 어댑터.
//!
//! `StateStore` 포트 구현. 값은 JSON 텍스트로 `kv` 테이블에 저장된다.

use async_trait::async_trait;
use peerstat_core::error::CoreError;
use peerstat_core::ports::state_store::{StateEntries, StateStore};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::migration;

/// SQLite 저장소 (`StateStore` 포트 구현)
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// 파일 기반 SQLite 저장소 생성
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        info!("SQLite 상태 저장소 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 SQLite 저장소 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, keys: &[&str]) -> Result<StateEntries, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        let mut stmt = conn
            .prepare_cached("SELECT value FROM kv WHERE key = ?1")
            .map_err(|e| CoreError::Storage(format!("조회 준비 실패: {e}")))?;

        let mut entries = StateEntries::new();
        for key in keys {
            let raw: Option<String> = stmt
                .query_row(params![key], |row| row.get(0))
                .optional()
                .map_err(|e| CoreError::Storage(format!("키 조회 실패 ({key}): {e}")))?;

            if let Some(raw) = raw {
                entries.insert((*key).to_string(), serde_json::from_str(&raw)?);
            }
        }

        Ok(entries)
    }

    async fn set(&self, entries: StateEntries) -> Result<(), CoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 시작 실패: {e}")))?;

        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO kv (key, value, updated_at)
                     VALUES (?1, ?2, datetime('now'))",
                )
                .map_err(|e| CoreError::Storage(format!("저장 준비 실패: {e}")))?;

            for (key, value) in &entries {
                let raw = serde_json::to_string(value)?;
                stmt.execute(params![key, raw])
                    .map_err(|e| CoreError::Storage(format!("키 저장 실패 ({key}): {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| CoreError::Storage(format!("커밋 실패: {e}")))?;

        debug!(count = entries.len(), "상태 저장");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entries(pairs: &[(&str, serde_json::Value)]) -> StateEntries {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        store
            .set(entries(&[
                ("messagesSent", json!(3)),
                ("peerConnectionsPerOrigin", json!({"https://a.test": 1})),
            ]))
            .await
            .unwrap();

        let got = store
            .get(&["messagesSent", "peerConnectionsPerOrigin"])
            .await
            .unwrap();
        assert_eq!(got["messagesSent"], json!(3));
        assert_eq!(got["peerConnectionsPerOrigin"]["https://a.test"], json!(1));
    }

    #[tokio::test]
    async fn missing_keys_are_absent() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let got = store.get(&["bytesSent"]).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        store.set(entries(&[("errors", json!(1))])).await.unwrap();
        store.set(entries(&[("errors", json!(2))])).await.unwrap();

        let got = store.get(&["errors"]).await.unwrap();
        assert_eq!(got["errors"], json!(2));
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.db");

        {
            let store = SqliteStateStore::open(&path).unwrap();
            store
                .set(entries(&[(
                    "peerConnectionsLastUpdate",
                    json!({"pc1": {"origin": "https://a.test", "lastUpdate": 1000}}),
                )]))
                .await
                .unwrap();
        }

        let store = SqliteStateStore::open(&path).unwrap();
        let got = store.get(&["peerConnectionsLastUpdate"]).await.unwrap();
        assert_eq!(got["peerConnectionsLastUpdate"]["pc1"]["lastUpdate"], json!(1000));
    }
}
