//! 인메모리 상태 저장소.
//!
//! `StateStore` 포트 구현. `--in-memory` 실행과 테스트에서 사용한다.

use async_trait::async_trait;
use parking_lot::RwLock;
use peerstat_core::error::CoreError;
use peerstat_core::ports::state_store::{StateEntries, StateStore};

/// 인메모리 저장소 (`StateStore` 포트 구현)
#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<StateEntries>,
}

impl MemoryStateStore {
    /// 빈 저장소 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 값으로 생성
    pub fn with_entries(entries: StateEntries) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// 현재 내용 복사본
    pub fn snapshot(&self) -> StateEntries {
        self.entries.read().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, keys: &[&str]) -> Result<StateEntries, CoreError> {
        let entries = self.entries.read();
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| ((*key).to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: StateEntries) -> Result<(), CoreError> {
        self.entries.write().extend(entries);
        Ok(())
    }
}
