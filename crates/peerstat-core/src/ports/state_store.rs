//! 영속 상태 저장소 포트.
//!
//! 문자열 키 → JSON 값의 단순 매핑. 원자성은 보장하지 않는다.
//!
//! 구현: `peerstat-storage` crate (rusqlite, 인메모리)

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::CoreError;

/// 키 → JSON 값
pub type StateEntries = BTreeMap<String, Value>;

/// 영속 키-값 저장소
#[async_trait]
pub trait StateStore: Send + Sync {
    /// 주어진 키들의 값 조회 (없는 키는 결과에서 빠진다)
    async fn get(&self, keys: &[&str]) -> Result<StateEntries, CoreError>;

    /// 여러 키를 한 번에 저장 (기존 값 덮어쓰기)
    async fn set(&self, entries: StateEntries) -> Result<(), CoreError>;
}
