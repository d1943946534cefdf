//! 영속 상태 키와 타입 변환.
//!
//! `StateStore`의 JSON 값을 세션 기록, origin별 카운트, 전송 통계로 읽고 쓴다.
//! 없는 키는 빈 값/0으로 읽힌다.

use peerstat_core::error::CoreError;
use peerstat_core::models::session::{DeliveryStats, OriginCounts, SessionMap};
use peerstat_core::ports::state_store::{StateEntries, StateStore};
use serde_json::Value;

/// 세션 ID → 마지막 갱신 기록
pub const SESSIONS_KEY: &str = "peerConnectionsLastUpdate";
/// origin → 활성 세션 수
pub const ORIGIN_COUNTS_KEY: &str = "peerConnectionsPerOrigin";
/// 전송한 메시지 수
pub const MESSAGES_SENT_KEY: &str = "messagesSent";
/// 전송한 바이트 수
pub const BYTES_SENT_KEY: &str = "bytesSent";
/// 누적 응답 대기 시간 (밀리초)
pub const TOTAL_TIME_KEY: &str = "totalTime";
/// 실패 응답 수
pub const ERRORS_KEY: &str = "errors";

/// 세션 기록 로드
pub async fn load_sessions(store: &dyn StateStore) -> Result<SessionMap, CoreError> {
    let mut entries = store.get(&[SESSIONS_KEY]).await?;
    match entries.remove(SESSIONS_KEY) {
        Some(Value::Null) | None => Ok(SessionMap::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// origin별 카운트 로드
pub async fn load_origin_counts(store: &dyn StateStore) -> Result<OriginCounts, CoreError> {
    let mut entries = store.get(&[ORIGIN_COUNTS_KEY]).await?;
    match entries.remove(ORIGIN_COUNTS_KEY) {
        Some(Value::Null) | None => Ok(OriginCounts::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// 세션 기록과 파생 카운트를 함께 저장
pub async fn save_sessions(
    store: &dyn StateStore,
    sessions: &SessionMap,
    counts: &OriginCounts,
) -> Result<(), CoreError> {
    let mut entries = StateEntries::new();
    entries.insert(SESSIONS_KEY.to_string(), serde_json::to_value(sessions)?);
    entries.insert(ORIGIN_COUNTS_KEY.to_string(), serde_json::to_value(counts)?);
    store.set(entries).await
}

/// 전송 통계 로드
pub async fn load_delivery_stats(store: &dyn StateStore) -> Result<DeliveryStats, CoreError> {
    let entries = store
        .get(&[MESSAGES_SENT_KEY, BYTES_SENT_KEY, TOTAL_TIME_KEY, ERRORS_KEY])
        .await?;

    Ok(DeliveryStats {
        messages_sent: counter(&entries, MESSAGES_SENT_KEY),
        bytes_sent: counter(&entries, BYTES_SENT_KEY),
        total_time_ms: counter(&entries, TOTAL_TIME_KEY),
        errors: counter(&entries, ERRORS_KEY),
    })
}

/// 전송 통계 저장
pub async fn save_delivery_stats(
    store: &dyn StateStore,
    stats: &DeliveryStats,
) -> Result<(), CoreError> {
    let mut entries = StateEntries::new();
    entries.insert(MESSAGES_SENT_KEY.to_string(), stats.messages_sent.into());
    entries.insert(BYTES_SENT_KEY.to_string(), stats.bytes_sent.into());
    entries.insert(TOTAL_TIME_KEY.to_string(), stats.total_time_ms.into());
    entries.insert(ERRORS_KEY.to_string(), stats.errors.into());
    store.set(entries).await
}

fn counter(entries: &StateEntries, key: &str) -> u64 {
    match entries.get(key) {
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_f64().map(|n| n.max(0.0) as u64))
            .unwrap_or(0),
        None => 0,
    }
}
