//! 세션 모델.
//!
//! 세션 식별자, 마지막 갱신 기록, origin별 활성 세션 수, 전송 누적 통계.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 세션 식별 정보 (id + 소유 페이지 origin)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    /// 피어 연결 ID
    pub id: String,
    /// 페이지 origin (scheme+host+port)
    pub origin: String,
}

impl SessionKey {
    /// 새 세션 키 생성
    pub fn new(id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
        }
    }
}

/// 세션 마지막 갱신 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// 페이지 origin
    pub origin: String,
    /// 마지막 성공 전송 시각 (epoch 밀리초)
    pub last_update: i64,
}

/// 세션 ID → 마지막 갱신 기록
pub type SessionMap = BTreeMap<String, SessionRecord>;

/// origin → 활성 세션 수
pub type OriginCounts = BTreeMap<String, u64>;

/// 세션 기록을 origin별로 집계
pub fn count_by_origin(sessions: &SessionMap) -> OriginCounts {
    let mut counts = OriginCounts::new();
    for record in sessions.values() {
        *counts.entry(record.origin.clone()).or_insert(0) += 1;
    }
    counts
}

/// 전송 누적 통계 (단조 증가)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    /// 전송한 메시지 수
    pub messages_sent: u64,
    /// 전송한 바이트 수 (압축 후)
    pub bytes_sent: u64,
    /// 누적 응답 대기 시간 (밀리초)
    #[serde(rename = "totalTime")]
    pub total_time_ms: u64,
    /// 실패 응답 수
    pub errors: u64,
}

impl DeliveryStats {
    /// 메시지당 평균 지연 (밀리초)
    pub fn avg_latency_ms(&self) -> Option<f64> {
        if self.messages_sent == 0 {
            None
        } else {
            Some(self.total_time_ms as f64 / self.messages_sent as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(origin: &str) -> SessionRecord {
        SessionRecord {
            origin: origin.to_string(),
            last_update: 1,
        }
    }

    #[test]
    fn counts_group_by_origin() {
        let mut sessions = SessionMap::new();
        sessions.insert("pc1".to_string(), record("https://a.test"));
        sessions.insert("pc2".to_string(), record("https://a.test"));
        sessions.insert("pc3".to_string(), record("https://b.test"));

        let counts = count_by_origin(&sessions);
        assert_eq!(counts.get("https://a.test"), Some(&2));
        assert_eq!(counts.get("https://b.test"), Some(&1));
        assert_eq!(counts.values().sum::<u64>(), sessions.len() as u64);
    }

    #[test]
    fn empty_sessions_have_no_origins() {
        assert!(count_by_origin(&SessionMap::new()).is_empty());
    }

    #[test]
    fn session_record_uses_camel_case() {
        let json = serde_json::to_value(record("https://a.test")).unwrap();
        assert_eq!(json["lastUpdate"], 1);
        assert_eq!(json["origin"], "https://a.test");
    }

    #[test]
    fn average_latency() {
        let stats = DeliveryStats {
            messages_sent: 4,
            bytes_sent: 100,
            total_time_ms: 40,
            errors: 0,
        };
        assert_eq!(stats.avg_latency_ms(), Some(10.0));
        assert_eq!(DeliveryStats::default().avg_latency_ms(), None);
    }
}
