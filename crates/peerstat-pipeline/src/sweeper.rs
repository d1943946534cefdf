//! 오래된 세션 정리기.
//!
//! 마지막 갱신이 임계값보다 오래된 세션마다 삭제 전송을 동시에 실행한다.
//! 개별 실패는 다른 삭제에 영향을 주지 않으며 보고서에만 남는다.

use futures::future::join_all;
use peerstat_core::config::ExporterConfig;
use peerstat_core::error::CoreError;
use peerstat_core::models::session::SessionKey;
use peerstat_core::ports::transport::GatewayMethod;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::delivery::DeliveryClient;
use crate::tracker::SessionTracker;

/// 삭제 실패 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    /// 세션 ID
    pub id: String,
    /// 실패 사유
    pub error: String,
}

/// 한 번의 정리 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 검사한 세션 수
    pub checked: usize,
    /// 삭제된 세션 ID
    pub removed: Vec<String>,
    /// 삭제 실패
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    /// stale 세션 수
    pub fn stale(&self) -> usize {
        self.removed.len() + self.failed.len()
    }
}

/// 오래된 세션 정리기
pub struct Sweeper {
    delivery: Arc<DeliveryClient>,
    tracker: Arc<SessionTracker>,
}

impl Sweeper {
    /// 새 정리기 생성
    pub fn new(delivery: Arc<DeliveryClient>, tracker: Arc<SessionTracker>) -> Self {
        Self { delivery, tracker }
    }

    /// `now_ms - last_update > threshold_ms`인 세션 삭제
    pub async fn sweep(
        &self,
        config: &ExporterConfig,
        now_ms: i64,
        threshold_ms: u64,
    ) -> Result<SweepReport, CoreError> {
        let sessions = self.tracker.sessions().await?;
        debug!(count = sessions.len(), "checking stale peer connections");

        if sessions.is_empty() {
            return Ok(SweepReport::default());
        }

        let threshold = i64::try_from(threshold_ms).unwrap_or(i64::MAX);
        let stale: Vec<SessionKey> = sessions
            .iter()
            .filter(|(_, record)| now_ms.saturating_sub(record.last_update) > threshold)
            .map(|(id, record)| SessionKey::new(id.clone(), record.origin.clone()))
            .collect();

        let outcomes = join_all(stale.iter().map(|key| async move {
            info!(id = %key.id, origin = %key.origin, "removing stale peer connection metrics");
            let result = self
                .delivery
                .send(config, GatewayMethod::Delete, key, None)
                .await;
            (key, result)
        }))
        .await;

        let mut report = SweepReport {
            checked: sessions.len(),
            ..SweepReport::default()
        };
        for (key, result) in outcomes {
            match result {
                Ok(_) => report.removed.push(key.id.clone()),
                Err(e) => {
                    warn!(id = %key.id, "stale 세션 삭제 실패: {e}");
                    report.failed.push(SweepFailure {
                        id: key.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// 현재 시각과 설정의 임계값으로 정리
    pub async fn sweep_now(&self, config: &ExporterConfig) -> Result<SweepReport, CoreError> {
        self.sweep(
            config,
            chrono::Utc::now().timestamp_millis(),
            config.stale_threshold_ms(),
        )
        .await
    }
}
