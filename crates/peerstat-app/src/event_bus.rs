//! 내부 이벤트 버스.
//!
//! `tokio::broadcast` 기반 내부 이벤트 라우팅. 세션 추적기의 관찰자 통지를
//! 이벤트로 발행하고, 배지 로거가 이를 구독한다.

use peerstat_core::config::ExporterConfig;
use peerstat_core::config_manager::ConfigManager;
use peerstat_core::models::badge::Badge;
use peerstat_core::models::session::OriginCounts;
use peerstat_core::ports::observer::SessionObserver;
use std::collections::BTreeSet;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::lifecycle::wait_for_shutdown;

/// 내부 앱 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// origin별 활성 세션 수 변경
    OriginCountsChanged(OriginCounts),
    /// 정리 완료
    SweepCompleted {
        checked: usize,
        removed: usize,
        failed: usize,
    },
}

/// 내부 이벤트 버스
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// 새 이벤트 버스 생성
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 이벤트 발행
    pub fn publish(&self, event: AppEvent) {
        debug!("이벤트 발행: {:?}", std::mem::discriminant(&event));
        let _ = self.tx.send(event);
    }

    /// 구독자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// 세션 관찰자 어댑터 생성
    pub fn observer(&self) -> BusObserver {
        BusObserver {
            tx: self.tx.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

/// `SessionObserver` 포트 구현: 통지를 버스 이벤트로 발행
#[derive(Clone)]
pub struct BusObserver {
    tx: broadcast::Sender<AppEvent>,
}

impl SessionObserver for BusObserver {
    fn origin_counts_changed(&self, counts: &OriginCounts) {
        let _ = self.tx.send(AppEvent::OriginCountsChanged(counts.clone()));
    }
}

/// 이전/현재 카운트에 등장한 origin들의 배지 계산
///
/// 세션이 모두 사라진 origin도 0으로 다시 그려야 하므로 양쪽 합집합을 본다.
pub fn badge_updates(
    config: &ExporterConfig,
    previous: &OriginCounts,
    current: &OriginCounts,
) -> Vec<(String, Badge)> {
    let origins: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();
    origins
        .into_iter()
        .filter(|origin| previous.get(*origin) != current.get(*origin))
        .map(|origin| {
            (
                origin.clone(),
                Badge::for_origin(config, current, origin),
            )
        })
        .collect()
}

/// 배지 변경 로거
///
/// 호스트 UI 대신 origin별 배지 변경을 로그로 남긴다.
pub async fn run_badge_logger(
    mut events: broadcast::Receiver<AppEvent>,
    config: ConfigManager,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut previous = OriginCounts::new();

    loop {
        tokio::select! {
            received = events.recv() => {
                match received {
                    Ok(AppEvent::OriginCountsChanged(current)) => {
                        let snapshot = config.snapshot();
                        let updates = badge_updates(&snapshot.exporter, &previous, &current);
                        for (origin, badge) in updates {
                            info!(
                                %origin,
                                text = %badge.text,
                                enabled = badge.enabled,
                                "배지 갱신: {}",
                                badge.title
                            );
                        }
                        previous = current;
                    }
                    Ok(AppEvent::SweepCompleted { checked, removed, failed }) => {
                        debug!(checked, removed, failed, "정리 이벤트 수신");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("배지 로거 이벤트 {skipped}개 누락");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = wait_for_shutdown(&mut shutdown_rx) => {
                debug!("배지 로거 종료");
                break;
            }
        }
    }
}
