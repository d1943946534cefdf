//! 정리 스케줄러.
//!
//! 설정된 주기마다 stale 세션 정리를 실행한다. 첫 실행은 한 주기 뒤.
//! 주기가 설정 변경으로 바뀌면 타이머를 다시 만든다.

use peerstat_core::config_manager::ConfigManager;
use peerstat_pipeline::sweeper::{SweepReport, Sweeper};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::event_bus::{AppEvent, EventBus};

/// 정리 스케줄러
pub struct SweepScheduler {
    sweeper: Arc<Sweeper>,
    config: ConfigManager,
    bus: Option<Arc<EventBus>>,
}

impl SweepScheduler {
    /// 새 스케줄러 생성
    pub fn new(sweeper: Arc<Sweeper>, config: ConfigManager) -> Self {
        Self {
            sweeper,
            config,
            bus: None,
        }
    }

    /// 정리 결과를 발행할 이벤트 버스 설정
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// 정리 1회 실행
    ///
    /// 매 실행마다 새 설정 스냅샷을 사용한다. 실패는 로그만 남긴다.
    pub async fn run_once(&self) -> Option<SweepReport> {
        let snapshot = self.config.snapshot();
        match self.sweeper.sweep_now(&snapshot.exporter).await {
            Ok(report) => {
                if report.stale() > 0 {
                    info!(
                        checked = report.checked,
                        removed = report.removed.len(),
                        failed = report.failed.len(),
                        "stale 세션 정리 완료"
                    );
                } else {
                    debug!(checked = report.checked, "정리할 stale 세션 없음");
                }
                if let Some(bus) = &self.bus {
                    bus.publish(AppEvent::SweepCompleted {
                        checked: report.checked,
                        removed: report.removed.len(),
                        failed: report.failed.len(),
                    });
                }
                Some(report)
            }
            Err(e) => {
                warn!("stale 세션 정리 실패: {e}");
                None
            }
        }
    }

    /// 종료 신호까지 주기적으로 정리
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut config_rx = self.config.subscribe();
        let mut period = self.config.snapshot().sweep_interval();
        let mut ticker = sweep_interval(period);
        info!("정리 스케줄러 시작 (주기 {}초)", period.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                changed = config_rx.changed() => {
                    if changed.is_err() {
                        continue;
                    }
                    let next = config_rx.borrow_and_update().sweep_interval();
                    if next != period {
                        info!("정리 주기 변경: {}초 → {}초", period.as_secs(), next.as_secs());
                        period = next;
                        ticker = sweep_interval(period);
                    }
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("정리 스케줄러 종료");
                        break;
                    }
                }
            }
        }
    }
}

fn sweep_interval(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
