//! # peerstat-pipeline
//!
//! 메트릭 직렬화와 전송 신뢰성 계층.
//!
//! ## 모듈
//! - `router`: 인바운드 이벤트 → 인코더 + 전송 클라이언트
//! - `delivery`: 게이트웨이 전송, 인증/압축, 전송 통계
//! - `tracker`: 세션 기록과 origin별 카운트 (유일한 변경 주체)
//! - `sweeper`: 오래된 세션 정리
//! - `state`: 영속 상태 키와 타입 변환
//!
//! ```text
//! observer ─▶ EventRouter ─▶ exposition::encode ─▶ DeliveryClient ─▶ SessionTracker
//! timer    ─▶ Sweeper ─▶ SessionTracker(read) ─▶ DeliveryClient(DELETE) ─▶ SessionTracker
//! ```

pub mod delivery;
pub mod router;
pub mod state;
pub mod sweeper;
pub mod tracker;

#[cfg(test)]
mod testing;

use peerstat_core::ports::compressor::Compressor;
use peerstat_core::ports::observer::SessionObserver;
use peerstat_core::ports::state_store::StateStore;
use peerstat_core::ports::transport::MetricsTransport;
use std::sync::Arc;

use crate::delivery::DeliveryClient;
use crate::router::EventRouter;
use crate::sweeper::Sweeper;
use crate::tracker::SessionTracker;

/// 포트 구현들로 조립된 파이프라인 구성요소
#[derive(Clone)]
pub struct Pipeline {
    /// 세션 수명 추적기
    pub tracker: Arc<SessionTracker>,
    /// 전송 클라이언트
    pub delivery: Arc<DeliveryClient>,
    /// 오래된 세션 정리기
    pub sweeper: Arc<Sweeper>,
    /// 인바운드 이벤트 라우터
    pub router: Arc<EventRouter>,
}

impl Pipeline {
    /// 구성요소 조립
    pub fn new(
        transport: Arc<dyn MetricsTransport>,
        store: Arc<dyn StateStore>,
        compressor: Arc<dyn Compressor>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let tracker = Arc::new(SessionTracker::new(store.clone(), observer));
        let delivery = Arc::new(DeliveryClient::new(
            transport,
            store,
            tracker.clone(),
            compressor,
        ));
        let sweeper = Arc::new(Sweeper::new(delivery.clone(), tracker.clone()));
        let router = Arc::new(EventRouter::new(delivery.clone()));

        Self {
            tracker,
            delivery,
            sweeper,
            router,
        }
    }
}
