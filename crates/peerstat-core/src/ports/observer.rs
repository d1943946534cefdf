//! 세션 변경 관찰자 포트.
//!
//! 구현: `peerstat-app` crate (이벤트 버스)

use crate::models::session::OriginCounts;

/// origin별 활성 세션 수 변경 통지
///
/// 호출자는 결과를 기다리지 않는다. 구현은 블로킹 없이 반환해야 한다.
pub trait SessionObserver: Send + Sync {
    /// 세션 기록이 바뀐 뒤 새 집계와 함께 호출
    fn origin_counts_changed(&self, counts: &OriginCounts);
}
