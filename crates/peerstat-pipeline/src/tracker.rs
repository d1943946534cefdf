//! 세션 수명 추적기.
//!
//! 세션 ID → (origin, 마지막 갱신 시각) 매핑의 유일한 변경 주체.
//! 매핑이 바뀔 때마다 origin별 카운트를 전체 재계산해 함께 저장하고,
//! 관찰자에게 새 카운트를 알린다.

use peerstat_core::error::CoreError;
use peerstat_core::models::session::{
    count_by_origin, OriginCounts, SessionKey, SessionMap, SessionRecord,
};
use peerstat_core::ports::observer::SessionObserver;
use peerstat_core::ports::state_store::StateStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::state;

/// 세션 수명 추적기
pub struct SessionTracker {
    store: Arc<dyn StateStore>,
    observer: Arc<dyn SessionObserver>,
    /// 매핑 read-modify-write 직렬화
    write_lock: Mutex<()>,
}

impl SessionTracker {
    /// 새 추적기 생성
    pub fn new(store: Arc<dyn StateStore>, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            store,
            observer,
            write_lock: Mutex::new(()),
        }
    }

    /// 세션 기록 갱신
    ///
    /// `timestamp`가 있으면 upsert, 없으면 삭제. 저장 후 재계산된 카운트를 반환한다.
    pub async fn touch(
        &self,
        session: &SessionKey,
        timestamp: Option<i64>,
    ) -> Result<OriginCounts, CoreError> {
        let counts = {
            let _guard = self.write_lock.lock().await;

            let mut sessions = state::load_sessions(self.store.as_ref()).await?;
            match timestamp {
                Some(last_update) => {
                    sessions.insert(
                        session.id.clone(),
                        SessionRecord {
                            origin: session.origin.clone(),
                            last_update,
                        },
                    );
                }
                None => {
                    sessions.remove(&session.id);
                }
            }

            let counts = count_by_origin(&sessions);
            state::save_sessions(self.store.as_ref(), &sessions, &counts).await?;
            debug!(
                id = %session.id,
                origin = %session.origin,
                active = sessions.len(),
                "세션 기록 갱신"
            );
            counts
        };

        self.observer.origin_counts_changed(&counts);
        Ok(counts)
    }

    /// 성공 전송 후 마지막 갱신 시각 기록
    pub async fn refresh(
        &self,
        session: &SessionKey,
        timestamp_ms: i64,
    ) -> Result<OriginCounts, CoreError> {
        self.touch(session, Some(timestamp_ms)).await
    }

    /// 삭제 전송 후 세션 제거
    pub async fn clear(&self, session: &SessionKey) -> Result<OriginCounts, CoreError> {
        self.touch(session, None).await
    }

    /// 현재 세션 기록
    pub async fn sessions(&self) -> Result<SessionMap, CoreError> {
        state::load_sessions(self.store.as_ref()).await
    }

    /// 현재 origin별 활성 세션 수
    pub async fn origin_counts(&self) -> Result<OriginCounts, CoreError> {
        state::load_origin_counts(self.store.as_ref()).await
    }
}
