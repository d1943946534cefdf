//! 전송 클라이언트.
//!
//! 인코딩된 메트릭(또는 삭제 요청)을 게이트웨이로 보낸다. 인증 헤더와
//! 선택적 압축을 적용하고, 전송 통계를 갱신하며, 원격 성공이 확인된 뒤에만
//! 세션 추적기를 갱신한다.

use base64::Engine;
use peerstat_core::config::ExporterConfig;
use peerstat_core::error::CoreError;
use peerstat_core::models::session::{DeliveryStats, SessionKey};
use peerstat_core::ports::compressor::Compressor;
use peerstat_core::ports::state_store::StateStore;
use peerstat_core::ports::transport::{GatewayMethod, GatewayRequest, MetricsTransport};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::state;
use crate::tracker::SessionTracker;

/// 요청 본문 Content-Type
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// 전송 클라이언트
pub struct DeliveryClient {
    transport: Arc<dyn MetricsTransport>,
    store: Arc<dyn StateStore>,
    tracker: Arc<SessionTracker>,
    compressor: Arc<dyn Compressor>,
    /// 전송 통계 read-modify-write 직렬화
    stats_lock: Mutex<()>,
}

impl DeliveryClient {
    /// 새 전송 클라이언트 생성
    pub fn new(
        transport: Arc<dyn MetricsTransport>,
        store: Arc<dyn StateStore>,
        tracker: Arc<SessionTracker>,
        compressor: Arc<dyn Compressor>,
    ) -> Self {
        Self {
            transport,
            store,
            tracker,
            compressor,
            stats_lock: Mutex::new(()),
        }
    }

    /// 메트릭 그룹 전송
    ///
    /// 성공 시 응답 본문을 반환한다. 비성공 상태 코드는 `errors`만 올리고
    /// `CoreError::RemoteRejection`으로 실패하며, 세션 기록은 건드리지 않는다.
    pub async fn send(
        &self,
        config: &ExporterConfig,
        method: GatewayMethod,
        session: &SessionKey,
        payload: Option<&str>,
    ) -> Result<String, CoreError> {
        let mut headers = vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())];
        if config.has_credentials() {
            headers.push(("Authorization".to_string(), basic_auth(config)));
        }

        let body = match (method, payload) {
            (GatewayMethod::Push, Some(text)) if config.gzip => {
                headers.push((
                    "Content-Encoding".to_string(),
                    self.compressor.content_encoding().to_string(),
                ));
                Some(self.compressor.compress(text.as_bytes())?)
            }
            (GatewayMethod::Push, Some(text)) => Some(text.as_bytes().to_vec()),
            _ => None,
        };
        let body_len = body.as_ref().map(|b| b.len() as u64);

        let request = GatewayRequest {
            method,
            url: config.gateway_url(&session.id),
            headers,
            body,
        };

        let start_ms = chrono::Utc::now().timestamp_millis();
        let started = Instant::now();
        let response = self.transport.execute(request).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !response.is_success() {
            if let Err(e) = self.record(|stats| stats.errors += 1).await {
                warn!("에러 카운터 저장 실패: {e}");
            }
            warn!(
                id = %session.id,
                status = response.status,
                "게이트웨이 거부: {}",
                response.body
            );
            return Err(CoreError::RemoteRejection {
                status: response.status,
                body: response.body,
            });
        }

        if let Some(bytes) = body_len {
            self.record(|stats| {
                stats.messages_sent += 1;
                stats.bytes_sent += bytes;
                stats.total_time_ms += elapsed_ms;
            })
            .await?;
        }

        match method {
            GatewayMethod::Push => {
                self.tracker.refresh(session, start_ms).await?;
            }
            GatewayMethod::Delete => {
                self.tracker.clear(session).await?;
            }
        }

        debug!(
            id = %session.id,
            method = method.as_http(),
            elapsed_ms,
            "메트릭 전송 완료"
        );
        Ok(response.body)
    }

    /// 현재 전송 통계
    pub async fn stats(&self) -> Result<DeliveryStats, CoreError> {
        state::load_delivery_stats(self.store.as_ref()).await
    }

    async fn record<F>(&self, update: F) -> Result<DeliveryStats, CoreError>
    where
        F: FnOnce(&mut DeliveryStats),
    {
        let _guard = self.stats_lock.lock().await;
        let mut stats = state::load_delivery_stats(self.store.as_ref()).await?;
        update(&mut stats);
        state::save_delivery_stats(self.store.as_ref(), &stats).await?;
        Ok(stats)
    }
}

fn basic_auth(config: &ExporterConfig) -> String {
    let credential = format!("{}:{}", config.username, config.password);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credential)
    )
}
