//! 인바운드 이벤트 라우터.
//!
//! 세션당 한 보고 주기의 stats 또는 종료 통지를 받아 인코더와 전송
//! 클라이언트로 보낸다. 결과는 항상 `{}` 또는 `{ error }`로 귀결된다.

use peerstat_core::config::ExporterConfig;
use peerstat_core::error::CoreError;
use peerstat_core::models::event::{EventResponse, InboundMessage, PeerConnectionStats};
use peerstat_core::ports::transport::GatewayMethod;
use peerstat_network::exposition;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::delivery::DeliveryClient;

/// 인바운드 이벤트 라우터
pub struct EventRouter {
    delivery: Arc<DeliveryClient>,
}

impl EventRouter {
    /// 새 라우터 생성
    pub fn new(delivery: Arc<DeliveryClient>) -> Self {
        Self { delivery }
    }

    /// 파싱된 메시지 처리
    pub async fn handle(&self, config: &ExporterConfig, message: InboundMessage) -> EventResponse {
        match message {
            InboundMessage::PeerConnectionStats(stats) => {
                self.handle_stats(config, stats).await.into()
            }
            InboundMessage::Unknown(name) => {
                warn!(event = ?name, "알 수 없는 이벤트");
                EventResponse::error(CoreError::UnknownEvent.to_string())
            }
        }
    }

    /// 원시 JSON 메시지 처리
    ///
    /// 알려진 이벤트의 `data`가 잘못된 경우도 알 수 없는 이벤트로 응답한다.
    pub async fn handle_value(&self, config: &ExporterConfig, value: Value) -> EventResponse {
        match InboundMessage::from_value(value) {
            Ok(message) => self.handle(config, message).await,
            Err(e) => {
                warn!("인바운드 메시지 파싱 실패: {e}");
                EventResponse::error(CoreError::UnknownEvent.to_string())
            }
        }
    }

    async fn handle_stats(
        &self,
        config: &ExporterConfig,
        stats: PeerConnectionStats,
    ) -> Result<(), CoreError> {
        let session = stats.session_key()?;

        if stats.is_closed() {
            self.delivery
                .send(config, GatewayMethod::Delete, &session, None)
                .await?;
            return Ok(());
        }

        let text = exposition::encode(&stats.url, &stats.state, &stats.values);
        if text.is_empty() {
            debug!(id = %session.id, "메트릭 없음, 전송 생략");
            return Ok(());
        }

        let payload = format!("{text}\n");
        self.delivery
            .send(config, GatewayMethod::Push, &session, Some(&payload))
            .await?;
        Ok(())
    }
}
