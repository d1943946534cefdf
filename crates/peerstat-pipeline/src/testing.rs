//! 테스트용 포트 구현.

use async_trait::async_trait;
use peerstat_core::error::CoreError;
use peerstat_core::models::session::OriginCounts;
use peerstat_core::ports::observer::SessionObserver;
use peerstat_core::ports::transport::{GatewayRequest, GatewayResponse, MetricsTransport};
use std::sync::Mutex;

/// 요청을 기록하고 미리 정한 응답을 돌려주는 전송
pub struct MockTransport {
    default_status: u16,
    default_body: String,
    /// URL에 이 문자열이 포함되면 해당 응답
    overrides: Vec<(String, Result<(u16, String), String>)>,
    requests: Mutex<Vec<GatewayRequest>>,
}

impl MockTransport {
    pub fn ok() -> Self {
        Self::with_status(200, "")
    }

    pub fn with_status(status: u16, body: &str) -> Self {
        Self {
            default_status: status,
            default_body: body.to_string(),
            overrides: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_for(mut self, url_part: &str, status: u16, body: &str) -> Self {
        self.overrides
            .push((url_part.to_string(), Ok((status, body.to_string()))));
        self
    }

    pub fn fail_for(mut self, url_part: &str, message: &str) -> Self {
        self.overrides
            .push((url_part.to_string(), Err(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsTransport for MockTransport {
    async fn execute(&self, request: GatewayRequest) -> Result<GatewayResponse, CoreError> {
        let outcome = self
            .overrides
            .iter()
            .find(|(part, _)| request.url.contains(part.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| Ok((self.default_status, self.default_body.clone())));

        self.requests.lock().unwrap().push(request);

        match outcome {
            Ok((status, body)) => Ok(GatewayResponse { status, body }),
            Err(message) => Err(CoreError::Network(message)),
        }
    }
}

/// 통지받은 카운트를 기록하는 관찰자
#[derive(Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<OriginCounts>>,
}

impl RecordingObserver {
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<OriginCounts> {
        self.seen.lock().unwrap().last().cloned()
    }
}

impl SessionObserver for RecordingObserver {
    fn origin_counts_changed(&self, counts: &OriginCounts) {
        self.seen.lock().unwrap().push(counts.clone());
    }
}
