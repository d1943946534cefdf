//! 인바운드 이벤트 모델.
//!
//! 관찰자가 보내는 메시지 `{ event, data }`와 응답 `{}` / `{ error }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::models::session::SessionKey;
use crate::models::stats::StatsRecord;

/// stats 보고 이벤트 이름
pub const PEER_CONNECTION_STATS_EVENT: &str = "peer-connection-stats";

/// 종료된 연결 상태
pub const CLOSED_STATE: &str = "closed";

/// 한 세션의 한 보고 주기 stats
#[derive(Debug, Clone, Deserialize)]
pub struct PeerConnectionStats {
    /// 페이지 URL
    pub url: String,
    /// 피어 연결 ID
    pub id: String,
    /// 연결 상태 (예: "connected", "closed")
    pub state: String,
    /// stats 레코드
    #[serde(default)]
    pub values: Vec<StatsRecord>,
}

impl PeerConnectionStats {
    /// 연결 종료 통지인지
    pub fn is_closed(&self) -> bool {
        self.state == CLOSED_STATE
    }

    /// 페이지 URL에서 origin을 구해 세션 키 생성
    pub fn session_key(&self) -> Result<SessionKey, CoreError> {
        let parsed = url::Url::parse(&self.url).map_err(|e| CoreError::Validation {
            field: "url".to_string(),
            message: format!("{}: {e}", self.url),
        })?;
        Ok(SessionKey::new(
            self.id.clone(),
            parsed.origin().ascii_serialization(),
        ))
    }
}

/// 인바운드 메시지
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// stats 스냅샷 또는 종료 통지
    PeerConnectionStats(PeerConnectionStats),
    /// 알 수 없는 이벤트 종류
    Unknown(Option<String>),
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Value,
}

impl InboundMessage {
    /// JSON 메시지 파싱
    ///
    /// 이벤트 이름이 없거나 모르는 이름이면 `Unknown`, 알려진 이벤트의
    /// `data`가 잘못되었으면 에러.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let raw: RawMessage = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(_) => return Ok(Self::Unknown(None)),
        };

        match raw.event.as_deref() {
            Some(PEER_CONNECTION_STATS_EVENT) => {
                let stats: PeerConnectionStats = serde_json::from_value(raw.data)?;
                Ok(Self::PeerConnectionStats(stats))
            }
            _ => Ok(Self::Unknown(raw.event)),
        }
    }
}

/// 인바운드 응답: 성공 시 `{}`, 실패 시 `{ "error": "..." }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// 실패 사유
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EventResponse {
    /// 성공 응답
    pub fn ok() -> Self {
        Self { error: None }
    }

    /// 실패 응답
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    /// 성공 여부
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Result<(), CoreError>> for EventResponse {
    fn from(result: Result<(), CoreError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::error(e.to_string()),
        }
    }
}
