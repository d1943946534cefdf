//! 메트릭 전송 포트.
//!
//! 요청/응답 수준의 원시 HTTP 전송. 인증·압축·통계는 호출자 책임.
//!
//! 구현: `peerstat-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;

/// 메트릭 그룹 요청 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMethod {
    /// 메트릭 그룹 upsert
    Push,
    /// 메트릭 그룹 삭제
    Delete,
}

impl GatewayMethod {
    /// HTTP 메서드 이름
    pub fn as_http(self) -> &'static str {
        match self {
            Self::Push => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// 전송 요청
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// 요청 종류
    pub method: GatewayMethod,
    /// 대상 URL
    pub url: String,
    /// 요청 헤더 (이름, 값)
    pub headers: Vec<(String, String)>,
    /// 본문 (Push에만 존재)
    pub body: Option<Vec<u8>>,
}

impl GatewayRequest {
    /// 헤더 값 조회 (대소문자 무시)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 전송 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    /// HTTP 상태 코드
    pub status: u16,
    /// 응답 본문
    pub body: String,
}

impl GatewayResponse {
    /// 2xx 여부
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 원시 HTTP 전송
#[async_trait]
pub trait MetricsTransport: Send + Sync {
    /// 요청 실행
    ///
    /// 연결 실패/타임아웃은 `CoreError::Network`. 비성공 상태 코드는
    /// 에러가 아니라 응답으로 반환된다.
    async fn execute(&self, request: GatewayRequest) -> Result<GatewayResponse, CoreError>;
}
