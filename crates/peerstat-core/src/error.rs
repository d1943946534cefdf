//! peerstat 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 라이브러리 에러를 `CoreError`로 매핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 전송 계층 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 원격 엔드포인트가 비성공 상태 코드로 응답
    ///
    /// 표시 문자열은 인바운드 응답의 `error` 값으로 그대로 전달된다.
    #[error("Response status: {status} error: {body}")]
    RemoteRejection {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문
        body: String,
    },

    /// 지원하지 않는 인바운드 이벤트
    #[error("unknown event")]
    UnknownEvent,

    /// 영속 상태 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}
