//! peerstat 도메인 모델.
//!
//! 인바운드 이벤트, stats 레코드, 세션 기록, 전송 통계, 배지를 정의한다.

pub mod badge;
pub mod event;
pub mod session;
pub mod stats;
