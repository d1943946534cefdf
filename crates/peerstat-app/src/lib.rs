//! # peerstat-app
//!
//! peerstat 에이전트 바이너리의 구성요소.
//! 인바운드 HTTP 엔드포인트, 정리 스케줄러, 내부 이벤트 버스,
//! 라이프사이클 관리를 제공하고 `main`에서 조립된다.

pub mod event_bus;
pub mod lifecycle;
pub mod scheduler;
pub mod server;
