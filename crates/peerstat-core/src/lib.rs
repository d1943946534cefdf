//! # peerstat-core
//!
//! peerstat 도메인 모델, 포트(trait) 정의, 에러 타입, 설정.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: stats 레코드, 세션 기록, 인바운드 이벤트
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 익스포터/에이전트 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 + 변경 통지

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
