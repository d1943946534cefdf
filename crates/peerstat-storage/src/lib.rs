//! # peerstat-storage
//!
//! `StateStore` 포트의 로컬 어댑터.
//! 세션 기록, origin별 카운트, 전송 통계를 재시작 후에도 유지한다.
//!
//! ## 모듈
//! - `sqlite`: 파일 기반 키-값 저장소 (SqliteStateStore)
//! - `memory`: 프로세스 수명 동안만 유지되는 저장소 (MemoryStateStore)
//! - `migration`: 스키마 마이그레이션

pub mod memory;
pub mod migration;
pub mod sqlite;
