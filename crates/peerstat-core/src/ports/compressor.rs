//! 압축 포트.
//!
//! 구현: `peerstat-network` crate (flate2)

use crate::error::CoreError;

/// 전송 본문 압축/해제 인터페이스
pub trait Compressor: Send + Sync {
    /// `Content-Encoding` 헤더 값 (예: "gzip")
    fn content_encoding(&self) -> &'static str;

    /// 데이터 압축
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CoreError>;

    /// 데이터 해제
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CoreError>;
}
