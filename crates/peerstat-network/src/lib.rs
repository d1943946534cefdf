//! # peerstat-network
//!
//! 메트릭 게이트웨이로 나가는 쪽의 어댑터.
//! stats 레코드를 gauge 텍스트로 인코딩하고, gzip 압축과
//! reqwest 기반 HTTP 전송을 제공한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use peerstat_network::exposition;
//! use peerstat_network::http_transport::ReqwestTransport;
//!
//! let text = exposition::encode(&stats.url, &stats.state, &stats.values);
//! let transport = ReqwestTransport::new(Duration::from_secs(30))?;
//! ```

pub mod compression;
pub mod exposition;
pub mod http_transport;
