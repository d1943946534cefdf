//! 탭 배지 모델.
//!
//! origin별 활성 세션 수를 호스트 UI에 표시할 제목/배지 텍스트로 변환.

use serde::{Deserialize, Serialize};

use crate::config::ExporterConfig;
use crate::models::session::OriginCounts;

const BADGE_TITLE: &str = "WebRTC Internals Exporter";

/// 배지 표시 내용
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// 툴팁 제목
    pub title: String,
    /// 배지 텍스트 (비활성 origin은 빈 문자열)
    pub text: String,
    /// 수집 활성화 여부
    pub enabled: bool,
}

impl Badge {
    /// origin의 배지 계산
    pub fn for_origin(config: &ExporterConfig, counts: &OriginCounts, origin: &str) -> Self {
        if config.is_origin_enabled(origin) {
            let active = counts.get(origin).copied().unwrap_or(0);
            Self {
                title: format!("{BADGE_TITLE}\nActive Peer Connections: {active}"),
                text: active.to_string(),
                enabled: true,
            }
        } else {
            Self {
                title: format!("{BADGE_TITLE} (disabled)"),
                text: String::new(),
                enabled: false,
            }
        }
    }
}
