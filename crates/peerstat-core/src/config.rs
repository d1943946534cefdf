//! 애플리케이션 설정 구조체.
//!
//! Pushgateway 엔드포인트, 인증, 갱신 주기 등 익스포터 옵션과
//! 에이전트 런타임 설정을 정의한다. 모든 필드는 serde 기본값을 가지므로
//! 일부 필드만 있는 설정 파일도 기본값으로 채워져 로드된다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 최소 비활성 임계값 (초)
pub const MIN_STALE_THRESHOLD_SECS: u64 = 30;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 익스포터 옵션
    #[serde(default)]
    pub exporter: ExporterConfig,
    /// 에이전트 런타임 설정
    #[serde(default)]
    pub agent: AgentConfig,
    /// 영속 상태 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
}

// ============================================================
// 익스포터 설정
// ============================================================

/// 익스포터 옵션: Pushgateway 전송 대상과 수집 범위
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfig {
    /// Pushgateway 기본 URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Basic 인증 사용자명
    #[serde(default)]
    pub username: String,
    /// Basic 인증 비밀번호
    #[serde(default)]
    pub password: String,
    /// stats 보고 주기 (초)
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    /// 전송 본문 gzip 압축 여부
    #[serde(default)]
    pub gzip: bool,
    /// Pushgateway job 이름
    #[serde(default = "default_job")]
    pub job: String,
    /// 수집이 활성화된 origin 목록
    #[serde(default)]
    pub enabled_origins: BTreeMap<String, bool>,
    /// 관찰자가 수집할 stats 타입
    #[serde(default = "default_enabled_stats")]
    pub enabled_stats: Vec<String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: String::new(),
            password: String::new(),
            update_interval: default_update_interval(),
            gzip: false,
            job: default_job(),
            enabled_origins: BTreeMap::new(),
            enabled_stats: default_enabled_stats(),
        }
    }
}

impl ExporterConfig {
    /// 세션이 stale로 판정되는 비활성 임계값 (밀리초)
    ///
    /// `max(2 * update_interval, 30) * 1000`
    pub fn stale_threshold_ms(&self) -> u64 {
        self.update_interval
            .saturating_mul(2)
            .max(MIN_STALE_THRESHOLD_SECS)
            .saturating_mul(1000)
    }

    /// 사용자명과 비밀번호가 모두 설정되었는지
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// origin 수집 활성화 여부
    pub fn is_origin_enabled(&self, origin: &str) -> bool {
        self.enabled_origins.get(origin).copied().unwrap_or(false)
    }

    /// 세션 메트릭 그룹 URL
    ///
    /// `{url}/metrics/job/{job}/peerConnectionId/{id}`
    pub fn gateway_url(&self, session_id: &str) -> String {
        format!(
            "{}/metrics/job/{}/peerConnectionId/{}",
            self.url.trim_end_matches('/'),
            self.job,
            session_id
        )
    }
}

// ============================================================
// 에이전트/저장소 설정
// ============================================================

/// 에이전트 런타임 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 인바운드 이벤트 수신 포트
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// 외부 접근 허용 여부 (false: 127.0.0.1 only)
    #[serde(default)]
    pub allow_external: bool,
    /// stale 세션 정리 주기 (초)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Pushgateway 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            allow_external: false,
            sweep_interval_secs: default_sweep_interval_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// 영속 상태 저장소 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite 상태 파일 경로 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            exporter: ExporterConfig::default(),
            agent: AgentConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        let parsed = url::Url::parse(&self.exporter.url).map_err(|e| CoreError::Validation {
            field: "exporter.url".to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::Validation {
                field: "exporter.url".to_string(),
                message: format!("지원하지 않는 스킴: {}", parsed.scheme()),
            });
        }
        if self.exporter.job.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "exporter.job".to_string(),
                message: "비어 있을 수 없음".to_string(),
            });
        }
        if self.exporter.update_interval == 0 {
            return Err(CoreError::Validation {
                field: "exporter.updateInterval".to_string(),
                message: "1초 이상이어야 함".to_string(),
            });
        }
        Ok(())
    }

    /// 재시작해야 반영되는 설정 중 `next`에서 바뀐 항목
    ///
    /// 리스너 주소와 상태 DB 경로는 시작 시 한 번만 읽는다.
    pub fn restart_required_changes(&self, next: &AppConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.agent.listen_port != next.agent.listen_port {
            changed.push("agent.listen_port");
        }
        if self.agent.allow_external != next.agent.allow_external {
            changed.push("agent.allow_external");
        }
        if self.storage.state_path != next.storage.state_path {
            changed.push("storage.state_path");
        }
        changed
    }

    /// 정리 주기를 Duration으로 반환
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.agent.sweep_interval_secs.max(1))
    }

    /// 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.agent.request_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_url() -> String {
    "http://localhost:9091".to_string()
}
fn default_update_interval() -> u64 {
    2
}
fn default_job() -> String {
    "webrtc-internals-exporter".to_string()
}
fn default_enabled_stats() -> Vec<String> {
    vec![
        "inbound-rtp".to_string(),
        "remote-inbound-rtp".to_string(),
        "outbound-rtp".to_string(),
    ]
}
fn default_listen_port() -> u16 {
    9092
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
