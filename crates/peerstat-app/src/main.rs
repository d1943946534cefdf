//! # peerstat
//!
//! WebRTC stats 익스포터 에이전트 진입점.
//! DI 컨테이너 역할, 라이프사이클 관리, 스케줄러 오케스트레이션.

use anyhow::{Context, Result};
use clap::Parser;
use peerstat_app::event_bus::{run_badge_logger, EventBus};
use peerstat_app::lifecycle::LifecycleManager;
use peerstat_app::scheduler::SweepScheduler;
use peerstat_app::server::InboundServer;
use peerstat_core::config::AppConfig;
use peerstat_core::config_manager::ConfigManager;
use peerstat_core::ports::state_store::StateStore;
use peerstat_network::compression::GzipCompressor;
use peerstat_network::http_transport::ReqwestTransport;
use peerstat_pipeline::Pipeline;
use peerstat_storage::memory::MemoryStateStore;
use peerstat_storage::sqlite::SqliteStateStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 상태 DB 파일 이름
const STATE_DB_FILE: &str = "state.db";

/// 종료 시 백그라운드 작업 대기 한도
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// WebRTC stats를 Pushgateway로 내보내는 에이전트
#[derive(Parser, Debug)]
#[command(name = "peerstat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Pushgateway URL (설정 파일에도 저장됨)
    #[arg(long, short = 'u')]
    url: Option<String>,

    /// Pushgateway job 이름 (설정 파일에도 저장됨)
    #[arg(long, short = 'j')]
    job: Option<String>,

    /// 인바운드 엔드포인트 포트 (설정 파일에도 저장됨)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// 상태 DB 디렉토리 (기본: 플랫폼 데이터 디렉토리)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 상태를 메모리에만 보관 (재시작 시 초기화)
    #[arg(long)]
    in_memory: bool,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

impl Args {
    fn has_overrides(&self) -> bool {
        self.url.is_some() || self.job.is_some() || self.port.is_some()
    }

    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.url {
            config.exporter.url = url.clone();
        }
        if let Some(job) = &self.job {
            config.exporter.job = job.clone();
        }
        if let Some(port) = self.port {
            config.agent.listen_port = port;
        }
    }
}

/// 설정 관리자 생성
///
/// 플랫폼 설정 경로를 쓸 수 없으면 메모리 전용 기본 설정으로 계속한다.
fn load_config_manager(args: &Args) -> Result<ConfigManager> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone())
            .with_context(|| format!("설정 파일 로드 실패: {}", path.display()))?,
        None => ConfigManager::new().unwrap_or_else(|e| {
            warn!("설정 관리자 초기화 실패, 메모리 전용 기본 설정 사용: {e}");
            ConfigManager::in_memory(AppConfig::default_config())
        }),
    };

    if args.has_overrides() {
        manager
            .update_with(|config| args.apply_overrides(config))
            .context("CLI 설정 적용 실패")?;
    }

    Ok(manager)
}

/// 상태 DB 경로 결정 (CLI > 설정 파일 > 플랫폼 기본 경로)
///
/// # 플랫폼별 기본 경로:
/// - macOS: `~/Library/Application Support/io.peerstat.peerstat/state.db`
/// - Windows: `%APPDATA%\peerstat\peerstat\data\state.db`
/// - Linux: `~/.local/share/peerstat/state.db`
fn resolve_state_path(data_dir: Option<&Path>, config: &AppConfig) -> PathBuf {
    data_dir
        .map(|d| d.join(STATE_DB_FILE))
        .or_else(|| config.storage.state_path.clone())
        .or_else(|| {
            ConfigManager::data_dir()
                .ok()
                .map(|d| d.join(STATE_DB_FILE))
        })
        .unwrap_or_else(|| PathBuf::from(STATE_DB_FILE))
}

fn open_state_store(args: &Args, config: &AppConfig) -> Result<Arc<dyn StateStore>> {
    if args.in_memory {
        info!("상태 저장소: 메모리");
        return Ok(Arc::new(MemoryStateStore::new()));
    }

    let path = resolve_state_path(args.data_dir.as_deref(), config);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("데이터 디렉토리 생성 실패: {}", parent.display())
            })?;
        }
    }

    let store = SqliteStateStore::open(&path)?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "peerstat={lvl},peerstat_app={lvl},peerstat_core={lvl},peerstat_network={lvl},\
         peerstat_storage={lvl},peerstat_pipeline={lvl},tower_http={lvl}",
        lvl = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("peerstat 에이전트 시작");

    let config_manager = load_config_manager(&args)?;
    if let Some(path) = config_manager.config_path() {
        info!("설정 파일: {}", path.display());
    }
    let config = config_manager.snapshot();
    config.validate()?;
    info!(
        "Pushgateway: {} (job={}, gzip={})",
        config.exporter.url, config.exporter.job, config.exporter.gzip
    );

    // ── 어댑터 생성 (DI 와이어링) ──
    let store = open_state_store(&args, &config)?;
    let transport = Arc::new(
        ReqwestTransport::new(config.request_timeout())?.with_config(config_manager.clone()),
    );
    let compressor = Arc::new(GzipCompressor::new());
    let bus = Arc::new(EventBus::default());
    let observer = Arc::new(bus.observer());

    let pipeline = Pipeline::new(transport, store, compressor, observer);
    let mut lifecycle = LifecycleManager::new();

    // ── 배지 로거 ──
    let badge_rx = bus.subscribe();
    let badge_config = config_manager.clone();
    lifecycle.spawn("badge-logger", move |shutdown_rx| {
        run_badge_logger(badge_rx, badge_config, shutdown_rx)
    });

    // ── 정리 스케줄러 ──
    let scheduler = SweepScheduler::new(pipeline.sweeper.clone(), config_manager.clone())
        .with_event_bus(bus.clone());
    lifecycle.spawn("sweep-scheduler", move |shutdown_rx| scheduler.run(shutdown_rx));

    // ── 인바운드 엔드포인트 ──
    let server = InboundServer::new(pipeline, config_manager.clone());
    let listener = server
        .bind()
        .await
        .with_context(|| format!("포트 {} 바인드 실패", config.agent.listen_port))?;
    lifecycle.spawn("inbound-server", move |shutdown_rx| async move {
        if let Err(e) = server.serve(listener, shutdown_rx).await {
            error!("인바운드 엔드포인트 오류: {e}");
        }
    });

    lifecycle.wait_for_signal().await;

    let total = lifecycle.task_count();
    let finished = lifecycle.drain(SHUTDOWN_GRACE).await;
    if finished < total {
        warn!("백그라운드 작업 {}/{}개만 정상 종료", finished, total);
    }

    info!("peerstat 에이전트 종료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["peerstat"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn cli_overrides_apply() {
        let args = args(&["--url", "https://push.example", "--job", "calls", "--port", "9200"]);
        assert!(args.has_overrides());

        let mut config = AppConfig::default_config();
        args.apply_overrides(&mut config);
        assert_eq!(config.exporter.url, "https://push.example");
        assert_eq!(config.exporter.job, "calls");
        assert_eq!(config.agent.listen_port, 9200);
    }

    #[test]
    fn no_overrides_by_default() {
        let args = args(&[]);
        assert!(!args.has_overrides());
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn state_path_prefers_cli_dir() {
        let mut config = AppConfig::default_config();
        config.storage.state_path = Some(PathBuf::from("/var/lib/peerstat/custom.db"));

        assert_eq!(
            resolve_state_path(Some(Path::new("/tmp/ps")), &config),
            PathBuf::from("/tmp/ps/state.db")
        );
        assert_eq!(
            resolve_state_path(None, &config),
            PathBuf::from("/var/lib/peerstat/custom.db")
        );
    }

    #[test]
    fn config_file_receives_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let path_arg = path.to_string_lossy().to_string();
        let args = args(&["--config", &path_arg, "--job", "calls"]);

        let manager = load_config_manager(&args).unwrap();
        assert_eq!(manager.snapshot().exporter.job, "calls");

        let reloaded = ConfigManager::with_path(path).unwrap();
        assert_eq!(reloaded.snapshot().exporter.job, "calls");
    }

    #[test]
    fn in_memory_store_skips_sqlite() {
        let args = args(&["--in-memory"]);
        assert!(open_state_store(&args, &AppConfig::default_config()).is_ok());
    }
}
