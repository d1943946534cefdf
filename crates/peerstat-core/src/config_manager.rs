//! 설정 파일 관리.
//!
//! 플랫폼별 설정 디렉토리에 JSON 파일로 설정을 저장/로드하고,
//! 변경 시 구독자에게 불변 스냅샷을 발행한다.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 설정 관리자
///
/// 현재 설정은 `watch` 채널에 `Arc<AppConfig>`로 보관된다.
/// 각 작업은 시작 시점의 스냅샷을 받아 사용하고, 변경은 `update_config`
/// 한 곳으로만 들어온다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    tx: Arc<watch::Sender<Arc<AppConfig>>>,
    /// 설정 파일 경로 (None이면 메모리 전용)
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 플랫폼 기본 경로에서 설정 관리자 생성
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// 지정된 경로로 설정 관리자 생성
    ///
    /// 파일이 없으면 기본 설정을 저장하고, 있으면 로드한 뒤 누락 필드를
    /// 기본값으로 채워 다시 저장한다.
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "설정 디렉토리 생성 실패: {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                info!("설정 디렉토리 생성: {}", parent.display());
            }
        }

        let config = if config_path.exists() {
            let loaded = Self::load_from_file(&config_path)?;
            Self::save_to_file(&config_path, &loaded)?;
            loaded
        } else {
            let default_config = AppConfig::default_config();
            Self::save_to_file(&config_path, &default_config)?;
            info!("기본 설정 파일 생성: {}", config_path.display());
            default_config
        };

        let (tx, _) = watch::channel(Arc::new(config));
        Ok(Self {
            tx: Arc::new(tx),
            config_path: Some(config_path),
        })
    }

    /// 파일 없이 메모리에서만 동작하는 설정 관리자
    pub fn in_memory(config: AppConfig) -> Self {
        let (tx, _) = watch::channel(Arc::new(config));
        Self {
            tx: Arc::new(tx),
            config_path: None,
        }
    }

    /// 현재 설정 스냅샷
    pub fn snapshot(&self) -> Arc<AppConfig> {
        self.tx.borrow().clone()
    }

    /// 설정 교체: 검증, 파일 저장, 구독자 통지
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), CoreError> {
        new_config.validate()?;

        if let Some(path) = &self.config_path {
            Self::save_to_file(path, &new_config)?;
            debug!("설정 저장 완료: {}", path.display());
        }

        self.tx.send_replace(Arc::new(new_config));
        info!("설정 변경 적용");
        Ok(())
    }

    /// 특정 필드만 업데이트
    pub fn update_with<F>(&self, updater: F) -> Result<Arc<AppConfig>, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = (*self.snapshot()).clone();
        updater(&mut config);
        self.update_config(config)?;
        Ok(self.snapshot())
    }

    /// 설정 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppConfig>> {
        self.tx.subscribe()
    }

    /// 설정 파일 경로 반환
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 플랫폼별 설정 디렉토리 경로
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// 플랫폼별 데이터 디렉토리 경로 (상태 DB)
    pub fn data_dir() -> Result<PathBuf, CoreError> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    fn project_dirs() -> Result<ProjectDirs, CoreError> {
        ProjectDirs::from("io", "peerstat", "peerstat")
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    /// 파일에서 설정 로드
    fn load_from_file(path: &Path) -> Result<AppConfig, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("설정 파일 읽기 실패: {}: {}", path.display(), e))
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("설정 파일 파싱 실패: {}: {}", path.display(), e))
        })?;

        debug!("설정 파일 로드 완료: {}", path.display());
        Ok(config)
    }

    /// 파일에 설정 저장
    fn save_to_file(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {}", e)))?;

        fs::write(path, content).map_err(|e| {
            CoreError::Config(format!("설정 파일 저장 실패: {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        assert!(config_path.exists());
        assert_eq!(manager.snapshot().exporter.job, "webrtc-internals-exporter");
    }

    #[test]
    fn update_and_persist_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        manager
            .update_with(|c| {
                c.exporter.gzip = true;
                c.exporter.update_interval = 5;
            })
            .unwrap();

        let manager2 = ConfigManager::with_path(config_path).unwrap();
        let config = manager2.snapshot();
        assert!(config.exporter.gzip);
        assert_eq!(config.exporter.update_interval, 5);
    }

    #[test]
    fn existing_file_gets_missing_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, r#"{"exporter":{"job":"custom"}}"#).unwrap();

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        assert_eq!(manager.snapshot().exporter.job, "custom");
        assert_eq!(manager.snapshot().exporter.url, "http://localhost:9091");

        let written = fs::read_to_string(&config_path).unwrap();
        assert!(written.contains("updateInterval"));
    }

    #[test]
    fn invalid_update_is_rejected() {
        let manager = ConfigManager::in_memory(AppConfig::default_config());
        let result = manager.update_with(|c| c.exporter.url = "not a url".to_string());
        assert!(result.is_err());
        assert_eq!(manager.snapshot().exporter.url, "http://localhost:9091");
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let manager = ConfigManager::in_memory(AppConfig::default_config());
        let mut rx = manager.subscribe();

        manager.update_with(|c| c.exporter.job = "next".to_string()).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().exporter.job, "next");
    }

    #[test]
    fn snapshot_is_immutable_after_update() {
        let manager = ConfigManager::in_memory(AppConfig::default_config());
        let before = manager.snapshot();
        manager.update_with(|c| c.exporter.gzip = true).unwrap();
        assert!(!before.exporter.gzip);
        assert!(manager.snapshot().exporter.gzip);
    }
}
