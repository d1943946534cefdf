//! 라이프사이클 관리.
//!
//! 백그라운드 작업 등록, 종료 신호 전파, 시그널 대기, 종료 유예.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 라이프사이클 관리자
///
/// 등록된 작업은 모두 같은 종료 수신기를 받는다.
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl LifecycleManager {
    /// 새 라이프사이클 관리자 생성
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// 종료 수신기 생성
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// 종료 수신기를 넘겨 백그라운드 작업 실행
    pub fn spawn<F, Fut>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task(self.subscribe()));
        debug!("작업 시작: {name}");
        self.tasks.push((name, handle));
    }

    /// 등록된 작업 수
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// 종료 신호 발송
    pub fn shutdown(&self) {
        info!("종료 신호 발송");
        self.shutdown_tx.send_replace(true);
    }

    /// OS 시그널 대기 (SIGINT, SIGTERM) 후 종료 신호 발송
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigint = signal(SignalKind::interrupt()).expect("SIGINT 핸들러 등록 실패");
            let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM 핸들러 등록 실패");

            tokio::select! {
                _ = sigint.recv() => info!("SIGINT 수신"),
                _ = sigterm.recv() => info!("SIGTERM 수신"),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("Ctrl+C 핸들러 등록 실패");
            info!("Ctrl+C 수신");
        }

        self.shutdown();
    }

    /// 종료 신호 후 등록된 작업 완료 대기
    ///
    /// `grace` 안에 끝나지 않은 작업은 중단시킨다. 제때 끝난 작업 수를 반환한다.
    pub async fn drain(self, grace: Duration) -> usize {
        self.shutdown();
        let deadline = tokio::time::Instant::now() + grace;
        let mut finished = 0;

        for (name, mut handle) in self.tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {
                    debug!("작업 종료: {name}");
                    finished += 1;
                }
                Ok(Err(e)) => warn!("작업 비정상 종료: {name}: {e}"),
                Err(_) => {
                    warn!("작업 종료 대기 시간 초과, 중단: {name}");
                    handle.abort();
                }
            }
        }

        finished
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 종료 신호가 올 때까지 대기
///
/// 송신측이 사라져도 반환한다.
pub async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}
