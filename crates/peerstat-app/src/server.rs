//! 인바운드 HTTP 엔드포인트.
//!
//! 관찰자가 보내는 stats 이벤트를 받아 라우터로 넘기고, 전송 통계·설정·배지를
//! 조회하는 로컬 API를 제공한다. Axum 기반.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use peerstat_core::config::AppConfig;
use peerstat_core::config_manager::ConfigManager;
use peerstat_core::error::CoreError;
use peerstat_core::models::badge::Badge;
use peerstat_core::models::event::EventResponse;
use peerstat_core::models::session::{DeliveryStats, OriginCounts};
use peerstat_pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::lifecycle::wait_for_shutdown;

// ============================================================
// 에러
// ============================================================

/// API 에러
#[derive(Debug, Error)]
pub enum ApiError {
    /// 내부 서버 오류
    #[error("내부 서버 오류: {0}")]
    Internal(String),

    /// 잘못된 요청
    #[error("잘못된 요청: {0}")]
    BadRequest(String),
}

/// 에러 응답 본문
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// 에러 메시지
    pub error: String,
    /// HTTP 상태 코드
    pub status: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = ErrorResponse {
            error: message,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { .. } | CoreError::Config(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// ============================================================
// 상태와 라우트
// ============================================================

/// 서버 상태
#[derive(Clone)]
pub struct ServerState {
    /// 파이프라인 구성요소
    pub pipeline: Pipeline,
    /// 설정 관리자
    pub config: ConfigManager,
}

/// API 라우트 생성
pub fn api_routes() -> Router<ServerState> {
    Router::new()
        .route("/events", post(post_event))
        .route("/stats", get(get_stats))
        .route("/config", get(get_config).put(put_config))
        .route("/badge", get(get_badge))
}

/// 전체 라우터 (미들웨어 포함)
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// 핸들러
// ============================================================

/// 인바운드 이벤트 처리
///
/// POST /api/events: 항상 200, 본문은 `{}` 또는 `{ "error": "..." }`
pub async fn post_event(State(state): State<ServerState>, body: Bytes) -> Json<EventResponse> {
    let value = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("인바운드 본문 파싱 실패: {e}");
            return Json(EventResponse::error(CoreError::UnknownEvent.to_string()));
        }
    };

    let snapshot = state.config.snapshot();
    Json(
        state
            .pipeline
            .router
            .handle_value(&snapshot.exporter, value)
            .await,
    )
}

/// 전송 통계 응답
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// 누적 전송 통계
    #[serde(flatten)]
    pub delivery: DeliveryStats,
    /// 메시지당 평균 지연 (밀리초)
    pub avg_latency_ms: Option<f64>,
    /// 추적 중인 세션 수
    pub active_sessions: u64,
    /// origin별 활성 세션 수
    pub peer_connections_per_origin: OriginCounts,
}

/// 전송 통계 조회
///
/// GET /api/stats
pub async fn get_stats(State(state): State<ServerState>) -> Result<Json<StatsResponse>, ApiError> {
    let delivery = state.pipeline.delivery.stats().await?;
    let origins = state.pipeline.tracker.origin_counts().await?;

    Ok(Json(StatsResponse {
        avg_latency_ms: delivery.avg_latency_ms(),
        delivery,
        active_sessions: origins.values().sum(),
        peer_connections_per_origin: origins,
    }))
}

/// 설정 조회
///
/// GET /api/config
pub async fn get_config(State(state): State<ServerState>) -> Json<AppConfig> {
    Json((*state.config.snapshot()).clone())
}

/// 설정 교체
///
/// PUT /api/config
pub async fn put_config(
    State(state): State<ServerState>,
    Json(new_config): Json<AppConfig>,
) -> Result<Json<AppConfig>, ApiError> {
    let pending = state
        .config
        .snapshot()
        .restart_required_changes(&new_config);
    state.config.update_config(new_config)?;
    if !pending.is_empty() {
        warn!("재시작 후 반영되는 설정 변경: {}", pending.join(", "));
    }
    Ok(Json((*state.config.snapshot()).clone()))
}

/// 배지 조회 쿼리
#[derive(Debug, Deserialize)]
pub struct BadgeQuery {
    /// 페이지 origin
    pub origin: String,
}

/// origin 배지 조회
///
/// GET /api/badge?origin=
pub async fn get_badge(
    State(state): State<ServerState>,
    Query(query): Query<BadgeQuery>,
) -> Result<Json<Badge>, ApiError> {
    let counts = state.pipeline.tracker.origin_counts().await?;
    let snapshot = state.config.snapshot();
    Ok(Json(Badge::for_origin(
        &snapshot.exporter,
        &counts,
        &query.origin,
    )))
}

// ============================================================
// 서버
// ============================================================

/// 인바운드 엔드포인트 서버
pub struct InboundServer {
    state: ServerState,
}

impl InboundServer {
    /// 새 서버 생성
    pub fn new(pipeline: Pipeline, config: ConfigManager) -> Self {
        Self {
            state: ServerState { pipeline, config },
        }
    }

    /// 설정된 주소에 바인드
    pub async fn bind(&self) -> Result<TcpListener, std::io::Error> {
        let snapshot = self.state.config.snapshot();
        let host = if snapshot.agent.allow_external {
            [0, 0, 0, 0]
        } else {
            [127, 0, 0, 1]
        };
        let addr = SocketAddr::from((host, snapshot.agent.listen_port));
        TcpListener::bind(addr).await
    }

    /// 종료 신호까지 서버 실행
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        if let Ok(addr) = listener.local_addr() {
            info!("인바운드 엔드포인트 시작: http://{addr}");
        }

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                wait_for_shutdown(&mut shutdown_rx).await;
                info!("인바운드 엔드포인트 종료 신호 수신");
            })
            .await?;

        info!("인바운드 엔드포인트 종료");
        Ok(())
    }
}
