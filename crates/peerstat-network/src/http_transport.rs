//! Pushgateway HTTP 전송 어댑터.
//!
//! `MetricsTransport` 포트 구현. 요청을 그대로 실행하고 상태 코드와 본문을 돌려준다.
//! 설정 관리자가 연결되면 요청마다 현재 `agent.request_timeout_ms`를 적용한다.

use async_trait::async_trait;
use peerstat_core::config_manager::ConfigManager;
use peerstat_core::error::CoreError;
use peerstat_core::ports::transport::{
    GatewayMethod, GatewayRequest, GatewayResponse, MetricsTransport,
};
use std::time::Duration;
use tracing::debug;

/// reqwest 기반 전송 (`MetricsTransport` 포트 구현)
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: Option<ConfigManager>,
}

impl ReqwestTransport {
    /// 새 전송 어댑터 생성
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            config: None,
        })
    }

    /// 요청 타임아웃을 설정 관리자의 현재 값으로 따르게 한다
    pub fn with_config(mut self, config: ConfigManager) -> Self {
        self.config = Some(config);
        self
    }
}

fn http_method(method: GatewayMethod) -> reqwest::Method {
    match method {
        GatewayMethod::Push => reqwest::Method::POST,
        GatewayMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl MetricsTransport for ReqwestTransport {
    async fn execute(&self, request: GatewayRequest) -> Result<GatewayResponse, CoreError> {
        let GatewayRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(http_method(method), &url);
        if let Some(config) = &self.config {
            builder = builder.timeout(config.snapshot().request_timeout());
        }
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("{} {url} 실패: {e}", method.as_http())))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            CoreError::Network(format!(
                "{} {url} 응답 본문 읽기 실패 (status {status}): {e}",
                method.as_http()
            ))
        })?;

        debug!(method = method.as_http(), %url, status, "게이트웨이 응답");
        Ok(GatewayResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerstat_core::config::AppConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn push_sends_body_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/metrics/job/j/peerConnectionId/pc1")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_header("authorization", "Basic dTpw")
            .match_body("x{pageUrl=\"u\"} 1\n\n")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let response = transport()
            .execute(GatewayRequest {
                method: GatewayMethod::Push,
                url: format!("{}/metrics/job/j/peerConnectionId/pc1", server.url()),
                headers: vec![
                    (
                        "Content-Type".to_string(),
                        "application/x-www-form-urlencoded".to_string(),
                    ),
                    ("Authorization".to_string(), "Basic dTpw".to_string()),
                ],
                body: Some(b"x{pageUrl=\"u\"} 1\n\n".to_vec()),
            })
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_has_no_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/metrics/job/j/peerConnectionId/pc1")
            .match_body("")
            .with_status(202)
            .create_async()
            .await;

        let response = transport()
            .execute(GatewayRequest {
                method: GatewayMethod::Delete,
                url: format!("{}/metrics/job/j/peerConnectionId/pc1", server.url()),
                headers: vec![],
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status, 202);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/metrics/job/j/peerConnectionId/pc1")
            .with_status(500)
            .with_body("oom")
            .create_async()
            .await;

        let response = transport()
            .execute(GatewayRequest {
                method: GatewayMethod::Push,
                url: format!("{}/metrics/job/j/peerConnectionId/pc1", server.url()),
                headers: vec![],
                body: Some(b"x 1\n".to_vec()),
            })
            .await
            .unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status, 500);
        assert_eq!(response.body, "oom");
    }

    #[tokio::test]
    async fn connection_failure_is_network_error() {
        let result = ReqwestTransport::new(Duration::from_millis(500))
            .unwrap()
            .execute(GatewayRequest {
                method: GatewayMethod::Delete,
                url: "http://127.0.0.1:1/metrics/job/j/peerConnectionId/pc1".to_string(),
                headers: vec![],
                body: None,
            })
            .await;

        assert!(matches!(result, Err(CoreError::Network(_))));
    }

    fn delete_request(base: &str) -> GatewayRequest {
        GatewayRequest {
            method: GatewayMethod::Delete,
            url: format!("{base}/metrics/job/j/peerConnectionId/pc1"),
            headers: vec![],
            body: None,
        }
    }

    #[tokio::test]
    async fn truncated_body_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort")
                .await
                .unwrap();
        });

        let result = transport()
            .execute(delete_request(&format!("http://{addr}")))
            .await;

        assert!(matches!(result, Err(CoreError::Network(_))));
    }

    #[tokio::test]
    async fn request_timeout_follows_config_updates() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ConfigManager::in_memory(AppConfig::default_config());
        config
            .update_with(|c| c.agent.request_timeout_ms = 100)
            .unwrap();
        let transport = ReqwestTransport::new(Duration::from_secs(30))
            .unwrap()
            .with_config(config);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            transport.execute(delete_request(&format!("http://{addr}"))),
        )
        .await
        .expect("설정된 타임아웃이 적용되지 않음");

        assert!(matches!(result, Err(CoreError::Network(_))));
    }
}
