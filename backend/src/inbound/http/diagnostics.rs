//! Diagnostic endpoints used to exercise proxies and dashboards.
//!
//! ```text
//! GET /api/info
//! GET /api/slow?delay=250
//! GET /api/error?code=418
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, get, web};
use chrono::{SecondsFormat, Utc};
use mockable::{DefaultEnv, Env};
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tracing::error;

use super::state::HttpState;

const DEFAULT_DELAY_MS: u64 = 1000;
const DEFAULT_ERROR_CODE: u16 = 500;

/// Deployment metadata read from the pod environment.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DeploymentInfo {
    /// Pod running the service, `local` outside a cluster.
    #[serde(rename = "POD_NAME")]
    pub pod_name: String,
    /// Namespace of the pod.
    #[serde(rename = "POD_NAMESPACE")]
    pub pod_namespace: String,
    /// Node scheduling the pod.
    #[serde(rename = "NODE_NAME")]
    pub node_name: String,
}

impl DeploymentInfo {
    /// Read pod metadata, defaulting to a local deployment.
    pub fn from_env(env: &impl Env) -> Self {
        let read = |name: &str, fallback: &str| {
            env.string(name)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| fallback.to_owned())
        };
        Self {
            pod_name: read("POD_NAME", "local"),
            pod_namespace: read("POD_NAMESPACE", "default"),
            node_name: read("NODE_NAME", "local"),
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoResponse {
    service: String,
    #[serde(rename = "type")]
    runtime: &'static str,
    framework: &'static str,
    timestamp: String,
    hostname: String,
    ip: String,
    environment: DeploymentInfo,
}

/// Hostname as published by the container runtime.
fn hostname(env: &impl Env) -> String {
    env.string("HOSTNAME")
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Address of the interface holding the default route, or loopback when
/// none is configured. Connecting a UDP socket sends no packets.
async fn local_ipv4() -> Ipv4Addr {
    async fn probe() -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).await?;
        Ok(socket.local_addr()?.ip())
    }
    match probe().await {
        Ok(IpAddr::V4(addr)) if !addr.is_loopback() && !addr.is_unspecified() => addr,
        _ => Ipv4Addr::LOCALHOST,
    }
}

/// Service and deployment metadata.
#[get("/info")]
pub async fn info(state: web::Data<HttpState>) -> HttpResponse {
    let env = DefaultEnv::new();
    HttpResponse::Ok().json(InfoResponse {
        service: state.service.clone(),
        runtime: "kubernetes-containerd-runtime",
        framework: "Rust + actix-web",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        hostname: hostname(&env),
        ip: local_ipv4().await.to_string(),
        environment: DeploymentInfo::from_env(&env),
    })
}

/// Query for `/api/slow`; unparsable values fall back to the default.
#[derive(Debug, Deserialize)]
pub struct SlowQuery {
    delay: Option<String>,
}

/// Sleep for `delay` milliseconds before answering.
#[get("/slow")]
pub async fn slow(state: web::Data<HttpState>, query: web::Query<SlowQuery>) -> HttpResponse {
    let delay = query
        .delay
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(delay)).await;
    HttpResponse::Ok().json(serde_json::json!({
        "service": state.service,
        "endpoint": "/api/slow",
        "delay_ms": delay,
        "message": "This endpoint simulates slow responses",
    }))
}

/// Query for `/api/error`; unparsable or out-of-range codes become 500.
#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    code: Option<String>,
}

fn requested_status(raw: Option<&str>) -> StatusCode {
    raw.and_then(|raw| raw.trim().parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or_else(|| {
            StatusCode::from_u16(DEFAULT_ERROR_CODE).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Answer with the requested status code.
#[get("/error")]
pub async fn simulated_error(
    state: web::Data<HttpState>,
    query: web::Query<ErrorQuery>,
) -> HttpResponse {
    let status = requested_status(query.code.as_deref());
    error!(code = status.as_u16(), "error endpoint called");
    HttpResponse::build(status).json(serde_json::json!({
        "service": state.service,
        "endpoint": "/api/error",
        "error_code": status.as_u16(),
        "message": "This endpoint simulates errors",
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test as actix_test};
    use mockable::MockEnv;
    use rstest::rstest;
    use serde_json::Value;

    use super::*;

    fn env_with(vars: &'static [(&'static str, &'static str)]) -> MockEnv {
        let mut env = MockEnv::new();
        env.expect_string().times(0..).returning(move |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_owned())
        });
        env
    }

    async fn get(uri: &str) -> actix_web::dev::ServiceResponse {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::fixtures()))
                .service(
                    web::scope("/api")
                        .service(info)
                        .service(slow)
                        .service(simulated_error),
                ),
        )
        .await;
        actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request()).await
    }

    #[rstest]
    fn deployment_info_defaults_to_local() {
        let deployment = DeploymentInfo::from_env(&env_with(&[]));
        assert_eq!(
            deployment,
            DeploymentInfo {
                pod_name: "local".to_owned(),
                pod_namespace: "default".to_owned(),
                node_name: "local".to_owned(),
            }
        );
    }

    #[rstest]
    fn deployment_info_reads_pod_metadata() {
        let env = env_with(&[("POD_NAME", "api-7f9"), ("POD_NAMESPACE", "edge")]);
        let deployment = DeploymentInfo::from_env(&env);
        assert_eq!(deployment.pod_name, "api-7f9");
        assert_eq!(deployment.pod_namespace, "edge");
        assert_eq!(deployment.node_name, "local");
    }

    #[rstest]
    fn hostname_falls_back_to_unknown() {
        assert_eq!(hostname(&env_with(&[])), "unknown");
        assert_eq!(hostname(&env_with(&[("HOSTNAME", "node-a")])), "node-a");
    }

    #[rstest]
    #[case(None, 500)]
    #[case(Some("404"), 404)]
    #[case(Some("teapot"), 500)]
    #[case(Some("42"), 500)]
    #[case(Some("70000"), 500)]
    fn requested_status_falls_back_to_500(#[case] raw: Option<&str>, #[case] expected: u16) {
        assert_eq!(requested_status(raw).as_u16(), expected);
    }

    #[rstest]
    #[actix_web::test]
    async fn info_reports_service_metadata() {
        let res = get("/api/info").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["service"], crate::SERVICE_NAME);
        assert!(body["ip"].as_str().is_some_and(|ip| ip.parse::<Ipv4Addr>().is_ok()));
        assert!(body["environment"]["POD_NAMESPACE"].is_string());
    }

    #[rstest]
    #[actix_web::test]
    async fn slow_reports_requested_delay() {
        let res = get("/api/slow?delay=5").await;
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["delay_ms"], 5);
    }

    #[rstest]
    #[actix_web::test]
    async fn error_endpoint_uses_requested_status() {
        let res = get("/api/error?code=418").await;
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["error_code"], 418);
    }
}
