//! HTTP agent.
//!
//! Actions `get`, `post`, `put` and `delete`. Input is an object
//! `{url, headers?, body?}`; `get` also accepts a bare URL string. A string
//! body is sent verbatim, any other body as JSON. The output is
//! `{status, body}` with the body parsed as JSON when it is valid JSON.

use std::time::Duration;

use pipewatch_core::agent::dispatch::Agent;
use pipewatch_types::config::HttpAgentSettings;
use pipewatch_types::error::AgentError;
use reqwest::Method;
use serde_json::{json, Map, Value};

const ACTIONS: [&str; 4] = ["delete", "get", "post", "put"];

pub struct HttpAgent {
    client: reqwest::Client,
}

/// A validated request description.
#[derive(Debug, PartialEq)]
struct HttpRequest {
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl HttpAgent {
    pub fn new(settings: &HttpAgentSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("pipewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, method: Method, request: HttpRequest) -> Result<Value, AgentError> {
        let mut builder = self.client.request(method.clone(), &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(Value::String(text)) => builder.body(text),
            Some(body) => builder.json(&body),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            AgentError::Failed(format!("{method} {} failed: {e}", request.url))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AgentError::Failed(format!("failed to read response from {}: {e}", request.url))
        })?;

        tracing::info!(
            method = %method,
            url = request.url.as_str(),
            status = status.as_u16(),
            body_len = text.len(),
            "HTTP agent request completed"
        );

        if !status.is_success() {
            return Err(AgentError::Failed(format!(
                "{method} {} returned {status}",
                request.url
            )));
        }

        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        Ok(json!({ "status": status.as_u16(), "body": body }))
    }
}

fn parse_method(action: &str) -> Option<Method> {
    match action {
        "get" => Some(Method::GET),
        "post" => Some(Method::POST),
        "put" => Some(Method::PUT),
        "delete" => Some(Method::DELETE),
        _ => None,
    }
}

fn parse_request(method: &Method, input: Value) -> Result<HttpRequest, AgentError> {
    let mut fields: Map<String, Value> = match input {
        Value::String(url) if *method == Method::GET => {
            return Ok(HttpRequest {
                url,
                headers: Vec::new(),
                body: None,
            });
        }
        Value::Object(fields) => fields,
        other => {
            return Err(AgentError::InvalidInput(format!(
                "expected an object with a 'url' field, got {other}"
            )));
        }
    };

    let url = match fields.remove("url") {
        Some(Value::String(url)) if !url.is_empty() => url,
        _ => return Err(AgentError::InvalidInput("'url' must be a non-empty string".into())),
    };

    let headers = match fields.remove("headers") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect(),
        Some(_) => return Err(AgentError::InvalidInput("'headers' must be an object".into())),
    };

    let body = fields.remove("body").filter(|b| !b.is_null());

    Ok(HttpRequest { url, headers, body })
}

impl Agent for HttpAgent {
    fn name(&self) -> &str {
        "http"
    }

    fn actions(&self) -> Vec<String> {
        ACTIONS.iter().map(|a| a.to_string()).collect()
    }

    async fn dispatch(&self, action: &str, input: Value) -> Result<Value, AgentError> {
        let method = parse_method(action).ok_or_else(|| AgentError::UnknownAction {
            agent: "http".to_string(),
            action: action.to_string(),
        })?;
        let request = parse_request(&method, input)?;
        self.send(method, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn agent() -> HttpAgent {
        HttpAgent::new(&HttpAgentSettings { timeout_secs: 5 }).unwrap()
    }

    /// Serve one canned response and hand back the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            // Read headers, then as much body as Content-Length announces.
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if n == 0 {
                    break buf.len();
                }
            };
            let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
        });

        (format!("http://{addr}/hook"), rx)
    }

    #[test]
    fn parse_request_accepts_bare_url_for_get_only() {
        let req = parse_request(&Method::GET, json!("http://ci/builds/7")).unwrap();
        assert_eq!(req.url, "http://ci/builds/7");

        let err = parse_request(&Method::POST, json!("http://ci/builds/7")).unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[test]
    fn parse_request_reads_headers_and_body() {
        let req = parse_request(
            &Method::POST,
            json!({
                "url": "http://chat/hooks/1",
                "headers": {"X-Token": "abc", "X-Retry": 2},
                "body": {"text": "build broke"}
            }),
        )
        .unwrap();
        assert_eq!(req.url, "http://chat/hooks/1");
        assert!(req.headers.contains(&("X-Token".to_string(), "abc".to_string())));
        assert!(req.headers.contains(&("X-Retry".to_string(), "2".to_string())));
        assert_eq!(req.body, Some(json!({"text": "build broke"})));
    }

    #[test]
    fn parse_request_rejects_missing_url() {
        let err = parse_request(&Method::GET, json!({"headers": {}})).unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
        let err = parse_request(&Method::GET, json!(42)).unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let err = agent().dispatch("patch", json!("http://x")).await.unwrap_err();
        assert_eq!(
            err,
            AgentError::UnknownAction {
                agent: "http".to_string(),
                action: "patch".to_string()
            }
        );
    }

    #[tokio::test]
    async fn get_parses_json_body() {
        let (url, request) = serve_once("200 OK", r#"{"status":"failed","id":7}"#).await;
        let out = agent().dispatch("get", json!(url)).await.unwrap();
        assert_eq!(out, json!({"status": 200, "body": {"status": "failed", "id": 7}}));

        let raw = request.await.unwrap();
        assert!(raw.starts_with("GET /hook HTTP/1.1"));
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let (url, request) = serve_once("201 Created", "created").await;
        let out = agent()
            .dispatch("post", json!({"url": url, "body": {"text": "hi"}}))
            .await
            .unwrap();
        assert_eq!(out, json!({"status": 201, "body": "created"}));

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /hook HTTP/1.1"));
        assert!(raw.ends_with(r#"{"text":"hi"}"#));
    }

    #[tokio::test]
    async fn non_success_status_fails() {
        let (url, _request) = serve_once("502 Bad Gateway", "{}").await;
        let err = agent().dispatch("delete", json!({"url": url})).await.unwrap_err();
        match err {
            AgentError::Failed(msg) => assert!(msg.contains("502"), "{msg}"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn lists_actions() {
        assert_eq!(agent().actions(), vec!["delete", "get", "post", "put"]);
        assert_eq!(agent().name(), "http");
    }
}
