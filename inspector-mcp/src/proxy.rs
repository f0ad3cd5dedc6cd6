// HTTP client for the multiplexing proxy's auxiliary API
//
// The proxy is the authoritative store of breakpoints (it sees every
// client's requests, not just ours) and of the thread most recently paused
// at a breakpoint.

use crate::error::{DebugError, DebugResult};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// One breakpoint as reported by `GET /breakpoints`. Class, method and line
/// are resolved by the proxy when it can; raw ids are always present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointRecord {
    pub request_id: i32,
    pub class_id: i64,
    pub method_id: i64,
    pub code_index: i64,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub line_number: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BreakpointListBody {
    #[serde(default)]
    breakpoints: Vec<BreakpointRecord>,
}

/// Body of `GET /current-thread`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentThread {
    pub thread_id: u64,
    #[serde(default)]
    pub thread_name: String,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub frames: i32,
}

#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(http_port: u16) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://localhost:{}", http_port),
        }
    }

    /// All breakpoints known to the proxy, across every connected client.
    pub async fn breakpoints(&self) -> DebugResult<Vec<BreakpointRecord>> {
        let url = format!("{}/breakpoints", self.base_url);
        let response = self.http.get(&url).send().await.map_err(to_proxy_error)?;

        if !response.status().is_success() {
            return Err(DebugError::Proxy(format!(
                "GET /breakpoints returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: BreakpointListBody = response.json().await.map_err(to_proxy_error)?;
        debug!("Proxy reported {} breakpoint(s)", body.breakpoints.len());
        Ok(body.breakpoints)
    }

    /// `className:lineNumber` -> breakpoint request id, for every breakpoint
    /// the proxy managed to resolve to a source location.
    pub async fn breakpoint_location_map(&self) -> DebugResult<HashMap<String, i32>> {
        let mut map = HashMap::new();
        for bp in self.breakpoints().await? {
            if let (Some(class_name), Some(line)) = (&bp.class_name, bp.line_number) {
                if !class_name.is_empty() && line > 0 {
                    map.insert(format!("{}:{}", class_name, line), bp.request_id);
                }
            }
        }
        Ok(map)
    }

    /// `DELETE /breakpoints/{id}`. Returns false when the proxy does not
    /// know the id (HTTP 404).
    pub async fn delete_breakpoint(&self, request_id: i32) -> DebugResult<bool> {
        let url = format!("{}/breakpoints/{}", self.base_url, request_id);
        let response = self.http.delete(&url).send().await.map_err(to_proxy_error)?;

        match response.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            other => Err(DebugError::Proxy(format!(
                "DELETE /breakpoints/{} returned HTTP {}",
                request_id, other
            ))),
        }
    }

    /// The thread most recently paused at a breakpoint, or None when no
    /// breakpoint event has been captured yet (HTTP 404).
    pub async fn current_thread(&self) -> DebugResult<Option<CurrentThread>> {
        let url = format!("{}/current-thread", self.base_url);
        let response = self.http.get(&url).send().await.map_err(to_proxy_error)?;

        match response.status().as_u16() {
            200 => {
                let body: CurrentThread = response.json().await.map_err(to_proxy_error)?;
                Ok(Some(body))
            }
            404 => Ok(None),
            other => Err(DebugError::Proxy(format!(
                "GET /current-thread returned HTTP {}",
                other
            ))),
        }
    }
}

fn to_proxy_error(err: reqwest::Error) -> DebugError {
    DebugError::Proxy(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_record_tolerates_missing_resolution() {
        let raw = r#"{
            "breakpoints": [
                {"requestId": 5, "classId": 100, "methodId": 200, "codeIndex": 3,
                 "className": "demo.C", "methodName": "run", "lineNumber": 20},
                {"requestId": 6, "classId": 101, "methodId": 201, "codeIndex": 0}
            ]
        }"#;
        let body: BreakpointListBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.breakpoints.len(), 2);
        assert_eq!(body.breakpoints[0].class_name.as_deref(), Some("demo.C"));
        assert_eq!(body.breakpoints[1].class_name, None);
        assert_eq!(body.breakpoints[1].line_number, None);
    }

    #[test]
    fn current_thread_deserializes() {
        let raw = r#"{"threadId": 99, "threadName": "http-1", "suspended": true, "frames": 7}"#;
        let body: CurrentThread = serde_json::from_str(raw).unwrap();
        assert_eq!(body.thread_id, 99);
        assert!(body.suspended);
        assert_eq!(body.frames, 7);
    }
}
