//! In-process stand-in for the REST backend.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tokio::net::TcpListener;

use npi_outreach::http::ApiClient;

#[derive(Debug, Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Csv(String),
    Empty(StatusCode),
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub bearer: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Inner {
    replies: HashMap<String, VecDeque<Reply>>,
    requests: Vec<Recorded>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    /// Queues a reply for `path`. The last queued reply keeps being served.
    pub fn reply(&self, path: &str, reply: Reply) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .replies
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn json(&self, path: &str, value: Value) -> &Self {
        self.reply(path, Reply::Json(StatusCode::OK, value))
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    /// Starts serving on an ephemeral localhost port and returns the origin.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind test listener");
        let addr: SocketAddr = listener.local_addr().unwrap();
        let router = Router::new().fallback(handle).with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock backend exited");
        });
        format!("http://{addr}")
    }

    pub async fn client(&self, token: Option<&str>) -> ApiClient {
        let origin = self.start().await;
        ApiClient::new(&origin, token.map(str::to_string)).expect("build client")
    }
}

fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    raw.unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

async fn handle(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let mut inner = mock.inner.lock().unwrap();
    inner.requests.push(Recorded {
        method,
        path: path.clone(),
        query: parse_query(uri.query()),
        bearer,
        body,
    });

    let reply = match inner.replies.get_mut(&path) {
        Some(queue) if queue.len() > 1 => queue.pop_front(),
        Some(queue) => queue.front().cloned(),
        None => None,
    };
    match reply {
        Some(Reply::Json(status, value)) => (status, axum::Json(value)).into_response(),
        Some(Reply::Csv(text)) => ([(header::CONTENT_TYPE, "text/csv")], text).into_response(),
        Some(Reply::Empty(status)) => status.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
