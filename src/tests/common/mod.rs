// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::Json;
use serde_json::Value;
use tokio::sync::Notify;

use crate::config::proc_loader::parse_config;
use crate::events::{AuthEvent, AuthEventBus, Subscription};
use crate::store::TokenStore;
use crate::Relay;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// What the fake refresh endpoint answers
#[derive(Clone, Debug)]
pub enum RefreshBehavior {
    Issue(&'static str),
    Fail(StatusCode),
}

/// One business call as the fake API saw it
#[derive(Clone, Debug)]
pub struct SeenCall {
    pub path: String,
    pub authorization: Option<String>,
    pub status: StatusCode,
}

/// In-process API that accepts exactly one bearer token at a time.
///
/// The refresh handler can be held on `gate` so tests decide when the
/// refresh resolves.
#[derive(Clone)]
pub struct FakeApi {
    pub valid_token: Arc<Mutex<String>>,
    pub calls: Arc<Mutex<Vec<SeenCall>>>,
    pub refresh_calls: Arc<AtomicUsize>,
    pub refresh_presented: Arc<Mutex<Vec<Option<String>>>>,
    pub refresh_behavior: Arc<Mutex<RefreshBehavior>>,
    pub always_reject: Arc<Mutex<HashSet<String>>>,
    pub slow: Arc<Mutex<HashMap<String, Duration>>>,
    pub gate: Option<Arc<Notify>>,
}

impl FakeApi {
    pub fn new(valid_token: &str, behavior: RefreshBehavior) -> Self {
        Self {
            valid_token: Arc::new(Mutex::new(valid_token.to_owned())),
            calls: Arc::new(Mutex::new(Vec::new())),
            refresh_calls: Arc::new(AtomicUsize::new(0)),
            refresh_presented: Arc::new(Mutex::new(Vec::new())),
            refresh_behavior: Arc::new(Mutex::new(behavior)),
            always_reject: Arc::new(Mutex::new(HashSet::new())),
            slow: Arc::new(Mutex::new(HashMap::new())),
            gate: None,
        }
    }

    /// Hold every refresh until `gate.notify_one()`
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn reject_always(&self, path: &str) {
        self.always_reject.lock().unwrap().insert(path.to_owned());
    }

    /// Accepted calls to `path` take `delay` before they are answered and recorded
    pub fn slow_path(&self, path: &str, delay: Duration) {
        self.slow.lock().unwrap().insert(path.to_owned(), delay);
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn seen_for(&self, path: &str) -> Vec<SeenCall> {
        self.seen().into_iter().filter(|c| c.path == path).collect()
    }

    /// Paths of successful calls, in the order the server answered them
    pub fn accepted_paths(&self) -> Vec<String> {
        self.seen()
            .into_iter()
            .filter(|c| c.status == StatusCode::OK)
            .map(|c| c.path)
            .collect()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/auth/refresh", post(refresh_handler))
            .route("/auth/login", post(login_handler))
            .fallback(business_handler)
            .with_state(self.clone())
    }

    pub async fn spawn(&self) -> (JoinHandle<()>, SocketAddr) {
        spawn_axum(self.router()).await
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn business_handler(State(api): State<FakeApi>, uri: Uri, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_owned();
    let authorization = authorization(&headers);
    let expected = format!("Bearer {}", api.valid_token.lock().unwrap());
    let rejected = api.always_reject.lock().unwrap().contains(&path);

    let status = if path == "/broken" {
        StatusCode::INTERNAL_SERVER_ERROR
    } else if rejected {
        StatusCode::UNAUTHORIZED
    } else if authorization.as_deref() == Some(expected.as_str()) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };

    let delay = api.slow.lock().unwrap().get(&path).copied();
    if let (StatusCode::OK, Some(delay)) = (status, delay) {
        tokio::time::sleep(delay).await;
    }

    api.calls.lock().unwrap().push(SeenCall {
        path: path.clone(),
        authorization,
        status,
    });
    (status, Json(json!({ "path": path })))
}

async fn refresh_handler(State(api): State<FakeApi>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    api.refresh_presented.lock().unwrap().push(authorization(&headers));

    if let Some(gate) = api.gate.clone() {
        gate.notified().await;
    }

    let behavior = api.refresh_behavior.lock().unwrap().clone();
    match behavior {
        RefreshBehavior::Issue(token) => {
            *api.valid_token.lock().unwrap() = token.to_owned();
            (
                StatusCode::OK,
                Json(json!({
                    "accessToken": token,
                    "refreshToken": null,
                    "user": { "id": 7, "name": "ada" }
                })),
            )
        }
        RefreshBehavior::Fail(status) => (status, Json(json!({ "error": "refresh refused" }))),
    }
}

async fn login_handler(State(api): State<FakeApi>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body.get("password").and_then(Value::as_str) != Some("secret") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad credentials" })));
    }
    let token = api.valid_token.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(json!({
            "accessToken": token,
            "refreshToken": "R1",
            "user": { "id": 7, "name": "ada" }
        })),
    )
}

/// Relay pointed at `addr` with the fake API's refresh and login paths
pub async fn relay_for(addr: SocketAddr, store: Arc<dyn TokenStore>) -> Relay {
    relay_with_queue_timeout(addr, store, 5_000).await
}

pub async fn relay_with_queue_timeout(addr: SocketAddr, store: Arc<dyn TokenStore>, queue_timeout_ms: u64) -> Relay {
    let yaml = format!(
        r#"
client:
  base_url: "http://{addr}/"
  timeout_ms: 5000
  queue_timeout_ms: {queue_timeout_ms}
refresh:
  path: "/auth/refresh"
login:
  path: "/auth/login"
"#
    );
    let cfg = parse_config(yaml).await.expect("test config is valid");
    Relay::with_store(&cfg, store).await.expect("relay")
}

/// Poll until `n` callers are parked behind the refresh
pub async fn wait_for_queue(relay: &Relay, n: usize) {
    let coordinator = relay.transport.coordinator().clone();
    tokio::time::timeout(Duration::from_secs(5), async move {
        while coordinator.queued() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("calls were not queued in time");
}

pub async fn wait_until_idle(relay: &Relay) {
    let coordinator = relay.transport.coordinator().clone();
    tokio::time::timeout(Duration::from_secs(5), async move {
        while coordinator.is_refreshing() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("refresh did not settle in time");
}

/// Record every event published on `bus`
pub fn record_events(bus: &AuthEventBus) -> (Arc<Mutex<Vec<AuthEvent>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    (seen, subscription)
}
