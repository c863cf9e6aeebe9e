//! Per-user editing sessions.
//!
//! Each session owns one [`GraphModel`] behind its own mutex, so mutations on
//! one graph are serialised while different sessions proceed in parallel.
//! Sessions are created on first contact and evicted by a background sweep
//! once they have been idle for longer than the configured TTL.
//!
//! The session id travels in the `i14y_session` cookie or, for API clients,
//! the `x-session-id` header. Every response echoes it in both places.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use i14y_structure::{GraphModel, Lang, LangMap};
use tracing::{debug, info, warn};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "i14y_session";
/// Header carrying the session id for clients without cookies.
pub const SESSION_HEADER: &str = "x-session-id";
/// Title of the dataset a fresh session starts with.
pub const DEFAULT_DATASET_TITLE: &str = "New Dataset";

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One user's editing state.
pub struct Session {
    id: String,
    state: Mutex<SessionState>,
}

struct SessionState {
    graph: GraphModel,
    last_access: Instant,
}

impl Session {
    fn new(id: String, graph: GraphModel, now: Instant) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState {
                graph,
                last_access: now,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run `f` with exclusive access to the session graph.
    pub fn with_graph<R>(&self, f: impl FnOnce(&mut GraphModel) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.last_access = Instant::now();
        f(&mut state.graph)
    }

    /// Swap in a new graph, e.g. after a successful import.
    pub fn replace_graph(&self, graph: GraphModel) {
        self.with_graph(|g| *g = graph);
    }

    pub fn last_access(&self) -> Instant {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .last_access
    }

    fn touch(&self, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if now > state.last_access {
            state.last_access = now;
        }
    }
}

/// The graph a new session or `POST /project/new` starts from.
pub fn starter_graph(title: &str, lang: Lang) -> GraphModel {
    match GraphModel::with_dataset(LangMap::single(lang, title)) {
        Ok(graph) => graph,
        Err(e) => {
            warn!("sessions: cannot seed dataset {title:?}: {e}");
            GraphModel::new()
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// All live sessions, keyed by id.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    ttl: Duration,
    default_lang: Lang,
}

impl SessionStore {
    pub fn new(ttl: Duration, default_lang: Lang) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            default_lang,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(id)
            .cloned()
    }

    /// The session for `id`, created when absent.
    ///
    /// A missing or malformed id gets a freshly generated one. Either way a
    /// new session starts with a single empty dataset.
    pub fn get_or_create(&self, id: Option<&str>, now: Instant) -> Arc<Session> {
        let id = id.filter(|id| is_valid_id(id));
        if let Some(id) = id {
            // Touched under the map lock, so a concurrent sweep either sees
            // the new access time or has already removed the session.
            let sessions = self.sessions.read().unwrap_or_else(|p| p.into_inner());
            if let Some(session) = sessions.get(id) {
                session.touch(now);
                return Arc::clone(session);
            }
        }

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        let mut sessions = self.sessions.write().unwrap_or_else(|p| p.into_inner());
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| {
                debug!("sessions: created {id}");
                Arc::new(Session::new(
                    id.clone(),
                    starter_graph(DEFAULT_DATASET_TITLE, self.default_lang),
                    now,
                ))
            })
            .clone();
        session.touch(now);
        session
    }

    /// Evict every session idle for longer than the TTL at `now`.
    ///
    /// Candidates are chosen from a snapshot of access times. Each one is
    /// re-checked under the map's write lock and its own state lock before
    /// removal: a session used since the snapshot survives, and so does one
    /// still held by an in-flight request. Returns the evicted ids.
    pub fn sweep(&self, now: Instant) -> Vec<String> {
        let snapshot: Vec<(String, Instant)> = self
            .sessions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(id, s)| (id.clone(), s.last_access()))
            .collect();
        let candidates = expired_ids(now, self.ttl, snapshot);
        if candidates.is_empty() {
            return candidates;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|p| p.into_inner());
        let mut evicted = Vec::with_capacity(candidates.len());
        for id in candidates {
            let still_expired = sessions.get(&id).is_some_and(|s| {
                let state = s.state.lock().unwrap_or_else(|p| p.into_inner());
                Arc::strong_count(s) == 1 && is_expired(now, self.ttl, state.last_access)
            });
            if still_expired {
                sessions.remove(&id);
                evicted.push(id);
            }
        }
        evicted
    }
}

/// Ids whose last access lies more than `ttl` before `now`.
pub fn expired_ids<I>(now: Instant, ttl: Duration, sessions: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, Instant)>,
{
    sessions
        .into_iter()
        .filter(|(_, last)| is_expired(now, ttl, *last))
        .map(|(id, _)| id)
        .collect()
}

fn is_expired(now: Instant, ttl: Duration, last_access: Instant) -> bool {
    now.saturating_duration_since(last_access) > ttl
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Run [`SessionStore::sweep`] every `interval` until the runtime shuts down.
pub async fn run_sweeper(store: Arc<SessionStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let evicted = store.sweep(Instant::now());
        if !evicted.is_empty() {
            info!(
                "sessions: evicted {} idle session(s), {} remaining",
                evicted.len(),
                store.len()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Axum `from_fn_with_state` middleware that resolves the caller's session
/// and hands it to handlers as an `Extension<Arc<Session>>`.
pub async fn session_middleware(
    State(store): State<Arc<SessionStore>>,
    mut req: Request,
    next: Next,
) -> Response {
    let requested = session_id(req.headers());
    let session = store.get_or_create(requested.as_deref(), Instant::now());
    let id = session.id().to_string();
    req.extensions_mut().insert(session);

    let mut resp = next.run(req).await;
    if let Ok(v) = HeaderValue::from_str(&id) {
        resp.headers_mut().insert(SESSION_HEADER, v);
    }
    let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
    if let Ok(v) = HeaderValue::from_str(&cookie) {
        resp.headers_mut().append(header::SET_COOKIE, v);
    }
    resp
}

/// The session id sent by the client: header first, then cookie.
fn session_id(headers: &HeaderMap) -> Option<String> {
    if let Some(id) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        let id = id.trim();
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
