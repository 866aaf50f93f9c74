//! HTTP surface of the runtime
//!
//! Serves cached snapshots to the presentation layer and routes admin
//! mutations through the gateway. Uses hyper http1 with TokioIo for async
//! handling.
//!
//! - `GET /health`, `GET /api/status` - liveness and sync state
//! - `GET /api/settings`, `GET /api/content/{collection}` - cached reads
//! - `POST /api/registrations` - public optimistic registration path
//! - `POST /api/admin/*` - session-gated admin mutations, seeding, upload
//! - any other `GET` - view resolution for the client shell

use bytes::Bytes;
use dashmap::DashMap;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use agora_client::{AuthClient, DataService, ObjectStore, Session};
use agora_model::{
    Chapter, Collection, FlagshipEvent, Hackathon, MissionLetter, NewRegistration, OtherEvent,
    Partner, PastEvent, PhotoItem, RecordId, RegistrationForm, RegistrationStatus, SuccessStory,
    Tag, WhatWeDoCard, Workshop,
};
use agora_sync::{CacheStore, MutationGateway, SyncCoordinator};

use crate::config::Args;
use crate::routing::{self, Route, SCROLL_MOUNT_DELAY_MS};
use crate::seed;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub service: Arc<dyn DataService>,
    pub store: Arc<CacheStore>,
    pub coordinator: SyncCoordinator,
    pub gateway: MutationGateway,
    /// Identity provider client (absent in dev mode)
    pub auth: Option<AuthClient>,
    /// Object storage client (absent in dev mode)
    pub objects: Option<ObjectStore>,
    /// Active admin sessions keyed by token
    pub sessions: DashMap<String, Session>,
    /// Connectivity state fed by the realtime feed
    pub connected: watch::Receiver<bool>,
    pub started_at: Instant,
}

/// Start the HTTP server.
pub async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Agora listening on {}", state.args.listen);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("{} {}", method, path);

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") => handle_health(&state),
        (&Method::GET, "/api/status") => handle_status(&state),
        (&Method::GET, "/api/settings") => json_response(StatusCode::OK, &state.store.site_settings()),
        (&Method::POST, "/api/registrations") => handle_create_registration(state.clone(), req).await?,
        (&Method::POST, "/api/admin/sign-in") => handle_sign_in(state.clone(), req).await?,
        (&Method::POST, "/api/admin/sign-out") => handle_sign_out(&state, &req),
        _ if path.starts_with("/api/content/") && method == Method::GET => {
            handle_content(&state, &req, &path)
        }
        _ if path.starts_with("/api/admin/") => handle_admin(state.clone(), req, &path).await?,
        (&Method::GET, _) => handle_view(&state, &path),
        _ => error_response(StatusCode::NOT_FOUND, "No such endpoint"),
    };

    Ok(response)
}

// =============================================================================
// Health and status
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
    version: &'static str,
    uptime: u64,
    mode: String,
}

fn handle_health(state: &AppState) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            uptime: state.started_at.elapsed().as_secs(),
            mode: if state.args.dev_mode {
                "development".into()
            } else {
                "production".into()
            },
        },
    )
}

fn handle_status(state: &AppState) -> Response<Full<Bytes>> {
    let offline = !*state.connected.borrow();
    json_response(
        StatusCode::OK,
        &json!({
            "loading": state.store.is_loading(),
            "offline": offline,
            "freshness_secs": state.coordinator.freshness(),
            "registration_total": state.store.registration_total(),
            "pending_registrations": state.store.pending_registration_count(),
        }),
    )
}

// =============================================================================
// Cached reads
// =============================================================================

/// Rows hidden from unauthenticated clients never leave the cache here;
/// the cache itself always holds the superset.
fn public_rows(store: &CacheStore, collection: Collection) -> Vec<Value> {
    store
        .rows(collection)
        .into_iter()
        .filter(|r| r.get("is_public").and_then(Value::as_bool) != Some(false))
        .collect()
}

/// Public rows through the typed record contract. A row that fails the
/// contract is dropped from the view (and logged), never served broken.
fn typed_public_rows<T: DeserializeOwned>(store: &CacheStore, collection: Collection) -> Vec<T> {
    public_rows(store, collection)
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection = %collection, error = %e, "Dropping malformed row from view");
                None
            }
        })
        .collect()
}

fn handle_content(state: &AppState, req: &Request<Incoming>, path: &str) -> Response<Full<Bytes>> {
    let name = path.trim_start_matches("/api/content/").trim_end_matches('/');
    let collection: Collection = match name.parse() {
        Ok(c) => c,
        Err(e) => return error_response(StatusCode::NOT_FOUND, &e.to_string()),
    };

    let admin = is_admin(state, req);
    if !collection.publicly_listable() && !admin {
        return error_response(StatusCode::FORBIDDEN, "Admin session required");
    }

    let rows = if admin {
        state.store.rows(collection)
    } else {
        public_rows(&state.store, collection)
    };
    json_response(StatusCode::OK, &rows)
}

// =============================================================================
// View resolution for the client shell
// =============================================================================

#[derive(Serialize)]
struct ViewResponse<'a> {
    view: &'static str,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    scroll_target: Option<&'a str>,
    scroll_delay_ms: u64,
}

fn handle_view(state: &AppState, path: &str) -> Response<Full<Bytes>> {
    let store = &state.store;
    let route = routing::resolve(path);

    let (status, view, data) = match &route {
        Route::Landing => (StatusCode::OK, route.view_name(), landing_data(state)),
        Route::Admin | Route::Partner => (StatusCode::OK, route.view_name(), Value::Null),
        Route::Hackathons => (
            StatusCode::OK,
            route.view_name(),
            json!(typed_public_rows::<Hackathon>(store, Collection::Hackathons)),
        ),
        Route::Workshops => (
            StatusCode::OK,
            route.view_name(),
            json!(typed_public_rows::<Workshop>(store, Collection::Workshops)),
        ),
        Route::Events => (
            StatusCode::OK,
            route.view_name(),
            json!({
                "flagship": typed_public_rows::<FlagshipEvent>(store, Collection::FlagshipEvents),
                "past": typed_public_rows::<PastEvent>(store, Collection::PastEvents),
                "other": typed_public_rows::<OtherEvent>(store, Collection::OtherEvents),
                "tags": typed_public_rows::<Tag>(store, Collection::Tags),
            }),
        ),
        Route::HackathonDetail(slug) => hackathon_detail(store, slug, &route),
        Route::WorkshopDetail(slug) => {
            typed_detail::<Workshop>(store, Collection::Workshops, slug, &route)
        }
        Route::OtherEventDetail(slug) => {
            typed_detail::<OtherEvent>(store, Collection::OtherEvents, slug, &route)
        }
        Route::NotFound => (StatusCode::NOT_FOUND, "not_found", Value::Null),
    };

    let body = ViewResponse {
        view,
        data,
        scroll_target: routing::scroll_target(path),
        scroll_delay_ms: SCROLL_MOUNT_DELAY_MS,
    };

    json_response(status, &body)
}

fn landing_data(state: &AppState) -> Value {
    let store = &state.store;
    let settings = store.site_settings();
    let registration_total = if settings.show_registration_total {
        Some(store.registration_total())
    } else {
        None
    };
    // Only the featured partners make the landing strip.
    let partners: Vec<Partner> = typed_public_rows::<Partner>(store, Collection::Partners)
        .into_iter()
        .filter(|p| p.is_featured)
        .collect();
    json!({
        "settings": settings,
        "flagship_events": typed_public_rows::<FlagshipEvent>(store, Collection::FlagshipEvents),
        "what_we_do_cards": typed_public_rows::<WhatWeDoCard>(store, Collection::WhatWeDoCards),
        "photo_gallery": typed_public_rows::<PhotoItem>(store, Collection::PhotoGallery),
        "success_stories": typed_public_rows::<SuccessStory>(store, Collection::SuccessStories),
        "chapters": typed_public_rows::<Chapter>(store, Collection::Chapters),
        "mission_letter": typed_public_rows::<MissionLetter>(store, Collection::MissionLetter),
        "partners": partners,
        "registration_total": registration_total,
    })
}

fn typed_detail<T: DeserializeOwned + Serialize>(
    store: &CacheStore,
    collection: Collection,
    slug: &str,
    route: &Route,
) -> (StatusCode, &'static str, Value) {
    let Some(row) = store.find_by(collection, "slug", slug) else {
        return (StatusCode::NOT_FOUND, "not_found", Value::Null);
    };
    if row.get("is_public").and_then(Value::as_bool) == Some(false) {
        return (StatusCode::NOT_FOUND, "not_found", Value::Null);
    }
    match serde_json::from_value::<T>(row) {
        Ok(record) => (StatusCode::OK, route.view_name(), json!(record)),
        Err(e) => {
            warn!(collection = %collection, slug = %slug, error = %e, "Malformed detail row");
            (StatusCode::NOT_FOUND, "not_found", Value::Null)
        }
    }
}

/// Hackathon detail also carries its registration form, when one exists.
fn hackathon_detail(store: &CacheStore, slug: &str, route: &Route) -> (StatusCode, &'static str, Value) {
    let (status, view, data) = typed_detail::<Hackathon>(store, Collection::Hackathons, slug, route);
    if status != StatusCode::OK {
        return (status, view, data);
    }
    let hackathon_id = data.get("id").and_then(Value::as_i64);
    let form = typed_public_rows::<RegistrationForm>(store, Collection::RegistrationForms)
        .into_iter()
        .find(|f| f.hackathon_id == hackathon_id);
    (
        status,
        view,
        json!({ "hackathon": data, "registration_form": form }),
    )
}

// =============================================================================
// Public registration
// =============================================================================

async fn handle_create_registration(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    if !state.store.site_settings().registrations_open {
        return Ok(error_response(
            StatusCode::FORBIDDEN,
            "Registrations are closed",
        ));
    }

    let body = req.into_body().collect().await?.to_bytes();
    let input: NewRegistration = match serde_json::from_slice(&body) {
        Ok(i) => i,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e.to_string())),
    };

    match state.gateway.create_registration(input).await {
        Ok(registration) => Ok(json_response(StatusCode::CREATED, &registration)),
        Err(e) => Ok(error_response(StatusCode::BAD_GATEWAY, &e.to_string())),
    }
}

// =============================================================================
// Admin gate
// =============================================================================

fn bearer_token(req: &Request<Incoming>) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

fn is_admin(state: &AppState, req: &Request<Incoming>) -> bool {
    if state.args.dev_mode {
        return true;
    }
    let Some(token) = bearer_token(req) else {
        return false;
    };
    // Read guard dropped before any removal to keep the map lock-free.
    let status = state
        .sessions
        .get(&token)
        .map(|session| !session.is_expired());
    match status {
        Some(true) => true,
        Some(false) => {
            state.sessions.remove(&token);
            false
        }
        None => false,
    }
}

async fn handle_sign_in(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let body = req.into_body().collect().await?.to_bytes();
    let credentials: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e.to_string())),
    };
    let email = credentials["email"].as_str().unwrap_or_default();
    let password = credentials["password"].as_str().unwrap_or_default();

    let session = if state.args.dev_mode {
        Session {
            access_token: format!("dev-{}", Uuid::new_v4()),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(12),
        }
    } else {
        let Some(ref auth) = state.auth else {
            return Ok(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Identity provider not configured",
            ));
        };
        match auth.sign_in(email, password).await {
            Ok(s) => s,
            Err(e) => return Ok(error_response(StatusCode::UNAUTHORIZED, &e.to_string())),
        }
    };

    let response = json!({
        "token": session.access_token,
        "expires_at": session.expires_at,
    });
    state.sessions.insert(session.access_token.clone(), session);
    Ok(json_response(StatusCode::OK, &response))
}

fn handle_sign_out(state: &AppState, req: &Request<Incoming>) -> Response<Full<Bytes>> {
    if let Some(token) = bearer_token(req) {
        state.sessions.remove(&token);
    }
    json_response(StatusCode::OK, &json!({"success": true}))
}

// =============================================================================
// Admin mutations
// =============================================================================

fn parse_id(raw: &str) -> RecordId {
    match raw.parse::<i64>() {
        Ok(n) => RecordId::Int(n),
        Err(_) => RecordId::Str(raw.to_string()),
    }
}

async fn handle_admin(
    state: Arc<AppState>,
    req: Request<Incoming>,
    path: &str,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    if !is_admin(&state, &req) {
        return Ok(error_response(StatusCode::UNAUTHORIZED, "Admin session required"));
    }

    let method = req.method().clone();
    let rest = path.trim_start_matches("/api/admin/").trim_end_matches('/');
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match (&method, segments.as_slice()) {
        (&Method::POST, ["refresh"]) => {
            let report = state.coordinator.refresh(true).await;
            Ok(json_response(
                StatusCode::OK,
                &json!({
                    "refreshed": report.refreshed,
                    "failed": report.failed,
                    "skipped": report.skipped,
                }),
            ))
        }

        (&Method::POST, ["seed"]) => {
            match seed::seed_all(&state.service, &state.gateway).await {
                Ok(inserted) => Ok(json_response(
                    StatusCode::OK,
                    &json!({"inserted": inserted}),
                )),
                Err(e) => Ok(error_response(StatusCode::BAD_GATEWAY, &e.to_string())),
            }
        }

        (&Method::POST, ["upload"]) => handle_upload(state.clone(), req).await,

        (&Method::PATCH, ["registrations", id, "status"]) => {
            let id = parse_id(id);
            let body = req.into_body().collect().await?.to_bytes();
            let payload: Value = match serde_json::from_slice(&body) {
                Ok(v) => v,
                Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e.to_string())),
            };
            let status: RegistrationStatus = match payload["status"]
                .as_str()
                .unwrap_or_default()
                .parse()
            {
                Ok(s) => s,
                Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e)),
            };
            // Optimistic: patched locally, pushed without waiting.
            state.gateway.set_registration_status(id, status);
            Ok(json_response(StatusCode::ACCEPTED, &json!({"success": true})))
        }

        (&Method::DELETE, ["registrations", id]) => {
            let id = parse_id(id);
            match state.gateway.delete_registration(&id).await {
                Ok(()) => Ok(json_response(StatusCode::OK, &json!({"success": true}))),
                Err(e) => Ok(error_response(StatusCode::BAD_GATEWAY, &e.to_string())),
            }
        }

        (&Method::POST, [collection]) => {
            let collection: Collection = match collection.parse() {
                Ok(c) => c,
                Err(e) => return Ok(error_response(StatusCode::NOT_FOUND, &e.to_string())),
            };
            let body = req.into_body().collect().await?.to_bytes();
            let record: Value = match serde_json::from_slice(&body) {
                Ok(v) => v,
                Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e.to_string())),
            };
            let result = if collection == Collection::PhotoGallery {
                state.gateway.add_photo(record).await
            } else {
                state.gateway.create(collection, record).await
            };
            match result {
                Ok(row) => Ok(json_response(StatusCode::CREATED, &row)),
                Err(e) => Ok(error_response(StatusCode::BAD_GATEWAY, &e.to_string())),
            }
        }

        (&Method::PATCH, [collection, id]) => {
            let collection: Collection = match collection.parse() {
                Ok(c) => c,
                Err(e) => return Ok(error_response(StatusCode::NOT_FOUND, &e.to_string())),
            };
            let id = parse_id(id);
            let body = req.into_body().collect().await?.to_bytes();
            let partial: Value = match serde_json::from_slice(&body) {
                Ok(v) => v,
                Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e.to_string())),
            };
            match state.gateway.update(collection, &id, partial).await {
                Ok(()) => Ok(json_response(StatusCode::OK, &json!({"success": true}))),
                Err(e) => Ok(error_response(StatusCode::BAD_GATEWAY, &e.to_string())),
            }
        }

        (&Method::DELETE, [collection, id]) => {
            let collection: Collection = match collection.parse() {
                Ok(c) => c,
                Err(e) => return Ok(error_response(StatusCode::NOT_FOUND, &e.to_string())),
            };
            let id = parse_id(id);
            let result = if collection == Collection::PhotoGallery {
                state.gateway.remove_photo(&id).await
            } else {
                state.gateway.delete(collection, &id).await
            };
            match result {
                Ok(()) => Ok(json_response(StatusCode::OK, &json!({"success": true}))),
                Err(e) => Ok(error_response(StatusCode::BAD_GATEWAY, &e.to_string())),
            }
        }

        _ => Ok(error_response(StatusCode::NOT_FOUND, "No such admin endpoint")),
    }
}

async fn handle_upload(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let Some(ref objects) = state.objects else {
        return Ok(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Object storage not configured",
        ));
    };

    let name = req
        .headers()
        .get("X-File-Name")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let mime_type = req
        .headers()
        .get("Content-Type")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let body = req.into_body().collect().await?.to_bytes();
    if body.is_empty() {
        return Ok(error_response(StatusCode::BAD_REQUEST, "Empty upload body"));
    }

    match objects
        .upload(&state.args.upload_bucket, &name, body.to_vec(), &mime_type)
        .await
    {
        Ok(url) => Ok(json_response(StatusCode::OK, &json!({"url": url}))),
        Err(e) => Ok(error_response(StatusCode::BAD_GATEWAY, &e.to_string())),
    }
}

// =============================================================================
// Response helpers
// =============================================================================

fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "success": false,
        "error": message,
    });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
