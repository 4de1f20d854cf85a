#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use flavormatch::config::SpotifyConfig;
use serde_json::{Value, json};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Shared hit counter for mock endpoints.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}


/// In-process stand-in for the Spotify accounts, Web API and oEmbed endpoints.
#[derive(Clone, Default)]
pub struct SpotifyMock {
    pub token_hits: Hits,
    pub me_hits: Hits,
    pub search_hits: Hits,
    pub create_hits: Hits,
    pub track_hits: Hits,
    pub oembed_hits: Hits,
    /// Bearer tokens seen by `/v1/me` and `/v1/search`, in order.
    pub seen_tokens: Arc<Mutex<Vec<String>>>,
    /// URI count of every add-tracks request, in order.
    pub track_batches: Arc<Mutex<Vec<usize>>>,
    /// `/v1/me` and `/v1/search` answer 401 this many times before succeeding.
    pub reject_first: usize,
    /// Playlist creation answers without an `id` when unset.
    pub playlist_id: Option<&'static str>,
    /// oEmbed reports ready from this attempt on; never when unset.
    pub embed_ready_at: Option<usize>,
    /// Add-tracks answers 403 from this request on.
    pub fail_tracks_at: Option<usize>,
    /// `expires_in` declared for app tokens; 3600 when unset.
    pub app_expires_in: Option<i64>,
}

impl SpotifyMock {
    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }

    pub fn track_batches(&self) -> Vec<usize> {
        self.track_batches.lock().unwrap().clone()
    }

    pub async fn start(self) -> String {
        let router = Router::new()
            .route("/api/token", post(mock_token))
            .route("/v1/me", get(mock_me))
            .route("/v1/search", get(mock_search))
            .route("/v1/users/{user_id}/playlists", post(mock_create_playlist))
            .route("/v1/playlists/{playlist_id}/tracks", post(mock_add_tracks))
            .route("/oembed", get(mock_oembed))
            .with_state(self);
        serve(router).await
    }
}

pub fn spotify_config(base: &str) -> SpotifyConfig {
    SpotifyConfig {
        client_id: Some("client-id".to_string()),
        client_secret: Some("client-secret".to_string()),
        redirect_uri: Some("http://127.0.0.1:5001/callback".to_string()),
        scope: "playlist-modify-private user-read-private".to_string(),
        auth_url: format!("{base}/authorize"),
        api_url: format!("{base}/v1"),
        token_url: format!("{base}/api/token"),
        oembed_url: format!("{base}/oembed"),
    }
}

async fn mock_token(
    State(mock): State<SpotifyMock>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = mock.token_hits.hit();
    let grant = form.get("grant_type").map(String::as_str).unwrap_or("");
    match grant {
        "client_credentials" => Json(json!({
            "access_token": format!("app-{n}"),
            "token_type": "Bearer",
            "expires_in": mock.app_expires_in.unwrap_or(3600)
        }))
        .into_response(),
        "refresh_token" if form.get("refresh_token").map(String::as_str) == Some("revoked") => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" }))).into_response()
        }
        "refresh_token" => Json(json!({
            "access_token": format!("fresh-{n}"),
            "token_type": "Bearer",
            "expires_in": 3600
        }))
        .into_response(),
        "authorization_code" => match form.get("code").map(String::as_str) {
            Some("good") if form.contains_key("code_verifier") => Json(json!({
                "access_token": "user-1",
                "refresh_token": "refresh-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "playlist-modify-private"
            }))
            .into_response(),
            Some("tokenless") => Json(json!({ "token_type": "Bearer" })).into_response(),
            _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" }))).into_response(),
        },
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

async fn mock_me(State(mock): State<SpotifyMock>, headers: HeaderMap) -> Response {
    let n = mock.me_hits.hit();
    mock.seen_tokens.lock().unwrap().push(bearer(&headers));
    if n <= mock.reject_first {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "id": "chef",
        "display_name": "Chef",
        "email": "chef@example.com",
        "country": "US"
    }))
    .into_response()
}

async fn mock_search(State(mock): State<SpotifyMock>, headers: HeaderMap) -> Response {
    let n = mock.search_hits.hit();
    mock.seen_tokens.lock().unwrap().push(bearer(&headers));
    if n <= mock.reject_first {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "tracks": {
            "items": [
                {
                    "id": "t1",
                    "name": "Oye Como Va",
                    "uri": "spotify:track:t1",
                    "artists": [{ "name": "Santana" }]
                },
                {
                    "id": "t2",
                    "name": "La Bamba",
                    "uri": "spotify:track:t2",
                    "artists": [{ "name": "Ritchie Valens" }]
                }
            ]
        }
    }))
    .into_response()
}

async fn mock_create_playlist(
    State(mock): State<SpotifyMock>,
    Path(_user_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    mock.create_hits.hit();
    match mock.playlist_id {
        Some(id) => (
            StatusCode::CREATED,
            Json(json!({
                "id": id,
                "name": body["name"],
                "public": body["public"],
                "external_urls": { "spotify": format!("https://open.spotify.com/playlist/{id}") }
            })),
        )
            .into_response(),
        None => (StatusCode::CREATED, Json(json!({ "name": body["name"] }))).into_response(),
    }
}

async fn mock_add_tracks(
    State(mock): State<SpotifyMock>,
    Path(_playlist_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let n = mock.track_hits.hit();
    if mock.fail_tracks_at.is_some_and(|at| n >= at) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let count = body["uris"].as_array().map(Vec::len).unwrap_or(0);
    mock.track_batches.lock().unwrap().push(count);
    (StatusCode::CREATED, Json(json!({ "snapshot_id": format!("snap-{n}") }))).into_response()
}

async fn mock_oembed(State(mock): State<SpotifyMock>) -> Response {
    let n = mock.oembed_hits.hit();
    if mock.embed_ready_at.is_some_and(|at| n >= at) {
        Json(json!({ "html": "<iframe></iframe>", "type": "rich" })).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}
