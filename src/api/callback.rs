use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use reqwest::Url;
use serde_json::{Value, json};

use crate::{
    api::{ApiError, ApiResult, SESSION_HEADER, require_user},
    server::AppState,
    types::{CallbackParams, RefreshBody, UserProfile},
};

/// `GET /login`: sends the browser to the provider's consent page.
pub async fn login(State(state): State<AppState>) -> ApiResult<Redirect> {
    let redirect = state.tokens.begin_login().await?;
    Ok(Redirect::to(&redirect.url))
}

/// `GET /callback?code=&state=`: completes the login and hands the tokens to
/// the UI through a redirect.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend = &state.config.frontend_url;

    if let Some(error) = params.error {
        tracing::info!(%error, "login declined at the provider");
        return Redirect::to(&frontend_callback(frontend, &[("error", error.as_str())]));
    }
    let (Some(code), Some(login_state)) = (params.code, params.state) else {
        return Redirect::to(&frontend_callback(
            frontend,
            &[("error", "missing_code")],
        ));
    };

    match state
        .tokens
        .exchange_authorization_code(&login_state, &code)
        .await
    {
        Ok((session, credential)) => {
            let expires_in = (credential.expires_at - state.tokens.now())
                .num_seconds()
                .max(0)
                .to_string();
            let refresh_token = credential.refresh_token.unwrap_or_default();
            Redirect::to(&frontend_callback(
                frontend,
                &[
                    ("access_token", credential.access_token.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                    ("expires_in", expires_in.as_str()),
                    ("session", session.as_str()),
                ],
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "authorization code exchange failed");
            Redirect::to(&frontend_callback(
                frontend,
                &[("error", "token_exchange_failed")],
            ))
        }
    }
}

fn frontend_callback(frontend: &str, params: &[(&str, &str)]) -> String {
    let base = format!("{}/callback", frontend.trim_end_matches('/'));
    Url::parse_with_params(&base, params)
        .map(|url| url.to_string())
        .unwrap_or(base)
}

/// `POST /refresh {refresh_token}`. When the request names a session, the
/// renewed credential replaces the stored one.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RefreshBody>,
) -> ApiResult<Json<Value>> {
    if body.refresh_token.trim().is_empty() {
        return Err(ApiError::BadRequest("missing refresh_token".to_string()));
    }
    let credential = state.tokens.refresh_user(&body.refresh_token).await?;

    if let Some(session) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        if state.tokens.sessions().get(session).await.is_some() {
            state.tokens.sessions().store(session, credential.clone()).await;
        }
    }

    let expires_in = (credential.expires_at - state.tokens.now())
        .num_seconds()
        .max(0);
    Ok(Json(json!({
        "access_token": credential.access_token,
        "refresh_token": credential.refresh_token,
        "expires_in": expires_in,
    })))
}

/// `GET /me`: the logged-in user's profile.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<UserProfile>> {
    let mut auth = require_user(&state, &headers).await?;
    Ok(Json(state.catalog.current_user(&mut auth).await?))
}
