use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tokio::sync::Mutex;

use crate::{
    clock::Clock,
    config::SpotifyConfig,
    error::AuthError,
    management::{CredentialStore, PendingLogins},
    types::{Credential, CredentialState, TokenResponse},
    utils,
};

/// Upper bound on a declared token lifetime. Larger `expires_in` values are
/// cut down to it.
const MAX_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Whose token an outbound music-provider call uses.
#[derive(Debug, Clone)]
pub enum Authorization {
    /// A logged-in user. `session` is set when the credential lives in the
    /// credential store, so renewals are written back there.
    User {
        session: Option<String>,
        credential: Credential,
    },
    /// The application itself, through the client-credentials grant.
    App,
}

impl Authorization {
    pub fn is_user(&self) -> bool {
        matches!(self, Authorization::User { .. })
    }
}

/// Where to send the browser to start a login.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: String,
    pub state: String,
}

/// Obtains, caches and renews Spotify credentials.
///
/// Two grant flows are supported:
///
/// - **Authorization code (with PKCE)** for a logged-in user. The resulting
///   credential is stored per session in the [`CredentialStore`] and renewed
///   with the refresh-token grant.
/// - **Client credentials** for anonymous, app-level catalogue calls. The
///   token is cached until its declared expiry; the cache lock is held while a
///   new token is fetched so concurrent callers trigger a single request.
///
/// [`call_with_auth`](Self::call_with_auth) wraps outbound requests with one
/// bounded renewal on a 401.
pub struct TokenLifecycleManager {
    config: SpotifyConfig,
    client: Client,
    clock: Arc<dyn Clock>,
    sessions: Arc<CredentialStore>,
    logins: PendingLogins,
    app: Mutex<Option<Credential>>,
    renewals: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenLifecycleManager {
    pub fn new(
        config: SpotifyConfig,
        client: Client,
        clock: Arc<dyn Clock>,
        sessions: Arc<CredentialStore>,
    ) -> Self {
        Self {
            config,
            client,
            clock,
            sessions,
            logins: PendingLogins::default(),
            app: Mutex::new(None),
            renewals: Mutex::new(HashMap::new()),
        }
    }

    /// Whether client id and secret are both present.
    ///
    /// Without them every grant fails with [`AuthError::ConfigMissing`] and the
    /// music features run degraded.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn sessions(&self) -> &Arc<CredentialStore> {
        &self.sessions
    }

    fn client_id(&self) -> Result<&str, AuthError> {
        self.config
            .client_id
            .as_deref()
            .ok_or(AuthError::ConfigMissing("SPOTIFY_API_AUTH_CLIENT_ID"))
    }

    fn client_secret(&self) -> Result<&str, AuthError> {
        self.config
            .client_secret
            .as_deref()
            .ok_or(AuthError::ConfigMissing("SPOTIFY_API_AUTH_CLIENT_SECRET"))
    }

    fn redirect_uri(&self) -> Result<&str, AuthError> {
        self.config
            .redirect_uri
            .as_deref()
            .ok_or(AuthError::ConfigMissing("SPOTIFY_API_REDIRECT_URI"))
    }

    /// Starts the authorization-code flow.
    ///
    /// Generates a PKCE verifier and an opaque `state`, remembers both until the
    /// callback arrives, and returns the provider's authorize URL.
    ///
    /// # Returns
    ///
    /// A [`LoginRedirect`] holding the authorize URL the browser should be sent
    /// to and the `state` value the callback must echo back.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ConfigMissing`] when the client id, the redirect URI or a
    ///   parseable authorize URL is not configured
    ///
    /// # Example
    ///
    /// ```
    /// let redirect = tokens.begin_login().await?;
    /// webbrowser::open(&redirect.url)?;
    /// ```
    pub async fn begin_login(&self) -> Result<LoginRedirect, AuthError> {
        let client_id = self.client_id()?;
        let redirect_uri = self.redirect_uri()?;

        let code_verifier = utils::generate_code_verifier();
        let code_challenge = utils::generate_code_challenge(&code_verifier);
        let state = utils::generate_token();

        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("code_challenge", code_challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("scope", self.config.scope.as_str()),
                ("state", state.as_str()),
            ],
        )
        .map_err(|_| AuthError::ConfigMissing("SPOTIFY_API_AUTH_URL"))?;

        self.logins
            .insert(state.clone(), code_verifier, self.clock.now())
            .await;

        Ok(LoginRedirect {
            url: url.to_string(),
            state,
        })
    }

    /// Exchanges a redirect-flow code for a user credential.
    ///
    /// One-shot: the pending login for `state` is consumed whether or not the
    /// exchange succeeds. On success the credential is stored under a fresh
    /// session id, which is returned alongside it.
    ///
    /// # Arguments
    ///
    /// * `state` - The `state` query parameter of the callback, as issued by
    ///   [`begin_login`](Self::begin_login)
    /// * `code` - The authorization code from the callback
    ///
    /// # Returns
    ///
    /// The new session id and the credential stored under it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ConfigMissing`] without client id or redirect URI
    /// - [`AuthError::Exchange`] when `state` is unknown or older than the login
    ///   window, when the token endpoint refuses the code, or when its answer
    ///   carries no access token
    ///
    /// # Example
    ///
    /// ```
    /// let (session, credential) = tokens
    ///     .exchange_authorization_code(&params.state, &params.code)
    ///     .await?;
    /// ```
    pub async fn exchange_authorization_code(
        &self,
        state: &str,
        code: &str,
    ) -> Result<(String, Credential), AuthError> {
        let client_id = self.client_id()?;
        let redirect_uri = self.redirect_uri()?;
        let login = self
            .logins
            .take(state, self.clock.now())
            .await
            .ok_or_else(|| AuthError::Exchange("unknown or expired login state".to_string()))?;

        let token = self
            .post_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("code_verifier", login.code_verifier.as_str()),
                ("client_id", client_id),
            ])
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let credential = self
            .credential_from(token, None)
            .ok_or_else(|| AuthError::Exchange("response carried no access_token".to_string()))?;

        let session = utils::generate_token();
        self.sessions.store(&session, credential.clone()).await;
        tracing::info!("user session created");
        Ok((session, credential))
    }

    /// Renews a user credential with the refresh-token grant.
    ///
    /// A rotated refresh token replaces the old one; when the provider sends
    /// none the old one is kept. The credential store is not touched here.
    ///
    /// # Arguments
    ///
    /// * `refresh_token` - The refresh token of the credential to renew
    ///
    /// # Errors
    ///
    /// - [`AuthError::ConfigMissing`] without a client id
    /// - [`AuthError::Expired`] when the grant is refused or the answer holds no
    ///   access token; the user has to log in again
    pub async fn refresh_user(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        let client_id = self.client_id()?;
        let token = self
            .post_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
            ])
            .await
            .map_err(|e| match e {
                AuthError::ConfigMissing(key) => AuthError::ConfigMissing(key),
                other => AuthError::Expired(other.to_string()),
            })?;

        self.credential_from(token, Some(refresh_token.to_string()))
            .ok_or_else(|| AuthError::Expired("refresh carried no access_token".to_string()))
    }

    /// Returns the app-level credential, fetching a new one only when the
    /// cached one has reached its `expires_at`.
    ///
    /// The cache lock is held across the token request, so concurrent callers
    /// with a cold cache wait for a single client-credentials grant. Declared
    /// lifetimes are capped at one day; negative ones expire at once.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ConfigMissing`] without client id or secret
    /// - [`AuthError::Rejected`] when the token endpoint refuses the grant or
    ///   answers without an access token
    /// - [`AuthError::Http`] on transport failures
    ///
    /// # Example
    ///
    /// ```
    /// let credential = tokens.get_app_credential().await?;
    /// let response = client
    ///     .get(url)
    ///     .bearer_auth(&credential.access_token)
    ///     .send()
    ///     .await?;
    /// ```
    pub async fn get_app_credential(&self) -> Result<Credential, AuthError> {
        let mut cached = self.app.lock().await;
        if let Some(credential) = cached
            .as_ref()
            .filter(|c| !c.is_expired(self.clock.now()))
        {
            return Ok(credential.clone());
        }

        self.client_secret()?;
        let token = self
            .post_token(&[("grant_type", "client_credentials")])
            .await?;
        let credential = self
            .credential_from(token, None)
            .ok_or_else(|| AuthError::Rejected("response carried no access_token".to_string()))?;

        tracing::debug!(expires_at = %credential.expires_at, "app credential refreshed");
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Drops the cached app credential if it is still the one that was rejected.
    async fn invalidate_app_credential(&self, rejected_token: &str) {
        let mut cached = self.app.lock().await;
        if cached
            .as_ref()
            .is_some_and(|c| c.access_token == rejected_token)
        {
            *cached = None;
        }
    }

    /// Resolves the caller's authorization from a session id or a bearer token.
    ///
    /// A known session wins because it carries the refresh token. A bare bearer
    /// token still works but cannot be renewed.
    ///
    /// # Arguments
    ///
    /// * `session` - Value of the `X-Session-Id` header, if any
    /// * `bearer` - Token from the `Authorization: Bearer` header, if any
    ///
    /// # Returns
    ///
    /// `None` when neither names a usable credential.
    pub async fn user_authorization(
        &self,
        session: Option<&str>,
        bearer: Option<&str>,
    ) -> Option<Authorization> {
        if let Some(session) = session {
            if let Some(credential) = self.sessions.get(session).await {
                return Some(Authorization::User {
                    session: Some(session.to_string()),
                    credential,
                });
            }
        }

        bearer.filter(|t| !t.is_empty()).map(|token| Authorization::User {
            session: None,
            credential: Credential::bearer(token.to_string(), self.clock.now()),
        })
    }

    /// Lifecycle state of the credential stored under `session`.
    pub async fn session_state(&self, session: &str) -> CredentialState {
        let credential = self.sessions.get(session).await;
        Credential::state(credential.as_ref(), self.clock.now())
    }

    /// Issues a request built by `build` with the caller's access token.
    ///
    /// On a 401 the credential is renewed once and the request is sent once
    /// more. A user credential that is already past its expiry is renewed up
    /// front instead, and that counts as the one renewal. A second 401 fails
    /// with [`AuthError::Expired`] and clears the session, so the user has to
    /// log in again. Never more than two requests per call.
    ///
    /// Renewals of one session are serialized. A request that waited on
    /// another request's renewal picks up the renewed credential instead of
    /// spending the refresh token a second time.
    ///
    /// # Arguments
    ///
    /// * `auth` - Whose token to send; updated in place when renewed
    /// * `build` - Builds the request from the client and an access token. It
    ///   runs once per attempt, so it must be repeatable
    ///
    /// # Returns
    ///
    /// The provider's response for any status other than a final 401. Callers
    /// check the status themselves.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Expired`] after a second 401 or a failed renewal
    /// - [`AuthError::ConfigMissing`] or [`AuthError::Rejected`] when an app
    ///   token cannot be obtained
    /// - [`AuthError::Http`] on transport failures
    ///
    /// # Example
    ///
    /// ```
    /// let url = format!("{}/me", tokens.config().api_url);
    /// let response = tokens
    ///     .call_with_auth(&mut auth, |client, token| client.get(&url).bearer_auth(token))
    ///     .await?;
    /// ```
    pub async fn call_with_auth<F>(
        &self,
        auth: &mut Authorization,
        build: F,
    ) -> Result<Response, AuthError>
    where
        F: Fn(&Client, &str) -> RequestBuilder + Send + Sync,
    {
        let mut renewed = false;
        if let Authorization::User {
            session,
            credential,
        } = auth
        {
            if credential.is_expired(self.clock.now()) && credential.refresh_token.is_some() {
                self.renew_user(session.as_deref(), credential).await?;
                renewed = true;
            }
        }

        let token = self.access_token(auth).await?;
        let response = build(&self.client, &token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        if renewed {
            return Err(self.expire(auth, "rejected right after renewal").await);
        }

        tracing::debug!("access token rejected, renewing once");
        let token = match auth {
            Authorization::User {
                session,
                credential,
            } => {
                self.renew_user(session.as_deref(), credential).await?;
                credential.access_token.clone()
            }
            Authorization::App => {
                self.invalidate_app_credential(&token).await;
                self.get_app_credential().await?.access_token
            }
        };

        let response = build(&self.client, &token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(self.expire(auth, "rejected after renewal").await);
        }
        Ok(response)
    }

    async fn access_token(&self, auth: &Authorization) -> Result<String, AuthError> {
        match auth {
            Authorization::User { credential, .. } => Ok(credential.access_token.clone()),
            Authorization::App => Ok(self.get_app_credential().await?.access_token),
        }
    }

    async fn renew_user(
        &self,
        session: Option<&str>,
        credential: &mut Credential,
    ) -> Result<(), AuthError> {
        let _renewal = match session {
            Some(session) => Some(self.renewal_lock(session).await.lock_owned().await),
            None => None,
        };
        if let Some(stored) = self.renewed_elsewhere(session, credential).await {
            *credential = stored;
            return Ok(());
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            if let Some(session) = session {
                self.sessions.remove(session).await;
            }
            return Err(AuthError::Expired("no refresh token".to_string()));
        };

        match self.refresh_user(&refresh_token).await {
            Ok(renewed) => {
                if let Some(session) = session {
                    self.sessions.store(session, renewed.clone()).await;
                }
                *credential = renewed;
                Ok(())
            }
            Err(e) => {
                if let Some(session) = session {
                    self.sessions.remove(session).await;
                }
                tracing::warn!(error = %e, "user credential renewal failed");
                Err(e)
            }
        }
    }

    /// One renewal lock per session; idle entries are pruned on each call.
    async fn renewal_lock(&self, session: &str) -> Arc<Mutex<()>> {
        let mut locks = self.renewals.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(session.to_string()).or_default())
    }

    /// The stored credential, if another request already replaced `credential`
    /// with a live one.
    async fn renewed_elsewhere(
        &self,
        session: Option<&str>,
        credential: &Credential,
    ) -> Option<Credential> {
        let stored = self.sessions.get(session?).await?;
        (stored.access_token != credential.access_token && !stored.is_expired(self.clock.now()))
            .then_some(stored)
    }

    async fn expire(&self, auth: &Authorization, reason: &str) -> AuthError {
        if let Authorization::User {
            session: Some(session),
            ..
        } = auth
        {
            self.sessions.remove(session).await;
        }
        AuthError::Expired(reason.to_string())
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let mut request = self.client.post(&self.config.token_url).form(form);
        if let Some(secret) = self.config.client_secret.as_deref() {
            request = request.basic_auth(self.client_id()?, Some(secret));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(format!("{status}: {body}")));
        }
        Ok(response.json::<TokenResponse>().await?)
    }

    fn credential_from(
        &self,
        token: TokenResponse,
        previous_refresh: Option<String>,
    ) -> Option<Credential> {
        let access_token = token.access_token.filter(|t| !t.is_empty())?;
        let now = self.clock.now();
        let lifetime = token
            .expires_in
            .unwrap_or(Credential::DEFAULT_LIFETIME_SECS)
            .clamp(0, MAX_LIFETIME_SECS);
        let expires_at = TimeDelta::try_seconds(lifetime)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or_else(|| now + TimeDelta::seconds(Credential::DEFAULT_LIFETIME_SECS));
        Some(Credential {
            access_token,
            refresh_token: token
                .refresh_token
                .filter(|t| !t.is_empty())
                .or(previous_refresh),
            expires_at,
            scope: token.scope,
        })
    }
}
