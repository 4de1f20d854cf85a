mod common;

use std::{sync::Arc, time::Duration};

use chrono::{TimeDelta, TimeZone, Utc};
use common::{SpotifyMock, spotify_config};
use flavormatch::{
    clock::{Clock, ManualClock},
    error::AuthError,
    management::CredentialStore,
    spotify::{Authorization, TokenLifecycleManager},
    types::{Credential, CredentialState},
    utils,
};
use reqwest::{StatusCode, Url};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

fn manager(base: &str, clock: Arc<ManualClock>) -> TokenLifecycleManager {
    TokenLifecycleManager::new(
        spotify_config(base),
        utils::http_client(Duration::from_secs(5)).unwrap(),
        clock,
        Arc::new(CredentialStore::in_memory()),
    )
}

fn user_credential(clock: &ManualClock, access: &str, refresh: Option<&str>) -> Credential {
    Credential {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_at: clock.now() + TimeDelta::seconds(3600),
        scope: None,
    }
}

async fn get_me(
    tokens: &TokenLifecycleManager,
    auth: &mut Authorization,
) -> Result<reqwest::Response, AuthError> {
    let url = format!("{}/me", tokens.config().api_url);
    tokens
        .call_with_auth(auth, |client, token| client.get(&url).bearer_auth(token))
        .await
}

#[tokio::test]
async fn test_app_credential_is_cached_until_expiry() {
    let mock = SpotifyMock::default();
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    let first = tokens.get_app_credential().await.unwrap();
    let second = tokens.get_app_credential().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.access_token, "app-1");
    assert_eq!(mock.token_hits.count(), 1);

    clock.advance(TimeDelta::seconds(3599));
    tokens.get_app_credential().await.unwrap();
    assert_eq!(mock.token_hits.count(), 1);

    clock.advance(TimeDelta::seconds(1));
    let renewed = tokens.get_app_credential().await.unwrap();
    assert_eq!(renewed.access_token, "app-2");
    assert_eq!(mock.token_hits.count(), 2);

    tokens.get_app_credential().await.unwrap();
    assert_eq!(mock.token_hits.count(), 2);
}

#[tokio::test]
async fn test_concurrent_app_credential_requests_fetch_once() {
    let mock = SpotifyMock::default();
    let base = mock.clone().start().await;
    let tokens = Arc::new(manager(&base, clock()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tokens = Arc::clone(&tokens);
            tokio::spawn(async move { tokens.get_app_credential().await.unwrap() })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().access_token, "app-1");
    }
    assert_eq!(mock.token_hits.count(), 1);
}

#[tokio::test]
async fn test_app_credential_requires_secret() {
    let mock = SpotifyMock::default();
    let base = mock.clone().start().await;
    let mut config = spotify_config(&base);
    config.client_secret = None;
    let tokens = TokenLifecycleManager::new(
        config,
        utils::http_client(Duration::from_secs(5)).unwrap(),
        clock(),
        Arc::new(CredentialStore::in_memory()),
    );

    assert!(!tokens.is_configured());
    assert!(matches!(
        tokens.get_app_credential().await,
        Err(AuthError::ConfigMissing(_))
    ));
    assert_eq!(mock.token_hits.count(), 0);
}

#[tokio::test]
async fn test_call_with_auth_retries_once_with_refreshed_token() {
    let mock = SpotifyMock {
        reject_first: 1,
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    tokens
        .sessions()
        .store("s1", user_credential(&clock, "stale", Some("refresh-1")))
        .await;
    let mut auth = tokens.user_authorization(Some("s1"), None).await.unwrap();

    let response = get_me(&tokens, &mut auth).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mock.me_hits.count(), 2);
    assert_eq!(mock.token_hits.count(), 1);
    assert_eq!(mock.seen_tokens(), vec!["stale".to_string(), "fresh-1".to_string()]);

    // The renewed credential is written back, refresh token kept
    let stored = tokens.sessions().get("s1").await.unwrap();
    assert_eq!(stored.access_token, "fresh-1");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_call_with_auth_gives_up_after_second_401() {
    let mock = SpotifyMock {
        reject_first: usize::MAX,
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    tokens
        .sessions()
        .store("s1", user_credential(&clock, "stale", Some("refresh-1")))
        .await;
    let mut auth = tokens.user_authorization(Some("s1"), None).await.unwrap();

    let result = get_me(&tokens, &mut auth).await;
    assert!(matches!(result, Err(AuthError::Expired(_))));
    assert_eq!(mock.me_hits.count(), 2);
    assert_eq!(mock.token_hits.count(), 1);
    assert_eq!(tokens.session_state("s1").await, CredentialState::Unset);
}

#[tokio::test]
async fn test_expired_credential_is_renewed_before_sending() {
    let mock = SpotifyMock::default();
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    tokens
        .sessions()
        .store("s1", user_credential(&clock, "old", Some("refresh-1")))
        .await;
    clock.advance(TimeDelta::seconds(3600));
    assert_eq!(tokens.session_state("s1").await, CredentialState::Expired);

    let mut auth = tokens.user_authorization(Some("s1"), None).await.unwrap();
    let response = get_me(&tokens, &mut auth).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mock.me_hits.count(), 1);
    assert_eq!(mock.seen_tokens(), vec!["fresh-1".to_string()]);
    assert_eq!(tokens.session_state("s1").await, CredentialState::Valid);
}

#[tokio::test]
async fn test_proactive_renewal_counts_as_the_only_renewal() {
    let mock = SpotifyMock {
        reject_first: usize::MAX,
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    tokens
        .sessions()
        .store("s1", user_credential(&clock, "old", Some("refresh-1")))
        .await;
    clock.advance(TimeDelta::seconds(4000));

    let mut auth = tokens.user_authorization(Some("s1"), None).await.unwrap();
    let result = get_me(&tokens, &mut auth).await;
    assert!(matches!(result, Err(AuthError::Expired(_))));
    assert_eq!(mock.me_hits.count(), 1);
    assert_eq!(mock.token_hits.count(), 1);
}

#[tokio::test]
async fn test_failed_refresh_clears_session() {
    let mock = SpotifyMock {
        reject_first: usize::MAX,
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    tokens
        .sessions()
        .store("s1", user_credential(&clock, "stale", Some("revoked")))
        .await;
    let mut auth = tokens.user_authorization(Some("s1"), None).await.unwrap();

    let result = get_me(&tokens, &mut auth).await;
    assert!(matches!(result, Err(AuthError::Expired(_))));
    assert_eq!(mock.me_hits.count(), 1);
    assert_eq!(tokens.session_state("s1").await, CredentialState::Unset);
}

#[tokio::test]
async fn test_bare_bearer_token_cannot_be_renewed() {
    let mock = SpotifyMock {
        reject_first: usize::MAX,
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let tokens = manager(&base, clock());

    let mut auth = tokens.user_authorization(None, Some("raw")).await.unwrap();
    let result = get_me(&tokens, &mut auth).await;
    assert!(matches!(result, Err(AuthError::Expired(_))));
    assert_eq!(mock.me_hits.count(), 1);
    assert_eq!(mock.token_hits.count(), 0);
}

#[tokio::test]
async fn test_app_authorization_reacquires_token_once() {
    let mock = SpotifyMock {
        reject_first: 1,
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let tokens = manager(&base, clock());

    let mut auth = Authorization::App;
    let response = get_me(&tokens, &mut auth).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mock.seen_tokens(), vec!["app-1".to_string(), "app-2".to_string()]);
    assert_eq!(mock.token_hits.count(), 2);
}

#[tokio::test]
async fn test_login_and_code_exchange() {
    let mock = SpotifyMock::default();
    let base = mock.clone().start().await;
    let tokens = manager(&base, clock());

    let redirect = tokens.begin_login().await.unwrap();
    let url = Url::parse(&redirect.url).unwrap();
    let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert!(redirect.url.starts_with(&format!("{base}/authorize")));
    assert_eq!(params["client_id"], "client-id");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["state"], redirect.state);
    assert_eq!(params["code_challenge"].len(), 43);

    let (session, credential) = tokens
        .exchange_authorization_code(&redirect.state, "good")
        .await
        .unwrap();
    assert_eq!(credential.access_token, "user-1");
    assert_eq!(credential.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(tokens.session_state(&session).await, CredentialState::Valid);

    // The login state is one-shot
    let again = tokens
        .exchange_authorization_code(&redirect.state, "good")
        .await;
    assert!(matches!(again, Err(AuthError::Exchange(_))));
    assert_eq!(mock.token_hits.count(), 1);
}

#[tokio::test]
async fn test_code_exchange_failures() {
    let mock = SpotifyMock::default();
    let base = mock.clone().start().await;
    let tokens = manager(&base, clock());

    let unknown = tokens.exchange_authorization_code("nope", "good").await;
    assert!(matches!(unknown, Err(AuthError::Exchange(_))));
    assert_eq!(mock.token_hits.count(), 0);

    let login = tokens.begin_login().await.unwrap();
    let rejected = tokens
        .exchange_authorization_code(&login.state, "bad")
        .await;
    assert!(matches!(rejected, Err(AuthError::Exchange(_))));

    let login = tokens.begin_login().await.unwrap();
    let tokenless = tokens
        .exchange_authorization_code(&login.state, "tokenless")
        .await;
    assert!(matches!(tokenless, Err(AuthError::Exchange(_))));
    assert!(tokens.sessions().is_empty().await);
}

#[tokio::test]
async fn test_expired_login_state_is_rejected() {
    let mock = SpotifyMock::default();
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    let login = tokens.begin_login().await.unwrap();
    clock.advance(TimeDelta::minutes(11));
    let result = tokens.exchange_authorization_code(&login.state, "good").await;
    assert!(matches!(result, Err(AuthError::Exchange(_))));
    assert_eq!(mock.token_hits.count(), 0);
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let mock = SpotifyMock::default();
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    let credential = tokens.refresh_user("refresh-1").await.unwrap();
    assert_eq!(credential.access_token, "fresh-1");
    assert_eq!(credential.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(credential.expires_at, clock.now() + TimeDelta::seconds(3600));

    let revoked = tokens.refresh_user("revoked").await;
    assert!(matches!(revoked, Err(AuthError::Expired(_))));
}

#[tokio::test]
async fn test_huge_declared_lifetime_is_capped() {
    let mock = SpotifyMock {
        app_expires_in: Some(i64::MAX),
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = Arc::new(manager(&base, clock.clone()));

    let handle = {
        let tokens = Arc::clone(&tokens);
        tokio::spawn(async move { tokens.get_app_credential().await })
    };
    let credential = handle.await.unwrap().unwrap();
    assert_eq!(credential.access_token, "app-1");
    assert_eq!(credential.expires_at, clock.now() + TimeDelta::hours(24));

    // The cache lock was released normally
    tokens.get_app_credential().await.unwrap();
    assert_eq!(mock.token_hits.count(), 1);
}

#[tokio::test]
async fn test_negative_declared_lifetime_expires_immediately() {
    let mock = SpotifyMock {
        app_expires_in: Some(-30),
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    let credential = tokens.get_app_credential().await.unwrap();
    assert_eq!(credential.expires_at, clock.now());
    assert!(credential.is_expired(clock.now()));

    let next = tokens.get_app_credential().await.unwrap();
    assert_eq!(next.access_token, "app-2");
    assert_eq!(mock.token_hits.count(), 2);
}

#[tokio::test]
async fn test_concurrent_401s_on_one_session_refresh_once() {
    let mock = SpotifyMock {
        reject_first: 2,
        ..SpotifyMock::default()
    };
    let base = mock.clone().start().await;
    let clock = clock();
    let tokens = manager(&base, clock.clone());

    tokens
        .sessions()
        .store("s1", user_credential(&clock, "stale", Some("refresh-1")))
        .await;
    let mut first = tokens.user_authorization(Some("s1"), None).await.unwrap();
    let mut second = tokens.user_authorization(Some("s1"), None).await.unwrap();

    let (a, b) = tokio::join!(get_me(&tokens, &mut first), get_me(&tokens, &mut second));
    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);

    assert_eq!(mock.token_hits.count(), 1);
    assert_eq!(mock.me_hits.count(), 4);
    let stored = tokens.sessions().get("s1").await.unwrap();
    assert_eq!(stored.access_token, "fresh-1");
    assert_eq!(tokens.session_state("s1").await, CredentialState::Valid);
}
