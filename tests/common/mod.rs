#![allow(dead_code)]

use anyhow::{bail, Context, Result};
use axum::{
    async_trait,
    body::Body,
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    Router,
};
use regdesk::{
    api::{self, session::SESSION_COOKIE, AppConfig, AppState},
    identity::{IdentityError, IdentityProvider, LoginRedirect, PendingLogin},
    store::MemoryStore,
};
use secrecy::SecretString;
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;
use url::Url;

pub const PUBLIC_URL: &str = "http://regdesk.test/";
pub const PROVIDER: &str = "https://provider.test/auth";
pub const ALICE: &str = "https://alice.id.fedoraproject.org/";
pub const BOB: &str = "https://bob.id.fedoraproject.org/";

const SECRET: &str = "test-secret-test-secret-test-secret-0123";

/// Sends every identifier straight back: whatever was typed is the identity.
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn begin(
        &self,
        identifier: &str,
        _return_to: &str,
        _realm: &str,
    ) -> Result<LoginRedirect, IdentityError> {
        if identifier.contains(' ') {
            return Err(IdentityError::InvalidIdentifier(identifier.to_string()));
        }
        Ok(LoginRedirect {
            url: format!("{PROVIDER}?id={identifier}"),
            pending: PendingLogin {
                endpoint: PROVIDER.to_string(),
                claimed_id: identifier.to_string(),
            },
        })
    }

    async fn complete(
        &self,
        pending: &PendingLogin,
        response: &HashMap<String, String>,
        _return_to: &str,
    ) -> Result<String, IdentityError> {
        match response.get("openid.mode").map(String::as_str) {
            Some("id_res") => {}
            Some("cancel") => return Err(IdentityError::Cancelled),
            other => return Err(IdentityError::Rejected(format!("mode {other:?}"))),
        }
        let claimed = response
            .get("openid.claimed_id")
            .ok_or_else(|| IdentityError::Rejected("no claimed_id".to_string()))?;
        if *claimed != pending.claimed_id {
            return Err(IdentityError::Rejected("claimed_id mismatch".to_string()));
        }
        Ok(claimed.clone())
    }
}

pub fn config() -> Result<AppConfig> {
    Ok(AppConfig::new(Url::parse(PUBLIC_URL)?))
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

/// Drives the router in-process, carrying the session cookie between requests.
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
    pub store: Arc<MemoryStore>,
}

impl TestClient {
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::default());
        let state = AppState::new(
            config,
            store.clone(),
            Arc::new(FakeIdentity),
            &SecretString::from(SECRET.to_string()),
        )?;
        Ok(Self {
            app: api::router(Arc::new(state)),
            cookie: None,
            store,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(config()?)
    }

    /// A second browser against the same store.
    pub fn fork(&self) -> Self {
        Self {
            app: self.app.clone(),
            cookie: None,
            store: self.store.clone(),
        }
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Result<TestResponse> {
        if let Some(cookie) = &self.cookie {
            request.headers_mut().insert(COOKIE, cookie.parse()?);
        }

        let response = self.app.clone().oneshot(request).await?;

        for value in response.headers().get_all(SET_COOKIE) {
            let pair = value.to_str()?.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                if name == SESSION_COOKIE {
                    self.cookie = (!value.is_empty()).then(|| pair.to_string());
                }
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .map(|value| value.to_str().map(ToString::to_string))
            .transpose()?;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;

        Ok(TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    pub async fn get(&mut self, path: &str) -> Result<TestResponse> {
        self.send(Request::get(path).body(Body::empty())?).await
    }

    pub async fn post_form(&mut self, path: &str, pairs: &[(&str, &str)]) -> Result<TestResponse> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        let request = Request::post(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))?;
        self.send(request).await
    }

    /// Follow a redirect response with a GET.
    pub async fn follow(&mut self, response: &TestResponse) -> Result<TestResponse> {
        let location = response
            .location
            .as_deref()
            .context("response is not a redirect")?;
        self.get(location).await
    }

    /// Run the whole login round trip for `identity`.
    pub async fn login_as(&mut self, identity: &str) -> Result<()> {
        let started = self.post_form("/login", &[("openid", identity)]).await?;
        if started.status != StatusCode::SEE_OTHER {
            bail!("login did not redirect: {}", started.status);
        }

        let callback = callback_query(&[
            ("openid.mode", "id_res"),
            ("openid.claimed_id", identity),
        ]);
        let finished = self.get(&callback).await?;
        if finished.status != StatusCode::SEE_OTHER || finished.location.as_deref() != Some("/") {
            bail!("login callback failed: {finished:?}");
        }
        Ok(())
    }

    /// Log in and file the minimal valid registration.
    pub async fn register_as(&mut self, identity: &str, firstname: &str) -> Result<()> {
        self.login_as(identity).await?;
        let response = self
            .post_form("/new", &[("firstname", firstname), ("email", "a@x.org")])
            .await?;
        if response.status != StatusCode::SEE_OTHER {
            bail!("registration failed: {response:?}");
        }
        Ok(())
    }
}

pub fn callback_query(pairs: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("/login/callback?{query}")
}
