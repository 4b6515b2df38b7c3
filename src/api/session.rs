use crate::api::{self, Error};
use crate::model::{Api, AuthToken, Credentials, RawPayload};

/// Holds the bearer token of one installation.
///
/// The API does not say when a token expires. A token is kept until a data
/// endpoint rejects it, after which it is dropped with `invalidate()`.
#[derive(Debug)]
pub struct AuthSession {
    api: Api,
    credentials: Credentials,
    token: Option<AuthToken>,
}

impl AuthSession {
    pub fn new(api: Api, credentials: Credentials) -> Self {
        AuthSession {
            api,
            credentials,
            token: None,
        }
    }

    /// Resume a session with a previously obtained token.
    pub fn with_token(mut self, token: AuthToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Log in and replace the held token. On failure the session holds no token.
    pub async fn login(&mut self) -> Result<AuthToken, Error> {
        self.token = None;
        let token = api::login(&self.api, &self.credentials).await?;
        log::debug!("Logged in as {}", self.credentials.identifier());
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Return the held token, logging in first if there is none.
    pub async fn ensure_token(&mut self) -> Result<AuthToken, Error> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => self.login().await,
        }
    }

    pub fn invalidate(&mut self) {
        if self.token.take().is_some() {
            log::debug!("Dropped rejected token");
        }
    }

    pub async fn overview(&self, token: &AuthToken) -> Result<RawPayload, Error> {
        api::overview(&self.api, token).await
    }

    pub async fn production(&self, token: &AuthToken) -> Result<RawPayload, Error> {
        api::production(&self.api, token, self.credentials.selector()).await
    }
}
