pub mod endpoint;
pub mod error;
pub mod response;
pub mod session;

use crate::model::{self, AuthToken, Credentials, RawPayload};
pub use error::Error;
pub use session::AuthSession;

use std::collections::HashMap;
use std::time::Duration;

pub const API_URL: &str = "https://api.hypon.cloud/v2";

pub fn api(api_url: &str, timeout: Duration) -> Result<model::Api, Error> {
    let client = reqwest::ClientBuilder::new()
        .timeout(timeout)
        .build()
        .or(Err(Error::InternalError))?;

    Ok(model::Api {
        api_url: api_url.trim_end_matches('/').to_owned(),
        client,
    })
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else {
        error.to_string()
    }
}

/// Log in with `credentials` and return a fresh bearer token.
///
/// Any non-200 status, transport failure or body without a token is an
/// `Error::AuthError`. Nothing is retried here.
pub async fn login(api: &model::Api, credentials: &Credentials) -> Result<AuthToken, Error> {
    let url = format!("{}{}", api.api_url, endpoint::LOGIN);

    let mut request_body = HashMap::from([
        ("username", credentials.identifier().to_owned()),
        ("password", credentials.secret().to_owned()),
    ]);
    if credentials.identifier().contains('@') {
        request_body.insert("email", credentials.identifier().to_owned());
    }

    let response = api
        .client
        .post(url)
        .json(&request_body)
        .send()
        .await
        .map_err(|e| Error::AuthError(describe(&e)))?;

    let status = response.status();
    if status != http::StatusCode::OK {
        return Err(Error::AuthError(format!("server responded {}", status)));
    }

    let text = response
        .text()
        .await
        .map_err(|e| Error::AuthError(format!("Error reading login response: {}", e)))?;

    response::login_token(&text).map(AuthToken::new)
}

/* timeouts on a data endpoint are fetch failures, anything else on the wire is transport */
fn fetch_error(path: &str, error: &reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::FetchError(format!("{}: {}", path, describe(error)))
    } else {
        Error::TransportError(format!("{}: {}", path, error))
    }
}

async fn get(api: &model::Api, path: &str, token: &AuthToken) -> Result<RawPayload, Error> {
    let url = format!("{}{}", api.api_url, path);

    let response = api
        .client
        .get(url)
        .header(http::header::AUTHORIZATION, token.bearer())
        .send()
        .await
        .map_err(|e| fetch_error(path, &e))?;

    match response.status() {
        status if status.is_success() => {}
        http::StatusCode::UNAUTHORIZED => return Err(Error::Unauthorized),
        status => {
            return Err(Error::FetchError(format!(
                "{}: server responded {}",
                path, status
            )))
        }
    }

    let text = response
        .text()
        .await
        .map_err(|e| fetch_error(path, &e))?;

    log::trace!("endpoint: {}, response_text: {}", path, text);

    response::data_object(&text)
}

/// Read the plant overview (energy totals, power, device counts, earnings).
pub async fn overview(api: &model::Api, token: &AuthToken) -> Result<RawPayload, Error> {
    get(api, endpoint::OVERVIEW, token).await
}

/// Read the production details (generation and revenue) of plant `selector`.
pub async fn production(
    api: &model::Api,
    token: &AuthToken,
    selector: &str,
) -> Result<RawPayload, Error> {
    get(api, &endpoint::production(selector), token).await
}
