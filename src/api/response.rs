use crate::api::Error;
use crate::model::RawPayload;
use serde::Deserialize;

/* Every response wraps its payload in `data` */
#[derive(Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
}

#[derive(Deserialize)]
pub struct LoginData {
    pub token: Option<String>,
}

/// Extract the bearer token out of a `/login` response body.
pub fn login_token(text: &str) -> Result<String, Error> {
    serde_json::from_str::<Envelope<LoginData>>(text)
        .map_err(|e| Error::AuthError(format!("Invalid login response: {}", e)))?
        .data
        .and_then(|data| data.token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::AuthError(String::from("No token received")))
}

/// Extract the `data` object out of a data endpoint response body.
pub fn data_object(text: &str) -> Result<RawPayload, Error> {
    serde_json::from_str::<Envelope<RawPayload>>(text)
        .map_err(|e| Error::InvalidResponse(text.to_owned(), e.to_string()))?
        .data
        .ok_or_else(|| {
            Error::InvalidResponse(text.to_owned(), String::from("missing `data` object"))
        })
}
