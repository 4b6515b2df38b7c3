use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Login was rejected or the login endpoint could not be reached.
    #[error("authentication failed: {0}")]
    AuthError(String),
    /// A data endpoint rejected the bearer token.
    #[error("token rejected by API")]
    Unauthorized,
    /// Non-success response or timeout on a data endpoint.
    #[error("fetch failed: {0}")]
    FetchError(String),
    /// Connection-level failure on a data endpoint.
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("invalid API response ({1}): {0}")]
    InvalidResponse(String, String),
    #[error("configuration error: {0}")]
    ConfigError(String),
    /// First refresh failed, nothing can be served.
    #[error("cannot connect: {0}")]
    NotReady(String),
    #[error("no data available yet")]
    NoData,
    #[error("publish failed: {0}")]
    PublishError(String),
    #[error("format error")]
    FormatError,
    #[error("internal error")]
    InternalError,
}

fn html(status: Status, body: String) -> response::Result<'static> {
    Response::build()
        .status(status)
        .sized_body(body.len(), Cursor::new(body))
        .header(ContentType::new("text", "html"))
        .ok()
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::AuthError(_) | Error::Unauthorized => {
                let error = format!("<html><body><h3>403 Forbidden</h3>Error while authenticating to upstream API: <code>{}</code></body></html>", self);
                html(Status::Forbidden, error)
            }
            Error::NoData | Error::NotReady(_) => {
                let error = format!(
                    "<html><body><h3>503 Service Unavailable</h3><code>{}</code></body></html>",
                    self
                );
                html(Status::ServiceUnavailable, error)
            }
            _ => {
                let error = format!(
                    "<html><body><h3>Unknown exception</h3><code>{:?}</code></body></html>",
                    self
                );
                html(Status::InternalServerError, error)
            }
        }
    }
}
