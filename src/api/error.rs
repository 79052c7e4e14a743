use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("login failed: {0}")]
    LoginError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("unexpected API response: {0}")]
    UnexpectedApiResponse(String),
    #[error("invalid API response ({1}): {0}")]
    InvalidResponse(String, String),
    #[error("request rate exceeded: {0}")]
    RateExceeded(String),
    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),
    #[error("malformed timestamp `{0}`")]
    MalformedTimestamp(String),
    #[error("refusing to publish an empty batch")]
    EmptyPublishBatch,
    #[error("device {device} already recorded for plant {plant}")]
    DuplicateDevice { plant: String, device: String },
    #[error("publish failed: {0}")]
    PublishError(String),
    #[error("unable to format output")]
    FormatError,
    #[error("internal error")]
    InternalError,
}

impl Error {
    /// Payload did not have the expected shape. Only the offending item is dropped.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedApiResponse(_)
                | Error::InvalidResponse(_, _)
                | Error::MissingField(_)
                | Error::MalformedTimestamp(_)
        )
    }

    /// The remote session can no longer be trusted and has to be re-established.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Error::LoginError(_) | Error::InvalidResponse(_, _))
    }
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error) = match self {
            Error::RateExceeded(s) => (
                Status::TooManyRequests,
                format!("<html><body><h3>429 Too Many Requests</h3>Downstream API response: <code>{}</code></body></html>", s),
            ),
            Error::LoginError(s) => (
                Status::Forbidden,
                format!("<html><body><h3>403 Forbidden</h3>Error while authenticating to downstream API: <code>{}</code></body></html>", s),
            ),
            _ => (
                Status::InternalServerError,
                format!(
                    "<html><body><h3>Unknown exception</h3><code>{}</code></body></html>",
                    self
                ),
            ),
        };

        Response::build()
            .status(status)
            .sized_body(error.len(), Cursor::new(error))
            .header(ContentType::new("text", "html"))
            .ok()
    }
}
