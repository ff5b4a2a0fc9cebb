//! Client error types.
//!
//! # Responsibilities
//! - Define the single error shape raised by the client
//! - Classify errors by kind (configuration, payload, templating, transport)
//! - Allow callers to rename and remap errors at the client boundary
//!
//! # Design Decisions
//! - `code` is textual (`ECONNREFUSED`) or a bare HTTP status (`404`)
//! - `status_code` is always present so callers never branch on absence
//! - Normalization lives in `normalizer.rs`; errors already of this type are
//!   never normalized twice

pub mod normalizer;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::crypto::CodecError;
use crate::http::endpoint::TemplateError;

/// Default error name.
pub const DEFAULT_ERROR_NAME: &str = "JwtClientError";

/// Broad category of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing identity field or key; raised before any I/O.
    Configuration,
    /// Decryption or parsing of an encrypted payload failed.
    Payload,
    /// A URL pattern could not be expanded.
    Templating,
    /// Anything returned by the transport, after normalization.
    Transport,
}

/// Error code: a symbolic name or an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Name(String),
    Status(u16),
}

impl ErrorCode {
    /// The symbolic name, if this is not a bare status.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            ErrorCode::Name(name) => Some(name),
            ErrorCode::Status(_) => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Name(name) => f.write_str(name),
            ErrorCode::Status(status) => write!(f, "{status}"),
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(name: &str) -> Self {
        ErrorCode::Name(name.to_string())
    }
}

impl From<u16> for ErrorCode {
    fn from(status: u16) -> Self {
        ErrorCode::Status(status)
    }
}

/// The only error type that crosses the client boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    name: Cow<'static, str>,
    kind: ErrorKind,
    status_code: u16,
    code: ErrorCode,
    message: String,
}

impl ClientError {
    pub fn new(
        kind: ErrorKind,
        status_code: u16,
        code: impl Into<ErrorCode>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: Cow::Borrowed(DEFAULT_ERROR_NAME),
            kind,
            status_code,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Configuration error with a symbolic code, status 500.
    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, 500, code, message)
    }

    /// `EINVALIDPAYLOAD`, status 500.
    pub fn invalid_payload() -> Self {
        Self::new(
            ErrorKind::Payload,
            500,
            CodecError::InvalidPayload.code(),
            CodecError::InvalidPayload.code(),
        )
    }

    /// Transport error; the message defaults to the code.
    pub fn transport(status_code: u16, code: impl Into<ErrorCode>) -> Self {
        let code = code.into();
        let message = code.to_string();
        Self::new(ErrorKind::Transport, status_code, code, message)
    }

    /// Replace the error name.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<TemplateError> for ClientError {
    fn from(err: TemplateError) -> Self {
        ClientError::new(ErrorKind::Templating, 500, "EURLTEMPLATE", err.to_string())
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Caller-supplied transformation applied to every error leaving the client.
///
/// A mapper can rename, re-code or re-message an error, but it always yields
/// a `ClientError`. To surface a type of your own, implement
/// `From<ClientError>` for it and convert with `?` (or `map_err`) at the call
/// site:
///
/// ```
/// use service_jwt_client::{ClientError, JwtClient};
///
/// #[derive(Debug)]
/// enum SubmitterError {
///     Upstream { status: u16, code: String },
/// }
///
/// impl From<ClientError> for SubmitterError {
///     fn from(err: ClientError) -> Self {
///         SubmitterError::Upstream {
///             status: err.status_code(),
///             code: err.code().to_string(),
///         }
///     }
/// }
///
/// fn user_id(client: &JwtClient, encrypted: &str) -> Result<String, SubmitterError> {
///     Ok(client.decrypt_user_id_and_token(encrypted)?.user_id)
/// }
///
/// let client = JwtClient::new("secret", "token", "submitter", "https://submitter").unwrap();
/// let err = user_id(&client, "garbage").unwrap_err();
/// assert!(matches!(err, SubmitterError::Upstream { status: 500, .. }));
/// ```
pub type ErrorMapper = Arc<dyn Fn(ClientError) -> ClientError + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let err = ClientError::configuration("ENOSERVICESECRET", "No service secret passed to client");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.code(), &ErrorCode::Name("ENOSERVICESECRET".into()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "No service secret passed to client");
        assert_eq!(err.name(), DEFAULT_ERROR_NAME);
    }

    #[test]
    fn test_invalid_payload() {
        let err = ClientError::invalid_payload();
        assert_eq!(err.kind(), ErrorKind::Payload);
        assert_eq!(err.code().as_name(), Some("EINVALIDPAYLOAD"));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_transport_message_defaults_to_code() {
        let err = ClientError::transport(404, 404u16);
        assert_eq!(err.message(), "404");
        assert_eq!(err.code().as_name(), None);
    }

    #[test]
    fn test_rename() {
        let err = ClientError::invalid_payload().with_name("SubmitterClientError");
        assert_eq!(err.name(), "SubmitterClientError");
    }

    #[derive(Debug, PartialEq)]
    enum CallerError {
        NotFound,
        Other(String),
    }

    impl From<ClientError> for CallerError {
        fn from(err: ClientError) -> Self {
            match err.code() {
                ErrorCode::Status(404) => CallerError::NotFound,
                code => CallerError::Other(code.to_string()),
            }
        }
    }

    fn lookup(result: ClientResult<u8>) -> Result<u8, CallerError> {
        Ok(result?)
    }

    #[test]
    fn test_conversion_into_caller_error_type() {
        assert_eq!(lookup(Ok(1)), Ok(1));
        assert_eq!(
            lookup(Err(ClientError::transport(404, 404u16))),
            Err(CallerError::NotFound)
        );
        assert_eq!(
            lookup(Err(ClientError::invalid_payload())),
            Err(CallerError::Other("EINVALIDPAYLOAD".into()))
        );
    }

    #[test]
    fn test_template_error_conversion() {
        let err: ClientError = TemplateError::MissingSubstitution("id".into()).into();
        assert_eq!(err.kind(), ErrorKind::Templating);
        assert_eq!(err.code().as_name(), Some("EURLTEMPLATE"));
    }
}
