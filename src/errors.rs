use ethers::types::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid action name: {0:?}")]
    InvalidActionName(String),
    #[error("Signing schema for {action:?} unavailable (status {status:?}): {reason}")]
    SchemaUnavailable {
        action: String,
        status: Option<u16>,
        reason: String,
    },
    #[error("Malformed signing schema: {0}")]
    MalformedSchema(String),
    #[error("No active account to sign with")]
    NoActiveAccount,
    #[error("Signer not ready for account {0:?}")]
    SignerNotReady(Address),
    #[error("Signature request rejected by user")]
    UserRejected,
    #[error("Signer error: {0}")]
    SignerError(String),
    #[error("Submission rejected (status {status}): {}", reason.as_deref().unwrap_or("no reason given"))]
    SubmissionRejected { status: u16, reason: Option<String> },
    #[error("Submission endpoint unreachable: {0}")]
    SubmissionUnreachable(String),
    #[error("Action submission cancelled")]
    Cancelled,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

/// Stable, payload-free discriminant of [`Error`], for callers that map
/// failures to their own messages or metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidActionName,
    SchemaUnavailable,
    MalformedSchema,
    NoActiveAccount,
    SignerNotReady,
    UserRejected,
    SignerError,
    SubmissionRejected,
    SubmissionUnreachable,
    Cancelled,
    Config,
    JsonParse,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidActionName(_) => ErrorKind::InvalidActionName,
            Error::SchemaUnavailable { .. } => ErrorKind::SchemaUnavailable,
            Error::MalformedSchema(_) => ErrorKind::MalformedSchema,
            Error::NoActiveAccount => ErrorKind::NoActiveAccount,
            Error::SignerNotReady(_) => ErrorKind::SignerNotReady,
            Error::UserRejected => ErrorKind::UserRejected,
            Error::SignerError(_) => ErrorKind::SignerError,
            Error::SubmissionRejected { .. } => ErrorKind::SubmissionRejected,
            Error::SubmissionUnreachable(_) => ErrorKind::SubmissionUnreachable,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config(_) => ErrorKind::Config,
            Error::JsonParse(_) => ErrorKind::JsonParse,
        }
    }

    /// Short message suitable for showing to an end user. Every kind gets its
    /// own wording so "server down" never reads like "signature declined".
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidActionName => "This action is not recognised.",
            ErrorKind::SchemaUnavailable => "Could not reach the server to prepare the action.",
            ErrorKind::MalformedSchema => "The server sent an invalid signing request.",
            ErrorKind::NoActiveAccount => "Connect a wallet before sending an action.",
            ErrorKind::SignerNotReady => "Your wallet is not connected for this account.",
            ErrorKind::UserRejected => "Signature declined.",
            ErrorKind::SignerError => "Your wallet could not sign the action.",
            ErrorKind::SubmissionRejected => "The server rejected the action.",
            ErrorKind::SubmissionUnreachable => "Could not reach the server to submit the action.",
            ErrorKind::Cancelled => "The action was cancelled.",
            ErrorKind::Config => "The client is misconfigured.",
            ErrorKind::JsonParse => "The action could not be encoded.",
        }
    }

    /// Whether re-running the whole submission (starting from the schema
    /// fetch) might succeed. Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::SchemaUnavailable { status, .. } => status.map_or(true, |s| s >= 500),
            Error::SubmissionUnreachable(_) => true,
            Error::SubmissionRejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
