use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "CFG_BAD_JSON")]
    CfgBadJson,
    #[serde(rename = "CFG_ERROR")]
    CfgError,
    #[serde(rename = "INVALID_ARGUMENT")]
    InvalidArgument,
    #[serde(rename = "COMMAND_FAILED")]
    CommandFailed,
    #[serde(rename = "UNKNOWN_COMMAND")]
    UnknownCommand,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::CfgBadJson => "CFG_BAD_JSON",
            ErrorCode::CfgError => "CFG_ERROR",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::CommandFailed => "COMMAND_FAILED",
            ErrorCode::UnknownCommand => "UNKNOWN_COMMAND",
        }
    }

    /// Process exit status used by the CLI transport.
    pub const fn exit_status(self) -> i32 {
        match self {
            ErrorCode::CfgBadJson
            | ErrorCode::CfgError
            | ErrorCode::InvalidArgument
            | ErrorCode::UnknownCommand => 2,
            ErrorCode::CommandFailed => 10,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct CodedError {
    pub code: ErrorCode,
    pub err: anyhow::Error,
}

impl CodedError {
    pub fn new(code: ErrorCode, err: anyhow::Error) -> Self {
        Self { code, err }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl std::error::Error for CodedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.err.as_ref())
    }
}

pub fn error_code(err: &anyhow::Error) -> ErrorCode {
    if let Some(coded) = err.downcast_ref::<CodedError>() {
        return coded.code;
    }
    ErrorCode::CommandFailed
}

/// Message reported for a failure, falling back to a kind name when the
/// error carries no text.
pub fn error_message(err: &anyhow::Error) -> String {
    let message = err.to_string();
    if !message.trim().is_empty() {
        return message;
    }
    if let Some(io) = err.root_cause().downcast_ref::<std::io::Error>() {
        return format!("{:?}", io.kind());
    }
    "CommandFailed".to_string()
}

/// Text of a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "panic".to_string()
}

pub fn invalid_argument(message: impl Into<String>) -> anyhow::Error {
    CodedError::new(ErrorCode::InvalidArgument, anyhow::anyhow!(message.into())).into()
}

pub fn invalid_argument_err(err: anyhow::Error) -> anyhow::Error {
    CodedError::new(ErrorCode::InvalidArgument, err).into()
}

pub fn config_error(code: ErrorCode, detail: impl Into<String>) -> anyhow::Error {
    let detail = detail.into();
    CodedError::new(code, anyhow::anyhow!("{code}: {detail}")).into()
}

pub fn unknown_command(command_id: &str) -> anyhow::Error {
    CodedError::new(
        ErrorCode::UnknownCommand,
        anyhow::anyhow!("Unknown command: {command_id}"),
    )
    .into()
}
