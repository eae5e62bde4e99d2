//! Uniform response envelope.
//!
//! Every gateway call ends in exactly one [`CommandResponse`]. Envelopes are
//! immutable once built; the only "echo" case (`NO_COMMAND` carrying the
//! requested id) is handled by passing the id to the builder.

use crate::domain::handler::{Command, HandlerIdentity};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Closed set of envelope codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// Handler returned true and no pipe interrupted
    Success,
    /// Handler returned a defined business failure
    Fail,
    /// Handler raised an undefined fault
    Error,
    /// A pipe interrupted without supplying a response
    BadRequest,
    /// Caller is not authenticated
    NotLogin,
    /// Caller lacks permission
    NoRight,
    /// Handler could not be resolved
    NoCommand,
}

impl ResponseCode {
    /// Numeric wire value
    pub const fn value(&self) -> i32 {
        match self {
            Self::Success => 200,
            Self::Fail => 503,
            Self::Error => 500,
            Self::BadRequest => 400,
            Self::NotLogin => 401,
            Self::NoRight => 403,
            Self::NoCommand => 404,
        }
    }

    /// Map a wire value back to a code
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            200 => Some(Self::Success),
            503 => Some(Self::Fail),
            500 => Some(Self::Error),
            400 => Some(Self::BadRequest),
            401 => Some(Self::NotLogin),
            403 => Some(Self::NoRight),
            404 => Some(Self::NoCommand),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Human-readable default message. Not stable; callers branch on codes.
    pub const fn default_message(&self) -> &'static str {
        match self {
            Self::Success => "Operation succeeded.",
            Self::Fail | Self::Error | Self::BadRequest => "Operation failed.",
            Self::NotLogin => "Please sign in and try again.",
            Self::NoRight => "You are not allowed to perform this operation.",
            Self::NoCommand => "The requested operation could not be found.",
        }
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.value())
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i32::deserialize(deserializer)?;
        Self::from_value(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown response code {value}")))
    }
}

pub const PROTOCOL_NOT_SUPPORTED_MESSAGE: &str =
    "This operation cannot be executed over this protocol.";
pub const TIMED_OUT_MESSAGE: &str = "Operation timed out.";
pub const MALFORMED_REQUEST_MESSAGE: &str = "The request parameters could not be parsed.";

/// Immutable result of a gateway call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    code: ResponseCode,
    message: String,
    result: Option<Value>,
    #[serde(rename = "command_id")]
    handler_id: String,
    #[serde(rename = "method")]
    verb: String,
}

impl CommandResponse {
    /// Build an envelope with an explicit code; used by interrupting pipes.
    ///
    /// A `None` message falls back to the code's default.
    pub fn new(
        code: ResponseCode,
        message: Option<String>,
        identity: Option<&HandlerIdentity>,
    ) -> Self {
        let (handler_id, verb) = identity
            .map(|i| (i.handler_id().to_string(), i.verb().to_string()))
            .unwrap_or_default();
        Self {
            code,
            message: message.unwrap_or_else(|| code.default_message().to_string()),
            result: None,
            handler_id,
            verb,
        }
    }

    fn from_command(code: ResponseCode, cmd: &dyn Command) -> Self {
        Self {
            code,
            message: cmd
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| code.default_message().to_string()),
            result: cmd.result().cloned(),
            handler_id: cmd.identity().handler_id().to_string(),
            verb: cmd.identity().verb().to_string(),
        }
    }

    /// `SUCCESS` carrying the handler's result
    pub fn success(cmd: &dyn Command) -> Self {
        Self::from_command(ResponseCode::Success, cmd)
    }

    /// `FAIL` carrying the handler's result
    pub fn fail(cmd: &dyn Command) -> Self {
        Self::from_command(ResponseCode::Fail, cmd)
    }

    pub fn error(identity: &HandlerIdentity) -> Self {
        Self::new(ResponseCode::Error, None, Some(identity))
    }

    pub fn bad_request(identity: &HandlerIdentity) -> Self {
        Self::new(ResponseCode::BadRequest, None, Some(identity))
    }

    pub fn not_login(identity: &HandlerIdentity) -> Self {
        Self::new(ResponseCode::NotLogin, None, Some(identity))
    }

    pub fn no_right(identity: &HandlerIdentity) -> Self {
        Self::new(ResponseCode::NoRight, None, Some(identity))
    }

    /// `ERROR` produced when the call deadline elapsed
    pub fn timed_out(identity: &HandlerIdentity) -> Self {
        Self::new(
            ResponseCode::Error,
            Some(TIMED_OUT_MESSAGE.to_string()),
            Some(identity),
        )
    }

    /// `NO_COMMAND` echoing the requested id verbatim
    pub fn no_command(requested_id: impl Into<String>) -> Self {
        Self {
            code: ResponseCode::NoCommand,
            message: ResponseCode::NoCommand.default_message().to_string(),
            result: None,
            handler_id: requested_id.into(),
            verb: String::new(),
        }
    }

    /// `NO_COMMAND` for a handler that refuses the call's protocol
    pub fn protocol_not_supported(requested_id: impl Into<String>) -> Self {
        Self {
            message: PROTOCOL_NOT_SUPPORTED_MESSAGE.to_string(),
            ..Self::no_command(requested_id)
        }
    }

    /// `BAD_REQUEST` for input the adapter could not parse
    pub fn malformed_request() -> Self {
        Self::new(
            ResponseCode::BadRequest,
            Some(MALFORMED_REQUEST_MESSAGE.to_string()),
            None,
        )
    }

    pub fn code(&self) -> ResponseCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn handler_id(&self) -> &str {
        &self.handler_id
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}
