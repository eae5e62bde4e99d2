//! Action handlers: a lighter handler variant dispatched outside the pipe
//! chain, with its own lifecycle hooks and code set.

use crate::domain::error::HandlerResult;
use crate::domain::handler::{HandlerIdentity, Params};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub const ACTION_SUCCESS_MESSAGE: &str = "Success.";
pub const ACTION_NOT_FOUND_MESSAGE: &str = "Action: {} not found.";
pub const ACTION_UNEXPECTED_MESSAGE: &str = "Got an unexpected error.";
pub const ACTION_RUNNING_ERROR_MESSAGE: &str = "Action running error.";

/// Closed set of action outcome codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCode {
    Success,
    RunningError,
    ActionNotFound,
    UnexpectedError,
}

impl ActionCode {
    pub const fn value(&self) -> i32 {
        match self {
            Self::Success => 200,
            Self::RunningError => 500,
            Self::ActionNotFound => 404,
            Self::UnexpectedError => -1,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            200 => Some(Self::Success),
            500 => Some(Self::RunningError),
            404 => Some(Self::ActionNotFound),
            -1 => Some(Self::UnexpectedError),
            _ => None,
        }
    }
}

impl Serialize for ActionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.value())
    }
}

impl<'de> Deserialize<'de> for ActionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i32::deserialize(deserializer)?;
        Self::from_value(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown action code {value}")))
    }
}

/// Mutable per-call state of an action
#[derive(Debug, Clone)]
pub struct ActionState {
    identity: HandlerIdentity,
    code: Option<ActionCode>,
    message: Option<String>,
    result: Option<Value>,
}

impl ActionState {
    pub fn new(identity: HandlerIdentity) -> Self {
        Self {
            identity,
            code: None,
            message: None,
            result: None,
        }
    }

    pub fn identity(&self) -> &HandlerIdentity {
        &self.identity
    }

    /// Declared outcome code, `None` until the action sets one
    pub fn code(&self) -> Option<ActionCode> {
        self.code
    }

    pub fn set_code(&mut self, code: ActionCode) {
        self.code = Some(code);
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, result: impl Into<Value>) {
        self.result = Some(result.into());
    }
}

/// Action handler.
///
/// `before` returning false aborts before `run`; `after` returning false
/// discards the result. Either way the declared code/message is used, or
/// `RUNNING_ERROR` when none was declared.
pub trait Action: Send {
    fn state(&self) -> &ActionState;

    fn state_mut(&mut self) -> &mut ActionState;

    fn before(&mut self, _params: &Params) -> bool {
        true
    }

    fn run(&mut self, params: &Params, verb: &str) -> HandlerResult<()>;

    fn after(&mut self, _params: &Params) -> bool {
        true
    }
}

/// Wire shape of an action outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub code: ActionCode,
    pub success: bool,
    pub message: Option<String>,
    pub result: Option<Value>,
}

impl ActionResponse {
    pub fn new(code: ActionCode, message: Option<String>) -> Self {
        Self {
            code,
            success: false,
            message,
            result: None,
        }
    }

    pub fn not_found(name: &str) -> Self {
        Self::new(
            ActionCode::ActionNotFound,
            Some(ACTION_NOT_FOUND_MESSAGE.replace("{}", name)),
        )
    }

    pub fn unexpected() -> Self {
        Self::new(
            ActionCode::UnexpectedError,
            Some(ACTION_UNEXPECTED_MESSAGE.to_string()),
        )
    }

    /// Terminal response built from the action's declared state
    pub fn from_state(state: &ActionState) -> Self {
        let result = state.result().cloned();
        let message = state.message().map(str::to_string);
        match state.code() {
            Some(ActionCode::Success) => Self {
                code: ActionCode::Success,
                success: true,
                message: message.or_else(|| Some(ACTION_SUCCESS_MESSAGE.to_string())),
                result,
            },
            Some(ActionCode::RunningError) => Self {
                code: ActionCode::RunningError,
                success: false,
                message: message.or_else(|| Some(ACTION_RUNNING_ERROR_MESSAGE.to_string())),
                result,
            },
            _ => Self {
                code: ActionCode::UnexpectedError,
                success: false,
                message: message.or_else(|| Some(ACTION_UNEXPECTED_MESSAGE.to_string())),
                result,
            },
        }
    }

    /// Response for a lifecycle hook that returned false
    pub fn aborted(state: &ActionState) -> Self {
        Self::new(
            state.code().unwrap_or(ActionCode::RunningError),
            state.message().map(str::to_string),
        )
    }
}
