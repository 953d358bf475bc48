use crate::errors::ControllerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_llm::ToolCall;

/// A proposed tool invocation awaiting operator sign-off.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    pub args: Value,
}

impl From<&ToolCall> for ActionRequest {
    fn from(call: &ToolCall) -> Self {
        Self {
            name: call.name.clone(),
            args: call.arguments.clone(),
        }
    }
}

/// Operator verdict on exactly one pending [`ActionRequest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    Edit { args: Value },
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Edit { .. } => "edit",
        }
    }

    /// Build a decision from its wire fields (`decision` + `edited_args`).
    pub fn from_wire(kind: &str, edited_args: Option<Value>) -> Result<Self, ControllerError> {
        match kind {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "edit" => edited_args.map(|args| Self::Edit { args }).ok_or_else(|| {
                ControllerError::MalformedDecision(
                    "edit decision requires edited_args".to_string(),
                )
            }),
            other => Err(ControllerError::MalformedDecision(format!(
                "unknown decision '{other}'"
            ))),
        }
    }
}

/// What one `start` or `resume` call produced.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed {
        thread_id: String,
        report: String,
    },
    Interrupted {
        thread_id: String,
        action_requests: Vec<ActionRequest>,
    },
    Failed {
        thread_id: String,
        error: String,
    },
}

impl RunOutcome {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::Completed { thread_id, .. }
            | Self::Interrupted { thread_id, .. }
            | Self::Failed { thread_id, .. } => thread_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decision_from_wire_accepts_the_three_verdicts() {
        assert_eq!(
            Decision::from_wire("approve", None).expect("approve should parse"),
            Decision::Approve
        );
        assert_eq!(
            Decision::from_wire("reject", None).expect("reject should parse"),
            Decision::Reject
        );
        assert_eq!(
            Decision::from_wire("edit", Some(json!({"target_currency": "JPY"})))
                .expect("edit should parse"),
            Decision::Edit {
                args: json!({"target_currency": "JPY"})
            }
        );
    }

    #[test]
    fn decision_from_wire_edit_without_args_expected_malformed() {
        let error = Decision::from_wire("edit", None).unwrap_err();
        assert!(matches!(error, ControllerError::MalformedDecision(_)));
    }

    #[test]
    fn decision_from_wire_unknown_kind_expected_malformed() {
        let error = Decision::from_wire("maybe", None).unwrap_err();
        assert!(matches!(error, ControllerError::MalformedDecision(_)));
    }
}
