use crate::errors::EnvelopeError;
use crate::outcome::{ActionRequest, RunOutcome};
use serde::{Deserialize, Serialize};

pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_INTERRUPTED: &str = "interrupted";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterruptPayload {
    pub action_requests: Vec<ActionRequest>,
}

/// Wire envelope returned by both operations on the request/response channel.
///
/// `status` discriminates completed from interrupted outcomes; `error` present
/// independent of `status` signals a transport or validation problem and must
/// be surfaced directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupts: Option<InterruptPayload>,
}

impl RunEnvelope {
    /// Envelope for a protocol-layer failure (invalid state, malformed
    /// decision, transport): an error with no run outcome attached.
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Decode into a run outcome, degrading to an explicit error when the
    /// shape is not one the protocol defines.
    pub fn decode(self) -> Result<RunOutcome, EnvelopeError> {
        if let Some(error) = self.error {
            return match self.thread_id {
                Some(thread_id) if self.status.is_none() => {
                    Ok(RunOutcome::Failed { thread_id, error })
                }
                _ => Err(EnvelopeError::Service(error)),
            };
        }

        let Some(status) = self.status.as_deref() else {
            return Err(EnvelopeError::UnknownShape(
                "envelope carries neither status nor error".to_string(),
            ));
        };
        let Some(thread_id) = self.thread_id else {
            return Err(EnvelopeError::UnknownShape(format!(
                "{status} envelope is missing thread_id"
            )));
        };

        match status {
            STATUS_COMPLETED => match self.report {
                Some(report) => Ok(RunOutcome::Completed { thread_id, report }),
                None => Err(EnvelopeError::UnknownShape(
                    "completed envelope is missing report".to_string(),
                )),
            },
            STATUS_INTERRUPTED => {
                let action_requests = self
                    .interrupts
                    .map(|payload| payload.action_requests)
                    .unwrap_or_default();
                if action_requests.is_empty() {
                    return Err(EnvelopeError::UnknownShape(
                        "interrupted envelope carries no action requests".to_string(),
                    ));
                }
                Ok(RunOutcome::Interrupted {
                    thread_id,
                    action_requests,
                })
            }
            other => Err(EnvelopeError::UnknownShape(format!(
                "unknown status '{other}'"
            ))),
        }
    }
}

impl From<RunOutcome> for RunEnvelope {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed { thread_id, report } => Self {
                status: Some(STATUS_COMPLETED.to_string()),
                thread_id: Some(thread_id),
                report: Some(report),
                ..Self::default()
            },
            RunOutcome::Interrupted {
                thread_id,
                action_requests,
            } => Self {
                status: Some(STATUS_INTERRUPTED.to_string()),
                thread_id: Some(thread_id),
                interrupts: Some(InterruptPayload { action_requests }),
                ..Self::default()
            },
            RunOutcome::Failed { thread_id, error } => Self {
                thread_id: Some(thread_id),
                error: Some(error),
                ..Self::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_envelope_round_trip_expected_lossless() {
        let outcomes = vec![
            RunOutcome::Completed {
                thread_id: "t1".to_string(),
                report: "# Report".to_string(),
            },
            RunOutcome::Interrupted {
                thread_id: "t1".to_string(),
                action_requests: vec![ActionRequest {
                    name: "get_exchange_rate".to_string(),
                    args: json!({"target_currency": "KRW"}),
                }],
            },
            RunOutcome::Failed {
                thread_id: "t1".to_string(),
                error: "budget exhausted".to_string(),
            },
        ];

        for outcome in outcomes {
            let envelope = RunEnvelope::from(outcome.clone());
            let encoded = serde_json::to_string(&envelope).expect("envelope should serialize");
            let decoded: RunEnvelope =
                serde_json::from_str(&encoded).expect("envelope should deserialize");
            assert_eq!(decoded.decode().expect("decode should succeed"), outcome);
        }
    }

    #[test]
    fn protocol_error_envelope_decodes_to_service_error() {
        let envelope = RunEnvelope::protocol_error("invalid run state");
        assert_eq!(
            envelope.decode().unwrap_err(),
            EnvelopeError::Service("invalid run state".to_string())
        );
    }

    #[test]
    fn interrupted_envelope_without_requests_expected_unknown_shape() {
        let envelope = RunEnvelope {
            status: Some(STATUS_INTERRUPTED.to_string()),
            thread_id: Some("t1".to_string()),
            ..RunEnvelope::default()
        };
        assert!(matches!(
            envelope.decode().unwrap_err(),
            EnvelopeError::UnknownShape(_)
        ));
    }

    #[test]
    fn completed_envelope_without_thread_id_expected_unknown_shape() {
        let envelope = RunEnvelope {
            status: Some(STATUS_COMPLETED.to_string()),
            report: Some("# Report".to_string()),
            ..RunEnvelope::default()
        };
        assert!(matches!(
            envelope.decode().unwrap_err(),
            EnvelopeError::UnknownShape(_)
        ));
    }

    #[test]
    fn empty_envelope_expected_unknown_shape() {
        assert!(matches!(
            RunEnvelope::default().decode().unwrap_err(),
            EnvelopeError::UnknownShape(_)
        ));
    }
}
