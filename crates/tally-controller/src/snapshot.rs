use crate::instruction::RunInstruction;
use serde::{Deserialize, Serialize};
use tally_agent::{ToolResultTurn, ToolResultsTurn, Turn, UserTurn, current_timestamp};
use tally_llm::{ToolCall, ToolResult, Usage};

/// Serialized continuation of a suspended run.
///
/// Everything `resume` needs to continue without replaying prior agent steps:
/// the originating instruction, the full turn history, the gated calls still
/// awaiting decisions (head first), and the tool-round counter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub instruction: RunInstruction,
    pub history: Vec<Turn>,
    pub pending_calls: Vec<ToolCall>,
    pub round_count: usize,
    pub usage: Usage,
    pub started_at: String,
}

impl RunSnapshot {
    pub fn new(instruction: RunInstruction) -> Self {
        let history = vec![Turn::User(UserTurn::new(
            instruction.user_message(),
            current_timestamp(),
        ))];
        Self {
            instruction,
            history,
            pending_calls: Vec::new(),
            round_count: 0,
            usage: Usage::default(),
            started_at: current_timestamp(),
        }
    }

    pub fn push_results(&mut self, results: Vec<ToolResult>) {
        if results.is_empty() {
            return;
        }
        let turns = results
            .into_iter()
            .map(|result| ToolResultTurn {
                tool_call_id: result.tool_call_id,
                content: result.content,
                is_error: result.is_error,
            })
            .collect();
        self.history
            .push(Turn::ToolResults(ToolResultsTurn::new(turns, current_timestamp())));
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
