use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tally_controller::{Decision, RunController, RunEnvelope, RunInstruction};

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub external_codes: Vec<String>,
    #[serde(default)]
    pub quantities: Vec<i64>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub thread_id: String,
    pub decision: String,
    #[serde(default)]
    pub edited_args: Option<Value>,
}

pub async fn info() -> Json<Value> {
    Json(json!({
        "name": "Tally Report Agent",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/report/invoke": "POST - start a report run",
            "/report/resume": "POST - resume an interrupted run",
        }
    }))
}

pub async fn invoke(
    State(controller): State<Arc<RunController>>,
    Json(body): Json<InvokeRequest>,
) -> Json<RunEnvelope> {
    let instruction = RunInstruction {
        instruction: body.instruction,
        external_codes: body.external_codes,
        quantities: body.quantities,
    };

    match controller.start(instruction, body.thread_id).await {
        Ok(outcome) => Json(RunEnvelope::from(outcome)),
        Err(error) => Json(RunEnvelope::protocol_error(error.to_string())),
    }
}

pub async fn resume(
    State(controller): State<Arc<RunController>>,
    Json(body): Json<ResumeRequest>,
) -> Json<RunEnvelope> {
    let decision = match Decision::from_wire(&body.decision, body.edited_args) {
        Ok(decision) => decision,
        Err(error) => return Json(RunEnvelope::protocol_error(error.to_string())),
    };

    match controller.resume(&body.thread_id, decision).await {
        Ok(outcome) => Json(RunEnvelope::from(outcome)),
        Err(error) => Json(RunEnvelope::protocol_error(error.to_string())),
    }
}
