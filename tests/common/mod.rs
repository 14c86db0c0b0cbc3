// Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use qrqc::config::PromptsConfig;
use qrqc::transport::{PromptRequest, Transport};
use qrqc::{QrqcError, Result};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const SENTINEL: &str = "I have enough information to generate the report.";

/// Replays canned replies in order and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<PromptRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, text: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(&self, error: QrqcError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_prompt(&self, request: &PromptRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(QrqcError::Transport("script exhausted".into())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn prompts() -> Arc<PromptsConfig> {
    let config: PromptsConfig = serde_json::from_value(json!({
        "prompts": {
            "initial": "Problem: {{probleme_initial}}. Ask the first question.",
            "followUp": "Answer: {{reponse_utilisateur}}. Next question?",
            "resume": "Resuming. Last answer: {{reponse_utilisateur}}",
            "reportGeneration": "Produce the QRQC report as JSON."
        },
        "schema": {
            "type": "OBJECT",
            "properties": {
                "titre_probleme": {"type": "STRING"},
                "etape1_detection_reaction": {"type": "OBJECT"},
                "etape3_plan_actions": {"type": "ARRAY"}
            },
            "required": ["titre_probleme", "etape1_detection_reaction", "etape3_plan_actions"]
        }
    }))
    .unwrap();
    Arc::new(config)
}

pub fn report_json() -> serde_json::Value {
    json!({
        "titre_probleme": "Unplanned stops on machine X",
        "etape1_detection_reaction": {
            "probleme_initial": "paraphrased by the model",
            "quoi": "Machine X stops",
            "ou": "Line 3"
        },
        "etape2_analyse": {
            "cinq_pourquoi": [
                {"question": "Why does it stop?", "reponse": "Overheating"},
                {"question": "Why overheating?", "reponse": "Clogged filter"}
            ]
        },
        "etape3_plan_actions": [
            {"action": "Replace filter", "qui": "Maintenance", "quand": "Monday"},
            {"action": "Add filter check to TPM", "qui": "Team lead", "quand": "End of month"}
        ]
    })
}
