// Prompt templates and the report response schema

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constants::{
    DEFAULT_INITIAL_PROBLEM_PATH, DEFAULT_READY_SENTINEL, PROBLEM_PLACEHOLDER,
    RESPONSE_PLACEHOLDER,
};

/// The prompts document fetched at startup
///
/// ```json
/// {
///   "prompts": {
///     "initial": "... {{probleme_initial}} ...",
///     "followUp": "... {{reponse_utilisateur}} ...",
///     "reportGeneration": "..."
///   },
///   "schema": { "type": "OBJECT", "properties": { ... } }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    pub prompts: PromptTemplates,

    /// Structural schema the report reply must follow
    #[serde(rename = "schema")]
    pub response_schema: Value,

    /// Overrides the built-in readiness phrase
    #[serde(
        rename = "readySentinel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ready_sentinel: Option<String>,

    /// Report field that receives the user's own problem statement
    #[serde(
        rename = "initialProblemPath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_problem_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplates {
    pub initial: String,
    #[serde(rename = "followUp")]
    pub follow_up: String,
    #[serde(rename = "reportGeneration")]
    pub report_generation: String,
    /// Sent when a saved discussion is picked up again; falls back to `followUp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
}

impl PromptsConfig {
    pub fn initial_prompt(&self, problem: &str) -> String {
        self.prompts.initial.replace(PROBLEM_PLACEHOLDER, problem)
    }

    pub fn follow_up_prompt(&self, answer: &str) -> String {
        self.prompts.follow_up.replace(RESPONSE_PLACEHOLDER, answer)
    }

    pub fn resume_prompt(&self, last_answer: &str) -> String {
        self.prompts
            .resume
            .as_deref()
            .unwrap_or(&self.prompts.follow_up)
            .replace(RESPONSE_PLACEHOLDER, last_answer)
    }

    pub fn report_prompt(&self) -> &str {
        &self.prompts.report_generation
    }

    pub fn ready_sentinel(&self) -> &str {
        self.ready_sentinel
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_READY_SENTINEL)
    }

    pub fn initial_problem_path(&self) -> &str {
        self.initial_problem_path
            .as_deref()
            .unwrap_or(DEFAULT_INITIAL_PROBLEM_PATH)
    }

    /// Top-level fields the schema marks as required
    pub fn required_fields(&self) -> Vec<String> {
        self.response_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PromptsConfig {
        serde_json::from_value(json!({
            "prompts": {
                "initial": "Problem: {{probleme_initial}}. Ask the first question.",
                "followUp": "Answer: {{reponse_utilisateur}}",
                "reportGeneration": "Produce the report."
            },
            "schema": {
                "type": "OBJECT",
                "properties": { "titre_probleme": { "type": "STRING" } },
                "required": ["titre_probleme", "etape1_detection_reaction"]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_initial_prompt_substitution() {
        let prompts = sample();
        assert_eq!(
            prompts.initial_prompt("Machine X stops frequently"),
            "Problem: Machine X stops frequently. Ask the first question."
        );
    }

    #[test]
    fn test_resume_falls_back_to_follow_up() {
        let prompts = sample();
        assert_eq!(prompts.resume_prompt("last words"), "Answer: last words");
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let prompts = sample();
        assert_eq!(prompts.ready_sentinel(), DEFAULT_READY_SENTINEL);
        assert_eq!(prompts.initial_problem_path(), DEFAULT_INITIAL_PROBLEM_PATH);
    }

    #[test]
    fn test_required_fields_from_schema() {
        assert_eq!(
            sample().required_fields(),
            vec!["titre_probleme", "etape1_detection_reaction"]
        );
    }

    #[test]
    fn test_custom_sentinel() {
        let mut prompts = sample();
        prompts.ready_sentinel =
            Some("J'ai suffisamment d'informations pour générer le rapport.".into());
        assert!(prompts.ready_sentinel().starts_with("J'ai"));
    }
}
