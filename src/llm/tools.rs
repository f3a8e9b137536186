//! Tool definitions the assessment prompts hand to the model.

use super::types::Tool;

pub const SUBMIT_QUESTIONS: &str = "submit_questions";

/// Tool the model calls to return the generated questionnaire.
///
/// The schema mirrors the `Question` wire shape so the tool input can be
/// deserialized directly.
#[must_use]
pub fn questions_tool() -> Tool {
    Tool {
        name: SUBMIT_QUESTIONS.into(),
        description: "Submit the generated anamnesis questionnaire. Call exactly once.".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "questionText": { "type": "string", "description": "Die Frage auf Deutsch" },
                            "options": {
                                "type": "array",
                                "minItems": 3,
                                "maxItems": 5,
                                "items": { "type": "string" },
                                "description": "3 bis 5 Antwortmöglichkeiten"
                            }
                        },
                        "required": ["questionText", "options"]
                    }
                }
            },
            "required": ["questions"]
        }),
    }
}
