//! Code analysis and tutoring chat through the Gemini `generateContent` API.
//!
//! For analysis the model is asked for a JSON object describing the code. Its
//! reply is free-form text, so the first `{` through the last `}` is cut out
//! and parsed; anything unparseable becomes [`AnalysisOutcome::Fallback`].
//!
//! Chat replays the conversation after a fixed tutor preamble and its
//! acknowledgement, so the model keeps its persona across turns.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::config::GeminiConfig;
use crate::{Error, Result};

/// Longest accepted input, in characters.
pub const MAX_CODE_CHARS: usize = 200_000;

/// Longest accepted chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 20_000;
/// Most prior turns replayed to the model.
pub const MAX_HISTORY_TURNS: usize = 50;

/// Opening instruction establishing the tutor persona.
pub const TUTOR_PREAMBLE: &str = "You are an expert AI tutor inside a software engineering learning platform called CodeVault. Help the user learn coding concepts, explain snippets, and provide clear code examples in a friendly, concise manner.";
/// Model turn acknowledging the preamble.
pub const TUTOR_ACK: &str =
    "Understood! I'll act as an expert AI tutor for CodeVault. How can I help you today?";
/// Reply used when the model returns no text.
pub const EMPTY_REPLY: &str = "Sorry, I couldn't generate a response.";

/// Speaker of a chat turn, in Gemini's role vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// `contents` array for a chat turn: preamble, acknowledgement, history, then
/// the new message.
pub fn chat_contents(history: &[ChatMessage], message: &str) -> Value {
    let turn = |role: ChatRole, text: &str| json!({ "role": role, "parts": [{ "text": text }] });

    let mut contents = vec![
        turn(ChatRole::User, TUTOR_PREAMBLE),
        turn(ChatRole::Model, TUTOR_ACK),
    ];
    contents.extend(history.iter().map(|m| turn(m.role, &m.content)));
    contents.push(turn(ChatRole::User, message));
    Value::Array(contents)
}

/// Check a chat request before anything leaves the process.
pub fn validate_chat(message: &str, history: &[ChatMessage]) -> Result<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::Validation("Message is required".into()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(Error::PayloadTooLarge("Message too large".into()));
    }
    if history.len() > MAX_HISTORY_TURNS {
        return Err(Error::PayloadTooLarge("Chat history too long".into()));
    }
    Ok(message.to_string())
}

/// Result of an analysis request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The model produced a parseable object.
    Parsed(Value),
    /// The model output could not be parsed; carries the placeholder payload.
    Fallback(Value),
}

impl AnalysisOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Parsed(v) | Self::Fallback(v) => v,
        }
    }
}

/// Placeholder returned when the model output is unusable.
pub fn fallback_analysis() -> Value {
    json!({
        "title": "ANALYSIS_FAILED",
        "description": "THE_SYSTEM_COULD_NOT_DECODE_THE_DATA_STREAM.",
        "language": "UNKNOWN",
        "tags": ["SYSTEM_ERROR"]
    })
}

/// Instructional prompt wrapping the code.
pub fn build_prompt(code: &str) -> String {
    format!(
        r#"Analyze this code and return a JSON object.
Keep titles and descriptions simple and professional.
Provide exactly 3 to 5 accurate tags.
Respond with ONLY valid JSON (no markdown, no extra text).

{{
  "title": "Clear and simple title",
  "description": "Brief description of what the code does",
  "language": "programming language",
  "tags": ["tag1", "tag2", "tag3"]
}}

Code:
{}
"#,
        code
    )
}

fn object_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid object regex"))
}

/// Parse the greedy `{ ... }` span of the text. Falls back to the whole text
/// when there are no braces.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let candidate = object_span().find(text).map(|m| m.as_str()).unwrap_or(text);
    serde_json::from_str(candidate).ok()
}

/// Check the input before anything leaves the process.
pub fn validate_code(code: Option<&Value>) -> Result<String> {
    let code = match code {
        None | Some(Value::Null) => return Err(Error::Validation("Code is required".into())),
        Some(Value::String(s)) if s.is_empty() => {
            return Err(Error::Validation("Code is required".into()))
        }
        Some(Value::String(s)) => s,
        Some(_) => return Err(Error::Validation("Code must be a string".into())),
    };
    if code.chars().count() > MAX_CODE_CHARS {
        return Err(Error::PayloadTooLarge("Code payload too large".into()));
    }
    Ok(code.clone())
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Gemini client for code analysis.
#[derive(Clone)]
pub struct CodeAnalyzer {
    client: Client,
    config: GeminiConfig,
}

impl CodeAnalyzer {
    pub fn new(client: Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.config.api_key.as_deref().ok_or_else(|| {
            Error::not_configured(
                "Gemini API key is not configured",
                "Please add GEMINI_API_KEY to your backend .env file.",
            )
        })
    }

    /// Analyze already-validated code.
    pub async fn analyze(&self, code: &str) -> Result<AnalysisOutcome> {
        let api_key = self.api_key()?;
        let body = json!({
            "contents": [{
                "parts": [{"text": build_prompt(code)}]
            }]
        });

        let text = self
            .generate(api_key, &body)
            .await
            .and_then(|text| text.ok_or_else(|| "No content in Gemini response".to_string()))
            .map_err(|e| {
                error!(error = %e, "Gemini analysis failed");
                Error::upstream("Failed to analyze code with Gemini", e)
            })?;

        match extract_json_object(&text) {
            Some(value) => {
                info!(title = ?value.get("title"), "Gemini analysis succeeded");
                Ok(AnalysisOutcome::Parsed(value))
            }
            None => {
                error!(response = %text, "Failed to parse Gemini response");
                Ok(AnalysisOutcome::Fallback(fallback_analysis()))
            }
        }
    }

    /// Tutor reply to an already-validated message.
    pub async fn chat(&self, history: &[ChatMessage], message: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let body = json!({
            "contents": chat_contents(history, message),
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 2000
            }
        });

        let reply = self.generate(api_key, &body).await.map_err(|e| {
            error!(error = %e, "Gemini chat failed");
            Error::upstream("Failed to get a reply from Gemini", e)
        })?;

        debug!(turns = history.len() + 1, empty = reply.is_none(), "Gemini chat replied");
        Ok(reply
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }

    /// One `generateContent` call; returns the first candidate's text, if any.
    async fn generate(
        &self,
        api_key: &str,
        body: &Value,
    ) -> std::result::Result<Option<String>, String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        debug!(model = %self.config.model, "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))?;

        let parsed: Option<GenerateResponse> = serde_json::from_str(&text).ok();
        if let Some(api_error) = parsed.as_ref().and_then(|p| p.error.as_ref()) {
            return Err(api_error.message.clone());
        }
        if !status.is_success() {
            return Err(format!("Gemini returned {}: {}", status, text));
        }

        Ok(parsed
            .and_then(|p| p.candidates)
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_is_greedy() {
        let text = "Sure! ```json\n{\"title\": \"Debounce\", \"tags\": [\"a\"]}\n``` done";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["title"], "Debounce");

        // First `{` to last `}` spans both objects and fails to parse.
        assert!(extract_json_object("{\"a\":1} and {\"b\":2}").is_none());
        assert!(extract_json_object("no braces here").is_none());
    }

    #[test]
    fn test_validate_code() {
        assert!(matches!(validate_code(None), Err(Error::Validation(m)) if m == "Code is required"));
        assert!(matches!(
            validate_code(Some(&json!(""))),
            Err(Error::Validation(m)) if m == "Code is required"
        ));
        assert!(matches!(
            validate_code(Some(&json!(42))),
            Err(Error::Validation(m)) if m == "Code must be a string"
        ));

        let at_limit = "x".repeat(MAX_CODE_CHARS);
        assert!(validate_code(Some(&json!(at_limit))).is_ok());
        let over = "x".repeat(MAX_CODE_CHARS + 1);
        assert!(matches!(
            validate_code(Some(&json!(over))),
            Err(Error::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn test_prompt_embeds_code() {
        let prompt = build_prompt("fn main() {}");
        assert!(prompt.contains("3 to 5"));
        assert!(prompt.trim_end().ends_with("fn main() {}"));
    }

    #[test]
    fn test_chat_contents_order() {
        let history = vec![
            ChatMessage {
                role: ChatRole::User,
                content: "What is a closure?".into(),
            },
            ChatMessage {
                role: ChatRole::Model,
                content: "A function with captured state.".into(),
            },
        ];
        let contents = chat_contents(&history, "Show one in Rust");
        let turns = contents.as_array().unwrap();

        assert_eq!(turns.len(), 5);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[0]["parts"][0]["text"], TUTOR_PREAMBLE);
        assert_eq!(turns[1]["role"], "model");
        assert_eq!(turns[1]["parts"][0]["text"], TUTOR_ACK);
        assert_eq!(turns[3]["role"], "model");
        assert_eq!(turns[4]["role"], "user");
        assert_eq!(turns[4]["parts"][0]["text"], "Show one in Rust");
    }

    #[test]
    fn test_validate_chat() {
        assert!(matches!(
            validate_chat("   ", &[]),
            Err(Error::Validation(m)) if m == "Message is required"
        ));
        assert_eq!(validate_chat("  hi ", &[]).unwrap(), "hi");

        let history = vec![
            ChatMessage {
                role: ChatRole::User,
                content: "x".into(),
            };
            MAX_HISTORY_TURNS + 1
        ];
        assert!(matches!(
            validate_chat("hi", &history),
            Err(Error::PayloadTooLarge(_))
        ));
        assert!(matches!(
            validate_chat(&"x".repeat(MAX_MESSAGE_CHARS + 1), &[]),
            Err(Error::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn test_chat_role_wire_names() {
        let message: ChatMessage =
            serde_json::from_value(json!({ "role": "model", "content": "ok" })).unwrap();
        assert_eq!(message.role, ChatRole::Model);
        assert!(serde_json::from_value::<ChatMessage>(json!({ "role": "system", "content": "x" })).is_err());
    }

    #[test]
    fn test_fallback_shape() {
        let value = fallback_analysis();
        assert_eq!(value["title"], "ANALYSIS_FAILED");
        assert_eq!(value["tags"], json!(["SYSTEM_ERROR"]));
    }
}
