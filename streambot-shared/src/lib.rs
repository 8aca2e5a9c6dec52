use serde::{Deserialize, Serialize};

/// A prior turn as sent to the backend: role and content only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Generation parameters. Unset fields are left out of the payload so the
/// backend applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// Body of `POST /api/chat/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub options: ChatOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_to_backend_shape() {
        let request = ChatRequest {
            message: "hello".to_string(),
            history: vec![ChatMessage {
                role: MessageRole::Assistant,
                content: "earlier".to_string(),
            }],
            options: ChatOptions {
                max_tokens: Some(512),
                temperature: Some(0.5),
                top_p: None,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "hello",
                "history": [{ "role": "assistant", "content": "earlier" }],
                "options": { "max_tokens": 512, "temperature": 0.5 }
            })
        );
    }

    #[test]
    fn missing_history_and_options_default() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(request.history.is_empty());
        assert_eq!(request.options, ChatOptions::default());
    }
}
