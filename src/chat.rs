//! Scripted reply generation via chat completions

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Generates conversational replies from transcribed user speech
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatClient {
    /// Create a new chat client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing.
    pub fn new(api_key: String, model: String, max_tokens: u32, temperature: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::InvalidConfig(
                "OpenAI API key required for chat".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            max_tokens,
            temperature,
        })
    }

    /// Produce a reply to the user's utterance.
    ///
    /// `context` is optional retrieved reference text appended to the user
    /// message, already formatted for prompt injection.
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or yields no choices.
    pub async fn reply(
        &self,
        system_prompt: &str,
        user_text: &str,
        context: Option<&str>,
    ) -> Result<String> {
        let user_content = match context {
            Some(ctx) if !ctx.is_empty() => format!("{user_text}{ctx}"),
            _ => user_text.to_string(),
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Chat(format!("chat API error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            e
        })?;

        let reply = result
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| Error::Chat("chat API returned no choices".to_string()))?;

        tracing::debug!(chars = reply.len(), "reply generated");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let result = ChatClient::new(String::new(), "gpt-3.5-turbo".to_string(), 150, 0.7);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: "Bonjour".to_string(),
            }],
            max_tokens: 150,
            temperature: 0.7,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 150);
    }
}
