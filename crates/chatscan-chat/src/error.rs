//! Error types for the language model client.

use chatscan_core::error::ChatscanError;

/// Errors from a chat completion call.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("response contained no reply")]
    EmptyReply,
    #[error("image error: {0}")]
    Image(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChatError::Decode(err.to_string())
        } else {
            ChatError::Request(err.to_string())
        }
    }
}

impl From<ChatError> for ChatscanError {
    fn from(err: ChatError) -> Self {
        ChatscanError::Llm(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::MissingApiKey("OPENAI_API_KEY".to_string());
        assert_eq!(err.to_string(), "API key not set (expected in $OPENAI_API_KEY)");

        let err = ChatError::Status {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned 429: rate limited");

        assert_eq!(ChatError::EmptyReply.to_string(), "response contained no reply");

        let err = ChatError::Image("empty upload".to_string());
        assert_eq!(err.to_string(), "image error: empty upload");
    }

    #[test]
    fn test_chat_error_into_chatscan_error() {
        let err: ChatscanError = ChatError::Request("connection refused".to_string()).into();
        assert!(matches!(err, ChatscanError::Llm(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_unicode_inner_message() {
        let err = ChatError::Decode("예상치 못한 응답".to_string());
        assert!(err.to_string().contains("예상치 못한 응답"));
    }
}
