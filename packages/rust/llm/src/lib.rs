//! Text-generation client for ReviewLens.
//!
//! The pipeline only sees the [`ChatClient`] trait: a rendered prompt goes in,
//! a [`ChatResponse`] (the streamed fragments plus usage) comes out. Model
//! choice, sampling parameters and timeouts are fixed when the client is
//! built.

mod openrouter;
mod sse;

pub use openrouter::{ClientConfig, OpenRouterClient};

use reviewlens_shared::Result;

/// A configured text-generation endpoint.
#[allow(async_fn_in_trait)]
pub trait ChatClient {
    /// Identifier of the model this client talks to. Part of cache keys.
    fn model_id(&self) -> &str;

    /// Send one prompt and wait for the complete (possibly streamed) reply.
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse>;
}

/// The reply to a single prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatResponse {
    /// Text fragments in arrival order.
    pub fragments: Vec<String>,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub latency_ms: u64,
}

impl ChatResponse {
    /// A single-fragment response, as returned by non-streaming clients.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            fragments: vec![text.into()],
            ..Default::default()
        }
    }

    /// The full reply text.
    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_concatenates_fragments_in_order() {
        let response = ChatResponse {
            fragments: vec!["<issues>".into(), "<issue>".into(), "</issue></issues>".into()],
            ..Default::default()
        };
        assert_eq!(response.text(), "<issues><issue></issue></issues>");
    }

    #[test]
    fn from_text_is_one_fragment() {
        let response = ChatResponse::from_text("hello");
        assert_eq!(response.fragments.len(), 1);
        assert_eq!(response.text(), "hello");
        assert_eq!(response.tokens_in, 0);
    }
}
