//! Recording stub client shared by the pipeline tests.

use std::sync::Mutex;

use reviewlens_llm::{ChatClient, ChatResponse};
use reviewlens_shared::{Result, ReviewLensError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Analyze,
    Merge,
    Report,
    Compare,
}

impl Stage {
    fn of(prompt: &str) -> Self {
        if prompt.contains("<baseline>") {
            Self::Compare
        } else if prompt.contains("<review>") {
            Self::Analyze
        } else if prompt.contains("merge the issues") {
            Self::Merge
        } else {
            Self::Report
        }
    }
}

/// Answers every prompt with a small deterministic reply and records it.
///
/// Analyze replies are numbered (`<issues>batch-1</issues>`, ...) so tests can
/// follow a reply through Merge and Report.
pub(crate) struct StubClient {
    model: String,
    fail: bool,
    calls: Mutex<Vec<(Stage, String)>>,
}

impl StubClient {
    pub(crate) fn new() -> Self {
        Self::with_model("stub/model")
    }

    pub(crate) fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails with a model error.
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub(crate) fn calls(&self, stage: Stage) -> usize {
        self.prompts(stage).len()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn prompts(&self, stage: Stage) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl ChatClient for StubClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
        if self.fail {
            return Err(ReviewLensError::Model("stub failure".into()));
        }

        let stage = Stage::of(prompt);
        let mut calls = self.calls.lock().unwrap();
        calls.push((stage, prompt.to_string()));
        let n = calls.iter().filter(|(s, _)| *s == stage).count();

        let reply = match stage {
            Stage::Analyze => format!("<issues>batch-{n}</issues>"),
            Stage::Merge => format!("<issues>merged-{n}</issues>"),
            Stage::Report => format!("report-{n}"),
            Stage::Compare => format!("comparison-{n}"),
        };
        Ok(ChatResponse {
            tokens_in: 10,
            tokens_out: 5,
            latency_ms: 1,
            ..ChatResponse::from_text(reply)
        })
    }
}
