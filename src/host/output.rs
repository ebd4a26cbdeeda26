//! Presentation of prompts to the host.

use crate::core::decision::Prompt;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::warn;

/// Renders prompts. The agent only decides that and what to show.
pub trait Presenter: Send + Sync {
    /// Surface `prompt` to the shopper.
    fn present(&self, prompt: &Prompt);
}

/// Line emitted on stdout for each prompt.
#[derive(Debug, Clone, Serialize)]
pub struct PromptOutput<'a> {
    /// Always `"prompt"`.
    #[serde(rename = "type")]
    pub kind: &'static str,

    /// The prompt.
    #[serde(flatten)]
    pub prompt: &'a Prompt,
}

/// Writes each prompt as one JSON line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinePresenter;

impl Presenter for JsonLinePresenter {
    fn present(&self, prompt: &Prompt) {
        let line = PromptOutput {
            kind: "prompt",
            prompt,
        };
        let written = serde_json::to_string(&line)
            .map_err(io::Error::other)
            .and_then(|json| {
                let mut stdout = io::stdout().lock();
                stdout.write_all(json.as_bytes())?;
                stdout.write_all(b"\n")?;
                stdout.flush()
            });
        if let Err(e) = written {
            warn!(error = %e, "failed to write prompt");
        }
    }
}

/// Keeps every prompt it is asked to show.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    shown: Mutex<Vec<Prompt>>,
}

impl RecordingPresenter {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompts shown so far.
    #[must_use]
    pub fn shown(&self) -> Vec<Prompt> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, prompt: &Prompt) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(prompt.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_output_serialization() {
        let prompt = Prompt {
            message: "Free shipping today".to_string(),
            category: None,
        };
        let json = serde_json::to_string(&PromptOutput {
            kind: "prompt",
            prompt: &prompt,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"prompt","message":"Free shipping today"}"#);
    }

    #[test]
    fn prompt_output_with_category() {
        let prompt = Prompt {
            message: "Still thinking it over?".to_string(),
            category: Some("reassure".to_string()),
        };
        let json = serde_json::to_string(&PromptOutput {
            kind: "prompt",
            prompt: &prompt,
        })
        .unwrap();
        assert!(json.contains(r#""category":"reassure""#));
    }

    #[test]
    fn recording_presenter_keeps_order() {
        let presenter = RecordingPresenter::new();
        for message in ["a", "b"] {
            presenter.present(&Prompt {
                message: message.to_string(),
                category: None,
            });
        }
        let shown: Vec<_> = presenter.shown().into_iter().map(|p| p.message).collect();
        assert_eq!(shown, ["a", "b"]);
    }
}
