//! Host page surface: inbound signals and prompt presentation.

pub mod input;
pub mod output;

pub use input::{HistoryKind, HostSignal, VisibilityState};
pub use output::{JsonLinePresenter, Presenter, PromptOutput, RecordingPresenter};
