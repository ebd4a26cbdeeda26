//! Host signal parsing.

use crate::core::capture::ClickTarget;
use serde::Deserialize;

/// Which history entry point was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    /// `pushState`.
    Push,
    /// `replaceState`.
    Replace,
}

/// Page visibility as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityState {
    /// Foreground.
    Visible,
    /// Background.
    Hidden,
}

/// Notification from the host page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostSignal {
    /// Page finished loading at `href`.
    Load {
        /// Current URL.
        href: String,
    },

    /// Shopper clicked somewhere.
    Click {
        /// Target element and its ancestors.
        target: ClickTarget,
    },

    /// History was mutated; `href` is the location after the mutation.
    History {
        /// Entry point used.
        kind: HistoryKind,
        /// Location after the mutation.
        href: String,
    },

    /// Back/forward navigation.
    Popstate {
        /// Current URL.
        href: String,
    },

    /// Fragment changed.
    Hashchange {
        /// Current URL.
        href: String,
    },

    /// Visibility changed.
    Visibility {
        /// New state.
        state: VisibilityState,
    },

    /// Host knows the cart changed.
    CartChanged,

    /// Shopper answered the prompt (`accept`, `dismiss`, `backdrop`).
    PromptAction {
        /// What the shopper did.
        action: String,
    },

    /// Page is being discarded.
    Unload,
}
