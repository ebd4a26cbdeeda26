//! Core types and pipeline logic.

pub mod agent;
pub mod capture;
pub mod cart;
pub mod clock;
pub mod decision;
pub mod navigation;
pub mod page;
pub mod schedule;
pub mod session;
pub mod state;
pub mod transport;
pub mod visibility;

pub use agent::{Agent, AgentDeps};
pub use capture::{ClickAction, ClickClassifier, ClickTarget, Element, EventBuffer, ThemeClassifier};
pub use cart::CartObserver;
pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{DecisionGate, DecisionOutcome, DecisionReason, DecisionRequest, Prompt};
pub use navigation::{NavigationHub, NavigationSignal, NavigationSource};
pub use page::{Location, PageCategory, PageKey};
pub use schedule::{Schedule, Task};
pub use session::SessionModel;
pub use state::{Event, SessionRecord};
pub use transport::{FlushOutcome, FlushReason, Transport};
pub use visibility::{Accrual, Visibility, VisibilityClock};
