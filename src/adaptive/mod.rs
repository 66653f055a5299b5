//! Adaptive item selection: mastery tracking, selection strategies and the
//! per-learner session state that ties them together.

pub mod decision;
pub mod error;
pub mod registry;
pub mod session;
pub mod tracker;
pub mod types;

pub use decision::{DecisionProvider, ProviderDecision, ProviderError, SelectionStrategy};
pub use error::{ErrorKind, SessionError};
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{AnswerOutcome, ModeMetrics, NextItem, SessionCoordinator, SessionMetrics};
pub use tracker::{BktParams, KnowledgeTracker};
pub use types::{AnswerRecord, ConfidenceSignals, Decision, SelectionContext, SessionMode};
