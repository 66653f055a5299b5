pub mod advisor;
pub mod llm_provider;
pub mod sessions;

pub use advisor::LlmDecisionProvider;
pub use sessions::{SessionOptions, SessionService};
