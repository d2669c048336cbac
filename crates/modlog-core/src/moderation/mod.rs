//! Moderation decisions, actions and the engine that applies them

pub mod action;
pub mod decision;
pub mod engine;

pub use action::{ModerationAction, ModerationActionBuilder, DEFAULT_MAX_SUSPENSION_DAYS};
pub use decision::{DecisionScope, ModerationDecision, Outcome, Transition};
pub use engine::{AppliedDecision, DecisionEngine};
