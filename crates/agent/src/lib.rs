//! The collaboration engine — the heart of Conclave.
//!
//! A request flows through three stages:
//!
//! 1. **Route**: the [`Router`] picks a primary capability, optional
//!    supporting capabilities and an execution mode
//! 2. **Dispatch**: the [`Dispatcher`] runs the chosen responders in single,
//!    sequential or parallel mode, recording every outcome in the session
//! 3. **Synthesize**: the transcript is reduced to one final answer
//!
//! Responder failures never abort a request; they are recorded as error
//! messages and the remaining participants still run.

pub mod classifier;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod guard;
pub mod registry;
pub mod responder;
pub mod router;
pub mod session;
pub mod specialist;
pub mod synthesizer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classifier::{LlmClassifier, parse_verdict};
pub use dispatcher::Dispatcher;
pub use engine::{Engine, RequestOptions, RequestOutcome};
pub use error::{EngineError, RegistryError};
pub use guard::{CallGuard, Interrupt};
pub use registry::CapabilityRegistry;
pub use responder::{Responder, ResponderError, ResponderOutput};
pub use router::{DecisionSource, Router, RoutingDecision};
pub use session::{
    AgentMessage, CollaborationSession, Failure, FailureReason, MessageStatus, SessionError,
    SessionStatus,
};
pub use specialist::{ResponderLimits, SpecialistResponder};
pub use synthesizer::synthesize;
