pub mod controller;

pub use crate::status::AgentState as LifecycleState;
pub use controller::{FactoryResetOutcome, LifecycleController, LifecycleError};
