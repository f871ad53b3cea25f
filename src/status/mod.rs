pub mod bus;
pub mod snapshot;

pub use bus::StatusBus;
pub use snapshot::AgentStatus;
