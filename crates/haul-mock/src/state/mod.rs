//! Shared state for the mock backends.

pub mod store;

pub use store::{AdminState, AgentReply, CargoStatus, MockState};
