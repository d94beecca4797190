//! Server lifecycle: bind, accept, and hand each connection to a worker.

pub mod listener;
pub mod state;

pub use listener::{bind_with_retry, run, serve};
pub use state::{ServerState, SimulatedWork};
