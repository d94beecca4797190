//! Shared mutable state touched by every connection: the admission window
//! and the access counter.

pub mod admission;
pub mod counter;

pub use admission::{AdmissionController, Clock, SystemClock};
pub use counter::{AccessCounter, CounterMode};
