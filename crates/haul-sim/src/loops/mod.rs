//! Async drivers for the simulation.

pub mod simulation_loop;

pub use simulation_loop::{run_simulation, Control, LoopOptions, Providers};
