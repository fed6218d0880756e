//! Cargo truck navigation simulation.
//!
//! [`session::NavigationSession`] is the synchronous state machine;
//! [`loops::run_simulation`] drives it against real or fake providers.

pub mod backoff;
pub mod camera;
pub mod config;
pub mod loops;
pub mod notifications;
pub mod session;

pub use config::Config;
pub use loops::{run_simulation, Control, LoopOptions, Providers};
pub use notifications::{Banner, NotificationProcessor};
pub use session::{
    Command, ControlState, NavButton, NavigationSession, SessionError, SessionEvent,
    SessionSnapshot,
};
