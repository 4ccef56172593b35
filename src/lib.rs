//! # Chargeclock - EV charging session timeline tracker
//!
//! Tracks a charging session from its start to the vehicle's pickup hour and
//! derives, once per tick, everything a UI needs to draw it: which planned
//! hours are past, current or upcoming, whether the car is charging, and how
//! long until pickup. When the pickup deadline passes the session ends on its
//! own.
//!
//! ## Architecture
//!
//! - `hour`: hour-of-day values and charging plans
//! - `schedule`: per-hour classification of a plan
//! - `window`: the hours a session spans
//! - `status`: idle / standby / charging state machine
//! - `deadline`: pickup deadline, countdown and termination timer
//! - `session` / `store`: session parameters and their persistence
//! - `backend`: scheduling service client
//! - `tracker`: the event loop tying it all together
//! - `web`: HTTP and SSE surface
//! - `config`, `logging`, `error`, `clock`: ambient support

pub mod backend;
pub mod clock;
pub mod config;
pub mod deadline;
pub mod error;
pub mod hour;
pub mod logging;
pub mod schedule;
pub mod session;
pub mod status;
pub mod store;
pub mod tracker;
#[cfg(feature = "web")]
pub mod web;
pub mod window;


// Re-export commonly used types
pub use config::Config;
pub use error::{ChargeClockError, Result};
pub use hour::{ChargingPlan, Hour};
pub use session::Session;
pub use tracker::{SessionTracker, TrackerHandle, TrackerSnapshot};
