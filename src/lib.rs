//! # lluvia_node
//!
//! A simulated rain-sensor node. One process hosts two threads of control:
//!
//! - **Emission**: a dedicated thread that connects to a collector over TCP,
//!   identifies itself with the fixed token `lluvia`, then sends one
//!   synthetic reading per line on a configurable interval.
//! - **Control**: an HTTP/JSON endpoint (advertised via mDNS under a fixed
//!   symbolic name) that pauses, resumes, stops, and reconfigures the
//!   emission loop while it runs.
//!
//! The two sides share exactly one mutable record, [`state::SensorState`],
//! and are otherwise fault-isolated: control failures never touch the
//! emission thread, and a dead collector never takes the control endpoint
//! down.

pub mod collector;
pub mod config;
pub mod control;
pub mod emission;
pub mod error;
pub mod reading;
pub mod registry;
pub mod state;

pub use collector::{CollectorConfig, CollectorLink, ReconnectStrategy, IDENT_TOKEN};
pub use config::NodeConfig;
pub use control::{router, AppState};
pub use emission::{EmissionLoop, POLL_INTERVAL};
pub use error::{SensorError, SensorResult};
pub use reading::{Reading, ReadingGenerator};
pub use registry::{ControlAdvertiser, CONTROL_NAME};
pub use state::{SensorState, StateSnapshot, DEFAULT_INTERVAL};
