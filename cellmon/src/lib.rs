//! Serving and neighbor cell monitoring for AT command modems.
//!
//! The core (band catalog, frequency rasters, response parsing, operator names
//! and the cell tracker) is pure and never fails. Only the [`modem`] transport
//! talks to hardware.

pub mod band;
pub mod config;
pub mod device;
pub mod errors;
pub mod frequency;
pub mod modem;
pub mod monitor;
pub mod operator;
pub mod parser;
pub mod profile;
pub mod registration;
pub mod technology;
pub mod tracker;

pub use errors::{ConfigError, ModemError};
pub use modem::{AtTransport, SerialModem};
pub use monitor::{Monitor, MonitorSnapshot, PollCommand};
pub use tracker::CellTracker;
