//! Rideau Canal Skateway ice monitoring service.
//!
//! Serves current and historical ice-condition measurements for the monitored
//! canal locations, with a safety label per location and an overall label for
//! the whole Skateway.

pub mod aggregate;
pub mod config;
pub mod dev_mode;
pub mod locations;
pub mod logging;
pub mod model;
pub mod safety;
pub mod server;
pub mod store;
pub mod verify;
