pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod ui;

pub use error::{GatewayError, GdpError, Result};
