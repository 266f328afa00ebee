// Module declarations for the library crate.

pub mod backend;
pub mod capability;
pub mod cli;
pub mod codes;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod harness;
pub mod recorder;
pub mod sampler;
pub mod sequence;
pub mod stats;
pub mod telemetry;
pub mod util;

pub use error::HarnessError;
