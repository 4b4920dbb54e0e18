pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod expected;
pub mod io;
pub mod paths;
pub mod process;
pub mod report;
pub mod story;

pub use error::{ParseError, Result, RunnerError};
