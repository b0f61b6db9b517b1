#![forbid(unsafe_code)]

//! Light/dark mode demo driving `contextize` end to end.

pub mod app;
pub mod cli;
pub mod error;

pub use app::{App, MODE_KEY, Mode, ModeState, stored_mode};
pub use cli::{Cli, run, run_from_env};
pub use error::{DemoError, Result};
