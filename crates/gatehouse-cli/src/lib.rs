pub mod cli;
pub mod commands;
pub mod config;
pub mod request;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::CheckConfig;
pub use request::RequestFixture;
