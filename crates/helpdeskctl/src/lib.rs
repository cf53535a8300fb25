//! helpdeskctl library - exposes modules for the binary and integration tests

pub mod api_client;
pub mod cli;
pub mod commands;
pub mod dashboard;
pub mod display;
pub mod errors;
pub mod guard;
pub mod logging;
pub mod notice;
pub mod portal;
pub mod progress;
pub mod push;
pub mod routes;
pub mod session;

pub use api_client::ApiClient;
