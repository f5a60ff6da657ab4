//! SkillSpark Server - HTTP relay in front of DashScope.
//!
//! The SkillSpark frontend talks to three AI endpoints. This crate serves
//! them and forwards the work to Alibaba Cloud's DashScope API.
//!
//! Design goals:
//! - Stream chat replies as they are generated, in the OpenAI chunk shape the
//!   frontend already parses.
//! - Keep the one-shot endpoints available even when DashScope is not: they
//!   always answer 200 with a `success` flag.
//! - Never buffer a whole reply. Backpressure and client disconnects reach the
//!   upstream connection directly.

pub mod config;
pub mod persona;
pub mod server;
pub mod streaming;
pub mod telemetry;
pub mod types;

pub use config::ServerConfig;
pub use server::{routes, serve, AppState};
