//! HTTP front end of the incident diary.
//!
//! Exposes the alert webhook (`POST /api/alerts`), the Slack interactivity
//! endpoint (`POST /api/slack/interactions`) and a health check.

pub mod server;

pub use server::{build_router, run_server, AlertResponse, AppState};
