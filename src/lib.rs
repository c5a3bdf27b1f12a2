//! Conference management backend: registration, paper submission, peer
//! review, payments and the public landing page.

pub mod admin;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod notifications;
pub mod payments;
pub mod reviews;
pub mod routes;
pub mod settings;
pub mod state;
pub mod storage;
pub mod submissions;
pub mod telemetry;
pub mod templates;
pub mod validation;
pub mod visits;

pub use routes::build_router;
pub use state::AppState;
