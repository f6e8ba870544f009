//! Student performance predictor.
//!
//! A single-page form posts student attributes, a logistic-regression
//! artifact classifies them as low or high performance, and every prediction
//! is appended to a per-session SQLite history.

pub mod actions;
pub mod api;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod features;
pub mod model;
pub mod page;
pub mod session;
pub mod trainer;

pub use actions::{Actions, AppActions, Render};
pub use config::AppConfig;
pub use connection::{ConnectionManager, SessionContext};
pub use features::{StudentFeatures, StudentInput};
pub use model::{ModelGateway, PerformanceClass};

/// Installs the `tracing` subscriber used by the binaries.
pub fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("student_performance=info".parse()?))
        .try_init()?;
    Ok(())
}
