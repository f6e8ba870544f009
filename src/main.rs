use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use tracing::info;

use student_performance::api::{self, Sessions};
use student_performance::{Actions, AppConfig, ConnectionManager, ModelGateway};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    student_performance::init_tracing()?;

    let config = AppConfig::load().context("loading configuration")?;

    // Without a model no prediction can be served.
    let model = ModelGateway::load(&config.model.path).with_context(|| {
        format!(
            "loading model artifact {} (run `cargo run --bin train_model` to create one)",
            config.model.path.display()
        )
    })?;
    info!(features = model.info().feature_names.len(), "model ready");

    let connections = ConnectionManager::from_config(&config.database);
    let max_retries = connections.max_retries();
    let actions = web::Data::new(Actions::new(
        Arc::new(model),
        connections,
        config.history.recent_limit,
    ));
    let sessions = web::Data::new(Sessions::from_config(&config.session));

    let (host, port) = config.socket_addr();
    info!("Starting Student Performance Predictor on http://{host}:{port}");
    info!(
        database = %config.database.url,
        max_retries,
        max_sessions = config.session.max_sessions,
        "connections are opened per session on demand"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(actions.clone())
            .app_data(sessions.clone())
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
