use actix_web::cookie::Cookie;
use actix_web::error::InternalError;
use actix_web::{web, HttpRequest, HttpResponse};
use sqlx::SqliteConnection;

use crate::actions::{AppActions, Render};
use crate::features::StudentInput;
use crate::page::INDEX_HTML;
use crate::session::{Session, SessionRegistry, SESSION_COOKIE};

pub type Sessions = SessionRegistry<SqliteConnection>;

fn session(req: &HttpRequest, sessions: &Sessions) -> Session<SqliteConnection> {
    let id = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
    sessions.resolve(id.as_deref())
}

fn respond(session: &Session<SqliteConnection>, render: Render) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    if session.is_new {
        builder.cookie(
            Cookie::build(SESSION_COOKIE, session.id.clone())
                .path("/")
                .http_only(true)
                .finish(),
        );
    }
    builder.json(render)
}

// Homepage endpoint
async fn serve_homepage() -> HttpResponse {
    HttpResponse::Ok().content_type("text/html").body(INDEX_HTML)
}

async fn summarize_input(
    req: HttpRequest,
    input: web::Json<StudentInput>,
    actions: web::Data<AppActions>,
    sessions: web::Data<Sessions>,
) -> HttpResponse {
    let session = session(&req, &sessions);
    let ctx = session.context.lock().await;
    let render = actions.summarize(&ctx, &input);
    drop(ctx);
    respond(&session, render)
}

async fn connect(
    req: HttpRequest,
    actions: web::Data<AppActions>,
    sessions: web::Data<Sessions>,
) -> HttpResponse {
    let session = session(&req, &sessions);
    let render = {
        let mut ctx = session.context.lock().await;
        actions.connect(&mut ctx).await
    };
    respond(&session, render)
}

// Prediction endpoint: ensure connection, predict, persist, return history
async fn predict(
    req: HttpRequest,
    input: web::Json<StudentInput>,
    actions: web::Data<AppActions>,
    sessions: web::Data<Sessions>,
) -> HttpResponse {
    let session = session(&req, &sessions);
    let render = {
        let mut ctx = session.context.lock().await;
        actions.predict_and_save(&mut ctx, &input).await
    };
    respond(&session, render)
}

async fn check_connection(
    req: HttpRequest,
    actions: web::Data<AppActions>,
    sessions: web::Data<Sessions>,
) -> HttpResponse {
    let session = session(&req, &sessions);
    let render = {
        let mut ctx = session.context.lock().await;
        actions.check_connection(&mut ctx).await
    };
    respond(&session, render)
}

async fn recent_predictions(
    req: HttpRequest,
    actions: web::Data<AppActions>,
    sessions: web::Data<Sessions>,
) -> HttpResponse {
    let session = session(&req, &sessions);
    let render = {
        let mut ctx = session.context.lock().await;
        actions.recent(&mut ctx).await
    };
    respond(&session, render)
}

async fn clear_predictions(
    req: HttpRequest,
    actions: web::Data<AppActions>,
    sessions: web::Data<Sessions>,
) -> HttpResponse {
    let session = session(&req, &sessions);
    let render = {
        let mut ctx = session.context.lock().await;
        actions.clear(&mut ctx).await
    };
    respond(&session, render)
}

// Model info endpoint
async fn get_model_info(actions: web::Data<AppActions>) -> HttpResponse {
    HttpResponse::Ok().json(actions.model().info())
}

// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Student Performance Predictor is running!")
}

/// Malformed form payloads come back as a render with an error notice.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let mut render = Render::default();
        render.error(format!("Invalid input: {err}"));
        InternalError::from_response(err, HttpResponse::BadRequest().json(render)).into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(serve_homepage))
        .route("/input/summary", web::post().to(summarize_input))
        .route("/connect", web::post().to(connect))
        .route("/predict", web::post().to(predict))
        .route("/connection", web::get().to(check_connection))
        .route("/predictions/recent", web::get().to(recent_predictions))
        .route("/predictions/clear", web::post().to(clear_predictions))
        .route("/model/info", web::get().to(get_model_info))
        .route("/health", web::get().to(health_check));
}
