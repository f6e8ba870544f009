//! One handler per user action on the form.
//!
//! Each handler takes the session's [`SessionContext`] by `&mut`, does its
//! work, and returns a [`Render`] describing what the page should show.
//! Failures become notices; handlers never fail the request.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::connection::{
    Backoff, ConnectionManager, Connector, SessionContext, SqliteConnector, TokioBackoff,
};
use crate::database::{NewPrediction, PredictionRecord, PredictionStore};
use crate::error::{StoreError, StoreResult};
use crate::features::{StudentFeatures, StudentInput};
use crate::model::{ModelGateway, PerformanceClass, Prediction};

pub type AppActions = Actions<SqliteConnector, TokioBackoff>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureValue {
    pub name: &'static str,
    pub value: f64,
}

/// The "User Input Summary" table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSummary {
    pub features: StudentFeatures,
    pub vector: Vec<FeatureValue>,
}

impl From<&StudentFeatures> for InputSummary {
    fn from(features: &StudentFeatures) -> Self {
        Self {
            features: features.clone(),
            vector: features
                .named_values()
                .into_iter()
                .map(|(name, value)| FeatureValue { name, value })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub class: PerformanceClass,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub class: PerformanceClass,
    pub class_index: usize,
    pub confidence: f64,
    pub probabilities: Vec<ClassProbability>,
}

impl From<&Prediction> for PredictionView {
    fn from(prediction: &Prediction) -> Self {
        Self {
            class: prediction.class(),
            class_index: prediction.class_index,
            confidence: prediction.confidence(),
            probabilities: PerformanceClass::ALL
                .iter()
                .zip(prediction.probabilities.iter())
                .map(|(&class, &probability)| ClassProbability { class, probability })
                .collect(),
        }
    }
}

/// What the page shows after an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Render {
    pub connected: bool,
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<InputSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent: Option<Vec<PredictionRecord>>,
}

impl Render {
    fn notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.notice(NoticeLevel::Success, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.notice(NoticeLevel::Info, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notice(NoticeLevel::Error, message);
    }

    pub fn has_errors(&self) -> bool {
        self.notices.iter().any(|n| n.level == NoticeLevel::Error)
    }
}

const CONNECTION_HINTS: [&str; 3] = [
    "- Is the database reachable at the configured URL?",
    "- Are the settings in the [database] config section correct?",
    "- Try connecting manually with these settings",
];

pub struct Actions<C, B = TokioBackoff> {
    model: Arc<ModelGateway>,
    connections: ConnectionManager<C, B>,
    recent_limit: u32,
}

impl<C, B> Actions<C, B>
where
    C: Connector<Handle = SqliteConnection>,
    B: Backoff,
{
    pub fn new(
        model: Arc<ModelGateway>,
        connections: ConnectionManager<C, B>,
        recent_limit: u32,
    ) -> Self {
        Self {
            model,
            connections,
            recent_limit,
        }
    }

    pub fn model(&self) -> &ModelGateway {
        &self.model
    }

    /// "Connect to Database".
    pub async fn connect(&self, ctx: &mut SessionContext<SqliteConnection>) -> Render {
        let mut render = Render::default();
        match self.connections.ensure(ctx).await {
            Ok(_) => render.success("Successfully connected to database!"),
            Err(err) => {
                render.error("Failed to connect to database");
                render.error(err.to_string());
            }
        }
        render.connected = ctx.is_connected();
        render
    }

    /// "Check Connection Status".
    pub async fn check_connection(&self, ctx: &mut SessionContext<SqliteConnection>) -> Render {
        let mut render = Render::default();
        match self.connections.ensure(ctx).await {
            Ok(_) => render.success("Database connection is active!"),
            Err(err) => {
                render.error("Database connection is not active");
                render.error(err.to_string());
            }
        }
        render.connected = ctx.is_connected();
        render
    }

    /// Encodes the current form values without touching the database.
    pub fn summarize(&self, ctx: &SessionContext<SqliteConnection>, input: &StudentInput) -> Render {
        let mut render = Render {
            connected: ctx.is_connected(),
            ..Render::default()
        };
        match input.validate() {
            Ok(()) => render.summary = Some(InputSummary::from(&StudentFeatures::from(input))),
            Err(err) => render.error(err.to_string()),
        }
        render
    }

    /// "Predict & Save to Database".
    pub async fn predict_and_save(
        &self,
        ctx: &mut SessionContext<SqliteConnection>,
        input: &StudentInput,
    ) -> Render {
        let mut render = Render::default();
        if let Err(err) = input.validate() {
            render.error(err.to_string());
            render.connected = ctx.is_connected();
            return render;
        }
        let features = StudentFeatures::from(input);
        render.summary = Some(InputSummary::from(&features));

        let conn = match self.connections.ensure(ctx).await {
            Ok(conn) => conn,
            Err(err) => {
                render.error("Database connection failed. Please check:");
                for hint in CONNECTION_HINTS {
                    render.error(hint);
                }
                render.error(err.to_string());
                return render;
            }
        };

        let prediction = self.model.predict(&features.to_vector());
        let record = NewPrediction {
            timestamp: Utc::now(),
            features,
            prediction: prediction.class(),
            confidence: prediction.confidence(),
        };

        match save_and_fetch(conn, &record, self.recent_limit).await {
            Ok((id, recent)) => {
                info!(
                    id,
                    class = record.prediction.label(),
                    confidence = record.confidence,
                    "prediction saved"
                );
                render.success("Prediction saved to database!");
                render.prediction = Some(PredictionView::from(&prediction));
                if recent.is_empty() {
                    render.info("No predictions in database yet");
                }
                render.recent = Some(recent);
            }
            Err(err) => {
                warn!(error = %err, "failed to save prediction");
                self.demote(ctx, &err);
                render.error(format!("Database error: {err}"));
            }
        }
        render.connected = ctx.is_connected();
        render
    }

    /// Recent history for the session, without re-acquiring a connection.
    pub async fn recent(&self, ctx: &mut SessionContext<SqliteConnection>) -> Render {
        let mut render = Render::default();
        let result = match ctx.handle_mut() {
            Some(conn) => PredictionStore::new(conn).recent(self.recent_limit).await,
            None => Err(StoreError::NotConnected),
        };
        match result {
            Ok(recent) => {
                if recent.is_empty() {
                    render.info("No predictions in database yet");
                }
                render.recent = Some(recent);
            }
            Err(err) => {
                self.demote(ctx, &err);
                render.error(err.to_string());
            }
        }
        render.connected = ctx.is_connected();
        render
    }

    /// "Clear All Predictions". Requires an already connected session.
    pub async fn clear(&self, ctx: &mut SessionContext<SqliteConnection>) -> Render {
        let mut render = Render::default();
        let result = match ctx.handle_mut() {
            Some(conn) => PredictionStore::new(conn).clear().await,
            None => Err(StoreError::NotConnected),
        };
        match result {
            Ok(deleted) => {
                info!(deleted, "predictions cleared");
                render.success("All predictions cleared from database!");
            }
            Err(StoreError::NotConnected) => render.error("No active database connection"),
            Err(err) => {
                warn!(error = %err, "failed to clear predictions");
                self.demote(ctx, &err);
                render.error(format!("Error clearing database: {err}"));
            }
        }
        render.connected = ctx.is_connected();
        render
    }

    fn demote(&self, ctx: &mut SessionContext<SqliteConnection>, err: &StoreError) {
        if err.invalidates_session() {
            ctx.invalidate();
        }
    }
}

async fn save_and_fetch(
    conn: &mut SqliteConnection,
    record: &NewPrediction,
    limit: u32,
) -> StoreResult<(i64, Vec<PredictionRecord>)> {
    let mut store = PredictionStore::new(conn);
    let id = store.insert(record).await?;
    let recent = store.recent(limit).await?;
    Ok((id, recent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::connection::ConnectionState;
    use crate::features::FEATURE_COUNT;
    use crate::model::ModelArtifact;

    fn model() -> Arc<ModelGateway> {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[2] = 0.05;
        coefficients[5] = 0.05;
        Arc::new(
            ModelGateway::from_artifact(ModelArtifact::logistic(-6.0, coefficients, None)).unwrap(),
        )
    }

    fn actions(url: &str) -> AppActions {
        let connections =
            ConnectionManager::new(SqliteConnector::new(url), TokioBackoff, 3, Duration::ZERO);
        Actions::new(model(), connections, 5)
    }

    /// Connects the session, then breaks its table behind the store's back.
    async fn connected_without_table(actions: &AppActions) -> SessionContext<SqliteConnection> {
        let mut ctx = SessionContext::new();
        assert!(actions.connect(&mut ctx).await.connected);
        let conn = ctx.handle_mut().unwrap();
        sqlx::query("DROP TABLE predictions")
            .execute(&mut *conn)
            .await
            .unwrap();
        ctx
    }

    async fn assert_reconnects_and_saves(
        actions: &AppActions,
        ctx: &mut SessionContext<SqliteConnection>,
    ) {
        let render = actions.predict_and_save(ctx, &StudentInput::default()).await;
        assert!(render.connected);
        assert!(!render.has_errors(), "{:?}", render.notices);
        assert_eq!(render.recent.map(|r| r.len()), Some(1));
        assert_eq!(ctx.state(), ConnectionState::Connected);
    }

    #[test]
    fn summarize_reports_invalid_input() {
        let actions = actions("sqlite::memory:");
        let ctx = SessionContext::new();
        let render = actions.summarize(
            &ctx,
            &StudentInput {
                outstanding_balance: 20_000,
                ..StudentInput::default()
            },
        );
        assert!(render.has_errors());
        assert!(render.summary.is_none());
        assert!(render.notices[0].message.contains("outstanding_balance"));
    }

    #[test]
    fn summarize_lists_vector_in_model_order() {
        let actions = actions("sqlite::memory:");
        let ctx = SessionContext::new();
        let render = actions.summarize(&ctx, &StudentInput::default());
        assert!(!render.connected);
        let summary = render.summary.unwrap();
        assert_eq!(summary.vector.len(), FEATURE_COUNT);
        assert_eq!(summary.vector[0].name, "Age");
        assert_eq!(summary.vector[0].value, 20.0);
    }

    #[tokio::test]
    async fn check_connection_connects_once() {
        let actions = actions("sqlite::memory:");
        let mut ctx = SessionContext::new();

        let render = actions.check_connection(&mut ctx).await;
        assert!(render.connected);
        assert_eq!(render.notices[0].message, "Database connection is active!");

        let render = actions.check_connection(&mut ctx).await;
        assert!(render.connected);
        assert_eq!(render.notices.len(), 1);
    }

    #[tokio::test]
    async fn predict_saves_and_returns_history() {
        let actions = actions("sqlite::memory:");
        let mut ctx = SessionContext::new();
        let input = StudentInput {
            attendance: 95,
            final_score: 90,
            ..StudentInput::default()
        };

        let render = actions.predict_and_save(&mut ctx, &input).await;
        assert!(render.connected);
        assert!(!render.has_errors(), "{:?}", render.notices);
        let prediction = render.prediction.unwrap();
        assert_eq!(prediction.class, PerformanceClass::High);
        let recent = render.recent.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].prediction, "High Performance");
        assert!((recent[0].confidence - prediction.confidence).abs() < 1e-12);
    }

    #[tokio::test]
    async fn failed_insert_drops_connection_until_next_predict() {
        let actions = actions("sqlite::memory:");
        let mut ctx = connected_without_table(&actions).await;

        let render = actions
            .predict_and_save(&mut ctx, &StudentInput::default())
            .await;
        assert!(!render.connected);
        assert_eq!(ctx.state(), ConnectionState::Unconnected);
        assert!(render.prediction.is_none());
        assert_eq!(render.notices.len(), 1);
        assert_eq!(render.notices[0].level, NoticeLevel::Error);
        assert!(render.notices[0].message.starts_with("Database error:"));

        assert_reconnects_and_saves(&actions, &mut ctx).await;
    }

    #[tokio::test]
    async fn failed_clear_drops_connection_until_next_predict() {
        let actions = actions("sqlite::memory:");
        let mut ctx = connected_without_table(&actions).await;

        let render = actions.clear(&mut ctx).await;
        assert!(!render.connected);
        assert_eq!(ctx.state(), ConnectionState::Unconnected);
        assert!(render.notices[0]
            .message
            .starts_with("Error clearing database:"));

        let render = actions.clear(&mut ctx).await;
        assert_eq!(render.notices[0].message, "No active database connection");

        assert_reconnects_and_saves(&actions, &mut ctx).await;
        let render = actions.clear(&mut ctx).await;
        assert_eq!(render.notices[0].level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn failed_read_drops_connection_until_next_predict() {
        let actions = actions("sqlite::memory:");
        let mut ctx = connected_without_table(&actions).await;

        let render = actions.recent(&mut ctx).await;
        assert!(!render.connected);
        assert_eq!(ctx.state(), ConnectionState::Unconnected);
        assert!(render.recent.is_none());
        assert_eq!(render.notices[0].level, NoticeLevel::Error);

        assert_reconnects_and_saves(&actions, &mut ctx).await;
        let render = actions.recent(&mut ctx).await;
        assert!(render.connected);
        assert_eq!(render.recent.map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn clear_without_connection_is_reported() {
        let actions = actions("sqlite::memory:");
        let mut ctx = SessionContext::new();
        let render = actions.clear(&mut ctx).await;
        assert!(!render.connected);
        assert_eq!(render.notices[0].message, "No active database connection");
    }

    #[tokio::test]
    async fn clear_after_predictions_empties_history() {
        let actions = actions("sqlite::memory:");
        let mut ctx = SessionContext::new();
        actions
            .predict_and_save(&mut ctx, &StudentInput::default())
            .await;

        let render = actions.clear(&mut ctx).await;
        assert_eq!(render.notices[0].level, NoticeLevel::Success);

        let render = actions.recent(&mut ctx).await;
        assert_eq!(render.recent, Some(Vec::new()));
        assert_eq!(render.notices[0].message, "No predictions in database yet");
    }

    #[tokio::test]
    async fn unreachable_database_keeps_page_usable() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("no").join("db").display());
        let actions = actions(&url);
        let mut ctx = SessionContext::new();

        let render = actions
            .predict_and_save(&mut ctx, &StudentInput::default())
            .await;
        assert!(!render.connected);
        assert!(render.prediction.is_none());
        assert_eq!(render.notices[0].message, "Database connection failed. Please check:");
        assert!(render
            .notices
            .last()
            .unwrap()
            .message
            .contains("after 3 attempts"));

        let render = actions.check_connection(&mut ctx).await;
        assert_eq!(render.notices[0].message, "Database connection is not active");
    }
}
