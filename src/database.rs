use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection};

use crate::error::{StoreError, StoreResult};
use crate::features::StudentFeatures;
use crate::model::PerformanceClass;

/// A prediction ready to be appended to the table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPrediction {
    pub timestamp: DateTime<Utc>,
    pub features: StudentFeatures,
    pub prediction: PerformanceClass,
    pub confidence: f64,
}

/// A stored row of the `predictions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub features: StudentFeatures,
    pub prediction: String,
    pub confidence: f64,
}

impl<'r> FromRow<'r, SqliteRow> for PredictionRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            timestamp: row.try_get("timestamp")?,
            features: StudentFeatures {
                age: row.try_get("age")?,
                year_of_study: row.try_get("year_of_study")?,
                attendance: row.try_get("attendance")?,
                assignment_score: row.try_get("assignment_score")?,
                midterm_score: row.try_get("midterm_score")?,
                final_score: row.try_get("final_score")?,
                tuition_paid: row.try_get("tuition_paid")?,
                outstanding_balance: row.try_get("outstanding_balance")?,
                books_borrowed: row.try_get("books_borrowed")?,
                library_visits: row.try_get("library_visits")?,
                days_absent: row.try_get("days_absent")?,
                gender_male: row.try_get("gender_male")?,
                department_cs: row.try_get("department_cs")?,
                department_ee: row.try_get("department_ee")?,
                parents_primary: row.try_get("parents_primary")?,
                parents_university: row.try_get("parents_university")?,
                chronic_illness: row.try_get("chronic_illness")?,
            },
            prediction: row.try_get("prediction")?,
            confidence: row.try_get("confidence")?,
        })
    }
}

/// Append-only prediction history on a borrowed session connection.
pub struct PredictionStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PredictionStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Creates the `predictions` table if it does not exist yet.
    pub async fn ensure_schema(&mut self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp DATETIME NOT NULL,
                age INTEGER NOT NULL,
                year_of_study INTEGER NOT NULL,
                attendance INTEGER NOT NULL,
                assignment_score INTEGER NOT NULL,
                midterm_score INTEGER NOT NULL,
                final_score INTEGER NOT NULL,
                tuition_paid INTEGER NOT NULL,
                outstanding_balance INTEGER NOT NULL,
                books_borrowed INTEGER NOT NULL,
                library_visits INTEGER NOT NULL,
                days_absent INTEGER NOT NULL,
                gender_male BOOLEAN NOT NULL,
                department_cs BOOLEAN NOT NULL,
                department_ee BOOLEAN NOT NULL,
                parents_primary BOOLEAN NOT NULL,
                parents_university BOOLEAN NOT NULL,
                chronic_illness BOOLEAN NOT NULL,
                prediction VARCHAR(20) NOT NULL,
                confidence REAL NOT NULL
            )
            "#,
        )
        .execute(&mut *self.conn)
        .await
        .map_err(StoreError::Schema)?;

        Ok(())
    }

    /// Appends one prediction and returns its id.
    pub async fn insert(&mut self, record: &NewPrediction) -> StoreResult<i64> {
        let features = &record.features;
        let result = sqlx::query(
            r#"
            INSERT INTO predictions (
                timestamp, age, year_of_study, attendance, assignment_score,
                midterm_score, final_score, tuition_paid, outstanding_balance,
                books_borrowed, library_visits, days_absent, gender_male,
                department_cs, department_ee, parents_primary, parents_university,
                chronic_illness, prediction, confidence
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.timestamp)
        .bind(features.age)
        .bind(features.year_of_study)
        .bind(features.attendance)
        .bind(features.assignment_score)
        .bind(features.midterm_score)
        .bind(features.final_score)
        .bind(features.tuition_paid)
        .bind(features.outstanding_balance)
        .bind(features.books_borrowed)
        .bind(features.library_visits)
        .bind(features.days_absent)
        .bind(features.gender_male)
        .bind(features.department_cs)
        .bind(features.department_ee)
        .bind(features.parents_primary)
        .bind(features.parents_university)
        .bind(features.chronic_illness)
        .bind(record.prediction.label())
        .bind(record.confidence)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Up to `limit` most recent predictions, newest first.
    pub async fn recent(&mut self, limit: u32) -> StoreResult<Vec<PredictionRecord>> {
        let records = sqlx::query_as::<_, PredictionRecord>(
            r#"
            SELECT * FROM predictions
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records)
    }

    /// Removes every prediction and restarts the id sequence. The table stays.
    pub async fn clear(&mut self) -> StoreResult<u64> {
        let deleted = sqlx::query("DELETE FROM predictions")
            .execute(&mut *self.conn)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'predictions'")
            .execute(&mut *self.conn)
            .await?;

        Ok(deleted)
    }
}
