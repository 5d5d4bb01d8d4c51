//! Database module - PostgreSQL prediction table
//!
//! One short-lived connection per write; there is no pool.

use sqlx::{Connection, PgConnection};

use crate::prediction_log::PredictionLogRecord;

/// Open a scoped connection
pub async fn connect(database_url: &str) -> Result<PgConnection, sqlx::Error> {
    PgConnection::connect(database_url).await
}

/// Create the predictions table if absent. Safe to run on every write.
pub async fn ensure_schema(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL).execute(&mut *conn).await?;
    Ok(())
}

/// Insert one prediction row and commit
pub async fn insert_prediction(
    conn: &mut PgConnection,
    record: &PredictionLogRecord,
) -> Result<(), sqlx::Error> {
    let mut tx = conn.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO predictions (
            grade_period1, grade_period2, study_time, absences,
            prediction_score, category, timestamp
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#
    )
    .bind(record.grade_period1 as f32)
    .bind(record.grade_period2 as f32)
    .bind(record.study_time as f32)
    .bind(record.absences as f32)
    .bind(record.prediction_score as f32)
    .bind(record.category.as_str())
    .bind(record.timestamp)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id SERIAL PRIMARY KEY,
    grade_period1 REAL,
    grade_period2 REAL,
    study_time REAL,
    absences REAL,
    prediction_score REAL,
    category VARCHAR(50),
    timestamp TIMESTAMPTZ DEFAULT NOW()
)
"#;
