use course_core::model::{LearnerId, ProgressRecord};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn list_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT learner_id, lesson_id, completed
            FROM progress
            WHERE learner_id = ?1
            ORDER BY lesson_id ASC
            ",
        )
        .bind(learner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (learner_id, lesson_id, completed)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(learner_id, lesson_id) DO UPDATE SET
                completed = excluded.completed
            ",
        )
        .bind(record.learner_id.to_string())
        .bind(id_i64("lesson_id", record.lesson_id.value())?)
        .bind(i64::from(record.completed))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
