use course_core::model::{LearnerId, LearnerProfile};

use super::SqliteRepository;
use super::mapping::{db_err, map_profile_row};
use crate::repository::{LearnerRepository, StorageError};

#[async_trait::async_trait]
impl LearnerRepository for SqliteRepository {
    async fn insert_profile(&self, profile: &LearnerProfile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO learners (id, email, course_selected, role)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(profile.learner_id.to_string())
        .bind(profile.email.as_str())
        .bind(profile.course_selected.as_deref())
        .bind(profile.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_profile(&self, id: LearnerId) -> Result<Option<LearnerProfile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, email, course_selected, role
            FROM learners WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_profile_row).transpose()
    }
}
