use course_core::model::{Course, CourseId};

use super::SqliteRepository;
use super::mapping::{course_id_from_i64, db_err, id_i64, map_course_row};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, name, description)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description
            ",
        )
        .bind(id_i64("course_id", course.id().value())?)
        .bind(course.name())
        .bind(course.description())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_course_id_by_name(&self, name: &str) -> Result<Option<CourseId>, StorageError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM courses WHERE name = ?1")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        id.map(course_id_from_i64).transpose()
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query("SELECT id, name, description FROM courses WHERE id = ?1")
            .bind(id_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query("SELECT id, name, description FROM courses ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(map_course_row(&row)?);
        }
        Ok(courses)
    }
}
