use course_core::model::{
    Course, CourseId, LearnerId, LearnerProfile, LearnerRole, Lesson, LessonId, ProgressRecord,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{AccountRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Unique-constraint violations become `Conflict`; everything else is a
/// connection-level failure.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn learner_id_from_str(v: &str) -> Result<LearnerId, StorageError> {
    v.parse::<LearnerId>().map_err(ser)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let order_index: i64 = row.try_get("order_index").map_err(ser)?;
    let order_index = i32::try_from(order_index).map_err(|_| {
        StorageError::Serialization(format!("invalid order_index: {order_index}"))
    })?;

    Lesson::new(
        lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("content").map_err(ser)?,
        order_index,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let learner: String = row.try_get("learner_id").map_err(ser)?;
    let completed: i64 = row.try_get("completed").map_err(ser)?;
    Ok(ProgressRecord::new(
        learner_id_from_str(&learner)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        completed != 0,
    ))
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<LearnerProfile, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let role: String = row.try_get("role").map_err(ser)?;
    Ok(LearnerProfile {
        learner_id: learner_id_from_str(&id)?,
        email: row.try_get("email").map_err(ser)?,
        course_selected: row.try_get("course_selected").map_err(ser)?,
        role: LearnerRole::parse(&role).map_err(ser)?,
    })
}

pub(crate) fn map_account_row(row: &SqliteRow) -> Result<AccountRecord, StorageError> {
    let id: String = row.try_get("learner_id").map_err(ser)?;
    Ok(AccountRecord {
        learner_id: learner_id_from_str(&id)?,
        email: row.try_get("email").map_err(ser)?,
        password_salt: row.try_get("password_salt").map_err(ser)?,
        password_hash: row.try_get("password_hash").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
