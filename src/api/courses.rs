use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value;
use tracing::info;

use super::parse_id;
use crate::db::{self, repository};
use crate::envelope::Envelope;
use crate::error::AppError;
use crate::models::Course;
use crate::schema::CourseSchema;
use crate::state::AppState;

const RESOURCE: &str = "Course";

pub async fn list_courses(State(state): State<AppState>) -> Result<Envelope<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Envelope::list(courses, "courses"))
}

pub async fn create_course(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<Course>, AppError> {
    let Json(body) = body?;
    let new_course = CourseSchema::load(&body)?;

    // An uncommitted transaction rolls back when dropped.
    let mut tx = db::begin_write(&state.db).await?;
    let course = repository::insert_course(&mut *tx, new_course).await?;
    tx.commit().await?;

    info!(id = course.id, "course created");
    Ok(Envelope::data(course)
        .with_message("Course created successfully")
        .with_status(StatusCode::CREATED))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Course>, AppError> {
    let id = parse_id(&id, RESOURCE)?;
    let course = repository::find_course_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound(RESOURCE))?;
    Ok(Envelope::data(course))
}

pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<Course>, AppError> {
    let id = parse_id(&id, RESOURCE)?;

    let mut tx = db::begin_write(&state.db).await?;
    let mut course = repository::find_course_by_id(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound(RESOURCE))?;

    let Json(body) = body?;
    CourseSchema::load_partial(&body)?.apply(&mut course);

    let course = repository::update_course(&mut *tx, &course).await?;
    tx.commit().await?;

    info!(id = course.id, "course updated");
    Ok(Envelope::data(course).with_message("Course updated successfully"))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<()>, AppError> {
    let id = parse_id(&id, RESOURCE)?;

    let mut tx = db::begin_write(&state.db).await?;
    let course = repository::find_course_by_id(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound(RESOURCE))?;
    if !repository::delete_course(&mut *tx, id).await? {
        return Err(AppError::NotFound(RESOURCE));
    }
    tx.commit().await?;

    info!(id, "course deleted");
    Ok(Envelope::message(format!(
        "Course \"{}\" deleted successfully",
        course.name
    )))
}
