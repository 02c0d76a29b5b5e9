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
use crate::models::Student;
use crate::schema::StudentSchema;
use crate::state::AppState;

const RESOURCE: &str = "Student";
const DUPLICATE_EMAIL: &str = "Email address is already registered";

pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Envelope<Vec<Student>>, AppError> {
    let students = repository::fetch_students(&state.db).await?;
    Ok(Envelope::list(students, "students"))
}

pub async fn create_student(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<Student>, AppError> {
    let Json(body) = body?;
    let new_student = StudentSchema::load(&body)?;

    let mut tx = db::begin_write(&state.db).await?;
    let student = repository::insert_student(&mut *tx, new_student)
        .await
        .map_err(AppError::on_unique_violation(DUPLICATE_EMAIL))?;
    tx.commit().await?;

    info!(id = student.id, "student created");
    Ok(Envelope::data(student)
        .with_message("Student created successfully")
        .with_status(StatusCode::CREATED))
}

pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Student>, AppError> {
    let id = parse_id(&id, RESOURCE)?;
    let student = repository::find_student_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound(RESOURCE))?;
    Ok(Envelope::data(student))
}

pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<Student>, AppError> {
    let id = parse_id(&id, RESOURCE)?;

    let mut tx = db::begin_write(&state.db).await?;
    let mut student = repository::find_student_by_id(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound(RESOURCE))?;

    let Json(body) = body?;
    StudentSchema::load_partial(&body)?.apply(&mut student);

    let student = repository::update_student(&mut *tx, &student)
        .await
        .map_err(AppError::on_unique_violation(DUPLICATE_EMAIL))?;
    tx.commit().await?;

    info!(id = student.id, "student updated");
    Ok(Envelope::data(student).with_message("Student updated successfully"))
}

pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<()>, AppError> {
    let id = parse_id(&id, RESOURCE)?;

    let mut tx = db::begin_write(&state.db).await?;
    let student = repository::find_student_by_id(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound(RESOURCE))?;
    if !repository::delete_student(&mut *tx, id).await? {
        return Err(AppError::NotFound(RESOURCE));
    }
    tx.commit().await?;

    info!(id, "student deleted");
    Ok(Envelope::message(format!(
        "Student \"{}\" deleted successfully",
        student.name
    )))
}
