pub mod courses;
pub mod students;

use axum::{Router, extract::State, routing::get};

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route(
            "/students",
            get(students::list_students).post(students::create_student),
        )
        .route(
            "/students/{id}",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .fallback(not_found)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<Envelope<()>, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(Envelope::message("ok"))
}

async fn not_found() -> AppError {
    AppError::NotFound("Resource")
}

/// Ids are unsigned decimal integers; anything else, including a sign
/// prefix, cannot name a stored record.
fn parse_id(raw: &str, resource: &'static str) -> Result<i64, AppError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::NotFound(resource));
    }
    raw.parse().map_err(|_| AppError::NotFound(resource))
}
