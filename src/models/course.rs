use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for `POST /courses`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub name: String,
    pub description: Option<String>,
}

/// Validated input for `PUT /courses/{id}`. `None` leaves the field untouched;
/// `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl CoursePatch {
    pub fn apply(self, course: &mut Course) {
        if let Some(name) = self.name {
            course.name = name;
        }
        if let Some(description) = self.description {
            course.description = description;
        }
    }
}
