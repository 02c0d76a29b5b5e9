use chrono::Utc;
use sqlx::{Executor, Sqlite};

use crate::models::{Course, NewCourse, NewStudent, Student};

pub async fn fetch_courses<'e, E>(db: E) -> Result<Vec<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(
        "SELECT id, name, description, created_at, updated_at FROM courses ORDER BY id",
    )
    .fetch_all(db)
    .await
}

pub async fn find_course_by_id<'e, E>(db: E, id: i64) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(
        "SELECT id, name, description, created_at, updated_at FROM courses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_course<'e, E>(db: E, course: NewCourse) -> Result<Course, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();

    sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (name, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        RETURNING id, name, description, created_at, updated_at
        "#,
    )
    .bind(course.name)
    .bind(course.description)
    .bind(now)
    .fetch_one(db)
    .await
}

/// Writes every mutable column of `course` and refreshes `updated_at`.
pub async fn update_course<'e, E>(db: E, course: &Course) -> Result<Course, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();

    sqlx::query_as::<_, Course>(
        r#"
        UPDATE courses
        SET name = ?1,
            description = ?2,
            updated_at = ?3
        WHERE id = ?4
        RETURNING id, name, description, created_at, updated_at
        "#,
    )
    .bind(&course.name)
    .bind(&course.description)
    .bind(now)
    .bind(course.id)
    .fetch_optional(db)
    .await?
    .ok_or(sqlx::Error::RowNotFound)
}

pub async fn delete_course<'e, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_students<'e, E>(db: E) -> Result<Vec<Student>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Student>(
        "SELECT id, name, email, created_at, updated_at FROM students ORDER BY id",
    )
    .fetch_all(db)
    .await
}

pub async fn find_student_by_id<'e, E>(db: E, id: i64) -> Result<Option<Student>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Student>(
        "SELECT id, name, email, created_at, updated_at FROM students WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_student<'e, E>(db: E, student: NewStudent) -> Result<Student, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();

    sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (name, email, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        RETURNING id, name, email, created_at, updated_at
        "#,
    )
    .bind(student.name)
    .bind(student.email)
    .bind(now)
    .fetch_one(db)
    .await
}

pub async fn update_student<'e, E>(db: E, student: &Student) -> Result<Student, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();

    sqlx::query_as::<_, Student>(
        r#"
        UPDATE students
        SET name = ?1,
            email = ?2,
            updated_at = ?3
        WHERE id = ?4
        RETURNING id, name, email, created_at, updated_at
        "#,
    )
    .bind(&student.name)
    .bind(&student.email)
    .bind(now)
    .bind(student.id)
    .fetch_optional(db)
    .await?
    .ok_or(sqlx::Error::RowNotFound)
}

pub async fn delete_student<'e, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
