use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::models::{Project, ProjectSummary, User};

const PROJECT_COLUMNS: &str =
    "id, user_id, title, idea, mvp_plan, status, created_at, updated_at";

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    // Create the database file if it doesn't exist
    let options = SqliteConnectOptions::from_str(database_url)
        .context("Failed to create SQLite options")?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePool::connect_with(options)
        .await
        .context("Failed to connect to the database")
}

pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            hashed_password TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            idea TEXT,
            mvp_plan TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id);

        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            done INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create tables")?;
    Ok(())
}

/// Inserts a user, returning `None` when the email is already registered.
pub async fn create_user(pool: &SqlitePool, email: &str, hashed_password: &str) -> Result<Option<User>> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO users (email, hashed_password, created_at) VALUES (?, ?, ?)",
    )
    .bind(email)
    .bind(hashed_password)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to insert user")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    Ok(Some(User {
        id: result.last_insert_rowid(),
        email: email.to_owned(),
        hashed_password: hashed_password.to_owned(),
    }))
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, email, hashed_password FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to look up user")?;

    Ok(row.map(|(id, email, hashed_password)| User { id, email, hashed_password }))
}

/// The caller's projects, newest first. Ids are assigned in creation order.
pub async fn list_projects(pool: &SqlitePool, user_id: i64) -> Result<Vec<ProjectSummary>> {
    let projects = sqlx::query_as::<_, ProjectSummary>(
        r#"
        SELECT p.id, p.title, p.description, p.idea, p.mvp_plan, p.status,
               p.created_at, p.updated_at,
               (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count
        FROM projects p
        WHERE p.user_id = ?
        ORDER BY p.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list projects")?;
    Ok(projects)
}

pub async fn create_project(
    pool: &SqlitePool,
    user_id: i64,
    title: &str,
    description: &str,
    idea: &str,
) -> Result<Project> {
    let now = Utc::now();
    let project_id = sqlx::query(
        r#"
        INSERT INTO projects (user_id, title, description, idea, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'active', ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(idea)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to insert project")?
    .last_insert_rowid();

    find_project(pool, user_id, project_id)
        .await?
        .context("Inserted project disappeared")
}

/// Looks a project up only within the rows owned by `user_id`.
pub async fn find_project(pool: &SqlitePool, user_id: i64, project_id: i64) -> Result<Option<Project>> {
    let query = format!("SELECT {} FROM projects WHERE id = ? AND user_id = ?", PROJECT_COLUMNS);
    let project = sqlx::query_as::<_, Project>(&query)
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to look up project")?;
    Ok(project)
}

pub async fn set_mvp_plan(
    pool: &SqlitePool,
    user_id: i64,
    project_id: i64,
    mvp_plan: &str,
) -> Result<Option<Project>> {
    let result = sqlx::query(
        "UPDATE projects SET mvp_plan = ?, updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(mvp_plan)
    .bind(Utc::now())
    .bind(project_id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to update project")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_project(pool, user_id, project_id).await
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // One long-lived connection, otherwise every connection gets its own in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}
