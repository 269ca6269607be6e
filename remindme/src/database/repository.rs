//! Repository layer for database operations
//!
//! CRUD over reminders. Status writes from the lifecycle engine go
//! through `update_status`, a compare-and-set on the stored status.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a new reminder
    pub async fn create_reminder(
        &self,
        req: &CreateReminderRequest,
        created_at: DateTime<Utc>,
    ) -> Result<Reminder> {
        let id = Uuid::new_v4().to_string();
        let status = req.status.unwrap_or(ReminderStatus::Active);

        let row = sqlx::query_as::<_, ReminderRow>(
            r#"
            INSERT INTO reminders (id, title, notes, due_at, created_at, updated_at, status, notify_before)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.title)
        .bind(req.notes.as_deref().unwrap_or_default())
        .bind(req.due_at)
        .bind(created_at)
        .bind(created_at)
        .bind(status.as_str())
        .bind(req.notify_before.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created reminder: {}", id);
        row.try_into()
    }

    /// Get a reminder by ID
    pub async fn get_reminder(&self, id: &str) -> Result<Reminder> {
        self.find_reminder(id)
            .await?
            .ok_or_else(|| AppError::ReminderNotFound(id.to_string()))
    }

    /// Get a reminder by ID, `None` if it does not exist
    pub async fn find_reminder(&self, id: &str) -> Result<Option<Reminder>> {
        let row = sqlx::query_as::<_, ReminderRow>("SELECT * FROM reminders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Reminder::try_from).transpose()
    }

    /// List all reminders, soonest due first
    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
            SELECT * FROM reminders ORDER BY due_at ASC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reminder::try_from).collect()
    }

    /// List reminders with the given status, soonest due first
    pub async fn list_reminders_by_status(&self, status: ReminderStatus) -> Result<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
            SELECT * FROM reminders WHERE status = ? ORDER BY due_at ASC, created_at ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reminder::try_from).collect()
    }

    /// Apply a user edit. Fields left as `None` keep their stored value.
    pub async fn update_reminder(
        &self,
        req: &UpdateReminderRequest,
        updated_at: DateTime<Utc>,
    ) -> Result<Reminder> {
        let mut tx = self.pool.begin().await?;

        let current: Reminder = sqlx::query_as::<_, ReminderRow>("SELECT * FROM reminders WHERE id = ?")
            .bind(&req.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::ReminderNotFound(req.id.clone()))?
            .try_into()?;

        let title = req.title.as_ref().unwrap_or(&current.title);
        let notes = req.notes.as_ref().unwrap_or(&current.notes);
        let due_at = req.due_at.unwrap_or(current.due_at);
        let status = req.status.unwrap_or(current.status);
        let notify_before = req.notify_before.unwrap_or(current.notify_before);

        let row = sqlx::query_as::<_, ReminderRow>(
            r#"
            UPDATE reminders
            SET title = ?, notes = ?, due_at = ?, status = ?, notify_before = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(notes)
        .bind(due_at)
        .bind(status.as_str())
        .bind(notify_before.as_str())
        .bind(updated_at)
        .bind(&req.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Updated reminder: {}", req.id);
        row.try_into()
    }

    /// Atomically move a reminder from `expected` to `status`.
    ///
    /// Returns `false` when the stored status no longer matches `expected`
    /// (a concurrent write won) or the reminder is gone.
    pub async fn update_status(
        &self,
        id: &str,
        expected: ReminderStatus,
        status: ReminderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE reminders SET status = ?, updated_at = ? WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.as_str())
        .bind(updated_at)
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows > 0 {
            tracing::debug!("Reminder {} status {} -> {}", id, expected, status);
        }
        Ok(rows > 0)
    }

    /// Permanently delete a reminder
    pub async fn delete_reminder(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ReminderNotFound(id.to_string()));
        }

        tracing::debug!("Deleted reminder: {}", id);
        Ok(())
    }
}
