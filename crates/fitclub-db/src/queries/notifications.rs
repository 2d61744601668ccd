use anyhow::Result;
use fitclub_types::models::ChannelType;
use rusqlite::{Connection, Row};

use crate::models::NotificationRow;
use crate::{Database, OptionalExt, now};

const NOTIFICATION_COLUMNS: &str = "id, user_from_id, user_to_id, type, data, message, \
     linked_notification, answer, answered, view_date, created_at";

/// Column values of a notification about to be inserted.
#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub id: &'a str,
    pub user_from_id: &'a str,
    pub user_to_id: &'a str,
    pub notification_type: &'a str,
    pub data: Option<&'a str>,
    pub message: &'a str,
    pub linked_notification: Option<&'a str>,
}

impl Database {
    pub fn insert_notification(&self, n: &NewNotification<'_>) -> Result<()> {
        self.with_conn(|conn| insert(conn, n))
    }

    pub fn get_notification(&self, id: &str) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| query_notification(conn, id))
    }

    pub fn set_notification_view_date(&self, id: &str, at: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET view_date = ?2 WHERE id = ?1",
                (id, at),
            )?;
            Ok(n > 0)
        })
    }

    /// Patch the answer fields; `None` leaves a field unchanged.
    pub fn update_notification(
        &self,
        id: &str,
        answered: Option<&str>,
        answer: Option<&str>,
        linked_notification: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET
                    answered = COALESCE(?2, answered),
                    answer = COALESCE(?3, answer),
                    linked_notification = COALESCE(?4, linked_notification)
                 WHERE id = ?1",
                rusqlite::params![id, answered, answer, linked_notification],
            )?;
            Ok(n > 0)
        })
    }

    /// Notifications received by a user, newest first.
    pub fn list_notifications_to(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| list_by(conn, "user_to_id", user_id))
    }

    /// Notifications sent by a user, newest first.
    pub fn list_notifications_from(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| list_by(conn, "user_from_id", user_id))
    }

    /// Answer a request in one transaction: mark `request_id` answered,
    /// insert `response` (which must link back to the request), then point the
    /// request at the response. With `joins`, the requester (the response's
    /// recipient) becomes a member of the answerer's channels of that type.
    /// Returns false, writing nothing, when the request does not exist or was
    /// already answered.
    pub fn answer_notification(
        &self,
        request_id: &str,
        answer_key: &str,
        response: &NewNotification<'_>,
        joins: Option<ChannelType>,
    ) -> Result<bool> {
        self.with_tx(|tx| {
            let marked = tx.execute(
                "UPDATE notifications SET answered = ?2, answer = ?3
                 WHERE id = ?1 AND answered IS NULL",
                (request_id, now(), answer_key),
            )?;
            if marked == 0 {
                return Ok(false);
            }

            insert(tx, response)?;
            tx.execute(
                "UPDATE notifications SET linked_notification = ?2 WHERE id = ?1",
                (request_id, response.id),
            )?;
            if let Some(channel_type) = joins {
                tx.execute(
                    "INSERT OR IGNORE INTO channel_users (channel_id, user_id)
                     SELECT id, ?2 FROM channels
                     WHERE owner_id = ?1 AND type = ?3 AND owner_id <> ?2",
                    (response.user_from_id, response.user_to_id, channel_type.as_str()),
                )?;
            }
            Ok(true)
        })
    }
}

fn insert(conn: &Connection, n: &NewNotification<'_>) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications
            (id, user_from_id, user_to_id, type, data, message, linked_notification, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            n.id,
            n.user_from_id,
            n.user_to_id,
            n.notification_type,
            n.data,
            n.message,
            n.linked_notification,
            now()
        ],
    )?;
    Ok(())
}

fn query_notification(conn: &Connection, id: &str) -> Result<Option<NotificationRow>> {
    conn.query_row(
        &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
        [id],
        map_notification,
    )
    .optional()
}

fn list_by(conn: &Connection, column: &str, user_id: &str) -> Result<Vec<NotificationRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE {column} = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([user_id], map_notification)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_from_id: row.get(1)?,
        user_to_id: row.get(2)?,
        notification_type: row.get(3)?,
        data: row.get(4)?,
        message: row.get(5)?,
        linked_notification: row.get(6)?,
        answer: row.get(7)?,
        answered: row.get(8)?,
        view_date: row.get(9)?,
        created_at: row.get(10)?,
    })
}
