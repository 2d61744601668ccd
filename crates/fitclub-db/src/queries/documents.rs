use anyhow::Result;
use fitclub_types::models::DocumentKind;
use rusqlite::Connection;

use super::get_enum;
use crate::models::DocumentRow;
use crate::{Database, OptionalExt, now};

impl Database {
    pub fn insert_document(
        &self,
        id: &str,
        user_id: &str,
        kind: DocumentKind,
        file_name: Option<&str>,
        size: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, user_id, kind, file_name, size, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, kind.as_str(), file_name, size, now()],
            )?;
            Ok(())
        })
    }

    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRow>> {
        self.with_conn(|conn| query_document(conn, id))
    }

    pub fn delete_document(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| delete_document_row(conn, id))
    }
}

pub(crate) fn query_document(conn: &Connection, id: &str) -> Result<Option<DocumentRow>> {
    conn.query_row(
        "SELECT id, user_id, kind, file_name, size, created_at FROM documents WHERE id = ?1",
        [id],
        |row| {
            Ok(DocumentRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                kind: get_enum(row, 2)?,
                file_name: row.get(3)?,
                size: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .optional()
}

/// Delete a document row. Profiles pointing at it are cleared; club logos and
/// group images are cleared by their foreign keys.
pub(crate) fn delete_document_row(conn: &Connection, id: &str) -> Result<bool> {
    conn.execute(
        "UPDATE users SET profile_image_id = NULL WHERE profile_image_id = ?1",
        [id],
    )?;
    let n = conn.execute("DELETE FROM documents WHERE id = ?1", [id])?;
    Ok(n > 0)
}

/// True while a profile, club logo or channel image still uses the document.
pub(crate) fn document_in_use(conn: &Connection, id: &str) -> Result<bool> {
    let used: bool = conn.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM users WHERE profile_image_id = ?1
            UNION ALL
            SELECT 1 FROM clubs WHERE logo_id = ?1
            UNION ALL
            SELECT 1 FROM channels WHERE group_image_id = ?1
         )",
        [id],
        |row| row.get(0),
    )?;
    Ok(used)
}
