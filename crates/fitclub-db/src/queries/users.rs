use anyhow::Result;
use fitclub_types::models::Role;
use rusqlite::{Connection, Row};

use super::get_enum;
use crate::models::UserRow;
use crate::{Database, OptionalExt, now};

const USER_COLUMNS: &str =
    "id, name, email, password, role, image, profile_image_id, pricing_id, created_at";

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, name, email, password_hash, role.as_str(), now()),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                map_user,
            )
            .optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Patch profile fields; `None` leaves a field unchanged.
    /// Returns false when the user does not exist.
    /// Patch a profile. For `image` and `profile_image_id`, `None` keeps the
    /// column and `Some(None)` clears it.
    pub fn update_user_profile(
        &self,
        id: &str,
        name: Option<&str>,
        image: Option<Option<&str>>,
        profile_image_id: Option<Option<&str>>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    image = CASE WHEN ?3 THEN ?4 ELSE image END,
                    profile_image_id = CASE WHEN ?5 THEN ?6 ELSE profile_image_id END
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    name,
                    image.is_some(),
                    image.flatten(),
                    profile_image_id.is_some(),
                    profile_image_id.flatten()
                ],
            )?;
            Ok(n > 0)
        })
    }

    pub fn set_user_role(&self, id: &str, role: Role) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET role = ?2 WHERE id = ?1",
                (id, role.as_str()),
            )?;
            Ok(n > 0)
        })
    }

    pub fn set_user_pricing(&self, id: &str, pricing_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET pricing_id = ?2 WHERE id = ?1",
                (id, pricing_id),
            )?;
            Ok(n > 0)
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        map_user,
    )
    .optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: get_enum(row, 4)?,
        image: row.get(5)?,
        profile_image_id: row.get(6)?,
        pricing_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}
