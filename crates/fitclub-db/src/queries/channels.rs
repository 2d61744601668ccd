use anyhow::Result;
use fitclub_types::models::ChannelType;
use rusqlite::{Connection, Row};

use super::documents::{delete_document_row, document_in_use, query_document};
use super::get_enum;
use crate::models::{ChannelListRow, ChannelRow, DocRef, DocumentRow};
use crate::{Database, OptionalExt, now};

const CHANNEL_COLUMNS: &str =
    "c.id, c.name, c.type, c.owner_id, c.club_id, c.coach_id, c.group_image_id, c.created_at";

impl Database {
    /// Create a GROUP or PRIVATE channel with its member set.
    /// Duplicate member ids are ignored.
    pub fn create_channel(
        &self,
        id: &str,
        name: &str,
        channel_type: ChannelType,
        owner_id: &str,
        group_image_id: Option<&str>,
        members: &[String],
    ) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO channels (id, name, type, owner_id, group_image_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, name, channel_type.as_str(), owner_id, group_image_id, now()],
            )?;
            insert_members(tx, id, members)?;
            Ok(())
        })
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, id))
    }

    /// Members of a channel as `(user id, name)`, owner excluded.
    pub fn get_channel_members(&self, channel_id: &str) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name FROM channel_users m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.channel_id = ?1
                 ORDER BY u.name, u.id",
            )?;
            let rows = stmt
                .query_map([channel_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// True when the user owns the channel or is one of its members.
    pub fn is_channel_participant(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS (
                    SELECT 1 FROM channels WHERE id = ?1 AND owner_id = ?2
                    UNION ALL
                    SELECT 1 FROM channel_users WHERE channel_id = ?1 AND user_id = ?2
                 )",
                (channel_id, user_id),
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    /// Existing PRIVATE channel between two users, whichever of them owns it.
    pub fn find_private_channel(&self, a: &str, b: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {CHANNEL_COLUMNS} FROM channels c
                     JOIN channel_users m ON m.channel_id = c.id
                     WHERE c.type = 'PRIVATE'
                       AND ((c.owner_id = ?1 AND m.user_id = ?2)
                         OR (c.owner_id = ?2 AND m.user_id = ?1))
                     ORDER BY c.created_at
                     LIMIT 1"
                ),
                (a, b),
                map_channel,
            )
            .optional()
        })
    }

    /// Every channel the user owns or belongs to, oldest first, joined with
    /// the image candidates of each channel type.
    pub fn list_channels_for_user(&self, user_id: &str) -> Result<Vec<ChannelListRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHANNEL_COLUMNS},
                        logo.user_id, logo.id,
                        cu.id, cu.profile_image_id, cu.image,
                        gi.user_id, gi.id,
                        o.id, o.profile_image_id, o.image
                 FROM channels c
                 JOIN users o ON o.id = c.owner_id
                 LEFT JOIN clubs cl ON cl.id = c.club_id
                 LEFT JOIN documents logo ON logo.id = cl.logo_id
                 LEFT JOIN coaches co ON co.id = c.coach_id
                 LEFT JOIN users cu ON cu.id = co.user_id
                 LEFT JOIN documents gi ON gi.id = c.group_image_id
                 WHERE c.owner_id = ?1
                    OR EXISTS (SELECT 1 FROM channel_users m
                               WHERE m.channel_id = c.id AND m.user_id = ?1)
                 ORDER BY c.created_at, c.rowid"
            ))?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChannelListRow {
                        channel: map_channel(row)?,
                        club_logo: doc_ref(row.get(8)?, row.get(9)?),
                        coach_profile_image: doc_ref(row.get(10)?, row.get(11)?),
                        coach_image: row.get(12)?,
                        group_image: doc_ref(row.get(13)?, row.get(14)?),
                        owner_profile_image: doc_ref(row.get(15)?, row.get(16)?),
                        owner_image: row.get(17)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Patch a group. `group_image_id` of `Some(None)` clears the image.
    /// `members`, when given, replaces the whole member set. Returns false
    /// when the channel does not exist.
    pub fn update_group(
        &self,
        id: &str,
        name: Option<&str>,
        group_image_id: Option<Option<&str>>,
        members: Option<&[String]>,
    ) -> Result<bool> {
        self.with_tx(|tx| {
            let n = tx.execute(
                "UPDATE channels SET
                    name = COALESCE(?2, name),
                    group_image_id = CASE WHEN ?3 THEN ?4 ELSE group_image_id END
                 WHERE id = ?1",
                rusqlite::params![id, name, group_image_id.is_some(), group_image_id.flatten()],
            )?;
            if n == 0 {
                return Ok(false);
            }
            if let Some(members) = members {
                tx.execute("DELETE FROM channel_users WHERE channel_id = ?1", [id])?;
                insert_members(tx, id, members)?;
            }
            Ok(true)
        })
    }

    /// Delete a channel with its members, messages, reactions and views, plus
    /// the row of its group image unless something else still uses that
    /// document. Returns `None` when the channel does not exist, otherwise the
    /// removed image document, if any.
    pub fn delete_group(&self, id: &str) -> Result<Option<Option<DocumentRow>>> {
        self.with_tx(|tx| {
            let Some(channel) = query_channel(tx, id)? else {
                return Ok(None);
            };
            let image = match channel.group_image_id.as_deref() {
                Some(doc_id) => query_document(tx, doc_id)?,
                None => None,
            };

            tx.execute("DELETE FROM channels WHERE id = ?1", [id])?;
            let image = match image {
                Some(doc) if document_in_use(tx, &doc.id)? => None,
                other => other,
            };
            if let Some(doc) = &image {
                delete_document_row(tx, &doc.id)?;
            }
            Ok(Some(image))
        })
    }
}

fn insert_members(conn: &Connection, channel_id: &str, members: &[String]) -> Result<()> {
    let mut stmt = conn
        .prepare("INSERT OR IGNORE INTO channel_users (channel_id, user_id) VALUES (?1, ?2)")?;
    for user_id in members {
        stmt.execute((channel_id, user_id))?;
    }
    Ok(())
}

pub(crate) fn query_channel(conn: &Connection, id: &str) -> Result<Option<ChannelRow>> {
    conn.query_row(
        &format!("SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.id = ?1"),
        [id],
        map_channel,
    )
    .optional()
}

fn map_channel(row: &Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        channel_type: get_enum(row, 2)?,
        owner_id: row.get(3)?,
        club_id: row.get(4)?,
        coach_id: row.get(5)?,
        group_image_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn doc_ref(user_id: Option<String>, document_id: Option<String>) -> Option<DocRef> {
    Some(DocRef {
        user_id: user_id?,
        document_id: document_id?,
    })
}
