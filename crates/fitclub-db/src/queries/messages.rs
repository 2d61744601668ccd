use anyhow::Result;
use fitclub_types::models::ReactionKind;
use rusqlite::Row;

use super::{get_enum, placeholders};
use crate::models::{MessageRow, ReactionRow};
use crate::{Database, OptionalExt, now};

const MESSAGE_SELECT: &str = "SELECT m.id, m.channel_id, m.from_id, u.name, m.message, m.message_ref_id, m.created_at
     FROM messages m
     LEFT JOIN users u ON m.from_id = u.id";

impl Database {
    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        channel_id: &str,
        from_id: &str,
        message: &str,
        message_ref_id: Option<&str>,
    ) -> Result<String> {
        self.with_conn(|conn| {
            let created_at = now();
            conn.execute(
                "INSERT INTO messages (id, channel_id, from_id, message, message_ref_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, channel_id, from_id, message, message_ref_id, created_at],
            )?;
            Ok(created_at)
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{MESSAGE_SELECT} WHERE m.id = ?1"), [id], map_message)
                .optional()
        })
    }

    /// Newest `limit` messages of a channel, newest first.
    pub fn get_messages(&self, channel_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the sender name in a single query
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 WHERE m.channel_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?2"
            ))?;

            let rows = stmt
                .query_map(rusqlite::params![channel_id, limit], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Reactions --

    /// Toggle a reaction: removes if exists, inserts if not.
    /// Returns true when the reaction was added.
    pub fn toggle_reaction(
        &self,
        id: &str,
        message_id: &str,
        from_id: &str,
        reaction: ReactionKind,
    ) -> Result<bool> {
        self.with_tx(|tx| {
            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM message_reactions
                     WHERE message_id = ?1 AND from_id = ?2 AND reaction = ?3",
                    (message_id, from_id, reaction.as_str()),
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                tx.execute("DELETE FROM message_reactions WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                tx.execute(
                    "INSERT INTO message_reactions (id, message_id, from_id, reaction, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![id, message_id, from_id, reaction.as_str(), now()],
                )?;
                Ok(true)
            }
        })
    }

    /// Batch-fetch reactions for a set of message IDs, oldest first.
    pub fn get_reactions_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, message_id, from_id, reaction, created_at FROM message_reactions
                 WHERE message_id IN ({})
                 ORDER BY created_at, rowid",
                placeholders(1, message_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(message_ids), |row| {
                    Ok(ReactionRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        from_id: row.get(2)?,
                        reaction: get_enum(row, 3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Views --

    pub fn get_last_view(&self, channel_id: &str, user_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT last_view FROM message_views WHERE channel_id = ?1 AND user_id = ?2",
                (channel_id, user_id),
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn upsert_last_view(&self, channel_id: &str, user_id: &str, at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_views (channel_id, user_id, last_view) VALUES (?1, ?2, ?3)
                 ON CONFLICT(channel_id, user_id) DO UPDATE SET last_view = excluded.last_view",
                (channel_id, user_id, at),
            )?;
            Ok(())
        })
    }
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        from_id: row.get(2)?,
        from_name: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        message: row.get(4)?,
        message_ref_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::testutil;
    use fitclub_types::models::{ChannelType, ReactionKind, Role};

    fn channel_with(db: &crate::Database) -> (String, String) {
        let alice = testutil::user(db, "alice", Role::Member);
        let bob = testutil::user(db, "bob", Role::Member);
        db.create_channel("g", "team", ChannelType::Group, &alice, None, &[bob.clone()])
            .unwrap();
        (alice, bob)
    }

    #[test]
    fn messages_come_newest_first_with_limit() {
        let db = testutil::db();
        let (alice, bob) = channel_with(&db);
        for i in 0..5 {
            let from = if i % 2 == 0 { &alice } else { &bob };
            db.insert_message(&format!("m{i}"), "g", from, &format!("msg {i}"), None)
                .unwrap();
        }

        let rows = db.get_messages("g", 3).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m4", "m3", "m2"]);
        assert_eq!(rows[0].from_name, "alice");
        assert_eq!(rows[1].from_name, "bob");
    }

    #[test]
    fn reaction_toggles() {
        let db = testutil::db();
        let (alice, bob) = channel_with(&db);
        db.insert_message("m", "g", &alice, "hi", None).unwrap();

        assert!(db.toggle_reaction("r1", "m", &bob, ReactionKind::Like).unwrap());
        assert!(db.toggle_reaction("r2", "m", &bob, ReactionKind::Fist).unwrap());
        assert!(!db.toggle_reaction("r3", "m", &bob, ReactionKind::Like).unwrap());

        let reactions = db.get_reactions_for_messages(&["m".to_string()]).unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].reaction, ReactionKind::Fist);
        assert!(db.get_reactions_for_messages(&[]).unwrap().is_empty());
    }

    #[test]
    fn last_view_upserts() {
        let db = testutil::db();
        let (alice, _) = channel_with(&db);
        assert!(db.get_last_view("g", &alice).unwrap().is_none());

        db.upsert_last_view("g", &alice, "2026-01-01T00:00:00.000000Z").unwrap();
        db.upsert_last_view("g", &alice, "2026-02-01T00:00:00.000000Z").unwrap();
        assert_eq!(
            db.get_last_view("g", &alice).unwrap().as_deref(),
            Some("2026-02-01T00:00:00.000000Z")
        );
    }
}
