use anyhow::Result;
use fitclub_types::models::ChannelType;

use crate::models::{ClubRow, CoachRow};
use crate::{Database, OptionalExt, now};

impl Database {
    /// Create a club and its CLUB channel, owned by the manager.
    pub fn create_club(
        &self,
        club_id: &str,
        name: &str,
        manager_id: &str,
        logo_id: Option<&str>,
        channel_id: &str,
    ) -> Result<()> {
        self.with_tx(|tx| {
            let created_at = now();
            tx.execute(
                "INSERT INTO clubs (id, name, manager_id, logo_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![club_id, name, manager_id, logo_id, created_at],
            )?;
            tx.execute(
                "INSERT INTO channels (id, name, type, owner_id, club_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    channel_id,
                    name,
                    ChannelType::Club.as_str(),
                    manager_id,
                    club_id,
                    created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_club(&self, id: &str) -> Result<Option<ClubRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, manager_id, logo_id, created_at FROM clubs WHERE id = ?1",
                [id],
                |row| {
                    Ok(ClubRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        manager_id: row.get(2)?,
                        logo_id: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Id of the CLUB channel of a club.
    pub fn get_club_channel_id(&self, club_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM channels WHERE club_id = ?1 ORDER BY created_at LIMIT 1",
                [club_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Create the coach profile of a user and its COACH channel.
    pub fn create_coach(
        &self,
        coach_id: &str,
        user_id: &str,
        channel_id: &str,
        channel_name: &str,
    ) -> Result<()> {
        self.with_tx(|tx| {
            let created_at = now();
            tx.execute(
                "INSERT INTO coaches (id, user_id, created_at) VALUES (?1, ?2, ?3)",
                (coach_id, user_id, &created_at),
            )?;
            tx.execute(
                "INSERT INTO channels (id, name, type, owner_id, coach_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    channel_id,
                    channel_name,
                    ChannelType::Coach.as_str(),
                    user_id,
                    coach_id,
                    created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_coach_by_user(&self, user_id: &str) -> Result<Option<CoachRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, created_at FROM coaches WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(CoachRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Id of the channel attached to a coach profile.
    pub fn get_coach_channel_id(&self, coach_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM channels WHERE coach_id = ?1 ORDER BY created_at LIMIT 1",
                [coach_id],
                |row| row.get(0),
            )
            .optional()
        })
    }
}
