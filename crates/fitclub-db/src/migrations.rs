use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE pricings (
                id              TEXT PRIMARY KEY,
                role_target     TEXT NOT NULL,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                free            INTEGER NOT NULL DEFAULT 0,
                highlighted     INTEGER NOT NULL DEFAULT 0,
                monthly         REAL NOT NULL DEFAULT 0,
                yearly          REAL NOT NULL DEFAULT 0,
                deleted         INTEGER NOT NULL DEFAULT 0,
                deletion_date   TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE pricing_options (
                id          TEXT PRIMARY KEY,
                pricing_id  TEXT NOT NULL REFERENCES pricings(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                weight      INTEGER NOT NULL
            );

            CREATE INDEX idx_pricing_options_pricing
                ON pricing_options(pricing_id, weight);

            CREATE TABLE pricing_features (
                pricing_id  TEXT NOT NULL REFERENCES pricings(id) ON DELETE CASCADE,
                feature     TEXT NOT NULL,
                PRIMARY KEY (pricing_id, feature)
            );

            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                email               TEXT NOT NULL UNIQUE,
                password            TEXT NOT NULL,
                role                TEXT NOT NULL DEFAULT 'MEMBER',
                image               TEXT,
                profile_image_id    TEXT,
                pricing_id          TEXT REFERENCES pricings(id),
                created_at          TEXT NOT NULL
            );

            CREATE TABLE documents (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                kind        TEXT NOT NULL,
                file_name   TEXT,
                size        INTEGER NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE clubs (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                manager_id  TEXT NOT NULL REFERENCES users(id),
                logo_id     TEXT REFERENCES documents(id) ON DELETE SET NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE coaches (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL UNIQUE REFERENCES users(id),
                created_at  TEXT NOT NULL
            );

            CREATE TABLE channels (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                type            TEXT NOT NULL,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                club_id         TEXT REFERENCES clubs(id),
                coach_id        TEXT REFERENCES coaches(id),
                group_image_id  TEXT REFERENCES documents(id) ON DELETE SET NULL,
                created_at      TEXT NOT NULL,
                CHECK ((type = 'CLUB') = (club_id IS NOT NULL)),
                CHECK ((type = 'COACH') = (coach_id IS NOT NULL)),
                CHECK (type = 'GROUP' OR group_image_id IS NULL)
            );

            CREATE TABLE channel_users (
                channel_id  TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (channel_id, user_id)
            );

            CREATE INDEX idx_channel_users_user
                ON channel_users(user_id);

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                channel_id      TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                from_id         TEXT NOT NULL REFERENCES users(id),
                message         TEXT NOT NULL,
                message_ref_id  TEXT REFERENCES messages(id) ON DELETE SET NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_channel
                ON messages(channel_id, created_at);

            CREATE TABLE message_reactions (
                id          TEXT PRIMARY KEY,
                message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                from_id     TEXT NOT NULL REFERENCES users(id),
                reaction    TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                UNIQUE(message_id, from_id, reaction)
            );

            CREATE INDEX idx_reactions_message
                ON message_reactions(message_id);

            CREATE TABLE message_views (
                channel_id  TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id),
                last_view   TEXT NOT NULL,
                PRIMARY KEY (channel_id, user_id)
            );

            CREATE TABLE notifications (
                id                  TEXT PRIMARY KEY,
                user_from_id        TEXT NOT NULL REFERENCES users(id),
                user_to_id          TEXT NOT NULL REFERENCES users(id),
                type                TEXT NOT NULL,
                data                TEXT,
                message             TEXT NOT NULL DEFAULT '',
                linked_notification TEXT REFERENCES notifications(id) ON DELETE SET NULL,
                answer              TEXT,
                answered            TEXT,
                view_date           TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_to
                ON notifications(user_to_id, created_at);
            CREATE INDEX idx_notifications_from
                ON notifications(user_from_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
