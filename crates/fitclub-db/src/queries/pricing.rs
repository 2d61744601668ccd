use anyhow::Result;
use fitclub_types::api::{PricingBase, PricingPatch};
use fitclub_types::models::{Feature, Role};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::get_enum;
use crate::models::{PricingDetail, PricingOptionRow, PricingRow};
use crate::{Database, OptionalExt, now};

const PRICING_COLUMNS: &str = "id, role_target, title, description, free, highlighted, monthly, \
     yearly, deleted, deletion_date, created_at";

impl Database {
    /// Insert a pricing with its options (weight = position) and features.
    pub fn create_pricing(
        &self,
        id: &str,
        base: &PricingBase,
        options: &[String],
        features: &[Feature],
    ) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO pricings
                    (id, role_target, title, description, free, highlighted, monthly, yearly, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    id,
                    base.role_target.as_str(),
                    base.title,
                    base.description,
                    base.free,
                    base.highlighted,
                    base.monthly,
                    base.yearly,
                    now()
                ],
            )?;
            replace_children(tx, id, options, features)?;
            Ok(())
        })
    }

    /// Patch the pricing row and fully replace its options and features, all
    /// or nothing. Returns false when the pricing does not exist.
    pub fn update_pricing(
        &self,
        patch: &PricingPatch,
        options: &[String],
        features: &[Feature],
    ) -> Result<bool> {
        let id = patch.id.to_string();
        self.with_tx(|tx| {
            let n = tx.execute(
                "UPDATE pricings SET
                    role_target = COALESCE(?2, role_target),
                    title = COALESCE(?3, title),
                    description = COALESCE(?4, description),
                    free = COALESCE(?5, free),
                    highlighted = COALESCE(?6, highlighted),
                    monthly = COALESCE(?7, monthly),
                    yearly = COALESCE(?8, yearly)
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    patch.role_target.map(|r| r.as_str()),
                    patch.title,
                    patch.description,
                    patch.free,
                    patch.highlighted,
                    patch.monthly,
                    patch.yearly
                ],
            )?;
            if n == 0 {
                return Ok(false);
            }
            tx.execute("DELETE FROM pricing_options WHERE pricing_id = ?1", [&id])?;
            tx.execute("DELETE FROM pricing_features WHERE pricing_id = ?1", [&id])?;
            replace_children(tx, &id, options, features)?;
            Ok(true)
        })
    }

    pub fn get_pricing(&self, id: &str) -> Result<Option<PricingDetail>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {PRICING_COLUMNS} FROM pricings WHERE id = ?1"),
                    [id],
                    map_pricing,
                )
                .optional()?;
            row.map(|pricing| with_children(conn, pricing)).transpose()
        })
    }

    /// Non-deleted pricings for a role, cheapest first.
    pub fn list_pricing_for_role(&self, role: Role) -> Result<Vec<PricingDetail>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRICING_COLUMNS} FROM pricings
                 WHERE role_target = ?1 AND deleted = 0
                 ORDER BY monthly ASC, created_at"
            ))?;
            let rows = stmt
                .query_map([role.as_str()], map_pricing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(|p| with_children(conn, p)).collect()
        })
    }

    /// Every pricing, deleted ones included, by role then monthly amount.
    pub fn list_all_pricing(&self) -> Result<Vec<PricingDetail>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRICING_COLUMNS} FROM pricings ORDER BY created_at"
            ))?;
            let mut rows = stmt
                .query_map([], map_pricing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            // role order is the enum declaration order, not the text order
            rows.sort_by(|a, b| {
                a.role_target
                    .cmp(&b.role_target)
                    .then(a.monthly.total_cmp(&b.monthly))
            });
            rows.into_iter().map(|p| with_children(conn, p)).collect()
        })
    }

    /// Soft delete (`deletion_date = Some`) or restore (`None`).
    pub fn set_pricing_deleted(&self, id: &str, deletion_date: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE pricings SET deleted = ?2, deletion_date = ?3 WHERE id = ?1",
                rusqlite::params![id, deletion_date.is_some(), deletion_date],
            )?;
            Ok(n > 0)
        })
    }

    /// Delete every option carrying this name, across all pricings.
    pub fn delete_pricing_options_by_name(&self, name: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM pricing_options WHERE name = ?1", [name])?;
            Ok(n)
        })
    }
}

fn replace_children(
    conn: &Connection,
    pricing_id: &str,
    options: &[String],
    features: &[Feature],
) -> Result<()> {
    let mut insert_option = conn.prepare(
        "INSERT INTO pricing_options (id, pricing_id, name, weight) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (weight, name) in options.iter().enumerate() {
        insert_option.execute(rusqlite::params![
            Uuid::new_v4().to_string(),
            pricing_id,
            name,
            weight as i64
        ])?;
    }

    let mut insert_feature = conn.prepare(
        "INSERT OR IGNORE INTO pricing_features (pricing_id, feature) VALUES (?1, ?2)",
    )?;
    for feature in features {
        insert_feature.execute((pricing_id, feature.as_str()))?;
    }
    Ok(())
}

fn with_children(conn: &Connection, pricing: PricingRow) -> Result<PricingDetail> {
    let mut stmt = conn.prepare(
        "SELECT id, pricing_id, name, weight FROM pricing_options
         WHERE pricing_id = ?1 ORDER BY weight",
    )?;
    let options = stmt
        .query_map([&pricing.id], |row| {
            Ok(PricingOptionRow {
                id: row.get(0)?,
                pricing_id: row.get(1)?,
                name: row.get(2)?,
                weight: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT feature FROM pricing_features WHERE pricing_id = ?1 ORDER BY feature",
    )?;
    let features = stmt
        .query_map([&pricing.id], |row| get_enum::<Feature>(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(PricingDetail {
        pricing,
        options,
        features,
    })
}

fn map_pricing(row: &Row<'_>) -> rusqlite::Result<PricingRow> {
    Ok(PricingRow {
        id: row.get(0)?,
        role_target: get_enum(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        free: row.get(4)?,
        highlighted: row.get(5)?,
        monthly: row.get(6)?,
        yearly: row.get(7)?,
        deleted: row.get(8)?,
        deletion_date: row.get(9)?,
        created_at: row.get(10)?,
    })
}
