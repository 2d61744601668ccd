mod channels;
mod clubs;
mod documents;
mod messages;
mod notifications;
mod pricing;
mod users;

pub use notifications::NewNotification;

use std::str::FromStr;

use fitclub_types::models::UnknownVariant;
use rusqlite::Row;
use rusqlite::types::Type;

/// Read a TEXT column holding one of the fitclub-types enums.
pub(crate) fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// `?1, ?2, ...` for an IN clause of `n` values starting at `start`.
pub(crate) fn placeholders(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
