//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for partial updates
//!
//! Wire names are camelCase. Nullable columns that a PATCH may clear use
//! `Option<Option<T>>` with [`deserialize_some`]: an absent key leaves the
//! column alone, an explicit `null` clears it.

use serde::{Deserialize, Deserializer};

pub mod activity;
pub mod dashboard;
pub mod label;
pub mod member;
pub mod milestone;
pub mod project;
pub mod task;
pub mod time_entry;
pub mod user;
pub mod workspace;

/// Deserialize a present value (including `null`) as `Some(value)`.
///
/// Pair with `#[serde(default)]` so a missing key stays `None`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
