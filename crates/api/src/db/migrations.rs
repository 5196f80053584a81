//! Canonical migration definitions.

/// A named migration: `(name, sql)`.
pub type Migration = (&'static str, &'static str);

/// Applied in order; each name is recorded once applied.
pub const MIGRATIONS: &[Migration] = &[
    (
        "0001_schema",
        include_str!("../../migrations/0001_schema.sql"),
    ),
    (
        "0002_seed_items",
        include_str!("../../migrations/0002_seed_items.sql"),
    ),
];
