//! SQLite schema for users, pets and cries.
//!
//! A user owns pets, a pet owns cries; both edges cascade on delete so that
//! removing an account removes everything underneath it in one statement.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "uid",
    cascade_delete: true,
};

const PET_FK: ForeignKey = ForeignKey {
    foreign_table: "pet",
    foreign_column: "id",
    cascade_delete: true,
};

pub const USER_TABLE: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "uid",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("nickname", &SqlType::Text, non_null = true),
        sqlite_column!("photo_id", &SqlType::Text),
    ],
    indices: &[("idx_user_email", "email")],
};

pub const PET_TABLE: Table = Table {
    name: "pet",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("gender", &SqlType::Text, non_null = true),
        sqlite_column!("age", &SqlType::Integer, non_null = true),
        sqlite_column!("species", &SqlType::Text, non_null = true),
        sqlite_column!("sub_species", &SqlType::Text, non_null = true),
        sqlite_column!("photo_id", &SqlType::Text),
    ],
    indices: &[("idx_pet_user_id", "user_id")],
};

pub const CRY_TABLE: Table = Table {
    name: "cry",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "pet_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PET_FK)
        ),
        sqlite_column!("time", &SqlType::Text, non_null = true),
        sqlite_column!("state", &SqlType::Text, non_null = true),
        sqlite_column!("audio_id", &SqlType::Text, non_null = true),
        sqlite_column!("predict_map", &SqlType::Text, non_null = true),
        sqlite_column!(
            "intensity",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'medium'")
        ),
        sqlite_column!(
            "duration",
            &SqlType::Real,
            non_null = true,
            default_value = Some("2.0")
        ),
    ],
    indices: &[
        ("idx_cry_pet_id", "pet_id"),
        ("idx_cry_pet_time", "pet_id, time"),
    ],
};

pub const PET_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USER_TABLE, PET_TABLE, CRY_TABLE],
    migration: None,
}];
