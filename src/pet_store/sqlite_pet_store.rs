use super::models::*;
use super::schema::PET_VERSIONED_SCHEMAS;
use super::{CryStore, PetStore, UserStore};
use crate::error::{ApiError, ApiResult};
use crate::sqlite_persistence::BASE_DB_VERSION;
use crate::vocab::{CryIntensity, CryState, PetGender, Species};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that SQLite's
/// lexicographic comparison orders them chronologically.
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Malformed stored timestamp {:?}", s))?
        .with_timezone(&Utc))
}

#[derive(Clone)]
pub struct SqlitePetStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePetStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open pet database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new pet database at {:?}", path);
            PET_VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            let schema = PET_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version as i64 == db_version)
                .with_context(|| format!("Unknown pet database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Pet database schema validation failed for version {}",
                    db_version
                )
            })?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            uid: row.get("uid")?,
            email: row.get("email")?,
            nickname: row.get("nickname")?,
            photo_id: row.get("photo_id")?,
        })
    }

    fn row_to_pet(row: &Row) -> ApiResult<Pet> {
        let gender_str: String = row.get("gender")?;
        let species_str: String = row.get("species")?;
        Ok(Pet {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            gender: PetGender::parse(&gender_str)
                .ok_or_else(|| anyhow!("Malformed stored gender {:?}", gender_str))?,
            age: row.get("age")?,
            species: Species::parse(&species_str)
                .ok_or_else(|| anyhow!("Malformed stored species {:?}", species_str))?,
            sub_species: row.get("sub_species")?,
            photo_id: row.get("photo_id")?,
        })
    }

    fn row_to_cry(row: &Row) -> ApiResult<Cry> {
        let time_str: String = row.get("time")?;
        let state_str: String = row.get("state")?;
        let intensity_str: String = row.get("intensity")?;
        let predict_map_str: String = row.get("predict_map")?;
        let predict_map: HashMap<String, f64> = serde_json::from_str(&predict_map_str)
            .context("Malformed stored predict_map")?;
        Ok(Cry {
            id: row.get("id")?,
            pet_id: row.get("pet_id")?,
            time: parse_time(&time_str)?,
            state: CryState::parse(&state_str)
                .ok_or_else(|| anyhow!("Malformed stored state {:?}", state_str))?,
            audio_id: row.get("audio_id")?,
            predict_map,
            intensity: CryIntensity::parse(&intensity_str)
                .ok_or_else(|| anyhow!("Malformed stored intensity {:?}", intensity_str))?,
            duration: row.get("duration")?,
        })
    }

    /// Fetches a pet by id and checks ownership in the same store call: a
    /// missing pet and a pet owned by someone else stay distinguishable.
    fn authorize_pet(conn: &Connection, pet_id: i64, requester_uid: &str) -> ApiResult<Pet> {
        let pet = conn
            .query_row(
                "SELECT id, user_id, name, gender, age, species, sub_species, photo_id
                 FROM pet WHERE id = ?1",
                params![pet_id],
                |row| Ok((row.get::<_, String>("user_id")?, Self::row_to_pet(row))),
            )
            .optional()?;

        match pet {
            None => Err(ApiError::NotFound(format!(
                "Pet with id {} not found",
                pet_id
            ))),
            Some((owner, _)) if owner != requester_uid => Err(ApiError::Unauthorized(format!(
                "You are not authorized to access pet {}",
                pet_id
            ))),
            Some((_, pet)) => pet,
        }
    }

    fn fetch_cry(conn: &Connection, cry_id: i64) -> ApiResult<Option<(Cry, String)>> {
        conn.query_row(
            "SELECT cry.id, cry.pet_id, cry.time, cry.state, cry.audio_id,
                    cry.predict_map, cry.intensity, cry.duration, pet.user_id AS owner_uid
             FROM cry JOIN pet ON cry.pet_id = pet.id
             WHERE cry.id = ?1",
            params![cry_id],
            |row| {
                let owner: String = row.get("owner_uid")?;
                Ok((Self::row_to_cry(row), owner))
            },
        )
        .optional()?
        .map(|(cry, owner)| Ok((cry?, owner)))
        .transpose()
    }

    /// Fetches a cry through its owning pet with NotFound/Unauthorized kept
    /// distinct.
    fn authorize_cry(conn: &Connection, cry_id: i64, requester_uid: &str) -> ApiResult<Cry> {
        match Self::fetch_cry(conn, cry_id)? {
            None => Err(ApiError::NotFound(format!(
                "Cry with id {} not found",
                cry_id
            ))),
            Some((_, owner)) if owner != requester_uid => Err(ApiError::Unauthorized(format!(
                "You are not authorized to access cry {}",
                cry_id
            ))),
            Some((cry, _)) => Ok(cry),
        }
    }

    fn insert_cry(tx: &Transaction, cry: &NewCry) -> ApiResult<i64> {
        tx.execute(
            "INSERT INTO cry (pet_id, time, state, audio_id, predict_map, intensity, duration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                cry.pet_id,
                format_time(&cry.time),
                cry.state.canonical(),
                cry.audio_id,
                serde_json::to_string(&cry.predict_map)?,
                cry.intensity.canonical(),
                cry.duration,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    fn cries_for_query(
        conn: &Connection,
        sql: &str,
        query_params: &[&dyn rusqlite::ToSql],
    ) -> ApiResult<Vec<Cry>> {
        let mut stmt = conn.prepare(sql)?;
        let rows: Vec<ApiResult<Cry>> = stmt
            .query_map(query_params, |row| Ok(Self::row_to_cry(row)))?
            .collect::<Result<_, _>>()?;
        rows.into_iter().collect()
    }

    const CRY_COLUMNS: &'static str =
        "cry.id, cry.pet_id, cry.time, cry.state, cry.audio_id, cry.predict_map,
         cry.intensity, cry.duration";
}

impl UserStore for SqlitePetStore {
    fn create_user(&self, user: NewUser) -> ApiResult<User> {
        let mut guard = self.conn.lock().unwrap();
        let tx = guard.transaction().map_err(anyhow::Error::from)?;

        let uid_taken: bool = tx
            .query_row(
                "SELECT 1 FROM user WHERE uid = ?1",
                params![user.uid],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if uid_taken {
            return Err(ApiError::Duplicate("User already exists".to_string()));
        }

        let email_taken: bool = tx
            .query_row(
                "SELECT 1 FROM user WHERE email = ?1",
                params![user.email],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if email_taken {
            return Err(ApiError::Duplicate("Email already exists".to_string()));
        }

        tx.execute(
            "INSERT INTO user (uid, email, nickname, photo_id) VALUES (?1, ?2, ?3, ?4)",
            params![user.uid, user.email, user.nickname, user.photo_id],
        )?;
        tx.commit().map_err(anyhow::Error::from)?;

        Ok(User {
            uid: user.uid,
            email: user.email,
            nickname: user.nickname,
            photo_id: user.photo_id,
        })
    }

    fn get_user(&self, uid: &str) -> ApiResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT uid, email, nickname, photo_id FROM user WHERE uid = ?1",
            params![uid],
            Self::row_to_user,
        )
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("User with id {} not found", uid)))
    }

    fn update_user(&self, uid: &str, patch: UserPatch) -> ApiResult<User> {
        let mut current = self.get_user(uid)?;
        if let Some(nickname) = patch.nickname {
            validate_nickname(&nickname)?;
            current.nickname = nickname;
        }
        if let Some(photo_id) = patch.photo_id {
            current.photo_id = Some(photo_id);
        }

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user SET nickname = ?1, photo_id = ?2 WHERE uid = ?3",
            params![current.nickname, current.photo_id, uid],
        )?;
        Ok(current)
    }

    fn delete_user(&self, uid: &str) -> ApiResult<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM user WHERE uid = ?1", params![uid])?;
        if deleted == 0 {
            return Err(ApiError::NotFound(format!(
                "User with id {} not found",
                uid
            )));
        }
        Ok(())
    }

    fn login_user(&self, uid: &str, email: &str) -> ApiResult<User> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT uid, email, nickname, photo_id FROM user WHERE email = ?1",
                params![email],
                Self::row_to_user,
            )
            .optional()?
            .ok_or_else(|| {
                ApiError::NotFound(format!("User with email {} not found", email))
            })?;
        if user.uid != uid {
            return Err(ApiError::Unauthorized("Unauthorized user id".to_string()));
        }
        Ok(user)
    }
}

impl PetStore for SqlitePetStore {
    fn create_pet(&self, owner_uid: &str, pet: NewPet) -> ApiResult<Pet> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO pet (user_id, name, gender, age, species, sub_species)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                owner_uid,
                pet.name,
                pet.gender.canonical(),
                pet.age,
                pet.species.canonical(),
                pet.sub_species,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Pet {
            id,
            user_id: owner_uid.to_string(),
            name: pet.name,
            gender: pet.gender,
            age: pet.age,
            species: pet.species,
            sub_species: pet.sub_species,
            photo_id: None,
        })
    }

    fn get_pet(&self, pet_id: i64, requester_uid: &str) -> ApiResult<Pet> {
        let conn = self.conn.lock().unwrap();
        Self::authorize_pet(&conn, pet_id, requester_uid)
    }

    fn list_pets_by_user(&self, owner_uid: &str) -> ApiResult<Vec<Pet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, gender, age, species, sub_species, photo_id
             FROM pet WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows: Vec<ApiResult<Pet>> = stmt
            .query_map(params![owner_uid], |row| Ok(Self::row_to_pet(row)))?
            .collect::<Result<_, _>>()?;
        rows.into_iter().collect()
    }

    fn update_pet(&self, pet_id: i64, requester_uid: &str, patch: PetPatch) -> ApiResult<Pet> {
        let mut guard = self.conn.lock().unwrap();
        let tx = guard.transaction().map_err(anyhow::Error::from)?;

        let mut pet = Self::authorize_pet(&tx, pet_id, requester_uid)?;
        if let Some(name) = patch.name {
            pet.name = name;
        }
        if let Some(gender) = patch.gender {
            pet.gender = gender;
        }
        if let Some(age) = patch.age {
            validate_age(age)?;
            pet.age = age;
        }
        if let Some(species) = patch.species {
            pet.species = species;
        }
        if let Some(sub_species) = patch.sub_species {
            pet.sub_species = sub_species;
        }
        if let Some(photo_id) = patch.photo_id {
            pet.photo_id = Some(photo_id);
        }

        tx.execute(
            "UPDATE pet SET name = ?1, gender = ?2, age = ?3, species = ?4,
                            sub_species = ?5, photo_id = ?6
             WHERE id = ?7",
            params![
                pet.name,
                pet.gender.canonical(),
                pet.age,
                pet.species.canonical(),
                pet.sub_species,
                pet.photo_id,
                pet_id,
            ],
        )?;
        tx.commit().map_err(anyhow::Error::from)?;
        Ok(pet)
    }

    fn delete_pet(&self, pet_id: i64, requester_uid: &str) -> ApiResult<()> {
        let mut guard = self.conn.lock().unwrap();
        let tx = guard.transaction().map_err(anyhow::Error::from)?;
        Self::authorize_pet(&tx, pet_id, requester_uid)?;
        tx.execute("DELETE FROM pet WHERE id = ?1", params![pet_id])?;
        tx.commit().map_err(anyhow::Error::from)?;
        Ok(())
    }

    fn set_pet_photo_id(&self, pet_id: i64, requester_uid: &str, photo_id: &str) -> ApiResult<()> {
        let mut guard = self.conn.lock().unwrap();
        let tx = guard.transaction().map_err(anyhow::Error::from)?;
        Self::authorize_pet(&tx, pet_id, requester_uid)?;
        tx.execute(
            "UPDATE pet SET photo_id = ?1 WHERE id = ?2",
            params![photo_id, pet_id],
        )?;
        tx.commit().map_err(anyhow::Error::from)?;
        Ok(())
    }
}

impl CryStore for SqlitePetStore {
    fn create_cry(&self, requester_uid: &str, cry: NewCry) -> ApiResult<Cry> {
        let mut guard = self.conn.lock().unwrap();
        let tx = guard.transaction().map_err(anyhow::Error::from)?;

        let pet = Self::authorize_pet(&tx, cry.pet_id, requester_uid)?;
        check_state_for_species(pet.species, cry.state)?;

        let id = Self::insert_cry(&tx, &cry)?;
        tx.commit().map_err(anyhow::Error::from)?;

        Ok(Cry {
            id,
            pet_id: cry.pet_id,
            time: cry.time,
            state: cry.state,
            audio_id: cry.audio_id,
            predict_map: cry.predict_map,
            intensity: cry.intensity,
            duration: cry.duration,
        })
    }

    fn get_cry(&self, cry_id: i64, requester_uid: &str) -> ApiResult<Cry> {
        let conn = self.conn.lock().unwrap();
        Self::authorize_cry(&conn, cry_id, requester_uid)
    }

    fn list_cries_by_pet(&self, pet_id: i64, requester_uid: &str) -> ApiResult<Vec<Cry>> {
        let conn = self.conn.lock().unwrap();
        Self::authorize_pet(&conn, pet_id, requester_uid)?;
        Self::cries_for_query(
            &conn,
            &format!(
                "SELECT {} FROM cry WHERE pet_id = ?1 ORDER BY cry.id",
                Self::CRY_COLUMNS
            ),
            &[&pet_id],
        )
    }

    fn list_cries_by_state(
        &self,
        pet_id: i64,
        state: &str,
        requester_uid: &str,
    ) -> ApiResult<Vec<Cry>> {
        let conn = self.conn.lock().unwrap();
        let pet = Self::authorize_pet(&conn, pet_id, requester_uid)?;
        let state = parse_state(state)?;
        check_state_for_species(pet.species, state)?;
        Self::cries_for_query(
            &conn,
            &format!(
                "SELECT {} FROM cry WHERE pet_id = ?1 AND state = ?2 ORDER BY cry.id",
                Self::CRY_COLUMNS
            ),
            &[&pet_id, &state.canonical()],
        )
    }

    fn list_cries_between(
        &self,
        pet_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        requester_uid: &str,
    ) -> ApiResult<Vec<Cry>> {
        // The end bound is pushed out a day so that a date-level end time
        // captures the whole final day.
        self.list_cries_window(
            pet_id,
            start_time,
            end_time + Duration::days(1),
            requester_uid,
        )
    }

    fn list_cries_window(
        &self,
        pet_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        requester_uid: &str,
    ) -> ApiResult<Vec<Cry>> {
        let conn = self.conn.lock().unwrap();
        Self::authorize_pet(&conn, pet_id, requester_uid)?;
        Self::cries_for_query(
            &conn,
            &format!(
                "SELECT {} FROM cry
                 WHERE pet_id = ?1 AND time >= ?2 AND time <= ?3
                 ORDER BY cry.time",
                Self::CRY_COLUMNS
            ),
            &[
                &pet_id,
                &format_time(&start_time),
                &format_time(&end_time),
            ],
        )
    }

    fn update_cry(&self, cry_id: i64, requester_uid: &str, patch: CryPatch) -> ApiResult<Cry> {
        let mut guard = self.conn.lock().unwrap();
        let tx = guard.transaction().map_err(anyhow::Error::from)?;

        let mut cry = Self::authorize_cry(&tx, cry_id, requester_uid)?;
        if let Some(time) = patch.time {
            cry.time = time;
        }
        if let Some(state) = patch.state {
            let pet = Self::authorize_pet(&tx, cry.pet_id, requester_uid)?;
            check_state_for_species(pet.species, state)?;
            cry.state = state;
        }
        if let Some(audio_id) = patch.audio_id {
            cry.audio_id = audio_id;
        }
        if let Some(predict_map) = patch.predict_map {
            cry.predict_map = predict_map;
        }
        if let Some(intensity) = patch.intensity {
            cry.intensity = intensity;
        }
        if let Some(duration) = patch.duration {
            validate_duration(duration)?;
            cry.duration = duration;
        }

        tx.execute(
            "UPDATE cry SET time = ?1, state = ?2, audio_id = ?3, predict_map = ?4,
                            intensity = ?5, duration = ?6
             WHERE id = ?7",
            params![
                format_time(&cry.time),
                cry.state.canonical(),
                cry.audio_id,
                serde_json::to_string(&cry.predict_map)?,
                cry.intensity.canonical(),
                cry.duration,
                cry_id,
            ],
        )?;
        tx.commit().map_err(anyhow::Error::from)?;
        Ok(cry)
    }

    fn delete_cry(&self, cry_id: i64, requester_uid: &str) -> ApiResult<()> {
        let mut guard = self.conn.lock().unwrap();
        let tx = guard.transaction().map_err(anyhow::Error::from)?;
        Self::authorize_cry(&tx, cry_id, requester_uid)?;
        tx.execute("DELETE FROM cry WHERE id = ?1", params![cry_id])?;
        tx.commit().map_err(anyhow::Error::from)?;
        Ok(())
    }
}
