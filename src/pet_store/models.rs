use crate::error::{ApiError, ApiResult};
use crate::vocab::{CryIntensity, CryState, PetGender, Species};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub nickname: String,
    pub photo_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub uid: String,
    pub email: String,
    pub nickname: String,
    pub photo_id: Option<String>,
}

impl NewUser {
    pub fn new(
        uid: String,
        email: String,
        nickname: String,
        photo_id: Option<String>,
    ) -> ApiResult<Self> {
        validate_email(&email)?;
        validate_nickname(&nickname)?;
        Ok(Self {
            uid,
            email,
            nickname,
            photo_id,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub nickname: Option<String>,
    pub photo_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub gender: PetGender,
    pub age: i64,
    pub species: Species,
    pub sub_species: String,
    pub photo_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPet {
    pub name: String,
    pub gender: PetGender,
    pub age: i64,
    pub species: Species,
    pub sub_species: String,
}

impl NewPet {
    pub fn new(
        name: String,
        gender: PetGender,
        age: i64,
        species: Species,
        sub_species: String,
    ) -> ApiResult<Self> {
        validate_age(age)?;
        Ok(Self {
            name,
            gender,
            age,
            species,
            sub_species,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PetPatch {
    pub name: Option<String>,
    pub gender: Option<PetGender>,
    pub age: Option<i64>,
    pub species: Option<Species>,
    pub sub_species: Option<String>,
    pub photo_id: Option<String>,
}

/// A classified audio event. `predict_map` holds the classifier's confidence
/// per state; hand-created cries may carry any mapping, prediction-created
/// ones sum to ~1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cry {
    pub id: i64,
    pub pet_id: i64,
    pub time: DateTime<Utc>,
    pub state: CryState,
    pub audio_id: String,
    pub predict_map: HashMap<String, f64>,
    pub intensity: CryIntensity,
    pub duration: f64,
}

#[derive(Debug, Clone)]
pub struct NewCry {
    pub pet_id: i64,
    pub time: DateTime<Utc>,
    pub state: CryState,
    pub audio_id: String,
    pub predict_map: HashMap<String, f64>,
    pub intensity: CryIntensity,
    pub duration: f64,
}

impl NewCry {
    pub fn new(
        pet_id: i64,
        time: DateTime<Utc>,
        state: CryState,
        audio_id: String,
        predict_map: HashMap<String, f64>,
        intensity: Option<CryIntensity>,
        duration: Option<f64>,
    ) -> ApiResult<Self> {
        let duration = duration.unwrap_or(2.0);
        validate_duration(duration)?;
        Ok(Self {
            pet_id,
            time,
            state,
            audio_id,
            predict_map,
            intensity: intensity.unwrap_or_default(),
            duration,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CryPatch {
    pub time: Option<DateTime<Utc>>,
    pub state: Option<CryState>,
    pub audio_id: Option<String>,
    pub predict_map: Option<HashMap<String, f64>>,
    pub intensity: Option<CryIntensity>,
    pub duration: Option<f64>,
}

// ----------------------------------------------------------------------------
// Field validation, lexicon-aware parsing
// ----------------------------------------------------------------------------

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,7}$").unwrap();
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid email format".to_string()))
    }
}

pub fn validate_nickname(nickname: &str) -> ApiResult<()> {
    let len = nickname.chars().count();
    if (3..=30).contains(&len) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "Nickname must be between 3 and 30 characters".to_string(),
        ))
    }
}

pub fn validate_age(age: i64) -> ApiResult<()> {
    if age < 0 {
        Err(ApiError::Validation("Age cannot be negative".to_string()))
    } else {
        Ok(())
    }
}

pub fn validate_duration(duration: f64) -> ApiResult<()> {
    if duration > 0.0 {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "duration must be a positive float".to_string(),
        ))
    }
}

fn allowed_values<T: Copy, F: Fn(T) -> &'static str>(values: &[T], f: F) -> String {
    values
        .iter()
        .map(|v| f(*v))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn parse_species(value: &str) -> ApiResult<Species> {
    Species::parse(value).ok_or_else(|| {
        ApiError::Validation(format!(
            "species must be one of ({}) or their Korean equivalents ({})",
            allowed_values(Species::ALL, Species::canonical),
            allowed_values(Species::ALL, Species::display),
        ))
    })
}

pub fn parse_gender(value: &str) -> ApiResult<PetGender> {
    PetGender::parse(value).ok_or_else(|| {
        ApiError::Validation(format!(
            "gender must be one of ({}) or their Korean equivalents ({})",
            allowed_values(PetGender::ALL, PetGender::canonical),
            allowed_values(PetGender::ALL, PetGender::display),
        ))
    })
}

pub fn parse_state(value: &str) -> ApiResult<CryState> {
    CryState::parse(value).ok_or_else(|| {
        ApiError::Validation(format!(
            "state must be one of ({}) or their Korean equivalents ({})",
            allowed_values(CryState::ALL, CryState::canonical),
            allowed_values(CryState::ALL, CryState::display),
        ))
    })
}

pub fn parse_intensity(value: &str) -> ApiResult<CryIntensity> {
    CryIntensity::parse(value).ok_or_else(|| {
        ApiError::Validation(format!(
            "intensity must be one of ({}) or their Korean equivalents ({})",
            allowed_values(CryIntensity::ALL, CryIntensity::canonical),
            allowed_values(CryIntensity::ALL, CryIntensity::display),
        ))
    })
}

/// The species/state compatibility check applied before every cry insert or
/// state update.
pub fn check_state_for_species(species: Species, state: CryState) -> ApiResult<()> {
    if state.is_valid_for(species) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "state must be one of ({}) or their Korean equivalents ({}) for a {}",
            allowed_values(CryState::allowed_for(species), CryState::canonical),
            allowed_values(CryState::allowed_for(species), CryState::display),
            species.canonical(),
        )))
    }
}
