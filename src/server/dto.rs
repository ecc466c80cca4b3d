//! Wire-level request/response shapes shared by the route modules.
//!
//! Responses default to the canonical lexicon; `?lang=ko` localizes the
//! vocabulary fields. Field names match the original mobile client contract
//! (`photoId`, `audioId`, `predictMap` are camelCase, the rest snake_case).

use crate::pet_store::{Cry, Pet, User};
use crate::vocab::{localize, Vocabulary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Ko,
}

#[derive(Debug, Default, Deserialize)]
pub struct LangQuery {
    #[serde(default)]
    pub lang: Lang,
}

fn render(value: &str, vocabulary: Vocabulary, lang: Lang) -> String {
    match lang {
        Lang::En => value.to_string(),
        Lang::Ko => localize(value, vocabulary),
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub nickname: String,
    #[serde(rename = "photoId")]
    pub photo_id: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            nickname: user.nickname,
            photo_id: user.photo_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthenticatedUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct PetResponse {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub gender: String,
    pub age: i64,
    pub species: String,
    pub sub_species: String,
    pub photo_id: Option<String>,
}

impl PetResponse {
    pub fn render(pet: Pet, lang: Lang) -> Self {
        Self {
            id: pet.id,
            user_id: pet.user_id,
            name: pet.name,
            gender: render(pet.gender.canonical(), Vocabulary::PetGender, lang),
            age: pet.age,
            species: render(pet.species.canonical(), Vocabulary::Species, lang),
            sub_species: pet.sub_species,
            photo_id: pet.photo_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CryResponse {
    pub id: i64,
    pub pet_id: i64,
    pub time: DateTime<Utc>,
    pub state: String,
    #[serde(rename = "audioId")]
    pub audio_id: String,
    #[serde(rename = "predictMap")]
    pub predict_map: HashMap<String, f64>,
    pub intensity: String,
    pub duration: f64,
}

impl CryResponse {
    pub fn render(cry: Cry, lang: Lang) -> Self {
        Self {
            id: cry.id,
            pet_id: cry.pet_id,
            time: cry.time,
            state: render(cry.state.canonical(), Vocabulary::CryState, lang),
            audio_id: cry.audio_id,
            predict_map: cry.predict_map,
            intensity: render(cry.intensity.canonical(), Vocabulary::CryIntensity, lang),
            duration: cry.duration,
        }
    }

    pub fn render_all(cries: Vec<Cry>, lang: Lang) -> Vec<Self> {
        cries.into_iter().map(|cry| Self::render(cry, lang)).collect()
    }
}
