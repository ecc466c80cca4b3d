//! Cry state prediction through the external classifier service.

use crate::error::ApiResult;
use crate::pet_store::{parse_state, Cry, CryStore, FullStore, NewCry, PetStore};
use crate::vocab::Species;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The classifier's label space differs from ours on exactly three labels.
/// This bridge is a stable contract with the inference service: renaming on
/// either side without updating the other silently corrupts state
/// assignment, so the mapping lives here, hard-coded, and nowhere else.
/// Labels outside the bridge pass through unchanged.
const LABEL_BRIDGE: &[(&str, &str)] = &[
    ("whining", "sad"),
    ("relax", "happy"),
    ("hostile", "anger"),
];

/// External audio classifier: takes wav bytes plus the pet's species,
/// returns a label → confidence mapping in the classifier's own vocabulary.
#[async_trait]
pub trait CryClassifier: Send + Sync {
    async fn classify(
        &self,
        audio: &[u8],
        species: Species,
        user_id: &str,
    ) -> Result<HashMap<String, f64>>;
}

/// Production classifier client. No retries; a failure surfaces to the
/// caller of the originating request.
pub struct HttpCryClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpCryClassifier {
    pub fn new(url: String, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, url }
    }
}

#[async_trait]
impl CryClassifier for HttpCryClassifier {
    async fn classify(
        &self,
        audio: &[u8],
        species: Species,
        user_id: &str,
    ) -> Result<HashMap<String, f64>> {
        let file_part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("file.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("user_id", user_id.to_string())
            .text("species", species.canonical());

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach the cry classifier")?;

        if !response.status().is_success() {
            bail!("Cry classifier failed with status {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse classifier response")
    }
}

/// Renames the bridged labels, passing all others through unchanged.
pub fn remap_labels(raw: HashMap<String, f64>) -> HashMap<String, f64> {
    raw.into_iter()
        .map(|(label, score)| {
            let renamed = LABEL_BRIDGE
                .iter()
                .find(|(external, _)| *external == label)
                .map(|(_, internal)| internal.to_string())
                .unwrap_or(label);
            (renamed, score)
        })
        .collect()
}

/// The label with the highest confidence; score ties break by label name so
/// the chosen state is deterministic.
pub fn dominant_label(map: &HashMap<String, f64>) -> Option<&str> {
    map.iter()
        .max_by(|a, b| {
            a.1.partial_cmp(b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(a.0))
        })
        .map(|(label, _)| label.as_str())
}

pub struct PredictionGateway {
    store: Arc<dyn FullStore>,
    classifier: Arc<dyn CryClassifier>,
    audio_dir: PathBuf,
}

impl PredictionGateway {
    pub fn new(
        store: Arc<dyn FullStore>,
        classifier: Arc<dyn CryClassifier>,
        audio_dir: PathBuf,
    ) -> Result<Self> {
        fs::create_dir_all(&audio_dir)?;
        Ok(Self {
            store,
            classifier,
            audio_dir,
        })
    }

    pub async fn predict(
        &self,
        audio: &[u8],
        pet_id: i64,
        requester_uid: &str,
    ) -> ApiResult<Cry> {
        self.predict_at(audio, pet_id, requester_uid, Utc::now())
            .await
    }

    pub async fn predict_at(
        &self,
        audio: &[u8],
        pet_id: i64,
        requester_uid: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Cry> {
        let pet = self.store.get_pet(pet_id, requester_uid)?;

        let raw = self
            .classifier
            .classify(audio, pet.species, requester_uid)
            .await?;
        let predict_map = remap_labels(raw);
        let state_label = dominant_label(&predict_map)
            .ok_or_else(|| anyhow::anyhow!("Classifier returned an empty prediction"))?
            .to_string();
        let state = parse_state(&state_label)?;

        let audio_id = format!("{}_{}", pet_id, now.format("%Y%m%d-%H%M%S"));
        let audio_path = self.audio_dir.join(format!("{}.wav", audio_id));
        fs::write(&audio_path, audio).context("Failed to persist cry audio")?;
        info!("stored predicted cry audio at {:?}", audio_path);

        let cry = NewCry::new(pet_id, now, state, audio_id, predict_map, None, None)?;
        self.store.create_cry(requester_uid, cry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::pet_store::{NewPet, NewUser, PetStore, SqlitePetStore, UserStore};
    use crate::vocab::{CryState, PetGender};
    use tempfile::TempDir;

    fn scores(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs
            .iter()
            .map(|(label, score)| (label.to_string(), *score))
            .collect()
    }

    #[test]
    fn bridged_labels_are_renamed_and_the_rest_pass_through() {
        let remapped = remap_labels(scores(&[
            ("whining", 0.1),
            ("relax", 0.6),
            ("hostile", 0.3),
        ]));
        assert_eq!(remapped, scores(&[("sad", 0.1), ("happy", 0.6), ("anger", 0.3)]));

        let remapped = remap_labels(scores(&[("hunger", 0.7), ("relax", 0.3)]));
        assert_eq!(remapped, scores(&[("hunger", 0.7), ("happy", 0.3)]));
    }

    #[test]
    fn dominant_label_breaks_ties_by_name() {
        let map = scores(&[("sad", 0.4), ("anger", 0.4), ("happy", 0.2)]);
        assert_eq!(dominant_label(&map), Some("anger"));

        let map = scores(&[("sad", 0.1), ("happy", 0.9)]);
        assert_eq!(dominant_label(&map), Some("happy"));
    }

    struct FixedClassifier(HashMap<String, f64>);

    #[async_trait]
    impl CryClassifier for FixedClassifier {
        async fn classify(
            &self,
            _audio: &[u8],
            _species: Species,
            _user_id: &str,
        ) -> Result<HashMap<String, f64>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl CryClassifier for BrokenClassifier {
        async fn classify(
            &self,
            _audio: &[u8],
            _species: Species,
            _user_id: &str,
        ) -> Result<HashMap<String, f64>> {
            bail!("connection refused")
        }
    }

    fn gateway_fixture(
        classifier: Arc<dyn CryClassifier>,
    ) -> (TempDir, Arc<SqlitePetStore>, PredictionGateway, i64) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqlitePetStore::new(dir.path().join("pet.db")).unwrap());
        store
            .create_user(
                NewUser::new(
                    "u1".to_string(),
                    "u1@example.com".to_string(),
                    "owner-one".to_string(),
                    None,
                )
                .unwrap(),
            )
            .unwrap();
        let pet = store
            .create_pet(
                "u1",
                NewPet::new(
                    "Bami".to_string(),
                    PetGender::Female,
                    3,
                    Species::Dog,
                    "maltese".to_string(),
                )
                .unwrap(),
            )
            .unwrap();
        let gateway =
            PredictionGateway::new(store.clone(), classifier, dir.path().join("cry_audio"))
                .unwrap();
        let pet_id = pet.id;
        (dir, store, gateway, pet_id)
    }

    #[tokio::test]
    async fn predict_persists_the_remapped_cry_and_audio() {
        let classifier = Arc::new(FixedClassifier(scores(&[
            ("whining", 0.1),
            ("relax", 0.6),
            ("hostile", 0.3),
        ])));
        let (dir, _store, gateway, pet_id) = gateway_fixture(classifier);

        let now: DateTime<Utc> = "2026-08-01T10:30:00Z".parse().unwrap();
        let cry = gateway
            .predict_at(b"RIFFfake-wav", pet_id, "u1", now)
            .await
            .unwrap();

        assert_eq!(cry.state, CryState::Happy);
        assert_eq!(
            cry.predict_map,
            scores(&[("sad", 0.1), ("happy", 0.6), ("anger", 0.3)])
        );
        let expected_audio_id = format!("{}_20260801-103000", pet_id);
        assert_eq!(cry.audio_id, expected_audio_id);
        assert!(dir
            .path()
            .join("cry_audio")
            .join(format!("{}.wav", expected_audio_id))
            .exists());
    }

    #[tokio::test]
    async fn classifier_failure_surfaces_as_internal() {
        let (_dir, _store, gateway, pet_id) = gateway_fixture(Arc::new(BrokenClassifier));
        let result = gateway.predict(b"RIFF", pet_id, "u1").await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn predicting_for_a_foreign_pet_is_unauthorized() {
        let classifier = Arc::new(FixedClassifier(scores(&[("relax", 1.0)])));
        let (_dir, store, gateway, pet_id) = gateway_fixture(classifier);
        store
            .create_user(
                NewUser::new(
                    "u2".to_string(),
                    "u2@example.com".to_string(),
                    "owner-two".to_string(),
                    None,
                )
                .unwrap(),
            )
            .unwrap();

        let result = gateway.predict(b"RIFF", pet_id, "u2").await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn cat_prediction_landing_on_a_dog_state_is_rejected() {
        // a cat whose argmax remaps to anger must fail species validation
        let classifier = Arc::new(FixedClassifier(scores(&[
            ("hostile", 0.9),
            ("relax", 0.1),
        ])));
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqlitePetStore::new(dir.path().join("pet.db")).unwrap());
        store
            .create_user(
                NewUser::new(
                    "u1".to_string(),
                    "u1@example.com".to_string(),
                    "owner-one".to_string(),
                    None,
                )
                .unwrap(),
            )
            .unwrap();
        let cat = store
            .create_pet(
                "u1",
                NewPet::new(
                    "Nabi".to_string(),
                    PetGender::Male,
                    2,
                    Species::Cat,
                    "korean shorthair".to_string(),
                )
                .unwrap(),
            )
            .unwrap();
        let gateway =
            PredictionGateway::new(store.clone(), classifier, dir.path().join("cry_audio"))
                .unwrap();

        let result = gateway.predict(b"RIFF", cat.id, "u1").await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
