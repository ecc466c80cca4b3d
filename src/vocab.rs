//! Closed vocabularies shared by the pet and cry models.
//!
//! Every vocabulary value exists in two parallel lexicons: the canonical
//! (English) form that is persisted, and the display (Korean) form shown to
//! clients. `parse` accepts either lexicon; `normalize`/`localize` are
//! string-level bridges that pass unknown input through unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
}

impl Species {
    pub const ALL: &'static [Species] = &[Species::Dog, Species::Cat];

    pub fn canonical(self) -> &'static str {
        match self {
            Species::Dog => "dog",
            Species::Cat => "cat",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Species::Dog => "개",
            Species::Cat => "고양이",
        }
    }

    pub fn parse(s: &str) -> Option<Species> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.canonical() == s || v.display() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetGender {
    Male,
    Female,
    Spayed,
}

impl PetGender {
    pub const ALL: &'static [PetGender] =
        &[PetGender::Male, PetGender::Female, PetGender::Spayed];

    pub fn canonical(self) -> &'static str {
        match self {
            PetGender::Male => "male",
            PetGender::Female => "female",
            PetGender::Spayed => "spayed",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            PetGender::Male => "수컷",
            PetGender::Female => "암컷",
            PetGender::Spayed => "중성화됨",
        }
    }

    pub fn parse(s: &str) -> Option<PetGender> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.canonical() == s || v.display() == s)
    }
}

/// Cry states across both species. The permitted subset is species-scoped:
/// `happy` belongs to both vocabularies, the rest to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryState {
    Anger,
    Play,
    Happy,
    Sad,
    Hunger,
    Lonely,
}

impl CryState {
    pub const ALL: &'static [CryState] = &[
        CryState::Anger,
        CryState::Play,
        CryState::Happy,
        CryState::Sad,
        CryState::Hunger,
        CryState::Lonely,
    ];

    pub const DOG: &'static [CryState] = &[
        CryState::Anger,
        CryState::Play,
        CryState::Happy,
        CryState::Sad,
    ];

    pub const CAT: &'static [CryState] =
        &[CryState::Happy, CryState::Hunger, CryState::Lonely];

    pub fn canonical(self) -> &'static str {
        match self {
            CryState::Anger => "anger",
            CryState::Play => "play",
            CryState::Happy => "happy",
            CryState::Sad => "sad",
            CryState::Hunger => "hunger",
            CryState::Lonely => "lonely",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            CryState::Anger => "화남",
            CryState::Play => "놀고 싶음",
            CryState::Happy => "행복함",
            CryState::Sad => "슬픔",
            CryState::Hunger => "배고픔",
            CryState::Lonely => "외로움",
        }
    }

    pub fn parse(s: &str) -> Option<CryState> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.canonical() == s || v.display() == s)
    }

    pub fn allowed_for(species: Species) -> &'static [CryState] {
        match species {
            Species::Dog => Self::DOG,
            Species::Cat => Self::CAT,
        }
    }

    pub fn is_valid_for(self, species: Species) -> bool {
        Self::allowed_for(species).contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryIntensity {
    Low,
    Medium,
    High,
}

impl Default for CryIntensity {
    fn default() -> Self {
        CryIntensity::Medium
    }
}

impl CryIntensity {
    pub const ALL: &'static [CryIntensity] = &[
        CryIntensity::Low,
        CryIntensity::Medium,
        CryIntensity::High,
    ];

    pub fn canonical(self) -> &'static str {
        match self {
            CryIntensity::Low => "low",
            CryIntensity::Medium => "medium",
            CryIntensity::High => "high",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            CryIntensity::Low => "낮음",
            CryIntensity::Medium => "중간",
            CryIntensity::High => "높음",
        }
    }

    pub fn parse(s: &str) -> Option<CryIntensity> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.canonical() == s || v.display() == s)
    }
}

/// Which closed vocabulary a string-level operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    Species,
    PetGender,
    CryState,
    CryIntensity,
}

/// Maps a display-lexicon value to its canonical form. Values already in
/// canonical form, and values outside the vocabulary, pass through unchanged;
/// rejecting bad input is the validation layer's job, not the translator's.
pub fn normalize(value: &str, vocabulary: Vocabulary) -> String {
    let canonical = match vocabulary {
        Vocabulary::Species => Species::parse(value).map(Species::canonical),
        Vocabulary::PetGender => PetGender::parse(value).map(PetGender::canonical),
        Vocabulary::CryState => CryState::parse(value).map(CryState::canonical),
        Vocabulary::CryIntensity => CryIntensity::parse(value).map(CryIntensity::canonical),
    };
    canonical.unwrap_or(value).to_string()
}

/// Maps a canonical value to its display form, passing through on miss.
pub fn localize(value: &str, vocabulary: Vocabulary) -> String {
    let display = match vocabulary {
        Vocabulary::Species => Species::parse(value).map(Species::display),
        Vocabulary::PetGender => PetGender::parse(value).map(PetGender::display),
        Vocabulary::CryState => CryState::parse(value).map(CryState::display),
        Vocabulary::CryIntensity => CryIntensity::parse(value).map(CryIntensity::display),
    };
    display.unwrap_or(value).to_string()
}
