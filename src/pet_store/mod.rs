mod models;
mod schema;
mod sqlite_pet_store;

pub use models::*;
pub use schema::PET_VERSIONED_SCHEMAS;
pub use sqlite_pet_store::SqlitePetStore;

use crate::error::ApiResult;
use chrono::{DateTime, Utc};

pub trait UserStore: Send + Sync {
    /// Creates a new user. Fails with a Duplicate error when the uid or the
    /// email is already taken.
    fn create_user(&self, user: NewUser) -> ApiResult<User>;

    /// Returns the user with the given uid, or NotFound.
    fn get_user(&self, uid: &str) -> ApiResult<User>;

    /// Applies the set fields of the patch and returns the updated user.
    fn update_user(&self, uid: &str, patch: UserPatch) -> ApiResult<User>;

    /// Deletes the user; owned pets and their cries go with it.
    fn delete_user(&self, uid: &str) -> ApiResult<()>;

    /// Checks a (uid, email) login pair. Unknown email is NotFound, a uid
    /// that does not match the email's account is Unauthorized.
    fn login_user(&self, uid: &str, email: &str) -> ApiResult<User>;
}

pub trait PetStore: Send + Sync {
    fn create_pet(&self, owner_uid: &str, pet: NewPet) -> ApiResult<Pet>;

    /// Fetches a pet and verifies ownership in one store call: a missing pet
    /// is NotFound, an existing pet owned by someone else is Unauthorized.
    fn get_pet(&self, pet_id: i64, requester_uid: &str) -> ApiResult<Pet>;

    fn list_pets_by_user(&self, owner_uid: &str) -> ApiResult<Vec<Pet>>;

    fn update_pet(&self, pet_id: i64, requester_uid: &str, patch: PetPatch) -> ApiResult<Pet>;

    fn delete_pet(&self, pet_id: i64, requester_uid: &str) -> ApiResult<()>;

    /// Records the profile photo id after an image upload.
    fn set_pet_photo_id(&self, pet_id: i64, requester_uid: &str, photo_id: &str) -> ApiResult<()>;
}

pub trait CryStore: Send + Sync {
    /// Validates the state against the owning pet's species before insert.
    fn create_cry(&self, requester_uid: &str, cry: NewCry) -> ApiResult<Cry>;

    /// Fetches a cry through its owning pet: no such cry is NotFound, a cry
    /// whose pet belongs to someone else is Unauthorized.
    fn get_cry(&self, cry_id: i64, requester_uid: &str) -> ApiResult<Cry>;

    fn list_cries_by_pet(&self, pet_id: i64, requester_uid: &str) -> ApiResult<Vec<Cry>>;

    /// The state may be supplied in either lexicon; it is normalized and
    /// checked against the pet's species before querying.
    fn list_cries_by_state(
        &self,
        pet_id: i64,
        state: &str,
        requester_uid: &str,
    ) -> ApiResult<Vec<Cry>>;

    /// Inclusive bounds; the end bound is extended by one day so a date-level
    /// end time captures the whole final day.
    fn list_cries_between(
        &self,
        pet_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        requester_uid: &str,
    ) -> ApiResult<Vec<Cry>>;

    /// Exact inclusive bounds with no end-of-day extension; this is the
    /// inspection window fetch.
    fn list_cries_window(
        &self,
        pet_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        requester_uid: &str,
    ) -> ApiResult<Vec<Cry>>;

    /// Applies the set fields; when the state changes it is re-validated
    /// against the owning pet's species.
    fn update_cry(&self, cry_id: i64, requester_uid: &str, patch: CryPatch) -> ApiResult<Cry>;

    fn delete_cry(&self, cry_id: i64, requester_uid: &str) -> ApiResult<()>;
}

pub trait FullStore: UserStore + PetStore + CryStore {}

impl<T: UserStore + PetStore + CryStore> FullStore for T {}
