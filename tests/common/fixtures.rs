//! Data seeding helpers that go straight through the store.

use chrono::{DateTime, Duration, Utc};
use petcry_server::pet_store::{CryStore, NewCry, SqlitePetStore};
use petcry_server::vocab::CryState;
use std::collections::HashMap;
use std::io::Cursor;

/// Inserts `count` cries for the pet, spaced a minute apart backwards from
/// `now`, cycling through the given states with the paired durations.
pub fn seed_cries(
    store: &SqlitePetStore,
    owner_uid: &str,
    pet_id: i64,
    now: DateTime<Utc>,
    count: usize,
    states: &[(CryState, f64)],
) {
    for i in 0..count {
        let (state, duration) = states[i % states.len()];
        let cry = NewCry::new(
            pet_id,
            now - Duration::minutes(i as i64 + 1),
            state,
            format!("audio-{}", i),
            HashMap::new(),
            None,
            Some(duration),
        )
        .expect("Bad fixture cry");
        store.create_cry(owner_uid, cry).expect("Failed to seed cry");
    }
}

/// A small valid PNG generated in memory.
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 128, 255, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode fixture png");
    bytes
}
