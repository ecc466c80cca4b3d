//! Constants shared by the end-to-end tests.

pub const TEST_UID: &str = "test-user-uid";
pub const TEST_EMAIL: &str = "test-user@example.com";
pub const TEST_NICKNAME: &str = "test-nickname";

pub const OTHER_UID: &str = "other-user-uid";
pub const OTHER_EMAIL: &str = "other-user@example.com";
pub const OTHER_NICKNAME: &str = "other-nickname";

pub const TEST_JWT_SECRET: &str = "e2e-test-secret";

pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// The classifier scores every prediction in the test suite resolves to.
pub const MOCK_CLASSIFIER_SCORES: &[(&str, f64)] =
    &[("whining", 0.1), ("relax", 0.6), ("hostile", 0.3)];
