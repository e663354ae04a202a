pub mod requests;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use requests::{body_json, json_request};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder, TEST_PASSWORD, TEST_SECRET};
