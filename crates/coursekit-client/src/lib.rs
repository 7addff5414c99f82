//! coursekit-client — REST backend integration.
//!
//! Implements the `coursekit-core` collaborator traits against the portal's
//! REST API with `reqwest`, plus an in-memory [`MockBackend`] for tests.

pub mod attempts;
pub mod config;
pub mod enrollment;
pub mod exams;
pub mod http;
pub mod materials;
pub mod mock;

pub use config::{connect, load_config, load_config_from, BackendConfig, CoursekitConfig};
pub use http::HttpBackend;
pub use mock::MockBackend;
