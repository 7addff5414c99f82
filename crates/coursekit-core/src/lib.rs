//! coursekit-core — exam lifecycle, materials and data model.
//!
//! This crate holds the domain types shared by every coursekit crate, the
//! async collaborator traits the REST client implements, and the state
//! machines that drive authoring, taking and reviewing exams.

pub mod answersheet;
pub mod auth;
pub mod builder;
pub mod deletion;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod inflight;
pub mod materials;
pub mod model;
pub mod parser;
pub mod submission;
pub mod taker;
pub mod traits;
pub mod wire;

pub use error::ApiError;
