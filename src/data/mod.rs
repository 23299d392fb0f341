//! Input data sources other than the user.

pub mod sample;

pub use sample::ApplicantSampler;
