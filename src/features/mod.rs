//! Feature alignment: shaping caller input into the model's exact input table.

pub mod aligner;
pub mod counters;

pub use aligner::*;
pub use counters::*;
