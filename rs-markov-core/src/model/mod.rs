//! Top-level module for the character-level Markov model.
//!
//! This module provides:
//! - The ordered symbol set (`Alphabet`) and model configuration (`ModelConfig`)
//! - The sparse n-gram count table (`CountTable`)
//! - The frequency model with context backoff (`FrequencyModel`)
//! - Generation configuration (`GenerationInput`) and the `Generator`

/// Ordered, duplicate-free symbol set fixed at model construction.
pub mod alphabet;

/// Explicit model configuration: order, alphabet and backoff flag.
pub mod config;

/// Flat n-gram count table.
///
/// Sparse: n-grams never observed are not stored.
pub mod count_table;

/// Frequency model (training, ranked candidates, sampling).
pub mod frequency_model;

/// Generation parameters (target length, start seed).
pub mod generation_input;

/// Text generation loop over a trained model.
pub mod generator;

pub use alphabet::Alphabet;
pub use config::ModelConfig;
pub use count_table::CountTable;
pub use frequency_model::{Candidate, FrequencyModel};
pub use generation_input::{GenerationInput, StartSeed};
pub use generator::Generator;
