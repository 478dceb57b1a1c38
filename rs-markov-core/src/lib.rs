//! Character-level Markov text model with context backoff.
//!
//! This crate provides:
//! - A frequency model over a fixed alphabet, with optional fallback to
//!   shorter contexts for unseen continuations
//! - A reversible rank-sequence codec (text <-> small integers) and a
//!   Huffman packing of rank sequences
//! - Binary persistence of trained models
//! - Chi-square tests of how much the next symbol depends on its context
//! - Corpus loading helpers and a text generator

/// Error type and result alias.
pub mod error;

/// Frequency model, configuration and text generation.
pub mod model;

/// Rank-sequence codec and entropy packing.
pub mod codec;

/// Save / load of trained models.
pub mod persistence;

/// Chi-square tests of symbol dependence.
pub mod statistics;

/// Training corpus sources and cleanup.
pub mod corpus;

/// I/O utilities (file loading, path helpers).
pub mod io;

pub use error::{MarkovError, Result};
pub use model::{Alphabet, Candidate, FrequencyModel, GenerationInput, Generator, ModelConfig, StartSeed};
