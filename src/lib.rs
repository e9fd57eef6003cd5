//! `podteaser` — a small, focused engine for cutting teaser clips out of
//! long-form podcast audio.
//!
//! This crate provides:
//! - Acoustic feature extraction (energy, spectral flux, speech density)
//! - Marker and transcript-cue resolution into a typed annotation timeline
//! - Interest scoring, greedy segment selection and crossfaded assembly
//! - A parallel batch runner with an optional cross-episode summary reel
//!
//! The library is designed to be used by both CLI tools and batch jobs, with
//! an emphasis on determinism, per-track failure isolation, and minimal
//! surprises.

// High-level API (most consumers should start here).
pub mod config;
pub mod pipeline;

// Per-track analysis stages.
pub mod features;
pub mod markers;
pub mod scoring;
pub mod selector;

// Rendering and cross-track combination.
pub mod assembler;
pub mod summary;

// Collaborator seams: decoding, transcription, WAV output, plot data.
pub mod decoder;
pub mod diagnostics;
pub mod transcript;
pub mod wav;

// Shared value types and error taxonomy.
pub mod error;
pub mod track;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use error::{Error, Result};
