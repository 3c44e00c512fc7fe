#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` is the public surface of the delta-sync core. It wires the
//! signature builder, the matcher, and the wire codecs into the three
//! operations collaborators call: generate a signature over a basis,
//! generate a delta against a signature, and apply or receive a delta to
//! reconstruct the new file.
//!
//! # Design
//!
//! - [`SyncEngine`] holds the immutable per-session configuration
//!   ([`EngineConfig`], usually derived from a
//!   [`protocol::negotiation::NegotiatedSession`]) and exposes in-memory
//!   and streaming entry points for both roles.
//! - [`wire`] carries the sum-header exchange, token-stream sending, and
//!   the receiver-side reconstructor with whole-file digest verification.
//! - [`EngineError`] is the error taxonomy every operation funnels into;
//!   each kind maps to a numeric [`ExitCode`] for wrapping programs.
//!
//! File walking, metadata application, and transports are collaborators:
//! the engine consumes and produces bytes only.
//!
//! # Examples
//!
//! ```
//! use engine::{EngineConfig, SyncEngine};
//!
//! let engine = SyncEngine::new(EngineConfig::default()).unwrap();
//! let basis = b"the quick brown fox jumps over the lazy dog".repeat(100);
//! let mut input = basis.clone();
//! input.extend_from_slice(b"and some appended data");
//!
//! let signature = engine.generate_signature(&basis).unwrap();
//! let delta = engine.generate_delta(&signature, &input).unwrap();
//! let output = engine.apply_delta(&basis, &signature, &delta).unwrap();
//! assert_eq!(output, input);
//! ```

mod config;
mod engine;
mod error;
mod exit_code;
mod stats;
pub mod wire;

pub use config::{EngineConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_IN_MEMORY_FILE};
pub use engine::SyncEngine;
pub use error::EngineError;
pub use exit_code::ExitCode;
pub use stats::{format_size, TransferStats};
