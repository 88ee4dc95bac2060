//! Bidirectional mapping between the preprocessed (expanded) token
//! stream and the raw (spelled) token streams of the files it came
//! from.
//!
//! [`TokenCollector`] observes one preprocessing pass live and captures
//! the expanded stream plus the source spans of top-level macro
//! expansions. Consuming it re-lexes every contributing file and
//! reconstructs a [`TokenBuffer`]: per file, the spelled tokens and a
//! sorted list of [`Mapping`] records for the stretches where the two
//! streams diverge. Everything not covered by a record maps 1:1.
//!
//! The buffer is immutable once built; all queries are read-only.

mod buffer;
mod builder;
mod collector;
mod token;

pub use buffer::{Expansion, Mapping, TokenBuffer};
pub use collector::{PpEventSink, TokenCollector};
pub use token::{tokenize, Token};
