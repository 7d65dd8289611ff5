//! Audio decoding and tempo analysis.

pub mod decoder;
pub mod tempo;

pub use decoder::{decode_audio, DecodedAudio};
pub use tempo::estimate_bpm;
