//! Band-selective spectral editing.

pub mod bands;
pub mod jitter;
pub mod passes;

pub use bands::{AttenuationBand, FINGERPRINT_BANDS};
pub use passes::{aggressive_pass, conservative_pass};
