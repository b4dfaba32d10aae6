//! Advisory analysis. Nothing in here returns an error to the caller:
//! failures become neutral defaults so analysis never blocks a workflow.

pub mod features;
pub mod fingerprint;

use std::path::Path;

use crate::audio::Decoder;
pub use features::{extract_features_from, FeatureVector};
pub use fingerprint::{detect_fingerprint_from, FingerprintScore};

/// Decode the head of `path` and extract its features.
pub fn extract_features(decoder: &dyn Decoder, path: &Path) -> FeatureVector {
    match decoder.decode_limited(path, Some(features::MAX_ANALYSIS_SECS)) {
        Ok(signal) => extract_features_from(&signal),
        Err(err) => {
            log::warn!("Cannot analyze {}: {}", path.display(), err);
            FeatureVector::default()
        }
    }
}

/// Decode the head of `path` and score it.
pub fn detect_fingerprint(decoder: &dyn Decoder, path: &Path) -> FingerprintScore {
    match decoder.decode_limited(path, Some(features::MAX_ANALYSIS_SECS)) {
        Ok(signal) => detect_fingerprint_from(&signal),
        Err(err) => {
            log::warn!("Cannot score {}: {}", path.display(), err);
            FingerprintScore::default()
        }
    }
}
