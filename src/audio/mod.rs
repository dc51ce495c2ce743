//! Acoustic analysis: WAV decoding and the per-clip vocal features.

pub mod features;
pub mod fft;
pub mod mfcc;
pub mod onset;
pub mod perturbation;
pub mod pitch;
pub mod wav;

pub use features::{extract_vocal_features, feature_columns, VocalFeatures};
pub use wav::{decode_wav, AudioClip};
