use crate::audio::mfcc::{mel_db_spectrogram, mfcc_means};
use crate::audio::onset::onset_frames;
use crate::audio::perturbation::{glottal_pulses, jitter_local, shimmer_local};
use crate::audio::pitch::track_pitch;
use crate::audio::wav::AudioClip;
use crate::domain::settings::ExtractionSettings;
use crate::utils::error::{PipelineError, Result};

pub const MEAN_PITCH_COLUMN: &str = "mean_pitch_hz";
pub const JITTER_COLUMN: &str = "jitter_local";
pub const SHIMMER_COLUMN: &str = "shimmer_local";
pub const SPEECH_RATE_COLUMN: &str = "speech_rate_onsets_per_sec";

/// Feature columns in CSV order (without `filename`).
pub fn feature_columns(n_mfcc: usize) -> Vec<String> {
    let mut columns = vec![
        MEAN_PITCH_COLUMN.to_string(),
        JITTER_COLUMN.to_string(),
        SHIMMER_COLUMN.to_string(),
        SPEECH_RATE_COLUMN.to_string(),
    ];
    columns.extend((1..=n_mfcc).map(|i| format!("mfcc_{}_mean", i)));
    columns
}

#[derive(Debug, Clone, PartialEq)]
pub struct VocalFeatures {
    pub mean_pitch_hz: f64,
    pub jitter_local: f64,
    pub shimmer_local: f64,
    pub speech_rate_onsets_per_sec: f64,
    pub mfcc_means: Vec<f64>,
}

impl VocalFeatures {
    /// Values in the same order as [`feature_columns`].
    pub fn to_values(&self) -> Vec<f64> {
        let mut values = vec![
            self.mean_pitch_hz,
            self.jitter_local,
            self.shimmer_local,
            self.speech_rate_onsets_per_sec,
        ];
        values.extend_from_slice(&self.mfcc_means);
        values
    }
}

/// Pitch, perturbation, MFCC and speech-rate features for one clip.
///
/// Undefined measures (no voiced frames, too few glottal pulses) are reported as `0.0`.
pub fn extract_vocal_features(clip: &AudioClip, settings: &ExtractionSettings) -> Result<VocalFeatures> {
    if clip.sample_rate == 0 {
        return Err(PipelineError::processing("sample rate is zero"));
    }
    if clip.is_empty() {
        return Err(PipelineError::processing("audio contains no samples"));
    }

    let samples = clip.samples_f64();

    let track = track_pitch(
        &samples,
        clip.sample_rate,
        settings.pitch_floor_hz,
        settings.pitch_ceiling_hz,
    );
    let mean_pitch_hz = track.mean_hz();

    let pulses = glottal_pulses(&samples, clip.sample_rate, &track);
    let jitter = jitter_local(&pulses, clip.sample_rate).unwrap_or(0.0);
    let shimmer = shimmer_local(&samples, clip.sample_rate, &pulses).unwrap_or(0.0);
    tracing::trace!(
        "pitch frames: {} voiced / {}, pulses: {}",
        track.voiced_count(),
        track.frames.len(),
        pulses.len()
    );

    let mel_db = mel_db_spectrogram(
        &samples,
        clip.sample_rate,
        settings.n_fft,
        settings.hop_length,
        settings.n_mels,
    );
    let mfcc_means = mfcc_means(&mel_db, settings.n_mfcc);

    let onsets = onset_frames(&mel_db, clip.sample_rate, settings.n_fft, settings.hop_length);
    let duration = clip.duration_seconds();
    let speech_rate = if duration > 0.0 {
        onsets.len() as f64 / duration
    } else {
        0.0
    };

    Ok(VocalFeatures {
        mean_pitch_hz,
        jitter_local: jitter,
        shimmer_local: shimmer,
        speech_rate_onsets_per_sec: speech_rate,
        mfcc_means,
    })
}
