use crate::audio::fft::FftPipeline;

const AMIN: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

/// Slaney-style mel scale: linear below 1 kHz, logarithmic above.
pub fn hz_to_mel(hz: f64) -> f64 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f64.ln() / 27.0;

    if hz >= min_log_hz {
        min_log_mel + (hz / min_log_hz).ln() / logstep
    } else {
        hz / f_sp
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f64.ln() / 27.0;

    if mel >= min_log_mel {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    } else {
        mel * f_sp
    }
}

/// Triangular mel filters over `[0, sr/2]`, area normalised (`2 / bandwidth`).
pub struct MelFilterbank {
    weights: Vec<Vec<f64>>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let sr = sample_rate as f64;
        let n_bins = n_fft / 2 + 1;
        let fft_freqs: Vec<f64> = (0..n_bins).map(|k| k as f64 * sr / n_fft as f64).collect();

        let mel_min = hz_to_mel(0.0);
        let mel_max = hz_to_mel(sr / 2.0);
        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let weights = (0..n_mels)
            .map(|m| {
                let (lo, center, hi) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let enorm = 2.0 / (hi - lo);
                fft_freqs
                    .iter()
                    .map(|&f| {
                        let lower = (f - lo) / (center - lo);
                        let upper = (hi - f) / (hi - center);
                        lower.min(upper).max(0.0) * enorm
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    pub fn n_mels(&self) -> usize {
        self.weights.len()
    }

    pub fn apply(&self, power_spectrum: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|filter| filter.iter().zip(power_spectrum).map(|(w, p)| w * p).sum())
            .collect()
    }
}

/// Centred STFT (zero padded by `n_fft / 2` on both sides) into power spectra, one per frame.
pub fn stft_power(samples: &[f64], n_fft: usize, hop_length: usize) -> Vec<Vec<f64>> {
    let pad = n_fft / 2;
    let mut padded = vec![0.0; pad];
    padded.extend_from_slice(samples);
    padded.extend(std::iter::repeat(0.0).take(pad));

    if padded.len() < n_fft || hop_length == 0 {
        return Vec::new();
    }

    let n_frames = 1 + (padded.len() - n_fft) / hop_length;
    let mut fft = FftPipeline::new(n_fft);
    (0..n_frames)
        .map(|t| {
            let start = t * hop_length;
            fft.power_spectrum(&padded[start..start + n_fft])
        })
        .collect()
}

/// `10 * log10(max(S, amin))`, floored at `max - 80 dB` over the whole spectrogram.
pub fn power_to_db(spectrogram: &mut [Vec<f64>]) {
    let mut max_db = f64::NEG_INFINITY;
    for frame in spectrogram.iter_mut() {
        for value in frame.iter_mut() {
            *value = 10.0 * value.max(AMIN).log10();
            max_db = max_db.max(*value);
        }
    }

    let floor = max_db - TOP_DB;
    for frame in spectrogram.iter_mut() {
        for value in frame.iter_mut() {
            *value = value.max(floor);
        }
    }
}

/// Mel power spectrogram in dB, `frames x n_mels`.
pub fn mel_db_spectrogram(
    samples: &[f64],
    sample_rate: u32,
    n_fft: usize,
    hop_length: usize,
    n_mels: usize,
) -> Vec<Vec<f64>> {
    let filterbank = MelFilterbank::new(sample_rate, n_fft, n_mels);
    let mut mel: Vec<Vec<f64>> = stft_power(samples, n_fft, hop_length)
        .iter()
        .map(|spectrum| filterbank.apply(spectrum))
        .collect();
    power_to_db(&mut mel);
    mel
}

/// Orthonormal DCT-II, keeping the first `n_out` coefficients.
pub fn dct_ortho(input: &[f64], n_out: usize) -> Vec<f64> {
    let n = input.len() as f64;
    (0..n_out)
        .map(|k| {
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, x)| x * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}

/// Per-coefficient mean of the MFCCs across all frames.
pub fn mfcc_means(mel_db: &[Vec<f64>], n_mfcc: usize) -> Vec<f64> {
    let mut means = vec![0.0; n_mfcc];
    if mel_db.is_empty() {
        return means;
    }

    for frame in mel_db {
        for (acc, c) in means.iter_mut().zip(dct_ortho(frame, n_mfcc)) {
            *acc += c;
        }
    }
    for m in means.iter_mut() {
        *m /= mel_db.len() as f64;
    }
    means
}
