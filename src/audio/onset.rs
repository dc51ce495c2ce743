/// Spectral-flux onset strength from a mel dB spectrogram (`frames x n_mels`).
///
/// Frame `t` holds the mean positive change of every band from frame `t - 1`. The
/// envelope is left padded so it lines up with centred STFT frames, then trimmed
/// back to the frame count.
pub fn onset_strength(mel_db: &[Vec<f64>], n_fft: usize, hop_length: usize) -> Vec<f64> {
    let n_frames = mel_db.len();
    if n_frames == 0 {
        return Vec::new();
    }

    let pad = 1 + n_fft / (2 * hop_length.max(1));
    let mut envelope = vec![0.0; pad];
    envelope.extend(mel_db.windows(2).map(|w| {
        let bands = w[1].len().max(1) as f64;
        w[1].iter()
            .zip(w[0].iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum::<f64>()
            / bands
    }));
    envelope.truncate(n_frames);
    envelope
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPickParams {
    pub pre_max: usize,
    pub post_max: usize,
    pub pre_avg: usize,
    pub post_avg: usize,
    pub wait: usize,
    pub delta: f64,
}

impl PeakPickParams {
    /// Window sizes expressed in frames for the given rate and hop.
    pub fn for_rate(sample_rate: u32, hop_length: usize) -> Self {
        let frames = |seconds: f64| (seconds * sample_rate as f64 / hop_length.max(1) as f64).floor() as usize;
        Self {
            pre_max: frames(0.03),
            post_max: frames(0.0) + 1,
            pre_avg: frames(0.10),
            post_avg: frames(0.10) + 1,
            wait: frames(0.03),
            delta: 0.07,
        }
    }
}

/// Frame indices where `envelope` is a local maximum that clears the local mean by
/// `delta`, with at least `wait` frames between picks.
pub fn peak_pick(envelope: &[f64], params: &PeakPickParams) -> Vec<usize> {
    let n = envelope.len();
    let mut peaks: Vec<usize> = Vec::new();

    for i in 0..n {
        let x = envelope[i];
        if x <= 0.0 {
            continue;
        }

        let max_lo = i.saturating_sub(params.pre_max);
        let max_hi = (i + params.post_max).min(n);
        let local_max = envelope[max_lo..max_hi].iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        if x < local_max {
            continue;
        }

        let avg_lo = i.saturating_sub(params.pre_avg);
        let avg_hi = (i + params.post_avg).min(n);
        let window = &envelope[avg_lo..avg_hi];
        let local_avg = window.iter().sum::<f64>() / window.len() as f64;
        if x < local_avg + params.delta {
            continue;
        }

        if peaks.last().map_or(true, |&last| i > last + params.wait) {
            peaks.push(i);
        }
    }

    peaks
}

/// Onset frames: the strength envelope normalised to `[0, 1]`, then peak picked.
pub fn onset_frames(mel_db: &[Vec<f64>], sample_rate: u32, n_fft: usize, hop_length: usize) -> Vec<usize> {
    let mut envelope = onset_strength(mel_db, n_fft, hop_length);
    if envelope.is_empty() {
        return Vec::new();
    }

    let min = envelope.iter().copied().fold(f64::INFINITY, f64::min);
    for v in envelope.iter_mut() {
        *v -= min;
    }
    let max = envelope.iter().copied().fold(0.0, f64::max);
    for v in envelope.iter_mut() {
        *v /= max + f64::MIN_POSITIVE;
    }

    if !envelope.iter().any(|&v| v > 0.0) || !envelope.iter().all(|v| v.is_finite()) {
        return Vec::new();
    }

    peak_pick(&envelope, &PeakPickParams::for_rate(sample_rate, hop_length))
}
