use crate::audio::fft::{symmetric_hann, Autocorrelator};

const PERIODS_PER_WINDOW: f64 = 3.0;
const VOICING_THRESHOLD: f64 = 0.45;
const SILENCE_THRESHOLD: f64 = 0.03;
const OCTAVE_COST: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    /// 視窗中心時間 (秒)
    pub time: f64,
    /// `None` 表示無聲 (unvoiced)
    pub frequency: Option<f64>,
    pub strength: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchTrack {
    pub time_step: f64,
    pub frames: Vec<PitchFrame>,
}

impl PitchTrack {
    /// Mean F0 over voiced frames; `0.0` when nothing is voiced.
    pub fn mean_hz(&self) -> f64 {
        let voiced: Vec<f64> = self.frames.iter().filter_map(|f| f.frequency).collect();
        if voiced.is_empty() {
            return 0.0;
        }
        voiced.iter().sum::<f64>() / voiced.len() as f64
    }

    pub fn voiced_count(&self) -> usize {
        self.frames.iter().filter(|f| f.frequency.is_some()).count()
    }

    /// F0 of the frame nearest to `time`, if that frame is voiced.
    pub fn frequency_at(&self, time: f64) -> Option<f64> {
        let first = self.frames.first()?;
        let idx = ((time - first.time) / self.time_step).round();
        let idx = if idx < 0.0 { 0 } else { idx as usize };
        self.frames
            .get(idx.min(self.frames.len() - 1))
            .and_then(|f| f.frequency)
    }

    /// Voiced stretches as `(start_time, end_time)` in seconds.
    pub fn voiced_intervals(&self) -> Vec<(f64, f64)> {
        let half = self.time_step / 2.0;
        let mut intervals = Vec::new();
        let mut current: Option<(f64, f64)> = None;

        for frame in &self.frames {
            match (frame.frequency.is_some(), current.as_mut()) {
                (true, Some(interval)) => interval.1 = frame.time + half,
                (true, None) => current = Some((frame.time - half, frame.time + half)),
                (false, Some(_)) => intervals.extend(current.take()),
                (false, None) => {}
            }
        }
        intervals.extend(current);
        intervals
    }
}

/// Autocorrelation pitch tracker.
///
/// Frames are `3 / floor` seconds long, Hann windowed, and spaced `0.75 / floor`
/// apart. Each frame's autocorrelation is divided by the window's own
/// autocorrelation before the best peak in `[1/ceiling, 1/floor]` is picked and
/// refined with a parabola. Frames quieter than 3 % of the global peak, or with
/// a best peak below 0.45, are unvoiced.
pub fn track_pitch(samples: &[f64], sample_rate: u32, floor_hz: f64, ceiling_hz: f64) -> PitchTrack {
    let sr = sample_rate as f64;
    let time_step = 0.75 / floor_hz;
    let window_len = ((PERIODS_PER_WINDOW / floor_hz) * sr).round() as usize;
    let hop = ((time_step * sr).round() as usize).max(1);

    let mut track = PitchTrack {
        time_step,
        frames: Vec::new(),
    };
    if sample_rate == 0 || window_len < 4 || samples.len() < window_len {
        return track;
    }

    let global_peak = samples.iter().fold(0.0f64, |acc, s| acc.max(s.abs()));

    let window = symmetric_hann(window_len);
    let mut autocorrelator = Autocorrelator::new(window_len);
    let window_ac = autocorrelator.autocorrelate(&window);

    let min_lag = ((sr / ceiling_hz).floor() as usize).max(2);
    let max_lag = ((sr / floor_hz).ceil() as usize).min(window_len - 2);

    let mut buf = vec![0.0; window_len];
    let mut start = 0;
    while start + window_len <= samples.len() {
        let frame = &samples[start..start + window_len];
        let time = (start as f64 + window_len as f64 / 2.0) / sr;

        let mean = frame.iter().sum::<f64>() / window_len as f64;
        let local_peak = frame.iter().fold(0.0f64, |acc, s| acc.max((s - mean).abs()));

        let mut best: Option<(f64, f64)> = None;
        if global_peak > 0.0 && local_peak >= SILENCE_THRESHOLD * global_peak && min_lag < max_lag {
            for (slot, (s, w)) in buf.iter_mut().zip(frame.iter().zip(window.iter())) {
                *slot = (s - mean) * w;
            }
            let r = autocorrelator.autocorrelate(&buf);
            best = best_candidate(&r, &window_ac, min_lag, max_lag, sr, floor_hz);
        }

        let (frequency, strength) = match best {
            Some((freq, strength))
                if strength >= VOICING_THRESHOLD && freq >= floor_hz && freq <= ceiling_hz =>
            {
                (Some(freq), strength)
            }
            Some((_, strength)) => (None, strength),
            None => (None, 0.0),
        };

        track.frames.push(PitchFrame {
            time,
            frequency,
            strength,
        });
        start += hop;
    }

    track
}

/// Best `(frequency, strength)` among the local maxima of the normalised autocorrelation.
fn best_candidate(
    r: &[f64],
    window_ac: &[f64],
    min_lag: usize,
    max_lag: usize,
    sr: f64,
    floor_hz: f64,
) -> Option<(f64, f64)> {
    if r[0] <= 0.0 || window_ac[0] <= 0.0 {
        return None;
    }

    let normalised = |k: usize| -> f64 {
        let w = window_ac[k] / window_ac[0];
        if w <= 1e-6 {
            return 0.0;
        }
        (r[k] / r[0]) / w
    };

    let mut best: Option<(f64, f64, f64)> = None;
    for k in min_lag..=max_lag {
        let (y0, y1, y2) = (normalised(k - 1), normalised(k), normalised(k + 1));
        if !(y1 > y0 && y1 >= y2) {
            continue;
        }

        let denom = y0 - 2.0 * y1 + y2;
        let offset = if denom.abs() > 1e-12 {
            (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        let lag = k as f64 + offset;
        let strength = y1 - 0.25 * (y0 - y2) * offset;

        // 偏好較短週期，避免選到倍週期
        let score = strength - OCTAVE_COST * (floor_hz * lag / sr).log2();
        if best.map_or(true, |(_, _, s)| score > s) {
            best = Some((sr / lag, strength, score));
        }
    }

    best.map(|(freq, strength, _)| (freq, strength))
}
