//! Glottal pulse marking and the local jitter / shimmer measures built on it.

use crate::audio::pitch::PitchTrack;

const SHORTEST_PERIOD: f64 = 0.0001;
const LONGEST_PERIOD: f64 = 0.02;
const MAX_PERIOD_FACTOR: f64 = 1.3;
const MAX_AMPLITUDE_FACTOR: f64 = 1.6;
/// 搜尋下一個脈衝時允許的週期誤差
const SEARCH_TOLERANCE: f64 = 0.2;

/// Periodic point process: sample indices of glottal pulses, ascending.
///
/// Inside every voiced stretch the first pulse is the waveform maximum around the
/// middle of the stretch. From there the walk goes both ways one local period at a
/// time, snapping to the maximum within ±20 % of the expected position.
pub fn glottal_pulses(samples: &[f64], sample_rate: u32, track: &PitchTrack) -> Vec<usize> {
    let sr = sample_rate as f64;
    let mut pulses = Vec::new();
    if sample_rate == 0 || samples.is_empty() {
        return pulses;
    }

    let last_index = samples.len() - 1;
    let to_index = |t: f64| -> usize { ((t * sr).round().max(0.0) as usize).min(last_index) };

    for (start_t, end_t) in track.voiced_intervals() {
        let (start, end) = (to_index(start_t), to_index(end_t));
        if end <= start {
            continue;
        }

        let mid_t = (start_t + end_t) / 2.0;
        let Some(f0) = track.frequency_at(mid_t) else {
            continue;
        };
        let period = sr / f0;
        let mid = to_index(mid_t);
        let half = (period / 2.0).round() as usize;
        let anchor = argmax(samples, mid.saturating_sub(half).max(start), (mid + half).min(end));

        let mut segment = vec![anchor];

        // 往右
        let mut current = anchor;
        let mut current_period = period;
        loop {
            if let Some(f) = track.frequency_at(current as f64 / sr) {
                current_period = sr / f;
            }
            let expected = current as f64 + current_period;
            let tolerance = SEARCH_TOLERANCE * current_period;
            let lo = (expected - tolerance).ceil() as usize;
            let hi = (expected + tolerance).floor() as usize;
            if hi > end || lo <= current {
                break;
            }
            current = argmax(samples, lo, hi);
            segment.push(current);
        }

        // 往左
        let mut current = anchor;
        let mut current_period = period;
        loop {
            if let Some(f) = track.frequency_at(current as f64 / sr) {
                current_period = sr / f;
            }
            let expected = current as f64 - current_period;
            let tolerance = SEARCH_TOLERANCE * current_period;
            if expected - tolerance < start as f64 {
                break;
            }
            let lo = (expected - tolerance).ceil() as usize;
            let hi = (expected + tolerance).floor() as usize;
            if hi >= current {
                break;
            }
            current = argmax(samples, lo, hi);
            segment.push(current);
        }

        pulses.extend(segment);
    }

    pulses.sort_unstable();
    pulses.dedup();
    pulses
}

/// Index of the largest sample in `[lo, hi]`.
fn argmax(samples: &[f64], lo: usize, hi: usize) -> usize {
    let hi = hi.min(samples.len() - 1);
    let lo = lo.min(hi);
    (lo..=hi).fold(lo, |best, i| if samples[i] > samples[best] { i } else { best })
}

fn is_valid_period(period: f64) -> bool {
    (SHORTEST_PERIOD..=LONGEST_PERIOD).contains(&period)
}

fn ratio(a: f64, b: f64) -> f64 {
    if a > b {
        a / b
    } else {
        b / a
    }
}

/// Pulse-to-pulse periods in seconds.
fn periods(pulses: &[usize], sample_rate: u32) -> Vec<f64> {
    let sr = sample_rate as f64;
    pulses
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 / sr)
        .collect()
}

/// Local jitter: mean absolute difference between consecutive periods divided by the mean period.
///
/// `None` when fewer than two acceptable consecutive periods exist.
pub fn jitter_local(pulses: &[usize], sample_rate: u32) -> Option<f64> {
    if sample_rate == 0 {
        return None;
    }
    let periods = periods(pulses, sample_rate);

    let valid: Vec<f64> = periods.iter().copied().filter(|&p| is_valid_period(p)).collect();
    if valid.len() < 2 {
        return None;
    }
    let mean_period = valid.iter().sum::<f64>() / valid.len() as f64;

    let diffs: Vec<f64> = periods
        .windows(2)
        .filter(|w| is_valid_period(w[0]) && is_valid_period(w[1]))
        .filter(|w| ratio(w[0], w[1]) <= MAX_PERIOD_FACTOR)
        .map(|w| (w[1] - w[0]).abs())
        .collect();
    if diffs.is_empty() || mean_period <= 0.0 {
        return None;
    }

    Some(diffs.iter().sum::<f64>() / diffs.len() as f64 / mean_period)
}

/// Local shimmer: mean absolute difference between the peak amplitudes of
/// consecutive periods divided by the mean amplitude.
pub fn shimmer_local(samples: &[f64], sample_rate: u32, pulses: &[usize]) -> Option<f64> {
    if sample_rate == 0 || pulses.len() < 3 {
        return None;
    }
    let periods = periods(pulses, sample_rate);

    // 每個週期的峰值振幅；不合格的週期記為 None
    let amplitudes: Vec<Option<f64>> = pulses
        .windows(2)
        .zip(periods.iter())
        .map(|(w, &period)| {
            if !is_valid_period(period) {
                return None;
            }
            let peak = samples[w[0]..w[1]].iter().fold(0.0f64, |acc, s| acc.max(s.abs()));
            (peak > 0.0).then_some(peak)
        })
        .collect();

    let valid: Vec<f64> = amplitudes.iter().flatten().copied().collect();
    if valid.len() < 2 {
        return None;
    }
    let mean_amplitude = valid.iter().sum::<f64>() / valid.len() as f64;

    let diffs: Vec<f64> = amplitudes
        .windows(2)
        .zip(periods.windows(2))
        .filter_map(|(a, p)| match (a[0], a[1]) {
            (Some(a0), Some(a1))
                if ratio(p[0], p[1]) <= MAX_PERIOD_FACTOR
                    && ratio(a0, a1) <= MAX_AMPLITUDE_FACTOR =>
            {
                Some((a1 - a0).abs())
            }
            _ => None,
        })
        .collect();
    if diffs.is_empty() || mean_amplitude <= 0.0 {
        return None;
    }

    Some(diffs.iter().sum::<f64>() / diffs.len() as f64 / mean_amplitude)
}
