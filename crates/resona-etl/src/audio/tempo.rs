//! Onset-energy tempo estimation.
//!
//! Good enough for catalog metadata: frame the signal, take the
//! half-wave rectified energy difference as an onset envelope, and pick
//! the autocorrelation lag with the strongest periodicity inside the
//! plausible BPM range. Smaller lags win ties, which prefers the base
//! period over its multiples.

const FRAME_LEN: usize = 1024;
const HOP_LEN: usize = 512;
const MIN_BPM: f64 = 40.0;
const MAX_BPM: f64 = 220.0;

/// Estimate tempo in beats per minute.
///
/// Returns `None` when the signal is too short or shows no stable
/// periodicity (silence, for instance).
#[must_use]
pub fn estimate_bpm(samples: &[f32], sample_rate: u32) -> Option<f64> {
    if sample_rate == 0 || samples.len() < FRAME_LEN * 8 {
        return None;
    }

    let mut energies = Vec::with_capacity(samples.len() / HOP_LEN);
    let mut start = 0;
    while start + FRAME_LEN <= samples.len() {
        let frame = &samples[start..start + FRAME_LEN];
        let energy: f64 = frame.iter().map(|s| f64::from(*s) * f64::from(*s)).sum();
        energies.push(energy);
        start += HOP_LEN;
    }

    // Half-wave rectified energy flux, mean-removed so the
    // autocorrelation responds to onsets rather than loudness.
    let mut envelope = Vec::with_capacity(energies.len());
    envelope.push(0.0);
    for pair in energies.windows(2) {
        envelope.push((pair[1] - pair[0]).max(0.0));
    }
    let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
    for value in &mut envelope {
        *value -= mean;
    }

    let frame_rate = f64::from(sample_rate) / HOP_LEN as f64;
    #[allow(clippy::cast_sign_loss)]
    let lag_min = ((frame_rate * 60.0 / MAX_BPM).ceil() as usize).max(1);
    #[allow(clippy::cast_sign_loss)]
    let lag_max = ((frame_rate * 60.0 / MIN_BPM).floor() as usize).min(envelope.len() / 2);
    if lag_min >= lag_max {
        return None;
    }

    let mut best_lag = 0;
    let mut best_score = 0.0;
    for lag in lag_min..=lag_max {
        let score: f64 = envelope
            .iter()
            .zip(envelope.iter().skip(lag))
            .map(|(a, b)| a * b)
            .sum();
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_score <= f64::EPSILON {
        return None;
    }
    Some(frame_rate * 60.0 / best_lag as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A click track: short bursts at a fixed beat interval.
    fn click_track(sample_rate: u32, bpm: f64, seconds: f64) -> Vec<f32> {
        let total = (f64::from(sample_rate) * seconds) as usize;
        let beat_interval = (f64::from(sample_rate) * 60.0 / bpm) as usize;
        let mut samples = vec![0.0f32; total];
        let mut pos = 0;
        while pos < total {
            for offset in 0..256.min(total - pos) {
                samples[pos + offset] = 1.0;
            }
            pos += beat_interval;
        }
        samples
    }

    #[test]
    fn test_click_track_at_120_bpm() {
        // 10240 Hz / 512-sample hop puts a 120 BPM beat at exactly 10
        // envelope frames, so the estimate lands on the nose.
        let samples = click_track(10240, 120.0, 20.0);
        let bpm = estimate_bpm(&samples, 10240).unwrap();
        assert!((bpm - 120.0).abs() < 2.0, "estimated {bpm}");
    }

    #[test]
    fn test_click_track_at_80_bpm() {
        let samples = click_track(10240, 80.0, 20.0);
        let bpm = estimate_bpm(&samples, 10240).unwrap();
        assert!((bpm - 80.0).abs() < 5.0, "estimated {bpm}");
    }

    #[test]
    fn test_silence_has_no_tempo() {
        let samples = vec![0.0f32; 10240 * 10];
        assert!(estimate_bpm(&samples, 10240).is_none());
    }

    #[test]
    fn test_short_input_has_no_tempo() {
        let samples = vec![1.0f32; FRAME_LEN];
        assert!(estimate_bpm(&samples, 10240).is_none());
    }
}
