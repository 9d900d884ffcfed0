use std::f64::consts::PI;
use std::time::Duration;

use crate::models::error::{BridgeError, BridgeResult};

/// Frequency of the diagnostic test tone.
pub const TEST_TONE_FREQUENCY_HZ: f64 = 440.0;

/// Length of the diagnostic test tone.
pub const TEST_TONE_DURATION: Duration = Duration::from_secs(2);

/// Peak amplitude of synthesized tones.
pub const TONE_AMPLITUDE: f64 = i16::MAX as f64;

/// Synthesize a sine wave as PCM16 at `sample_rate_hz`.
///
/// Produces `sample_rate_hz * duration` samples starting at phase zero, so
/// the first sample is always `0` and no sample exceeds `±32767`.
pub fn sine_wave(sample_rate_hz: u32, frequency_hz: f64, duration: Duration) -> BridgeResult<Vec<i16>> {
    if sample_rate_hz == 0 {
        return Err(BridgeError::ToneGeneration("sample rate is zero".into()));
    }
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(BridgeError::ToneGeneration(format!("invalid frequency {}", frequency_hz)));
    }
    if frequency_hz * 2.0 > sample_rate_hz as f64 {
        return Err(BridgeError::ToneGeneration(format!(
            "{}Hz is above the Nyquist limit of {}Hz",
            frequency_hz, sample_rate_hz
        )));
    }

    let count = sample_rate_hz as f64 * duration.as_secs_f64();
    if count > usize::MAX as f64 / 2.0 {
        return Err(BridgeError::ToneGeneration("tone too long".into()));
    }
    let count = count.round() as usize;

    let rate = sample_rate_hz as f64;
    let samples = (0..count)
        .map(|i| {
            let t = i as f64 / rate;
            ((2.0 * PI * frequency_hz * t).sin() * TONE_AMPLITUDE) as i16
        })
        .collect();
    Ok(samples)
}

/// The 2 s, 440 Hz diagnostic tone.
pub fn test_tone(sample_rate_hz: u32) -> BridgeResult<Vec<i16>> {
    sine_wave(sample_rate_hz, TEST_TONE_FREQUENCY_HZ, TEST_TONE_DURATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_length_is_two_seconds() {
        for rate in [8_000u32, 16_000, 24_000, 44_100, 48_000] {
            let tone = test_tone(rate).unwrap();
            assert_eq!(tone.len(), rate as usize * 2);
        }
    }

    #[test]
    fn test_tone_starts_at_zero_and_stays_in_range() {
        let tone = test_tone(48_000).unwrap();
        assert_eq!(tone[0], 0);
        let peak = tone.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(peak <= 32_767);
        // A full-scale sine should come close to the ceiling.
        assert!(peak > 32_000);
    }

    #[test]
    fn quarter_period_hits_peak() {
        // 440 Hz at 1760 Hz sample rate: sample 1 is a quarter period.
        let tone = sine_wave(1_760, 440.0, Duration::from_millis(10)).unwrap();
        approx::assert_abs_diff_eq!(tone[1] as f64, 32_767.0, epsilon = 1.0);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(test_tone(0), Err(BridgeError::ToneGeneration(_))));
        assert!(matches!(
            sine_wave(8_000, 5_000.0, Duration::from_secs(1)),
            Err(BridgeError::ToneGeneration(_))
        ));
        assert!(matches!(
            sine_wave(8_000, f64::NAN, Duration::from_secs(1)),
            Err(BridgeError::ToneGeneration(_))
        ));
    }
}
