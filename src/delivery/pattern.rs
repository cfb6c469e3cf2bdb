use std::f32::consts::TAU;
use std::time::Duration;

/// Envelope and pitch of the synthesized alert tone.
///
/// Gain ramps linearly from silence to `peak_gain` over `attack`, back to
/// silence by `decay_end`, and stays silent until `duration` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TonePattern {
    pub frequency_hz: f32,
    pub peak_gain: f32,
    pub attack: Duration,
    pub decay_end: Duration,
    pub duration: Duration,
}

impl TonePattern {
    pub const ALERT: TonePattern = TonePattern {
        frequency_hz: 880.0,
        peak_gain: 0.5,
        attack: Duration::from_millis(100),
        decay_end: Duration::from_millis(500),
        duration: Duration::from_secs(2),
    };

    pub fn gain_at(&self, elapsed: Duration) -> f32 {
        if elapsed < self.attack {
            return self.peak_gain * ratio(elapsed, self.attack);
        }
        if elapsed < self.decay_end {
            let decay = self.decay_end - self.attack;
            return self.peak_gain * (1.0 - ratio(elapsed - self.attack, decay));
        }
        0.0
    }

    /// Amplitude of the tone `elapsed` after it started.
    pub fn sample_at(&self, elapsed: Duration) -> f32 {
        if elapsed >= self.duration {
            return 0.0;
        }
        let phase = TAU * self.frequency_hz * elapsed.as_secs_f32();
        self.gain_at(elapsed) * phase.sin()
    }

    pub fn total_samples(&self, sample_rate: u32) -> u64 {
        (self.duration.as_secs_f64() * f64::from(sample_rate)).round() as u64
    }
}

impl Default for TonePattern {
    fn default() -> Self {
        Self::ALERT
    }
}

fn ratio(part: Duration, whole: Duration) -> f32 {
    if whole.is_zero() {
        return 1.0;
    }
    (part.as_secs_f32() / whole.as_secs_f32()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn envelope_rises_then_falls_to_silence() {
        let tone = TonePattern::ALERT;

        assert!(tone.gain_at(ms(0)).abs() < EPSILON);
        assert!((tone.gain_at(ms(50)) - 0.25).abs() < EPSILON);
        assert!((tone.gain_at(ms(100)) - 0.5).abs() < EPSILON);
        assert!((tone.gain_at(ms(300)) - 0.25).abs() < EPSILON);
        assert!(tone.gain_at(ms(500)).abs() < EPSILON);
        assert!(tone.gain_at(ms(1500)).abs() < EPSILON);
    }

    #[test]
    fn samples_stay_within_peak_gain() {
        let tone = TonePattern::ALERT;

        let loudest = (0..2000)
            .map(|millis| tone.sample_at(ms(millis)).abs())
            .fold(0.0f32, f32::max);

        assert!(loudest <= tone.peak_gain + EPSILON);
        assert!(loudest > 0.4, "The tone should be audible near its peak.");
    }

    #[test]
    fn nothing_is_produced_after_the_pattern_ends() {
        assert_eq!(TonePattern::ALERT.sample_at(ms(2000)), 0.0);
        assert_eq!(TonePattern::ALERT.sample_at(ms(2500)), 0.0);
    }

    #[test]
    fn sample_count_covers_two_seconds() {
        assert_eq!(TonePattern::ALERT.total_samples(44_100), 88_200);
    }
}
