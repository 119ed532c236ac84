//! Daily population census.
//!
//! One [`PopulationSample`] is emitted per whole simulated day. A day that
//! passes without any event repeats the last observed counts.

use symbiosis_types::PopulationSample;

/// Tracks which day is due next and the counts last written.
#[derive(Debug, Clone)]
pub struct Census {
    current_day: u64,
    previous: PopulationSample,
}

/// Whole day containing `time`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn day_of(time: f64) -> u64 {
    if time <= 0.0 { 0 } else { time.floor() as u64 }
}

impl Census {
    /// Start the census with the day-zero counts, returning the day-zero
    /// sample.
    pub fn start(total: u32, per_clade: Vec<u32>) -> (Self, PopulationSample) {
        let sample = PopulationSample {
            day: 0,
            total,
            per_clade,
        };
        let census = Self {
            current_day: 1,
            previous: sample.clone(),
        };
        (census, sample)
    }

    /// Next day to be written.
    pub const fn current_day(&self) -> u64 {
        self.current_day
    }

    /// Catch up to `time` given the counts observed at `time`.
    ///
    /// Days strictly before `time`'s day repeat the previous counts; if
    /// `time` falls on the due day, that day gets the current counts.
    pub fn observe(&mut self, time: f64, total: u32, per_clade: &[u32]) -> Vec<PopulationSample> {
        let day = day_of(time);
        let mut samples = Vec::new();
        while self.current_day < day {
            samples.push(PopulationSample {
                day: self.current_day,
                ..self.previous.clone()
            });
            self.current_day = self.current_day.saturating_add(1);
        }
        if day == self.current_day {
            let sample = PopulationSample {
                day,
                total,
                per_clade: per_clade.to_vec(),
            };
            self.previous = sample.clone();
            samples.push(sample);
            self.current_day = self.current_day.saturating_add(1);
        }
        samples
    }
}
