//! Historical timestamps: recency-biased day selection, seasonal intensity, regional business
//! hours, and index-driven boundary dates.

pub mod calendar;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::config::TemporalConfig;
use crate::sampling::PhaseRng;

#[derive(Clone, Debug)]
pub struct TemporalEngine {
    current_date: NaiveDate,
    window_start: NaiveDate,
    reference_now: DateTime<Utc>,
    edge_dates: Vec<NaiveDate>,
    peak_intensity: f64,
    config: TemporalConfig,
}

impl TemporalEngine {
    pub fn new(current_date: NaiveDate, config: &TemporalConfig) -> Self {
        let window_start = current_date - Duration::days(config.history_days);
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let reference_now = current_date.and_time(end_of_day).and_utc();
        let peak_intensity = config
            .seasonal_spikes
            .iter()
            .map(|spike| spike.multiplier)
            .fold(1.0_f64, f64::max);

        Self {
            current_date,
            window_start,
            reference_now,
            edge_dates: calendar::edge_dates_between(window_start, current_date),
            peak_intensity,
            config: config.clone(),
        }
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn window_start(&self) -> NaiveDate {
        self.window_start
    }

    /// Earliest instant any generated timestamp may carry.
    pub fn window_floor(&self) -> DateTime<Utc> {
        self.window_start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Latest instant any generated timestamp may carry.
    pub fn reference_now(&self) -> DateTime<Utc> {
        self.reference_now
    }

    pub fn edge_dates(&self) -> &[NaiveDate] {
        &self.edge_dates
    }

    /// Relative intake volume on `date`: weekend damping times any active seasonal spike.
    pub fn intensity(&self, date: NaiveDate) -> f64 {
        let days_ago = (self.current_date - date).num_days();
        let weekday_factor =
            if calendar::is_weekend(date) { self.config.weekend_intensity } else { 1.0 };
        let seasonal = self
            .config
            .seasonal_spikes
            .iter()
            .filter(|spike| days_ago <= spike.start_days_ago && days_ago >= spike.end_days_ago)
            .map(|spike| spike.multiplier)
            .fold(1.0_f64, f64::max);
        weekday_factor * seasonal
    }

    /// Day inside the history window, skewed toward the present by `recency_bias` and
    /// reshaped by [`Self::intensity`] through bounded rejection sampling.
    pub fn sample_historical_date(&self, rng: &mut PhaseRng, recency_bias: f64) -> NaiveDate {
        let exponent = 1.0 + 2.0 * recency_bias.clamp(0.0, 1.0);
        let window = self.config.history_days as f64;
        let mut candidate = self.current_date;

        for _ in 0..self.config.rejection_attempts {
            let days_ago = (window * rng.unit().powf(exponent)).floor() as i64;
            candidate = self.current_date - Duration::days(days_ago.min(self.config.history_days));
            let acceptance = self.intensity(candidate) / self.peak_intensity;
            if rng.unit() < acceptance {
                break;
            }
        }

        candidate
    }

    /// Edge date pinned to generation slot `index`, if any.
    pub fn boundary_date_for(&self, index: usize) -> Option<NaiveDate> {
        let stride = self.config.boundary_stride.max(1);
        if index % stride != self.config.boundary_offset {
            return None;
        }
        self.edge_dates.get(index / stride).copied()
    }

    /// Historical date for generation slot `index`. The sampler always runs so the stream
    /// position does not depend on whether the slot is pinned to an edge date.
    pub fn historical_date_for(&self, rng: &mut PhaseRng, index: usize) -> NaiveDate {
        let sampled = self.sample_historical_date(rng, self.config.recency_bias);
        self.boundary_date_for(index).unwrap_or(sampled)
    }

    /// Uniform local clock time inside the configured business window.
    pub fn business_time(&self, rng: &mut PhaseRng) -> NaiveTime {
        let start = i64::from(self.config.business_start_hour) * 60;
        let end = i64::from(self.config.business_end_hour) * 60 - 1;
        let minute = rng.range_inclusive(start, end.max(start));
        let seconds = u32::try_from(minute * 60).unwrap_or(0);
        NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Converts a local business-hours time at a location into UTC. The UTC day can differ
    /// from the local day; results later than [`Self::reference_now`] move back whole days
    /// and nothing lands before [`Self::window_floor`].
    pub fn adjust_for_region(
        &self,
        date: NaiveDate,
        local_time: NaiveTime,
        utc_offset_minutes: i32,
    ) -> DateTime<Utc> {
        let local = NaiveDateTime::new(date, local_time);
        let mut utc = (local - Duration::minutes(i64::from(utc_offset_minutes))).and_utc();
        while utc > self.reference_now {
            utc -= Duration::days(1);
        }
        utc.max(self.window_floor())
    }

    pub fn clamp_to_now(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        timestamp.min(self.reference_now)
    }
}
