//! Folding a 3-hourly forecast feed into per-day summaries.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// At most this many future days are summarized
pub const MAX_FORECAST_DAYS: usize = 4;

/// Samples shown in the 3-hour panel (24 hours)
pub const THREE_HOUR_SAMPLES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Condition {
    pub description: String,
    pub icon_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_kmh: f64,
    pub gust_kmh: Option<f64>,
    /// Degrees, 0/360 is North
    pub direction_deg: f64,
}

/// One timestamped forecast point from the upstream feed.
///
/// The timestamp carries the feed's own UTC offset, which decides what
/// calendar day the sample belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp: DateTime<FixedOffset>,
    pub temperature_c: f64,
    pub condition: Condition,
    pub wind: Wind,
}

impl RawSample {
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastEntry {
    pub date: NaiveDate,
    pub representative_timestamp: DateTime<FixedOffset>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub condition: Condition,
    pub wind_speed_max: f64,
    pub wind_gust_max: Option<f64>,
    pub wind_direction_at_max_speed: f64,
}

impl DailyForecastEntry {
    fn start(sample: &RawSample) -> Self {
        Self {
            date: sample.day(),
            representative_timestamp: sample.timestamp,
            temp_min: sample.temperature_c,
            temp_max: sample.temperature_c,
            condition: sample.condition.clone(),
            wind_speed_max: sample.wind.speed_kmh,
            wind_gust_max: sample.wind.gust_kmh,
            wind_direction_at_max_speed: sample.wind.direction_deg,
        }
    }

    fn fold(&mut self, sample: &RawSample) {
        self.temp_min = self.temp_min.min(sample.temperature_c);
        self.temp_max = self.temp_max.max(sample.temperature_c);

        match (sample.wind.gust_kmh, self.wind_gust_max) {
            (Some(gust), Some(max)) if gust <= max => {}
            (Some(gust), _) => self.wind_gust_max = Some(gust),
            (None, _) => {}
        }
        // Strictly greater: on ties the first direction seen stays.
        if sample.wind.speed_kmh > self.wind_speed_max {
            self.wind_speed_max = sample.wind.speed_kmh;
            self.wind_direction_at_max_speed = sample.wind.direction_deg;
        }
    }
}

/// Collapses `samples` into one entry per calendar day strictly after
/// `reference`, in order of first appearance, keeping at most
/// [`MAX_FORECAST_DAYS`] days.
pub fn aggregate(
    samples: &[RawSample],
    reference: NaiveDate,
) -> Result<Vec<DailyForecastEntry>, CoreError> {
    if samples.is_empty() {
        return Err(CoreError::malformed_feed("forecast contains no samples"));
    }

    let mut days: Vec<DailyForecastEntry> = Vec::with_capacity(MAX_FORECAST_DAYS);
    for sample in samples.iter().filter(|s| s.day() > reference) {
        let day = sample.day();
        match days.iter().position(|entry| entry.date == day) {
            Some(i) => days[i].fold(sample),
            None if days.len() < MAX_FORECAST_DAYS => {
                days.push(DailyForecastEntry::start(sample))
            }
            None => {}
        }
    }

    tracing::debug!(
        samples = samples.len(),
        days = days.len(),
        %reference,
        "aggregated forecast"
    );
    Ok(days)
}

/// Min and max temperature of the samples falling on `day`
pub fn today_range(samples: &[RawSample], day: NaiveDate) -> Option<(f64, f64)> {
    samples
        .iter()
        .filter(|s| s.day() == day)
        .map(|s| s.temperature_c)
        .fold(None, |range, t| match range {
            None => Some((t, t)),
            Some((min, max)) => Some((f64::min(min, t), f64::max(max, t))),
        })
}

/// The next `count` samples of the feed
pub fn upcoming(samples: &[RawSample], count: usize) -> &[RawSample] {
    &samples[..samples.len().min(count)]
}

/// Y-axis bounds for the min/max temperature chart: the data range padded
/// by 20 % of its span on each side.
pub fn chart_bounds(entries: &[DailyForecastEntry]) -> Option<[f64; 2]> {
    let min = entries.iter().map(|e| e.temp_min.round()).reduce(f64::min)?;
    let max = entries.iter().map(|e| e.temp_max.round()).reduce(f64::max)?;
    let padding = ((max - min) * 0.2).ceil();
    Some([min.floor() - padding, max.ceil() + padding])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(
        offset: &FixedOffset,
        day: u32,
        hour: u32,
        temp: f64,
        speed: f64,
        gust: Option<f64>,
        deg: f64,
    ) -> RawSample {
        RawSample {
            timestamp: offset.with_ymd_and_hms(2024, 7, day, hour, 0, 0).unwrap(),
            temperature_c: temp,
            condition: Condition {
                description: format!("day {day} hour {hour}"),
                icon_id: "01d".to_string(),
            },
            wind: Wind {
                speed_kmh: speed,
                gust_kmh: gust,
                direction_deg: deg,
            },
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn test_empty_feed_is_malformed() {
        let err = aggregate(&[], reference()).unwrap_err();
        assert!(matches!(err, CoreError::MalformedFeed(_)));
    }

    #[test]
    fn test_reference_day_is_excluded() {
        let tz = utc();
        let samples = vec![
            sample(&tz, 1, 9, 20.0, 5.0, None, 90.0),
            sample(&tz, 1, 12, 24.0, 5.0, None, 90.0),
        ];
        let days = aggregate(&samples, reference()).unwrap();
        assert!(days.is_empty());
    }

    #[test]
    fn test_fold_tracks_extremes() {
        let tz = utc();
        let samples = vec![
            sample(&tz, 2, 0, 18.0, 10.0, None, 90.0),
            sample(&tz, 2, 3, 15.0, 20.0, Some(30.0), 180.0),
            sample(&tz, 2, 6, 25.0, 20.0, Some(25.0), 270.0),
            sample(&tz, 2, 9, 21.0, 12.0, Some(41.0), 0.0),
        ];
        let days = aggregate(&samples, reference()).unwrap();
        assert_eq!(days.len(), 1);
        let day = &days[0];
        assert_eq!(day.temp_min, 15.0);
        assert_eq!(day.temp_max, 25.0);
        assert_eq!(day.wind_speed_max, 20.0);
        // Tie at 20 km/h keeps the first direction
        assert_eq!(day.wind_direction_at_max_speed, 180.0);
        assert_eq!(day.wind_gust_max, Some(41.0));
        assert_eq!(day.representative_timestamp, samples[0].timestamp);
        assert_eq!(day.condition, samples[0].condition);
    }

    #[test]
    fn test_caps_at_four_days() {
        let tz = utc();
        let samples: Vec<_> = (2..=7)
            .map(|d| sample(&tz, d, 12, f64::from(d), 5.0, None, 0.0))
            .collect();
        let days = aggregate(&samples, reference()).unwrap();
        let dates: Vec<u32> = days.iter().map(|d| chrono::Datelike::day(&d.date)).collect();
        assert_eq!(dates, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_samples_fold_into_their_own_day_after_the_cap() {
        let tz = utc();
        let mut samples: Vec<_> = (2..=5)
            .map(|d| sample(&tz, d, 0, 10.0, 5.0, None, 0.0))
            .collect();
        samples.push(sample(&tz, 6, 0, 50.0, 50.0, None, 0.0));
        samples.push(sample(&tz, 3, 12, 2.0, 9.0, Some(12.0), 45.0));
        samples.push(sample(&tz, 5, 12, 14.0, 3.0, None, 90.0));

        let days = aggregate(&samples, reference()).unwrap();
        assert_eq!(days.len(), 4);
        assert_eq!(days[1].temp_min, 2.0);
        assert_eq!(days[1].wind_speed_max, 9.0);
        assert_eq!(days[1].wind_direction_at_max_speed, 45.0);
        assert_eq!(days[1].wind_gust_max, Some(12.0));
        assert_eq!(days[3].temp_max, 14.0);
        assert_eq!(days[3].wind_speed_max, 5.0);
        assert!(days.iter().all(|d| d.temp_max < 50.0));
    }

    #[test]
    fn test_day_follows_sample_offset() {
        // 23:00 UTC on the 1st is already the 2nd at UTC+3
        let east = FixedOffset::east_opt(3 * 3600).unwrap();
        let ts = utc().with_ymd_and_hms(2024, 7, 1, 23, 0, 0).unwrap().with_timezone(&east);
        let s = RawSample {
            timestamp: ts,
            ..sample(&east, 2, 2, 10.0, 1.0, None, 0.0)
        };
        let days = aggregate(&[s], reference()).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 7, 2).unwrap());
    }

    #[test]
    fn test_today_range() {
        let tz = utc();
        let samples = vec![
            sample(&tz, 1, 9, 12.0, 0.0, None, 0.0),
            sample(&tz, 1, 15, 19.5, 0.0, None, 0.0),
            sample(&tz, 2, 0, 5.0, 0.0, None, 0.0),
        ];
        assert_eq!(today_range(&samples, reference()), Some((12.0, 19.5)));
        assert_eq!(today_range(&samples, NaiveDate::from_ymd_opt(2024, 7, 9).unwrap()), None);
    }

    #[test]
    fn test_upcoming_is_bounded() {
        let tz = utc();
        let samples: Vec<_> = (0..3).map(|h| sample(&tz, 2, h * 3, 10.0, 0.0, None, 0.0)).collect();
        assert_eq!(upcoming(&samples, THREE_HOUR_SAMPLES).len(), 3);
        assert_eq!(upcoming(&samples, 2).len(), 2);
    }

    #[test]
    fn test_chart_bounds() {
        let tz = utc();
        let samples = vec![
            sample(&tz, 2, 0, 10.0, 0.0, None, 0.0),
            sample(&tz, 3, 0, 20.0, 0.0, None, 0.0),
        ];
        let days = aggregate(&samples, reference()).unwrap();
        assert_eq!(chart_bounds(&days), Some([8.0, 22.0]));
        assert_eq!(chart_bounds(&[]), None);
    }
}
