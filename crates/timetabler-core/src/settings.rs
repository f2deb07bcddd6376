//! School day settings
//!
//! Derives the shape of a school day from its settings: how many lessons fit,
//! when each lesson starts and ends, and how long lunch lasts in lessons.
//!
//! # Lessons per day
//!
//! ```text
//! available = (end - start) - lunch_duration      (lunch only when configured)
//! lessons   = floor(available / (class_hour + average_break))
//! ```
//!
//! The average is computed exactly by scaling with the number of configured
//! breaks, so `[10, 15]` behaves like a 12.5 minute break.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ScheduleError;

/// Per-school timing configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolSettings {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub class_hour_length_minutes: u32,
    /// Break after lesson n is entry n-1; the last entry repeats
    #[serde(default)]
    pub break_durations: Vec<u32>,
    /// Fallback used when `break_durations` is empty
    #[serde(default = "default_break_minutes")]
    pub default_break_minutes: u32,
    /// 1-based lesson indices at which lunch may start
    #[serde(default)]
    pub possible_lunch_hours: Vec<u8>,
    #[serde(default)]
    pub lunch_duration_minutes: u32,
}

fn default_break_minutes() -> u32 {
    10
}

/// Clock times of one lesson
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPeriod {
    pub index: u8,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SchoolSettings {
    /// Settings for a day from `start` to `end` with 45-minute lessons,
    /// 10-minute breaks and no lunch
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start_time: start,
            end_time: end,
            class_hour_length_minutes: 45,
            break_durations: Vec::new(),
            default_break_minutes: default_break_minutes(),
            possible_lunch_hours: Vec::new(),
            lunch_duration_minutes: 0,
        }
    }

    pub fn class_hour(mut self, minutes: u32) -> Self {
        self.class_hour_length_minutes = minutes;
        self
    }

    pub fn breaks(mut self, durations: impl IntoIterator<Item = u32>) -> Self {
        self.break_durations = durations.into_iter().collect();
        self
    }

    pub fn lunch(mut self, minutes: u32, possible_hours: impl IntoIterator<Item = u8>) -> Self {
        self.lunch_duration_minutes = minutes;
        self.possible_lunch_hours = possible_hours.into_iter().collect();
        self
    }

    /// Check the invariants generation depends on
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.end_time <= self.start_time {
            return Err(ScheduleError::Configuration(format!(
                "School day ends ({}) before it starts ({})",
                self.end_time, self.start_time
            )));
        }
        if self.class_hour_length_minutes == 0 {
            return Err(ScheduleError::Configuration(
                "Class hour length must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn is_lunch_configured(&self) -> bool {
        !self.possible_lunch_hours.is_empty() && self.lunch_duration_minutes > 0
    }

    /// Minutes between start and end of the school day
    pub fn day_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Number of lesson slots that fit into one day
    pub fn max_lessons_per_day(&self) -> u8 {
        let hour = i64::from(self.class_hour_length_minutes);
        if hour == 0 {
            return 0;
        }

        let mut available = self.day_minutes();
        if self.is_lunch_configured() {
            available -= i64::from(self.lunch_duration_minutes);
        }
        if available <= 0 {
            return 0;
        }

        let lessons = if self.break_durations.is_empty() {
            available / (hour + i64::from(self.default_break_minutes))
        } else {
            let count = self.break_durations.len() as i64;
            let total: i64 = self.break_durations.iter().map(|&b| i64::from(b)).sum();
            (available * count) / (hour * count + total)
        };

        lessons.clamp(0, i64::from(u8::MAX)) as u8
    }

    /// Lunch length expressed in lesson slots (rounded up)
    pub fn lunch_hours_count(&self) -> u8 {
        if self.class_hour_length_minutes == 0 {
            return 0;
        }
        let count = self
            .lunch_duration_minutes
            .div_ceil(self.class_hour_length_minutes);
        count.min(u32::from(u8::MAX)) as u8
    }

    /// Break following the given 1-based lesson
    pub fn break_after(&self, lesson: u8) -> u32 {
        if self.break_durations.is_empty() {
            return self.default_break_minutes;
        }
        let idx = usize::from(lesson.max(1) - 1).min(self.break_durations.len() - 1);
        self.break_durations[idx]
    }

    /// Clock start and end of every lesson of the day
    pub fn lesson_periods(&self) -> Vec<LessonPeriod> {
        let hour = Duration::minutes(i64::from(self.class_hour_length_minutes));
        let mut cursor = self.start_time;
        let mut periods = Vec::new();

        for index in 1..=self.max_lessons_per_day() {
            let end = cursor + hour;
            periods.push(LessonPeriod {
                index,
                start: cursor,
                end,
            });
            cursor = end + Duration::minutes(i64::from(self.break_after(index)));
        }

        periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn four_hour_morning_fits_four_lessons() {
        let settings = SchoolSettings::new(time(8, 0), time(12, 0));
        // 240 / (45 + 10) = 4.36
        assert_eq!(settings.max_lessons_per_day(), 4);
    }

    #[test]
    fn lunch_is_subtracted_only_when_configured() {
        let base = SchoolSettings::new(time(8, 0), time(15, 0)).breaks([10]);
        // 420 / 55 = 7.6
        assert_eq!(base.max_lessons_per_day(), 7);

        let with_lunch = base.clone().lunch(30, [4, 5]);
        // 390 / 55 = 7.09
        assert_eq!(with_lunch.max_lessons_per_day(), 7);

        let long_lunch = base.clone().lunch(60, [4, 5]);
        // 360 / 55 = 6.5
        assert_eq!(long_lunch.max_lessons_per_day(), 6);

        // Duration without possible hours is not a configured lunch
        let no_hours = base.lunch(60, []);
        assert_eq!(no_hours.max_lessons_per_day(), 7);
    }

    #[test]
    fn average_break_is_exact() {
        // 8:00-13:00 = 300 minutes, average break 12.5 -> 300 / 57.5 = 5.2
        let settings = SchoolSettings::new(time(8, 0), time(13, 0)).breaks([10, 15]);
        assert_eq!(settings.max_lessons_per_day(), 5);
    }

    #[test]
    fn lunch_hours_round_up() {
        let settings = SchoolSettings::new(time(8, 0), time(15, 0)).lunch(50, [4]);
        assert_eq!(settings.lunch_hours_count(), 2);

        let exact = SchoolSettings::new(time(8, 0), time(15, 0)).lunch(45, [4]);
        assert_eq!(exact.lunch_hours_count(), 1);
    }

    #[test]
    fn last_break_repeats() {
        let settings = SchoolSettings::new(time(8, 0), time(14, 0)).breaks([5, 20, 10]);
        assert_eq!(settings.break_after(1), 5);
        assert_eq!(settings.break_after(2), 20);
        assert_eq!(settings.break_after(3), 10);
        assert_eq!(settings.break_after(7), 10);
    }

    #[test]
    fn lesson_periods_follow_breaks() {
        let settings = SchoolSettings::new(time(8, 0), time(11, 0)).breaks([5, 20]);
        let periods = settings.lesson_periods();

        assert_eq!(periods.len(), 3);
        assert_eq!((periods[0].start, periods[0].end), (time(8, 0), time(8, 45)));
        assert_eq!((periods[1].start, periods[1].end), (time(8, 50), time(9, 35)));
        assert_eq!((periods[2].start, periods[2].end), (time(9, 55), time(10, 40)));
    }

    #[test]
    fn validate_rejects_inverted_day() {
        let settings = SchoolSettings::new(time(12, 0), time(8, 0));
        assert!(matches!(
            settings.validate(),
            Err(ScheduleError::Configuration(_))
        ));

        let zero_hour = SchoolSettings::new(time(8, 0), time(12, 0)).class_hour(0);
        assert!(zero_hour.validate().is_err());
        assert_eq!(zero_hour.max_lessons_per_day(), 0);
    }
}
