//! Recurrence rules and the next-occurrence calculator.
//!
//! [`next_occurrence`] is a pure function: given a validated
//! [`ScheduleSpec`] and a reference instant it returns the next instant the
//! reminder becomes due, always strictly after the reference. Calendar
//! arithmetic happens on the naive date/time components; values are carried
//! as `DateTime<Utc>` for storage and ordering (schedules are
//! timezone-naive, interpreted in whatever local context computed them).

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// How often a reminder recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every day at `time_of_day`.
    Daily,
    /// On each weekday in `days_of_week`, at `time_of_day`.
    Weekly,
    /// Same day-of-month each month, clamped to month end.
    Monthly,
    /// Every `interval_days` days.
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Fixed-size set of weekdays, bit 0 = Sunday .. bit 6 = Saturday.
///
/// Weekday membership arrives from callers as loose ordinals; this type
/// validates them once at the boundary so the calculator never sees
/// free-form integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    const ALL_BITS: u8 = 0b0111_1111;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from weekday ordinals (0 = Sunday .. 6 = Saturday).
    pub fn from_ordinals(ordinals: &[u8]) -> Result<Self, CoreError> {
        let mut set = Self::empty();
        for &ord in ordinals {
            if ord > 6 {
                return Err(CoreError::validation(format!(
                    "weekday ordinal out of range: {ord} (expected 0..=6)"
                )));
            }
            set.0 |= 1 << ord;
        }
        Ok(set)
    }

    /// Build from a raw bitmask (bit 0 = Sunday), as stored in the database.
    pub fn from_mask(mask: u8) -> Result<Self, CoreError> {
        if mask & !Self::ALL_BITS != 0 {
            return Err(CoreError::validation(format!(
                "weekday bitmask out of range: {mask:#010b}"
            )));
        }
        Ok(Self(mask))
    }

    pub fn as_mask(&self) -> u8 {
        self.0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Member weekdays in Sunday-first ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0u8..7).filter(|ord| self.0 & (1 << ord) != 0).map(|ord| match ord {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            _ => Weekday::Sat,
        })
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ordinals: Vec<u8> = self.iter().map(|d| d.num_days_from_sunday() as u8).collect();
        ordinals.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ordinals = Vec::<u8>::deserialize(deserializer)?;
        Self::from_ordinals(&ordinals).map_err(D::Error::custom)
    }
}

/// The recurrence rule attached to a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub frequency: Frequency,
    /// Local time of day the reminder fires (minute resolution).
    pub time_of_day: NaiveTime,
    /// Required non-empty when `frequency` is [`Frequency::Weekly`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<WeekdaySet>,
    /// Required (>= 1) when `frequency` is [`Frequency::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<u32>,
}

impl ScheduleSpec {
    pub fn daily(time_of_day: NaiveTime) -> Self {
        Self {
            frequency: Frequency::Daily,
            time_of_day,
            days_of_week: None,
            interval_days: None,
        }
    }

    pub fn weekly(time_of_day: NaiveTime, days_of_week: WeekdaySet) -> Self {
        Self {
            frequency: Frequency::Weekly,
            time_of_day,
            days_of_week: Some(days_of_week),
            interval_days: None,
        }
    }

    pub fn monthly(time_of_day: NaiveTime) -> Self {
        Self {
            frequency: Frequency::Monthly,
            time_of_day,
            days_of_week: None,
            interval_days: None,
        }
    }

    pub fn custom(time_of_day: NaiveTime, interval_days: u32) -> Self {
        Self {
            frequency: Frequency::Custom,
            time_of_day,
            days_of_week: None,
            interval_days: Some(interval_days),
        }
    }

    /// Enforce the shape invariants. The calculator is total over specs
    /// that pass this check.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self.frequency {
            Frequency::Weekly => match self.days_of_week {
                Some(days) if !days.is_empty() => {}
                _ => {
                    return Err(CoreError::validation(
                        "weekly schedule requires a non-empty weekday set",
                    ));
                }
            },
            Frequency::Custom => match self.interval_days {
                Some(n) if n >= 1 => {}
                _ => {
                    return Err(CoreError::validation(
                        "custom schedule requires an interval of at least one day",
                    ));
                }
            },
            Frequency::Daily | Frequency::Monthly => {}
        }
        if self.frequency != Frequency::Weekly && self.days_of_week.is_some() {
            return Err(CoreError::validation(
                "days_of_week only applies to weekly schedules",
            ));
        }
        if self.frequency != Frequency::Custom && self.interval_days.is_some() {
            return Err(CoreError::validation(
                "interval_days only applies to custom schedules",
            ));
        }
        Ok(())
    }
}

/// Compute the next occurrence of `spec` strictly after `reference`.
///
/// Pure and deterministic. "Already passed today" always rolls to the next
/// qualifying day, never to "now".
pub fn next_occurrence(spec: &ScheduleSpec, reference: DateTime<Utc>) -> DateTime<Utc> {
    let today = reference.date_naive();
    match spec.frequency {
        Frequency::Daily => {
            let candidate = at(today, spec.time_of_day);
            if candidate > reference {
                candidate
            } else {
                at(today + Duration::days(1), spec.time_of_day)
            }
        }
        Frequency::Weekly => {
            let days = spec.days_of_week.unwrap_or_default();
            // Inclusive forward scan over the next 7 calendar days.
            for offset in 0..7 {
                let day = today + Duration::days(offset);
                if days.contains(day.weekday()) {
                    let candidate = at(day, spec.time_of_day);
                    if candidate > reference {
                        return candidate;
                    }
                }
            }
            // Only reachable when today is the sole member and its time has
            // passed: wrap to the earliest member strictly after today,
            // rolling into next week.
            let today_ord = today.weekday().num_days_from_sunday();
            let ahead = days
                .iter()
                .map(|day| {
                    let delta = (day.num_days_from_sunday() + 7 - today_ord) % 7;
                    if delta == 0 { 7 } else { delta }
                })
                .min()
                // Empty sets are rejected at validation; roll a full week.
                .unwrap_or(7);
            at(today + Duration::days(ahead as i64), spec.time_of_day)
        }
        Frequency::Monthly => {
            let candidate = at(today, spec.time_of_day);
            if candidate > reference {
                candidate
            } else {
                at(next_month_clamped(today), spec.time_of_day)
            }
        }
        Frequency::Custom => {
            let candidate = at(today, spec.time_of_day);
            if candidate > reference {
                // Today still counts as day zero of the cycle.
                candidate
            } else {
                let interval = spec.interval_days.unwrap_or(1).max(1);
                at(today + Duration::days(interval as i64), spec.time_of_day)
            }
        }
    }
}

/// One-off deferral: `reference + minutes`. Ignores the recurrence rule.
pub fn snooze_until(reference: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    reference + Duration::minutes(minutes as i64)
}

fn at(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Same day-of-month in the following month, clamped to the last valid day
/// (scheduling on the 31st never skips a 30-day month).
fn next_month_clamped(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let mut day = date.day();
    loop {
        if let Some(next) = NaiveDate::from_ymd_opt(year, month, day) {
            return next;
        }
        day -= 1;
    }
}
