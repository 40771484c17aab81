//! Relative-date window resolution
//!
//! Every relative-date operator resolves to a half-open `[start, end)` window
//! of UTC instants. Calendar-anchored operators work on the local calendar of
//! the context timezone; rolling operators work on the evaluation instant.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeDelta, Utc, Weekday};
use chrono_tz::Tz;
use serde_json::Value as JsonValue;

use crate::filter::{FilterError, Operator, TimeUnit};
use crate::schema::DateFormat;
use crate::utils::time::{local_midnight, parse_day};

/// Calendar conventions used by week and fiscal-year operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSettings {
    pub week_start: Weekday,
    /// Month (1-12) on whose first day the fiscal year begins
    pub fiscal_year_start_month: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            week_start: Weekday::Mon,
            fiscal_year_start_month: 4,
        }
    }
}

impl CalendarSettings {
    /// Calendar year in which the fiscal year containing `date` started
    pub fn fiscal_year_of(&self, date: NaiveDate) -> i32 {
        if date.month() < self.fiscal_year_start_month {
            date.year() - 1
        } else {
            date.year()
        }
    }

    fn fiscal_year_start(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.fiscal_year_start_month, 1)
    }

    fn week_start_of(&self, date: NaiveDate) -> Option<NaiveDate> {
        let offset = (date.weekday().num_days_from_monday() + 7
            - self.week_start.num_days_from_monday())
            % 7;
        date.checked_sub_days(Days::new(u64::from(offset)))
    }
}

/// Half-open window of UTC instants; `None` bounds are unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn from(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| instant >= start) && self.end.is_none_or(|end| instant < end)
    }
}

/// Calendar period of this/next/last operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Week,
    Month,
    Year,
    FiscalYear,
}

/// Evaluation context for one compile call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateContext {
    pub now: DateTime<Utc>,
    pub tz: Tz,
    pub settings: CalendarSettings,
}

impl DateContext {
    pub fn new(now: DateTime<Utc>, tz: Tz, settings: CalendarSettings) -> Self {
        Self { now, tz, settings }
    }

    /// Date-only attributes use the UTC calendar with no timezone conversion
    pub fn for_format(&self, format: DateFormat) -> Self {
        match format {
            DateFormat::Date => Self {
                tz: chrono_tz::UTC,
                ..*self
            },
            DateFormat::Datetime => *self,
        }
    }

    /// Current local calendar date
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.tz).date_naive()
    }

    /// Resolve a relative-date operator and its value to a window
    pub fn window(
        &self,
        operator: &Operator,
        value: &JsonValue,
    ) -> Result<DateWindow, FilterError> {
        let today = self.today();
        let window = match operator {
            Operator::On => {
                let day = self.day_value(operator, value)?;
                self.days(operator, day, 0, 1)?
            }
            Operator::OnOrAfter => {
                let day = self.day_value(operator, value)?;
                DateWindow::from(self.midnight(operator, day)?)
            }
            Operator::OnOrBefore => {
                let day = self.day_value(operator, value)?;
                DateWindow::until(self.midnight(operator, shift_days(operator, day, 1)?)?)
            }
            Operator::Today => self.days(operator, today, 0, 1)?,
            Operator::Yesterday => self.days(operator, today, -1, 0)?,
            Operator::Tomorrow => self.days(operator, today, 1, 2)?,
            Operator::NextSevenDays => self.days(operator, today, 0, 7)?,
            Operator::LastSevenDays => self.days(operator, today, -6, 1)?,
            Operator::ThisWeek => self.period(operator, Period::Week, 0)?,
            Operator::NextWeek => self.period(operator, Period::Week, 1)?,
            Operator::LastWeek => self.period(operator, Period::Week, -1)?,
            Operator::ThisMonth => self.period(operator, Period::Month, 0)?,
            Operator::NextMonth => self.period(operator, Period::Month, 1)?,
            Operator::LastMonth => self.period(operator, Period::Month, -1)?,
            Operator::ThisYear => self.period(operator, Period::Year, 0)?,
            Operator::NextYear => self.period(operator, Period::Year, 1)?,
            Operator::LastYear => self.period(operator, Period::Year, -1)?,
            Operator::ThisFiscalYear => self.period(operator, Period::FiscalYear, 0)?,
            Operator::NextFiscalYear => self.period(operator, Period::FiscalYear, 1)?,
            Operator::LastFiscalYear => self.period(operator, Period::FiscalYear, -1)?,
            Operator::InFiscalYear => {
                let year = fiscal_year_value(operator, value)?;
                self.fiscal_year(operator, year)?
            }
            Operator::NextX(unit) => {
                let later = self.rolling(operator, *unit, value, true)?;
                DateWindow::between(self.now, later)
            }
            Operator::LastX(unit) => {
                let earlier = self.rolling(operator, *unit, value, false)?;
                DateWindow::between(earlier, self.now)
            }
            Operator::OlderThanX(unit) => {
                DateWindow::until(self.rolling(operator, *unit, value, false)?)
            }
            Operator::Lt
            | Operator::Lte
            | Operator::Gt
            | Operator::Gte
            | Operator::Like
            | Operator::NotLike
            | Operator::BeginsWith
            | Operator::EndsWith
            | Operator::NotBeginWith
            | Operator::NotEndWith
            | Operator::Eq
            | Operator::Ne
            | Operator::Null
            | Operator::NotNull
            | Operator::In
            | Operator::NotIn
            | Operator::Between
            | Operator::Ignored(_) => {
                return Err(FilterError::invalid_value(
                    operator.key(),
                    "operator does not describe a date window",
                ));
            }
        };

        tracing::trace!(
            operator = %operator,
            timezone = %self.tz,
            start = ?window.start,
            end = ?window.end,
            "Resolved date window"
        );
        Ok(window)
    }

    fn midnight(&self, operator: &Operator, date: NaiveDate) -> Result<DateTime<Utc>, FilterError> {
        local_midnight(self.tz, date).ok_or_else(|| out_of_range(operator))
    }

    /// `[anchor + from, anchor + to)` in whole local days
    fn days(
        &self,
        operator: &Operator,
        anchor: NaiveDate,
        from: i64,
        to: i64,
    ) -> Result<DateWindow, FilterError> {
        Ok(DateWindow::between(
            self.midnight(operator, shift_days(operator, anchor, from)?)?,
            self.midnight(operator, shift_days(operator, anchor, to)?)?,
        ))
    }

    fn period(
        &self,
        operator: &Operator,
        period: Period,
        shift: i32,
    ) -> Result<DateWindow, FilterError> {
        let today = self.today();
        let (start, end) = match period {
            Period::Week => {
                let this_week = self
                    .settings
                    .week_start_of(today)
                    .ok_or_else(|| out_of_range(operator))?;
                let start = shift_days(operator, this_week, i64::from(shift) * 7)?;
                (start, shift_days(operator, start, 7)?)
            }
            Period::Month => {
                let this_month = today.with_day(1).ok_or_else(|| out_of_range(operator))?;
                let start = shift_months(operator, this_month, shift)?;
                (start, shift_months(operator, start, 1)?)
            }
            Period::Year => {
                let year = today.year() + shift;
                (
                    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| out_of_range(operator))?,
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                        .ok_or_else(|| out_of_range(operator))?,
                )
            }
            Period::FiscalYear => {
                let year = self.settings.fiscal_year_of(today) + shift;
                return self.fiscal_year(operator, year);
            }
        };
        Ok(DateWindow::between(
            self.midnight(operator, start)?,
            self.midnight(operator, end)?,
        ))
    }

    fn fiscal_year(&self, operator: &Operator, year: i32) -> Result<DateWindow, FilterError> {
        let start = self
            .settings
            .fiscal_year_start(year)
            .ok_or_else(|| out_of_range(operator))?;
        let end = self
            .settings
            .fiscal_year_start(year + 1)
            .ok_or_else(|| out_of_range(operator))?;
        Ok(DateWindow::between(
            self.midnight(operator, start)?,
            self.midnight(operator, end)?,
        ))
    }

    /// `now` moved `n` units forward or backward
    fn rolling(
        &self,
        operator: &Operator,
        unit: TimeUnit,
        value: &JsonValue,
        forward: bool,
    ) -> Result<DateTime<Utc>, FilterError> {
        let n = count_value(operator, value)?;
        let moved = match unit {
            TimeUnit::Hours | TimeUnit::Days | TimeUnit::Weeks => {
                let n = i64::from(n);
                let delta = match unit {
                    TimeUnit::Hours => TimeDelta::try_hours(n),
                    TimeUnit::Days => TimeDelta::try_days(n),
                    _ => TimeDelta::try_weeks(n),
                }
                .ok_or_else(|| out_of_range(operator))?;
                if forward {
                    self.now.checked_add_signed(delta)
                } else {
                    self.now.checked_sub_signed(delta)
                }
            }
            TimeUnit::Months | TimeUnit::Years => {
                let months = if unit == TimeUnit::Years {
                    n.checked_mul(12).ok_or_else(|| out_of_range(operator))?
                } else {
                    n
                };
                if forward {
                    self.now.checked_add_months(Months::new(months))
                } else {
                    self.now.checked_sub_months(Months::new(months))
                }
            }
        };
        moved.ok_or_else(|| out_of_range(operator))
    }

    fn day_value(&self, operator: &Operator, value: &JsonValue) -> Result<NaiveDate, FilterError> {
        let text = value
            .as_str()
            .ok_or_else(|| FilterError::invalid_value(operator.key(), "expected a date string"))?;
        parse_day(text, self.tz).ok_or_else(|| {
            FilterError::invalid_value(operator.key(), format!("'{}' is not a valid date", text))
        })
    }
}

fn out_of_range(operator: &Operator) -> FilterError {
    FilterError::invalid_value(operator.key(), "date out of range")
}

fn shift_days(operator: &Operator, date: NaiveDate, days: i64) -> Result<NaiveDate, FilterError> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or_else(|| out_of_range(operator))
}

fn shift_months(
    operator: &Operator,
    date: NaiveDate,
    months: i32,
) -> Result<NaiveDate, FilterError> {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.ok_or_else(|| out_of_range(operator))
}

/// Non-negative integer, given as a JSON number or a numeric string
fn count_value(operator: &Operator, value: &JsonValue) -> Result<u32, FilterError> {
    let invalid = || {
        FilterError::invalid_value(
            operator.key(),
            format!("expected a non-negative integer, got {}", value),
        )
    };
    let n = match value {
        JsonValue::Number(n) => n.as_u64().ok_or_else(invalid)?,
        JsonValue::String(s) => s.trim().parse::<u64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    u32::try_from(n).map_err(|_| out_of_range(operator))
}

/// Fiscal start year, given as a JSON number or a numeric string
fn fiscal_year_value(operator: &Operator, value: &JsonValue) -> Result<i32, FilterError> {
    let invalid = || {
        FilterError::invalid_value(
            operator.key(),
            format!("expected a fiscal start year, got {}", value),
        )
    };
    let year = match value {
        JsonValue::Number(n) => n.as_i64().ok_or_else(invalid)?,
        JsonValue::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    i32::try_from(year).map_err(|_| out_of_range(operator))
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
