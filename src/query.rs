use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::error::AttendanceError;
use crate::models::MealType;

/// Parameters of a single-day stats or report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyQuery {
    pub date: NaiveDate,
    pub meal: Option<MealType>,
}

impl DailyQuery {
    pub fn from_params(date: Option<&str>, meal: Option<MealType>) -> Result<Self, AttendanceError> {
        Ok(Self {
            date: parse_date("date", date)?,
            meal,
        })
    }
}

/// Inclusive date range of a weekly stats request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeeklyQuery {
    pub fn from_params(start: Option<&str>, end: Option<&str>) -> Result<Self, AttendanceError> {
        Ok(Self {
            start: parse_date("startDate", start)?,
            end: parse_date("endDate", end)?,
        })
    }

    /// The week containing today's UTC date, the same calendar events are
    /// bucketed by.
    pub fn current_week() -> Self {
        Self::week_of(Utc::now().date_naive())
    }

    /// Monday through Sunday of the week containing `today`.
    pub fn week_of(today: NaiveDate) -> Self {
        let start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        Self {
            start,
            end: start + Duration::days(6),
        }
    }
}

fn parse_date(name: &'static str, value: Option<&str>) -> Result<NaiveDate, AttendanceError> {
    let raw = value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or(AttendanceError::MissingRequiredParameter(name))?;

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| AttendanceError::InvalidParameter {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_date_is_rejected() {
        assert_eq!(
            DailyQuery::from_params(None, None),
            Err(AttendanceError::MissingRequiredParameter("date"))
        );
        assert_eq!(
            DailyQuery::from_params(Some("  "), Some(MealType::Lunch)),
            Err(AttendanceError::MissingRequiredParameter("date"))
        );
    }

    #[test]
    fn weekly_range_needs_both_ends() {
        assert_eq!(
            WeeklyQuery::from_params(Some("2025-04-01"), None),
            Err(AttendanceError::MissingRequiredParameter("endDate"))
        );
        assert_eq!(
            WeeklyQuery::from_params(None, Some("2025-04-07")),
            Err(AttendanceError::MissingRequiredParameter("startDate"))
        );
    }

    #[test]
    fn malformed_dates_are_invalid() {
        assert!(matches!(
            DailyQuery::from_params(Some("04/01/2025"), None),
            Err(AttendanceError::InvalidParameter { name: "date", .. })
        ));
    }

    #[test]
    fn parses_iso_dates() {
        let query = WeeklyQuery::from_params(Some("2025-04-01"), Some("2025-04-07")).unwrap();
        assert_eq!(query.start, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(query.end, NaiveDate::from_ymd_opt(2025, 4, 7).unwrap());
    }

    #[test]
    fn week_of_runs_monday_to_sunday() {
        // 2025-04-10 is a Thursday
        let week = WeeklyQuery::week_of(NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        assert_eq!(week.start, NaiveDate::from_ymd_opt(2025, 4, 7).unwrap());
        assert_eq!(week.end, NaiveDate::from_ymd_opt(2025, 4, 13).unwrap());

        let sunday = WeeklyQuery::week_of(NaiveDate::from_ymd_opt(2025, 4, 13).unwrap());
        assert_eq!(sunday, week);
    }

    #[test]
    fn current_week_contains_the_utc_date() {
        let week = WeeklyQuery::current_week();
        let today = Utc::now().date_naive();
        assert!(week.start <= today && today <= week.end);
        assert_eq!(week.end - week.start, Duration::days(6));
    }
}
