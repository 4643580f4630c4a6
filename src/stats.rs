use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AttendanceEvent, DailyStats, FoodPreference, MealBucket, MealType, Student, WeeklyStats,
    ACADEMIC_YEARS,
};
use crate::roll;

fn student_year(student: &Student, reference_year: i32) -> Option<i32> {
    match roll::resolve_year(&student.roll_number, reference_year) {
        Ok(year) => Some(year),
        Err(err) => {
            debug!(student_id = %student.id, "excluding from year buckets: {err}");
            None
        }
    }
}

fn tally_preference(bucket: &mut MealBucket, preference: FoodPreference) {
    match preference {
        FoodPreference::Veg => bucket.veg += 1,
        FoodPreference::NonVeg => bucket.non_veg += 1,
        FoodPreference::Unclassified => {}
    }
}

/// Roll-call statistics for one day.
///
/// A student is present once no matter how many meals they took, while
/// every event counts toward its meal. Students with an unresolvable or
/// out-of-range year only show up in the overall totals. Events for ids
/// outside the roster are ignored.
pub fn aggregate_daily(
    roster: &[Student],
    events: &[AttendanceEvent],
    reference_year: i32,
) -> DailyStats {
    let mut events_by_student: HashMap<Uuid, Vec<&AttendanceEvent>> = HashMap::new();
    for event in events {
        events_by_student.entry(event.student_id).or_default().push(event);
    }

    let mut stats = DailyStats {
        total: roster.len(),
        ..DailyStats::default()
    };

    for student in roster {
        let year = student_year(student, reference_year);
        if let Some(bucket) = year.and_then(|y| stats.by_year.get_mut(y)) {
            bucket.total += 1;
        }

        match events_by_student.get(&student.id) {
            Some(attended) => {
                stats.present += 1;
                if let Some(bucket) = year.and_then(|y| stats.by_year.get_mut(y)) {
                    bucket.present += 1;
                }

                for event in attended {
                    if let Some(meal) = stats.by_meal.get_mut(event.meal_type) {
                        meal.present += 1;
                        tally_preference(meal, event.food_preference);
                    }
                }
            }
            None => {
                stats.absent += 1;
                if let Some(bucket) = year.and_then(|y| stats.by_year.get_mut(y)) {
                    bucket.absent += 1;
                }
            }
        }
    }

    for meal in MealType::SERVED {
        if let Some(bucket) = stats.by_meal.get_mut(meal) {
            bucket.total = roster.len();
            bucket.absent = bucket.total as i64 - bucket.present as i64;
        }
    }

    stats
}

/// Roll numbers of present students per academic year, in order of first
/// attendance. Every year from 1 to 4 has an entry, possibly empty.
pub fn present_rolls_by_year(
    roster: &[Student],
    events: &[AttendanceEvent],
    reference_year: i32,
) -> BTreeMap<i32, Vec<String>> {
    let lookup: HashMap<Uuid, (&str, Option<i32>)> = roster
        .iter()
        .map(|student| {
            (
                student.id,
                (student.roll_number.as_str(), student_year(student, reference_year)),
            )
        })
        .collect();

    let mut grouped: BTreeMap<i32, Vec<String>> =
        ACADEMIC_YEARS.map(|year| (year, Vec::new())).collect();
    let mut seen = HashSet::new();

    for event in events {
        let Some((roll_number, Some(year))) = lookup.get(&event.student_id) else {
            continue;
        };
        let Some(rolls) = grouped.get_mut(year) else {
            continue;
        };
        if seen.insert(event.student_id) {
            rolls.push(roll_number.to_string());
        }
    }

    grouped
}

/// Every calendar date from `start` to `end`, both inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

#[derive(Debug, Default, Clone, Copy)]
struct DayTally {
    lunch: usize,
    dinner: usize,
    veg: usize,
    non_veg: usize,
}

/// Per-day meal and preference counts across `start..=end`.
pub fn aggregate_weekly(
    events: &[AttendanceEvent],
    start: NaiveDate,
    end: NaiveDate,
) -> WeeklyStats {
    let mut tallies: HashMap<NaiveDate, DayTally> = HashMap::new();
    for event in events {
        let tally = tallies.entry(event.date()).or_default();
        match event.meal_type {
            MealType::Lunch => tally.lunch += 1,
            MealType::Dinner => tally.dinner += 1,
            MealType::Unclassified => {}
        }
        match event.food_preference {
            FoodPreference::Veg => tally.veg += 1,
            FoodPreference::NonVeg => tally.non_veg += 1,
            FoodPreference::Unclassified => {}
        }
    }

    let mut stats = WeeklyStats::default();
    for day in date_range(start, end) {
        let tally = tallies.get(&day).copied().unwrap_or_default();
        stats.dates.push(day.format("%Y-%m-%d").to_string());
        stats.attendance.lunch.push(tally.lunch);
        stats.attendance.dinner.push(tally.dinner);
        stats.preferences.veg.push(tally.veg);
        stats.preferences.non_veg.push(tally.non_veg);
    }

    stats
}
