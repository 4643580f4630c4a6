use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::models::{DailyStats, MealType, ACADEMIC_YEARS};

/// One CSV line. Blank separators are empty rows.
pub type Row = Vec<String>;

macro_rules! row {
    ($($cell:expr),* $(,)?) => {
        vec![$($cell.to_string()),*]
    };
}

/// Lays out the daily report: summary, year table, meal table, then the
/// present roll numbers grouped by academic year.
pub fn build_rows(
    date: NaiveDate,
    daily: &DailyStats,
    present_rolls_by_year: &BTreeMap<i32, Vec<String>>,
) -> Vec<Row> {
    let mut rows = vec![
        row!["Date", date.format("%Y-%m-%d")],
        row!["Total Students", daily.total],
        row!["Present", daily.present],
        row!["Absent", daily.absent],
        Row::new(),
        row!["Year", "Total", "Present", "Absent"],
    ];

    for (year, bucket) in daily.by_year.iter() {
        rows.push(row![year, bucket.total, bucket.present, bucket.absent]);
    }

    rows.push(Row::new());
    rows.push(row!["Meal", "Total", "Present", "Absent", "Veg", "NonVeg"]);

    for meal in MealType::SERVED {
        if let Some(bucket) = daily.by_meal.get(meal) {
            rows.push(row![
                meal.label(),
                bucket.total,
                bucket.present,
                bucket.absent,
                bucket.veg,
                bucket.non_veg,
            ]);
        }
    }

    rows.push(Row::new());
    rows.push(row!["Present Students (Grouped by Year)"]);

    for year in ACADEMIC_YEARS {
        rows.push(row![format!("Year {year}")]);
        let mut listed: Vec<&String> = Vec::new();
        for roll_number in present_rolls_by_year.get(&year).into_iter().flatten() {
            if !listed.contains(&roll_number) {
                listed.push(roll_number);
                rows.push(vec![roll_number.clone()]);
            }
        }
        rows.push(Row::new());
    }

    rows
}

pub fn write_csv(rows: &[Row], out: &Path) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(out)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn default_report_path(date: NaiveDate) -> String {
    format!("attendance-{}.csv", date.format("%Y-%m-%d"))
}
