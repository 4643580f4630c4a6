use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{AttendanceEvent, FoodPreference, MarkedAttendance, MealType, Student};

pub const ATTENDANCE_CHANNEL: &str = "attendance_marked";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("6f1c2b9e-3a57-4c1e-9d0a-8b2f4e6d1a01")?,
            "220101",
            "Ananya Rao",
        ),
        (
            Uuid::parse_str("a4d9e0c3-7b21-4f68-8e5c-1d3b7a9f2c02")?,
            "22015A",
            "Rohit Verma",
        ),
        (
            Uuid::parse_str("c8e7f1a2-5d43-4b9e-a6c0-2f8d1e3b4c03")?,
            "230412",
            "Meera Iyer",
        ),
        (
            Uuid::parse_str("0b5a3d7e-9c12-4e8f-b1a4-6c2e9d0f5b04")?,
            "240233",
            "Kabir Singh",
        ),
        (
            Uuid::parse_str("e2f4a6c8-1b3d-4f5e-8a7c-9d0b2e4f6a05")?,
            "250107",
            "Sana Qureshi",
        ),
    ];

    for (id, roll_number, name) in &students {
        sqlx::query(
            r#"
            INSERT INTO mess_attendance.students (id, roll_number, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (roll_number) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(id)
        .bind(roll_number)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let today = Utc::now().date_naive();
    let events = vec![
        ("220101", MealType::Lunch, FoodPreference::Veg, (12, 40)),
        ("220101", MealType::Dinner, FoodPreference::NonVeg, (19, 5)),
        ("22015A", MealType::Lunch, FoodPreference::NonVeg, (13, 10)),
        ("240233", MealType::Dinner, FoodPreference::Veg, (20, 15)),
    ];

    for (roll_number, meal, preference, (hour, minute)) in events {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).context("invalid time")?;
        let recorded_at = today.and_time(time).and_utc();
        let source_key = format!("seed-{today}-{roll_number}-{}", meal.as_str());

        sqlx::query(
            r#"
            INSERT INTO mess_attendance.attendance
            (id, student_id, meal_type, food_preference, recorded_at, source_key)
            SELECT $1, s.id, $2, $3, $4, $5
            FROM mess_attendance.students s
            WHERE s.roll_number = $6
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(meal.as_str())
        .bind(preference.as_str())
        .bind(recorded_at)
        .bind(source_key)
        .bind(roll_number)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[derive(Debug, serde::Deserialize)]
pub struct RosterRow {
    pub roll_number: String,
    pub name: String,
}

/// Reads a roster CSV with `roll_number` and `name` columns.
pub fn read_roster_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<RosterRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<RosterRow>() {
        let row = result?;
        if row.roll_number.is_empty() {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}

pub async fn import_roster(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let rows = read_roster_csv(csv_path)?;
    let mut upserted = 0usize;

    for row in rows {
        let result = sqlx::query(
            r#"
            INSERT INTO mess_attendance.students (id, roll_number, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (roll_number) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.roll_number)
        .bind(&row.name)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            upserted += 1;
        }
    }

    Ok(upserted)
}

fn student_from_row(row: &PgRow) -> Student {
    Student {
        id: row.get("id"),
        roll_number: row.get("roll_number"),
        name: row.get("name"),
    }
}

pub async fn find_student_by_roll(
    pool: &PgPool,
    roll_number: &str,
) -> anyhow::Result<Option<Student>> {
    let row = sqlx::query(
        "SELECT id, roll_number, name FROM mess_attendance.students WHERE roll_number = $1",
    )
    .bind(roll_number)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(student_from_row))
}

pub async fn fetch_roster(pool: &PgPool) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        "SELECT id, roll_number, name FROM mess_attendance.students ORDER BY roll_number",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(student_from_row).collect())
}

pub async fn insert_attendance(
    pool: &PgPool,
    student_id: Uuid,
    meal: MealType,
    preference: FoodPreference,
    recorded_at: DateTime<Utc>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO mess_attendance.attendance
        (id, student_id, meal_type, food_preference, recorded_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(student_id)
    .bind(meal.as_str())
    .bind(preference.as_str())
    .bind(recorded_at)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Broadcasts a marked meal to `LISTEN attendance_marked` subscribers.
pub async fn notify_attendance(pool: &PgPool, marked: &MarkedAttendance) -> anyhow::Result<()> {
    let payload = serde_json::to_string(marked)?;
    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(ATTENDANCE_CHANNEL)
        .bind(payload)
        .execute(pool)
        .await?;
    Ok(())
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_after(date: NaiveDate) -> anyhow::Result<DateTime<Utc>> {
    let next = date.succ_opt().context("date out of range")?;
    Ok(day_start(next))
}

fn event_from_row(row: &PgRow) -> AttendanceEvent {
    let meal_type: String = row.get("meal_type");
    let food_preference: Option<String> = row.get("food_preference");
    AttendanceEvent {
        student_id: row.get("student_id"),
        meal_type: MealType::parse(&meal_type),
        food_preference: FoodPreference::parse(food_preference.as_deref().unwrap_or_default()),
        recorded_at: row.get("recorded_at"),
    }
}

/// Events recorded on `date` (UTC calendar day), optionally for one meal.
pub async fn fetch_events_on(
    pool: &PgPool,
    date: NaiveDate,
    meal: Option<MealType>,
) -> anyhow::Result<Vec<AttendanceEvent>> {
    let mut query = String::from(
        "SELECT student_id, meal_type, food_preference, recorded_at \
         FROM mess_attendance.attendance \
         WHERE recorded_at >= $1 AND recorded_at < $2",
    );

    if meal.is_some() {
        query.push_str(" AND lower(meal_type) = $3");
    }
    query.push_str(" ORDER BY recorded_at");

    let mut rows = sqlx::query(&query)
        .bind(day_start(date))
        .bind(day_after(date)?);

    if let Some(value) = meal {
        rows = rows.bind(value.as_str());
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(event_from_row).collect())
}

/// Events recorded between `start` and `end`, both days inclusive.
pub async fn fetch_events_between(
    pool: &PgPool,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<AttendanceEvent>> {
    let records = sqlx::query(
        r#"
        SELECT student_id, meal_type, food_preference, recorded_at
        FROM mess_attendance.attendance
        WHERE recorded_at >= $1 AND recorded_at < $2
        ORDER BY recorded_at
        "#,
    )
    .bind(day_start(start))
    .bind(day_after(end)?)
    .fetch_all(pool)
    .await?;

    Ok(records.iter().map(event_from_row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn day_bounds_cover_the_whole_utc_day() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        assert_eq!(day_start(date).to_rfc3339(), "2025-04-30T00:00:00+00:00");
        assert_eq!(day_after(date).unwrap().to_rfc3339(), "2025-05-01T00:00:00+00:00");
    }

    #[test]
    fn roster_csv_skips_blank_roll_numbers() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "roll_number,name").unwrap();
        writeln!(file, "220101, Ananya Rao").unwrap();
        writeln!(file, ",Nobody").unwrap();
        writeln!(file, "22015A,Rohit Verma").unwrap();

        let rows = read_roster_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].roll_number, "220101");
        assert_eq!(rows[0].name, "Ananya Rao");
        assert_eq!(rows[1].roll_number, "22015A");
    }

    #[test]
    fn missing_roster_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_roster_csv(&dir.path().join("absent.csv")).is_err());
    }
}
