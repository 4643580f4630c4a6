use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use uuid::Uuid;

pub const ACADEMIC_YEARS: std::ops::RangeInclusive<i32> = 1..=4;

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub roll_number: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum MealType {
    Lunch,
    Dinner,
    /// Anything stored that is neither lunch nor dinner.
    #[value(skip)]
    Unclassified,
}

impl MealType {
    pub const SERVED: [MealType; 2] = [MealType::Lunch, MealType::Dinner];

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lunch" => MealType::Lunch,
            "dinner" => MealType::Dinner,
            _ => MealType::Unclassified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Unclassified => "unclassified",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Unclassified => "Unclassified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FoodPreference {
    Veg,
    NonVeg,
    #[value(skip)]
    Unclassified,
}

impl FoodPreference {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "veg" => FoodPreference::Veg,
            "non-veg" => FoodPreference::NonVeg,
            _ => FoodPreference::Unclassified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FoodPreference::Veg => "veg",
            FoodPreference::NonVeg => "non-veg",
            FoodPreference::Unclassified => "unclassified",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceEvent {
    pub student_id: Uuid,
    pub meal_type: MealType,
    pub food_preference: FoodPreference,
    pub recorded_at: DateTime<Utc>,
}

impl AttendanceEvent {
    /// Calendar date of the event, independent of time of day.
    pub fn date(&self) -> NaiveDate {
        self.recorded_at.date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YearBucket {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
}

/// Year buckets for academic years 1 through 4, stored at `year - 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByYear([YearBucket; 4]);

impl ByYear {
    pub fn get(&self, year: i32) -> Option<&YearBucket> {
        self.0.get(Self::index(year)?)
    }

    pub fn get_mut(&mut self, year: i32) -> Option<&mut YearBucket> {
        self.0.get_mut(Self::index(year)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &YearBucket)> {
        ACADEMIC_YEARS.zip(self.0.iter())
    }

    fn index(year: i32) -> Option<usize> {
        if ACADEMIC_YEARS.contains(&year) {
            usize::try_from(year - 1).ok()
        } else {
            None
        }
    }
}

impl Serialize for ByYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (year, bucket) in self.iter() {
            map.serialize_entry(&year, bucket)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealBucket {
    pub total: usize,
    pub present: usize,
    /// `total - present`; negative when repeat visits to one meal outnumber
    /// the roster.
    pub absent: i64,
    pub veg: usize,
    pub non_veg: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ByMeal {
    pub lunch: MealBucket,
    pub dinner: MealBucket,
}

impl ByMeal {
    pub fn get(&self, meal: MealType) -> Option<&MealBucket> {
        match meal {
            MealType::Lunch => Some(&self.lunch),
            MealType::Dinner => Some(&self.dinner),
            MealType::Unclassified => None,
        }
    }

    pub fn get_mut(&mut self, meal: MealType) -> Option<&mut MealBucket> {
        match meal {
            MealType::Lunch => Some(&mut self.lunch),
            MealType::Dinner => Some(&mut self.dinner),
            MealType::Unclassified => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub by_year: ByYear,
    pub by_meal: ByMeal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MealSeries {
    pub lunch: Vec<usize>,
    pub dinner: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSeries {
    pub veg: Vec<usize>,
    pub non_veg: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyStats {
    pub dates: Vec<String>,
    pub attendance: MealSeries,
    pub preferences: PreferenceSeries,
}

/// Confirmation of a recorded meal, also used as the notification payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedAttendance {
    pub roll_number: String,
    pub name: String,
    /// Shown in the confirmation line only.
    #[serde(skip_serializing)]
    pub year: Option<i32>,
    pub meal_type: &'static str,
    pub food_preference: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_and_preference_parsing_ignores_case() {
        assert_eq!(MealType::parse("LUNCH"), MealType::Lunch);
        assert_eq!(MealType::parse(" Dinner "), MealType::Dinner);
        assert_eq!(MealType::parse("breakfast"), MealType::Unclassified);
        assert_eq!(FoodPreference::parse("Non-Veg"), FoodPreference::NonVeg);
        assert_eq!(FoodPreference::parse("VEG"), FoodPreference::Veg);
        assert_eq!(FoodPreference::parse("vegan"), FoodPreference::Unclassified);
        assert_eq!(FoodPreference::parse(""), FoodPreference::Unclassified);
    }

    #[test]
    fn year_buckets_reject_out_of_range_years() {
        let mut by_year = ByYear::default();
        assert!(by_year.get_mut(0).is_none());
        assert!(by_year.get_mut(5).is_none());
        assert!(by_year.get_mut(-3).is_none());

        if let Some(bucket) = by_year.get_mut(4) {
            bucket.total += 2;
        }
        assert_eq!(by_year.get(4).map(|bucket| bucket.total), Some(2));
        assert_eq!(by_year.iter().map(|(year, _)| year).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn daily_stats_serialize_with_camel_case_and_year_keys() {
        let value = serde_json::to_value(DailyStats::default()).unwrap();
        assert!(value["byYear"]["1"]["total"].is_number());
        assert!(value["byYear"]["4"]["absent"].is_number());
        assert!(value["byMeal"]["lunch"]["nonVeg"].is_number());
        assert!(value["byMeal"]["dinner"]["veg"].is_number());
    }

    #[test]
    fn marked_attendance_payload_omits_year() {
        let marked = MarkedAttendance {
            roll_number: "22015A".to_string(),
            name: "Rohit Verma".to_string(),
            year: Some(4),
            meal_type: MealType::Lunch.as_str(),
            food_preference: FoodPreference::NonVeg.as_str(),
            timestamp: chrono::Utc::now(),
        };

        let value = serde_json::to_value(&marked).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["foodPreference", "mealType", "name", "rollNumber", "timestamp"]
        );
        assert_eq!(value["mealType"], "lunch");
        assert_eq!(value["foodPreference"], "non-veg");
    }
}
