use chrono::{Local, NaiveTime, Timelike};

use crate::models::MealType;

/// The meal being served at `time`: lunch from 12:00 until 15:00, dinner
/// from 18:30 until 23:00.
pub fn meal_at(time: NaiveTime) -> Option<MealType> {
    let minutes = time.hour() * 60 + time.minute();
    match minutes {
        720..=899 => Some(MealType::Lunch),
        1110..=1379 => Some(MealType::Dinner),
        _ => None,
    }
}

pub fn current_meal() -> Option<MealType> {
    meal_at(Local::now().time())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn lunch_window_edges() {
        assert_eq!(meal_at(at(11, 59)), None);
        assert_eq!(meal_at(at(12, 0)), Some(MealType::Lunch));
        assert_eq!(meal_at(at(14, 59)), Some(MealType::Lunch));
        assert_eq!(meal_at(at(15, 0)), None);
    }

    #[test]
    fn dinner_window_edges() {
        assert_eq!(meal_at(at(18, 29)), None);
        assert_eq!(meal_at(at(18, 30)), Some(MealType::Dinner));
        assert_eq!(meal_at(at(22, 59)), Some(MealType::Dinner));
        assert_eq!(meal_at(at(23, 0)), None);
    }
}
