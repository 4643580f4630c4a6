use chrono::{Datelike, Local};

use crate::error::AttendanceError;

/// Program code that marks a lateral-entry admission.
const LATERAL_CODE: &str = "5A";

/// Derives the academic year of a student from their roll number.
///
/// Characters `[0, 2)` hold the joining year suffix and `[4, 6)` the
/// program code. Lateral entries count one year ahead. The result is not
/// clamped, so callers decide what to do with years outside `1..=4`.
pub fn resolve_year(roll_number: &str, reference_year: i32) -> Result<i32, AttendanceError> {
    if roll_number.chars().count() < 6 {
        return Err(AttendanceError::malformed(roll_number));
    }

    let suffix: String = roll_number.chars().take(2).collect();
    if !suffix.chars().all(|c| c.is_ascii_digit()) {
        return Err(AttendanceError::malformed(roll_number));
    }
    let joining_year = 2000
        + suffix
            .parse::<i32>()
            .map_err(|_| AttendanceError::malformed(roll_number))?;

    let code: String = roll_number.chars().skip(4).take(2).collect();
    let is_lateral = code.eq_ignore_ascii_case(LATERAL_CODE);

    Ok(reference_year - joining_year + i32::from(is_lateral))
}

pub fn current_year() -> i32 {
    Local::now().year()
}
