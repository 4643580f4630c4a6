use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("Malformed roll number: {roll_number:?}")]
    MalformedRollNumber { roll_number: String },

    #[error("{0} is required")]
    MissingRequiredParameter(&'static str),

    #[error("Invalid {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Student not found: {0}")]
    StudentNotFound(String),
}

impl AttendanceError {
    pub fn malformed(roll_number: &str) -> Self {
        AttendanceError::MalformedRollNumber {
            roll_number: roll_number.to_string(),
        }
    }
}
