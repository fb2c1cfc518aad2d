/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar dates (time entry `date`, milestone start/end) carry no zone.
pub type Date = chrono::NaiveDate;
