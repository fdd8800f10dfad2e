use chrono::{DateTime, Local};
use std::fmt;

pub type MetricName = String;

/// Format of the timestamp that opens every flushed line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One flush cycle's worth of rendered metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<Local>,
    pub fields: Vec<(MetricName, String)>, // registry insertion order
}

impl SnapshotRecord {
    pub fn new(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<MetricName>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Rendered value of the first field called `name`, if any.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The record as a single newline-terminated line.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for SnapshotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp.format(TIMESTAMP_FORMAT))?;
        for (name, value) in &self.fields {
            write!(f, " \"{}\" {}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 2)
            .unwrap()
            + chrono::Duration::milliseconds(41)
    }

    #[test]
    fn test_record_line_format() {
        let mut record = SnapshotRecord::new(fixed_time());
        record.push("C", "5");
        record.push("HTTP requests RPS", "3.00");

        assert_eq!(
            record.to_line(),
            "2024-03-07 09:05:02.041 \"C\" 5 \"HTTP requests RPS\" 3.00\n"
        );
    }

    #[test]
    fn test_empty_record_is_just_timestamp() {
        let record = SnapshotRecord::new(fixed_time());
        assert_eq!(record.to_string(), "2024-03-07 09:05:02.041");
    }

    #[test]
    fn test_value_of_returns_first_match() {
        let mut record = SnapshotRecord::new(fixed_time());
        record.push("dup", "1");
        record.push("dup", "2");

        assert_eq!(record.value_of("dup"), Some("1"));
        assert_eq!(record.value_of("missing"), None);
    }
}
