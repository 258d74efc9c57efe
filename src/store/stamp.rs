//! Unique stamps for new category records.

use chrono::Utc;
use uuid::Uuid;

/// Source of unique identifiers for new records
pub trait StampGenerator {
    fn generate(&self) -> String;
}

/// Stamps of the form `host+yymmddHHMMSS+abc123`
#[derive(Debug, Clone)]
pub struct HostStamp {
    host: String,
}

impl HostStamp {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Default for HostStamp {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl StampGenerator for HostStamp {
    fn generate(&self) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{}+{}+{}",
            self.host,
            Utc::now().format("%y%m%d%H%M%S"),
            &random[..6]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_shape() {
        let stamp = HostStamp::new("qbank.example.org").generate();
        let parts: Vec<&str> = stamp.split('+').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "qbank.example.org");
        assert_eq!(parts[1].len(), 12);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_stamps_differ() {
        let generator = HostStamp::default();
        assert_ne!(generator.generate(), generator.generate());
    }
}
