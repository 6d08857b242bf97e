use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    /// Canonical roll number: trimmed and uppercased before storage.
    pub roll_number: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LunchPass {
    pub id: String,
    pub student_id: String,
    #[serde(skip)]
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

/// A student annotated with pass usage, for the admin roster view.
#[derive(Debug, Clone, Serialize)]
pub struct StudentUsage {
    #[serde(flatten)]
    pub student: Student,
    pub passes_total: i64,
    pub passes_used: i64,
}

/// One row of the dashboard activity feed: a pass joined with its owner.
#[derive(Debug, Clone, Serialize)]
pub struct PassActivity {
    pub student_name: String,
    pub roll_number: String,
    pub issued_at: DateTime<Utc>,
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

/// Admin auth credential. The raw secret is never stored; only the
/// argon2id hash and a short lookup prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Dashboard counters. `usage_percentage` is rounded to one decimal and
/// defined as 0.0 when no passes have been issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub total_students: i64,
    pub total_passes_generated: i64,
    pub total_passes_used: i64,
    pub passes_remaining: i64,
    pub usage_percentage: f64,
}

/// Normalizes a roll number to its canonical form: whitespace trimmed,
/// uppercased. All lookups and inserts go through this.
#[must_use]
pub fn normalize_roll_number(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_roll_number() {
        assert_eq!(normalize_roll_number("  1602 "), "1602");
        assert_eq!(normalize_roll_number("ab12cd"), "AB12CD");
        assert_eq!(normalize_roll_number("   "), "");
    }
}
