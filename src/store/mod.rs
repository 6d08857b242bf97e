mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Roster operations
    fn create_student(&self, student: &Student) -> Result<()>;
    fn get_student(&self, id: &str) -> Result<Option<Student>>;
    fn get_student_by_roll(&self, roll_number: &str) -> Result<Option<Student>>;
    fn list_students(&self) -> Result<Vec<StudentUsage>>;
    fn delete_student(&self, id: &str) -> Result<bool>;

    // Pass operations
    fn create_pass(&self, pass: &LunchPass) -> Result<()>;
    fn get_pass_with_student(&self, token: &str) -> Result<Option<(LunchPass, Student)>>;
    fn get_active_pass(&self, student_id: &str) -> Result<Option<LunchPass>>;
    /// Atomically marks the pass used. Returns false if the token does not
    /// exist or was already redeemed; callers distinguish the two with a
    /// follow-up lookup.
    fn redeem_pass(&self, token: &str, used_at: DateTime<Utc>) -> Result<bool>;

    // Reporting
    fn count_students(&self) -> Result<i64>;
    fn count_passes(&self) -> Result<i64>;
    fn count_used_passes(&self) -> Result<i64>;
    fn recent_passes(&self, limit: i64) -> Result<Vec<PassActivity>>;

    // Admin token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;
}
