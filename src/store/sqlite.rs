use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Maps a pass-insert failure to the violated constraint: the global token
/// index or the single-active-pass partial index.
fn classify_pass_conflict(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(e, Some(msg)) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            if msg.contains("passes.token") {
                return Error::TokenCollision;
            }
            if msg.contains("passes.student_id") {
                return Error::ActivePassConflict;
            }
        }
    }
    Error::from(err)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Roster operations

    fn create_student(&self, student: &Student) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO students (id, roll_number, name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                student.id,
                student.roll_number,
                student.name,
                format_datetime(&student.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicateRollNumber)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_student(&self, id: &str) -> Result<Option<Student>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, roll_number, name, created_at FROM students WHERE id = ?1",
            params![id],
            |row| {
                Ok(Student {
                    id: row.get(0)?,
                    roll_number: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_student_by_roll(&self, roll_number: &str) -> Result<Option<Student>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, roll_number, name, created_at FROM students WHERE roll_number = ?1",
            params![roll_number],
            |row| {
                Ok(Student {
                    id: row.get(0)?,
                    roll_number: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_students(&self) -> Result<Vec<StudentUsage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.roll_number, s.name, s.created_at,
                    COUNT(p.id), COALESCE(SUM(p.used), 0)
             FROM students s
             LEFT JOIN passes p ON p.student_id = s.id
             GROUP BY s.id
             ORDER BY s.rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(StudentUsage {
                student: Student {
                    id: row.get(0)?,
                    roll_number: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                },
                passes_total: row.get(4)?,
                passes_used: row.get(5)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_student(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM students WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Pass operations

    fn create_pass(&self, pass: &LunchPass) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO passes (id, student_id, token, issued_at, used, used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    pass.id,
                    pass.student_id,
                    pass.token,
                    format_datetime(&pass.issued_at),
                    pass.used,
                    pass.used_at.as_ref().map(format_datetime),
                ],
            )
            .map_err(classify_pass_conflict)?;
        Ok(())
    }

    fn get_pass_with_student(&self, token: &str) -> Result<Option<(LunchPass, Student)>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT p.id, p.student_id, p.token, p.issued_at, p.used, p.used_at,
                    s.id, s.roll_number, s.name, s.created_at
             FROM passes p
             JOIN students s ON s.id = p.student_id
             WHERE p.token = ?1",
            params![token],
            |row| {
                Ok((
                    LunchPass {
                        id: row.get(0)?,
                        student_id: row.get(1)?,
                        token: row.get(2)?,
                        issued_at: parse_datetime(&row.get::<_, String>(3)?),
                        used: row.get(4)?,
                        used_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                    },
                    Student {
                        id: row.get(6)?,
                        roll_number: row.get(7)?,
                        name: row.get(8)?,
                        created_at: parse_datetime(&row.get::<_, String>(9)?),
                    },
                ))
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_active_pass(&self, student_id: &str) -> Result<Option<LunchPass>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, student_id, token, issued_at, used, used_at
             FROM passes WHERE student_id = ?1 AND used = 0",
            params![student_id],
            |row| {
                Ok(LunchPass {
                    id: row.get(0)?,
                    student_id: row.get(1)?,
                    token: row.get(2)?,
                    issued_at: parse_datetime(&row.get::<_, String>(3)?),
                    used: row.get(4)?,
                    used_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn redeem_pass(&self, token: &str, used_at: DateTime<Utc>) -> Result<bool> {
        // Check-then-mark as one conditional update so two scanners racing
        // on the same token see exactly one affected row between them.
        let rows = self.conn().execute(
            "UPDATE passes SET used = 1, used_at = ?2 WHERE token = ?1 AND used = 0",
            params![token, format_datetime(&used_at)],
        )?;
        Ok(rows > 0)
    }

    // Reporting

    fn count_students(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        Ok(count)
    }

    fn count_passes(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM passes", [], |row| row.get(0))?;
        Ok(count)
    }

    fn count_used_passes(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passes WHERE used = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn recent_passes(&self, limit: i64) -> Result<Vec<PassActivity>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.name, s.roll_number, p.issued_at, p.used, p.used_at
             FROM passes p
             JOIN students s ON s.id = p.student_id
             ORDER BY p.rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(PassActivity {
                student_name: row.get(0)?,
                roll_number: row.get(1)?,
                issued_at: parse_datetime(&row.get::<_, String>(2)?),
                used: row.get(3)?,
                used_at: row.get::<_, Option<String>>(4)?.map(|s| parse_datetime(&s)),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Admin token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::TokenCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                    expires_at: row.get::<_, Option<String>>(4)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn open_store(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
    }

    fn sample_student(roll: &str, name: &str) -> Student {
        Student {
            id: Uuid::new_v4().to_string(),
            roll_number: roll.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    fn sample_pass(student_id: &str, token: &str) -> LunchPass {
        LunchPass {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            token: token.to_string(),
            issued_at: Utc::now(),
            used: false,
            used_at: None,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"students".to_string()));
        assert!(tables.contains(&"passes".to_string()));
        assert!(tables.contains(&"tokens".to_string()));
    }

    #[test]
    fn test_student_crud() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let student = sample_student("1602", "Anand Sharma");
        store.create_student(&student).unwrap();

        let fetched = store.get_student_by_roll("1602").unwrap().unwrap();
        assert_eq!(fetched.name, "Anand Sharma");

        let listed = store.list_students().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].passes_total, 0);

        let deleted = store.delete_student(&student.id).unwrap();
        assert!(deleted);
        assert!(store.get_student_by_roll("1602").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_roll_number_rejected() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store
            .create_student(&sample_student("1602", "Anand Sharma"))
            .unwrap();
        let result = store.create_student(&sample_student("1602", "Someone Else"));
        assert!(matches!(result, Err(Error::DuplicateRollNumber)));
    }

    #[test]
    fn test_list_students_preserves_insertion_order() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        for (roll, name) in [("1603", "Priya Singh"), ("1602", "Anand Sharma")] {
            store.create_student(&sample_student(roll, name)).unwrap();
        }

        let rolls: Vec<String> = store
            .list_students()
            .unwrap()
            .into_iter()
            .map(|s| s.student.roll_number)
            .collect();
        assert_eq!(rolls, vec!["1603", "1602"]);
    }

    #[test]
    fn test_token_collision_detected() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let s1 = sample_student("1602", "Anand Sharma");
        let s2 = sample_student("1603", "Priya Singh");
        store.create_student(&s1).unwrap();
        store.create_student(&s2).unwrap();

        store.create_pass(&sample_pass(&s1.id, "token-abc")).unwrap();
        let result = store.create_pass(&sample_pass(&s2.id, "token-abc"));
        assert!(matches!(result, Err(Error::TokenCollision)));
    }

    #[test]
    fn test_second_unused_pass_rejected() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let student = sample_student("1602", "Anand Sharma");
        store.create_student(&student).unwrap();

        store
            .create_pass(&sample_pass(&student.id, "token-1"))
            .unwrap();
        let result = store.create_pass(&sample_pass(&student.id, "token-2"));
        assert!(matches!(result, Err(Error::ActivePassConflict)));

        // After redemption a fresh pass is allowed again
        assert!(store.redeem_pass("token-1", Utc::now()).unwrap());
        store
            .create_pass(&sample_pass(&student.id, "token-2"))
            .unwrap();
    }

    #[test]
    fn test_redeem_is_one_shot() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let student = sample_student("1602", "Anand Sharma");
        store.create_student(&student).unwrap();
        store
            .create_pass(&sample_pass(&student.id, "token-1"))
            .unwrap();

        assert!(store.redeem_pass("token-1", Utc::now()).unwrap());
        assert!(!store.redeem_pass("token-1", Utc::now()).unwrap());
        assert!(!store.redeem_pass("no-such-token", Utc::now()).unwrap());

        let (pass, _) = store.get_pass_with_student("token-1").unwrap().unwrap();
        assert!(pass.used);
        assert!(pass.used_at.is_some());
    }

    #[test]
    fn test_concurrent_redeems_grant_once() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(open_store(&temp));

        let student = sample_student("1602", "Anand Sharma");
        store.create_student(&student).unwrap();
        store
            .create_pass(&sample_pass(&student.id, "token-race"))
            .unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.redeem_pass("token-race", Utc::now()).unwrap())
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();
        assert_eq!(granted, 1);
    }

    #[test]
    fn test_delete_student_cascades_to_passes() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let student = sample_student("1602", "Anand Sharma");
        store.create_student(&student).unwrap();
        store
            .create_pass(&sample_pass(&student.id, "token-1"))
            .unwrap();
        store.redeem_pass("token-1", Utc::now()).unwrap();
        store
            .create_pass(&sample_pass(&student.id, "token-2"))
            .unwrap();

        store.delete_student(&student.id).unwrap();

        assert!(store.get_pass_with_student("token-1").unwrap().is_none());
        assert!(store.get_pass_with_student("token-2").unwrap().is_none());
        assert_eq!(store.count_passes().unwrap(), 0);
    }

    #[test]
    fn test_counts_and_recent_activity() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        assert_eq!(store.count_students().unwrap(), 0);
        assert_eq!(store.count_passes().unwrap(), 0);
        assert_eq!(store.count_used_passes().unwrap(), 0);

        let s1 = sample_student("1602", "Anand Sharma");
        let s2 = sample_student("1603", "Priya Singh");
        store.create_student(&s1).unwrap();
        store.create_student(&s2).unwrap();
        store.create_pass(&sample_pass(&s1.id, "token-1")).unwrap();
        store.create_pass(&sample_pass(&s2.id, "token-2")).unwrap();
        store.redeem_pass("token-1", Utc::now()).unwrap();

        assert_eq!(store.count_students().unwrap(), 2);
        assert_eq!(store.count_passes().unwrap(), 2);
        assert_eq!(store.count_used_passes().unwrap(), 1);

        let activity = store.recent_passes(10).unwrap();
        assert_eq!(activity.len(), 2);
        // Most recently issued first
        assert_eq!(activity[0].roll_number, "1603");
        assert!(!activity[0].used);
        assert!(activity[1].used);
        assert!(activity[1].used_at.is_some());

        let limited = store.recent_passes(1).unwrap();
        assert_eq!(limited.len(), 1);
    }
}
