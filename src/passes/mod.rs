use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{LunchPass, PassActivity, Stats, Student, normalize_roll_number};

/// 32 bytes of CSPRNG output, base64url-encoded: 43 chars, 256 bits.
const TOKEN_BYTES: usize = 32;

/// Collisions are practically impossible at this entropy; the retry exists
/// so a constraint violation never surfaces to the caller.
const MAX_TOKEN_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct IssuedPass {
    pub token: String,
    pub student_name: String,
    pub roll_number: String,
}

#[derive(Debug, Clone)]
pub struct Redemption {
    pub student_name: String,
    pub roll_number: String,
}

/// The one authoritative pass lifecycle implementation. Every surface
/// (student portal, scanner, admin, dashboard) calls through here; none
/// touch pass rows directly.
pub struct PassService {
    store: Arc<dyn Store>,
}

impl PassService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Issues a single-use pass for the given roll number. If the student
    /// already holds an unused pass the existing token is returned inside
    /// `ActivePassExists` so the caller can re-display it instead of
    /// minting a duplicate.
    pub fn issue(&self, roll_number: &str) -> Result<IssuedPass> {
        let roll = normalize_roll_number(roll_number);
        if roll.is_empty() {
            return Err(Error::InputRequired("roll number"));
        }

        let student = self
            .store
            .get_student_by_roll(&roll)?
            .ok_or(Error::StudentNotFound)?;

        if let Some(existing) = self.store.get_active_pass(&student.id)? {
            return Err(Error::ActivePassExists {
                token: existing.token,
                student_name: student.name,
            });
        }

        for _ in 0..MAX_TOKEN_RETRIES {
            let token = generate_pass_token();
            let pass = LunchPass {
                id: Uuid::new_v4().to_string(),
                student_id: student.id.clone(),
                token: token.clone(),
                issued_at: Utc::now(),
                used: false,
                used_at: None,
            };

            match self.store.create_pass(&pass) {
                Ok(()) => {
                    return Ok(IssuedPass {
                        token,
                        student_name: student.name,
                        roll_number: student.roll_number,
                    });
                }
                Err(Error::TokenCollision) => continue,
                // A concurrent issue won the partial-index race; hand back
                // the winner's token, same as the pre-check above.
                Err(Error::ActivePassConflict) => {
                    let existing = self
                        .store
                        .get_active_pass(&student.id)?
                        .ok_or(Error::ActivePassConflict)?;
                    return Err(Error::ActivePassExists {
                        token: existing.token,
                        student_name: student.name,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::TokenCollision)
    }

    /// Validates a scanned token and marks it used. The mark is a single
    /// conditional update, so of two simultaneous scans exactly one is
    /// granted and the other sees `AlreadyRedeemed`.
    pub fn redeem(&self, token: &str) -> Result<Redemption> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InputRequired("token"));
        }

        let now = Utc::now();
        if self.store.redeem_pass(token, now)? {
            let (_, student) = self
                .store
                .get_pass_with_student(token)?
                .ok_or(Error::TokenNotFound)?;
            return Ok(Redemption {
                student_name: student.name,
                roll_number: student.roll_number,
            });
        }

        match self.store.get_pass_with_student(token)? {
            None => Err(Error::TokenNotFound),
            Some((pass, student)) => Err(Error::AlreadyRedeemed {
                student_name: student.name,
                used_at: pass.used_at.unwrap_or(now),
            }),
        }
    }

    pub fn stats(&self) -> Result<Stats> {
        let total_students = self.store.count_students()?;
        let total_passes_generated = self.store.count_passes()?;
        let total_passes_used = self.store.count_used_passes()?;

        let usage_percentage = if total_passes_generated > 0 {
            let raw = total_passes_used as f64 / total_passes_generated as f64 * 100.0;
            (raw * 10.0).round() / 10.0
        } else {
            0.0
        };

        Ok(Stats {
            total_students,
            total_passes_generated,
            total_passes_used,
            passes_remaining: total_passes_generated - total_passes_used,
            usage_percentage,
        })
    }

    pub fn recent_activity(&self, limit: i64) -> Result<Vec<PassActivity>> {
        self.store.recent_passes(limit)
    }

    // Roster operations are forwarded so callers only ever hold a
    // PassService; normalization happens here, once.

    pub fn create_student(&self, roll_number: &str, name: &str) -> Result<Student> {
        let roll = normalize_roll_number(roll_number);
        if roll.is_empty() {
            return Err(Error::InputRequired("roll number"));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InputRequired("name"));
        }

        let student = Student {
            id: Uuid::new_v4().to_string(),
            roll_number: roll,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_student(&student)?;
        Ok(student)
    }

    pub fn list_students(&self) -> Result<Vec<crate::types::StudentUsage>> {
        self.store.list_students()
    }

    pub fn delete_student(&self, id: &str) -> Result<()> {
        if self.store.delete_student(id)? {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }
}

fn generate_pass_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
