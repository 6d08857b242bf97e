pub const SCHEMA: &str = r#"
-- Roster: one row per registered student
CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY,
    roll_number TEXT NOT NULL UNIQUE,  -- stored canonical: trimmed, uppercase
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Lunch passes; a pass belongs to exactly one student
CREATE TABLE IF NOT EXISTS passes (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    token TEXT NOT NULL,
    issued_at TEXT DEFAULT (datetime('now')),
    used INTEGER NOT NULL DEFAULT 0,
    used_at TEXT                       -- NULL until redeemed, then immutable
);

-- Admin auth credentials
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- short prefix for fast lookup
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Tokens are globally unique across all passes ever issued
CREATE UNIQUE INDEX IF NOT EXISTS idx_passes_token ON passes(token);

-- At most one unused pass per student; concurrent issuers hit this
-- constraint instead of both inserting
CREATE UNIQUE INDEX IF NOT EXISTS idx_passes_active ON passes(student_id) WHERE used = 0;

CREATE INDEX IF NOT EXISTS idx_passes_student ON passes(student_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
"#;
