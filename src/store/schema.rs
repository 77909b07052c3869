pub const SCHEMA: &str = r#"
-- Projects: one row per logical tenant
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,

    -- Operator-chosen secret, stored verbatim (see DESIGN.md)
    password TEXT NOT NULL,

    -- 'Private' or 'Publish'; only published projects answer public queries
    privacy TEXT NOT NULL DEFAULT 'Private',

    -- Backend database name derived from the project name at creation.
    -- UNIQUE rejects distinct names that sanitize identically.
    backend_db TEXT NOT NULL UNIQUE,

    -- Public-path key; NULL until generated, overwritten on regeneration
    api_key TEXT,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Operator tokens
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of the raw token id for fast lookup

    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_projects_backend_db ON projects(backend_db);
"#;
