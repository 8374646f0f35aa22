//! Embedded DDL, applied at `init()`. Kept alongside the repository code
//! the way the teacher's Postgres layer keeps its schema next to its
//! repositories, rather than as a separate migrations crate.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scan_sessions (
    id              UUID PRIMARY KEY,
    domain          VARCHAR(255) NOT NULL,
    start_time      TIMESTAMPTZ NOT NULL,
    end_time        TIMESTAMPTZ,
    total_hosts     BIGINT NOT NULL DEFAULT 0,
    total_shares    BIGINT NOT NULL DEFAULT 0,
    total_sensitive BIGINT NOT NULL DEFAULT 0,
    status          VARCHAR(16) NOT NULL DEFAULT 'running'
);

CREATE TABLE IF NOT EXISTS shares (
    id              UUID PRIMARY KEY,
    session_id      UUID NOT NULL REFERENCES scan_sessions(id) ON DELETE CASCADE,
    hostname        VARCHAR(255) NOT NULL,
    share_name      VARCHAR(255) NOT NULL,
    access_level    VARCHAR(16) NOT NULL,
    error_message   TEXT,
    total_files     BIGINT NOT NULL DEFAULT 0,
    total_dirs      BIGINT NOT NULL DEFAULT 0,
    hidden_files    BIGINT NOT NULL DEFAULT 0,
    scan_time       TIMESTAMPTZ NOT NULL,
    UNIQUE (hostname, share_name, scan_time)
);

CREATE INDEX IF NOT EXISTS idx_shares_hostname ON shares(hostname);
CREATE INDEX IF NOT EXISTS idx_shares_scan_time ON shares(scan_time);
CREATE INDEX IF NOT EXISTS idx_shares_session_id ON shares(session_id);

CREATE TABLE IF NOT EXISTS root_files (
    id              BIGSERIAL PRIMARY KEY,
    share_id        UUID NOT NULL REFERENCES shares(id) ON DELETE CASCADE,
    name            VARCHAR(255) NOT NULL,
    kind            VARCHAR(16) NOT NULL,
    size_bytes      BIGINT NOT NULL DEFAULT 0,
    readonly        BOOLEAN NOT NULL DEFAULT FALSE,
    hidden          BOOLEAN NOT NULL DEFAULT FALSE,
    directory       BOOLEAN NOT NULL DEFAULT FALSE,
    created_at      TIMESTAMPTZ,
    modified_at     TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS sensitive_files (
    id              BIGSERIAL PRIMARY KEY,
    share_id        UUID NOT NULL REFERENCES shares(id) ON DELETE CASCADE,
    file_path       VARCHAR(4096) NOT NULL CHECK (length(file_path) <= 4096),
    file_name       VARCHAR(255) NOT NULL,
    detection_type  VARCHAR(50) NOT NULL,
    description     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sensitive_files_share_id ON sensitive_files(share_id);
CREATE INDEX IF NOT EXISTS idx_sensitive_files_detection_type ON sensitive_files(detection_type);

CREATE TABLE IF NOT EXISTS sensitive_patterns (
    id              UUID PRIMARY KEY,
    regex           TEXT NOT NULL,
    category        VARCHAR(64) NOT NULL,
    description     TEXT NOT NULL,
    enabled         BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE INDEX IF NOT EXISTS idx_sensitive_patterns_category ON sensitive_patterns(category);
"#;
