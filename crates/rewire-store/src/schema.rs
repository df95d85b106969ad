/// The full Rewire schema: five tables plus the indexes SPEC_FULL.md §6
/// requires. `CREATE ... IF NOT EXISTS` makes this safe to run against an
/// existing database, so the same call path serves both `--init-db` on a
/// fresh file and normal startup against an existing one.
pub const SCHEMA: &str = r"
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS expectations (
  id TEXT PRIMARY KEY,
  type TEXT NOT NULL CHECK(type IN ('schedule', 'alert_path')),
  name TEXT NOT NULL,
  expected_interval_s INTEGER NOT NULL CHECK(expected_interval_s >= 60),
  tolerance_s INTEGER NOT NULL DEFAULT 0 CHECK(tolerance_s >= 0),
  params_json TEXT NOT NULL,
  owner_email TEXT NOT NULL,
  is_enabled INTEGER NOT NULL DEFAULT 1 CHECK(is_enabled IN (0, 1)),
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS observations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  expectation_id TEXT NOT NULL,
  kind TEXT NOT NULL CHECK(kind IN ('start', 'end', 'ping', 'ack')),
  observed_at INTEGER NOT NULL,
  meta_json TEXT,
  FOREIGN KEY(expectation_id) REFERENCES expectations(id)
);

CREATE INDEX IF NOT EXISTS idx_obs_exp_time ON observations(expectation_id, observed_at);

CREATE TABLE IF NOT EXISTS alert_trials (
  id TEXT PRIMARY KEY,
  expectation_id TEXT NOT NULL,
  sent_at INTEGER NOT NULL,
  acked_at INTEGER,
  status TEXT NOT NULL CHECK(status IN ('pending', 'acked', 'expired')),
  meta_json TEXT,
  FOREIGN KEY(expectation_id) REFERENCES expectations(id)
);

CREATE INDEX IF NOT EXISTS idx_trials_exp ON alert_trials(expectation_id);
CREATE INDEX IF NOT EXISTS idx_trials_status ON alert_trials(status);

CREATE TABLE IF NOT EXISTS violations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  expectation_id TEXT NOT NULL,
  detected_at INTEGER NOT NULL,
  code TEXT NOT NULL,
  message TEXT NOT NULL,
  evidence_json TEXT NOT NULL,
  is_open INTEGER NOT NULL DEFAULT 1 CHECK(is_open IN (0, 1)),
  last_notified_at INTEGER,
  FOREIGN KEY(expectation_id) REFERENCES expectations(id)
);

CREATE INDEX IF NOT EXISTS idx_viol_open ON violations(expectation_id, is_open);
CREATE INDEX IF NOT EXISTS idx_viol_code ON violations(expectation_id, code);
";
