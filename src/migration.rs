//! Schema migrations from a directory of SQL revisions.
//!
//! Each revision is a pair of files named `<version>_<name>.up.sql` and
//! `<version>_<name>.down.sql`. Revisions apply in ascending version order.
//! The current position is kept in a single-row `schema_migrations` table
//! together with a dirty flag that stays set if a revision fails halfway.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

/// Migration failure.
#[derive(Debug)]
pub enum MigrationError {
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    Database(rusqlite::Error),
    /// Revision name is empty or contains path separators.
    InvalidName(String),
    /// A previous migration failed; the schema needs manual repair.
    Dirty(u64),
    /// The recorded version has no revision file in the directory.
    UnknownVersion(u64),
    /// A revision is missing its `.up.sql` or `.down.sql` file.
    MissingFile { version: u64, direction: Direction },
    /// Fewer revisions are available than the requested number of steps.
    ShortLimit { requested: usize, available: usize },
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::Io { path, error } => {
                write!(f, "IO error for '{}': {}", path.display(), error)
            }
            MigrationError::Database(e) => write!(f, "database error: {}", e),
            MigrationError::InvalidName(name) => write!(f, "invalid revision name '{}'", name),
            MigrationError::Dirty(v) => write!(f, "dirty database version {}, fix and retry", v),
            MigrationError::UnknownVersion(v) => {
                write!(f, "database version {} has no revision file", v)
            }
            MigrationError::MissingFile { version, direction } => {
                write!(f, "revision {} has no {} file", version, direction.suffix())
            }
            MigrationError::ShortLimit {
                requested,
                available,
            } => write!(
                f,
                "requested {} steps but only {} available",
                requested, available
            ),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Io { error, .. } => Some(error),
            MigrationError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for MigrationError {
    fn from(e: rusqlite::Error) -> Self {
        MigrationError::Database(e)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> MigrationError + '_ {
    move |error| MigrationError::Io {
        path: path.to_path_buf(),
        error,
    }
}

/// Migration direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn suffix(self) -> &'static str {
        match self {
            Direction::Up => ".up.sql",
            Direction::Down => ".down.sql",
        }
    }
}

/// Create an empty revision pair named after the current Unix time in
/// nanoseconds. Returns the two file names.
pub fn new_revision(dir: impl AsRef<Path>, name: &str) -> Result<(String, String), MigrationError> {
    if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') || name.contains("..") {
        return Err(MigrationError::InvalidName(name.to_string()));
    }

    let dir = dir.as_ref();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let base = format!("{}_{}", nanos, name);
    let up = format!("{}{}", base, Direction::Up.suffix());
    let down = format!("{}{}", base, Direction::Down.suffix());

    for file in [&up, &down] {
        let path = dir.join(file);
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_err(&path))?;
    }

    info!(up = %up, down = %down, "revision created");
    Ok((up, down))
}

/// One revision pair on disk.
#[derive(Clone, Debug)]
pub struct Revision {
    pub version: u64,
    pub name: String,
    up: Option<PathBuf>,
    down: Option<PathBuf>,
}

impl Revision {
    fn file(&self, direction: Direction) -> Result<&Path, MigrationError> {
        let path = match direction {
            Direction::Up => self.up.as_deref(),
            Direction::Down => self.down.as_deref(),
        };
        path.ok_or(MigrationError::MissingFile {
            version: self.version,
            direction,
        })
    }
}

/// Recorded schema position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchemaVersion {
    pub version: u64,
    pub dirty: bool,
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dirty {
            write!(f, "{} (dirty)", self.version)
        } else {
            write!(f, "{}", self.version)
        }
    }
}

/// Split `<version>_<name>.<up|down>.sql`.
fn parse_file_name(file_name: &str) -> Option<(u64, &str, Direction)> {
    let (stem, direction) = if let Some(stem) = file_name.strip_suffix(Direction::Up.suffix()) {
        (stem, Direction::Up)
    } else {
        (
            file_name.strip_suffix(Direction::Down.suffix())?,
            Direction::Down,
        )
    };
    let (version, name) = stem.split_once('_')?;
    Some((version.parse().ok()?, name, direction))
}

/// Applies revisions from a directory to one connection.
pub struct Migrator {
    dir: PathBuf,
    conn: Connection,
}

impl Migrator {
    /// Create a migrator, ensuring the `schema_migrations` table exists.
    pub fn new(dir: impl Into<PathBuf>, conn: Connection) -> Result<Self, MigrationError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER NOT NULL PRIMARY KEY,
                dirty INTEGER NOT NULL
            )",
        )?;
        Ok(Self {
            dir: dir.into(),
            conn,
        })
    }

    /// Revisions found in the directory, ascending.
    pub fn revisions(&self) -> Result<Vec<Revision>, MigrationError> {
        let mut found: BTreeMap<u64, Revision> = BTreeMap::new();

        for entry in fs::read_dir(&self.dir).map_err(io_err(&self.dir))? {
            let entry = entry.map_err(io_err(&self.dir))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some((version, name, direction)) = parse_file_name(file_name) else {
                debug!(file = file_name, "skipping non-revision file");
                continue;
            };

            let revision = found.entry(version).or_insert_with(|| Revision {
                version,
                name: name.to_string(),
                up: None,
                down: None,
            });
            match direction {
                Direction::Up => revision.up = Some(entry.path()),
                Direction::Down => revision.down = Some(entry.path()),
            }
        }

        Ok(found.into_values().collect())
    }

    /// Current schema position, `None` before the first revision.
    pub fn version(&self) -> Result<Option<SchemaVersion>, MigrationError> {
        let version = self
            .conn
            .query_row(
                "SELECT version, dirty FROM schema_migrations LIMIT 1",
                [],
                |row| {
                    Ok(SchemaVersion {
                        version: row.get::<_, i64>(0)? as u64,
                        dirty: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(version)
    }

    /// Apply every pending revision. Returns the number applied.
    pub fn up(&mut self) -> Result<usize, MigrationError> {
        let (revisions, applied) = self.position()?;
        let pending = revisions.len() - applied;
        self.run(&revisions, applied, pending as i64)
    }

    /// Revert every applied revision. Returns the number reverted.
    pub fn down(&mut self) -> Result<usize, MigrationError> {
        let (revisions, applied) = self.position()?;
        self.run(&revisions, applied, -(applied as i64))
    }

    /// Apply `n` revisions forward (`n > 0`) or revert `-n` (`n < 0`).
    pub fn steps(&mut self, n: i64) -> Result<usize, MigrationError> {
        let (revisions, applied) = self.position()?;
        self.run(&revisions, applied, n)
    }

    /// All revisions plus how many of them are applied.
    fn position(&self) -> Result<(Vec<Revision>, usize), MigrationError> {
        let revisions = self.revisions()?;
        let applied = match self.version()? {
            None => 0,
            Some(SchemaVersion { version, dirty: true }) => {
                return Err(MigrationError::Dirty(version))
            }
            Some(SchemaVersion { version, .. }) => revisions
                .iter()
                .position(|r| r.version == version)
                .map(|i| i + 1)
                .ok_or(MigrationError::UnknownVersion(version))?,
        };
        Ok((revisions, applied))
    }

    fn run(&mut self, revisions: &[Revision], applied: usize, n: i64) -> Result<usize, MigrationError> {
        let count = n.unsigned_abs() as usize;
        let available = if n >= 0 {
            revisions.len() - applied
        } else {
            applied
        };
        if count > available {
            return Err(MigrationError::ShortLimit {
                requested: count,
                available,
            });
        }

        if n >= 0 {
            for revision in &revisions[applied..applied + count] {
                self.apply(revision, Direction::Up, Some(revision.version))?;
            }
        } else {
            for i in (applied - count..applied).rev() {
                let previous = i.checked_sub(1).map(|p| revisions[p].version);
                self.apply(&revisions[i], Direction::Down, previous)?;
            }
        }
        Ok(count)
    }

    /// Run one revision file, leaving the version dirty if it fails.
    fn apply(
        &mut self,
        revision: &Revision,
        direction: Direction,
        target: Option<u64>,
    ) -> Result<(), MigrationError> {
        let path = revision.file(direction)?;
        let sql = fs::read_to_string(path).map_err(io_err(path))?;

        write_version(&self.conn, Some(revision.version), true)?;

        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)?;
        write_version(&tx, target, false)?;
        tx.commit()?;

        info!(
            version = revision.version,
            name = %revision.name,
            direction = ?direction,
            "migration applied"
        );
        Ok(())
    }
}

fn write_version(conn: &Connection, version: Option<u64>, dirty: bool) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM schema_migrations", [])?;
    if let Some(version) = version {
        conn.execute(
            "INSERT INTO schema_migrations (version, dirty) VALUES (?1, ?2)",
            params![version as i64, dirty],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, sql: &str) {
        fs::write(dir.join(name), sql).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1_links.up.sql", "CREATE TABLE links (key TEXT PRIMARY KEY, url TEXT);");
        write(dir.path(), "1_links.down.sql", "DROP TABLE links;");
        write(dir.path(), "2_tags.up.sql", "CREATE TABLE tags (name TEXT);");
        write(dir.path(), "2_tags.down.sql", "DROP TABLE tags;");
        write(dir.path(), "README.md", "not a revision");
        dir
    }

    fn table_exists(migrator: &Migrator, name: &str) -> bool {
        migrator
            .conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .unwrap()
            == 1
    }

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("1700000000_create_links.up.sql"),
            Some((1_700_000_000, "create_links", Direction::Up))
        );
        assert_eq!(
            parse_file_name("2_x.down.sql"),
            Some((2, "x", Direction::Down))
        );
        assert_eq!(parse_file_name("abc_x.up.sql"), None);
        assert_eq!(parse_file_name("1_x.sql"), None);
        assert_eq!(parse_file_name("README.md"), None);
    }

    #[test]
    fn test_up_and_down() {
        let dir = fixture();
        let mut migrator =
            Migrator::new(dir.path(), Connection::open_in_memory().unwrap()).unwrap();

        assert_eq!(migrator.version().unwrap(), None);
        assert_eq!(migrator.up().unwrap(), 2);
        assert_eq!(
            migrator.version().unwrap(),
            Some(SchemaVersion {
                version: 2,
                dirty: false
            })
        );
        assert!(table_exists(&migrator, "links"));
        assert!(table_exists(&migrator, "tags"));

        // Already at head.
        assert_eq!(migrator.up().unwrap(), 0);

        assert_eq!(migrator.down().unwrap(), 2);
        assert_eq!(migrator.version().unwrap(), None);
        assert!(!table_exists(&migrator, "links"));
    }

    #[test]
    fn test_steps() {
        let dir = fixture();
        let mut migrator =
            Migrator::new(dir.path(), Connection::open_in_memory().unwrap()).unwrap();

        assert_eq!(migrator.steps(1).unwrap(), 1);
        assert_eq!(migrator.version().unwrap().unwrap().version, 1);
        assert!(!table_exists(&migrator, "tags"));

        assert_eq!(migrator.steps(1).unwrap(), 1);
        assert_eq!(migrator.steps(-1).unwrap(), 1);
        assert_eq!(migrator.version().unwrap().unwrap().version, 1);

        let err = migrator.steps(5).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::ShortLimit {
                requested: 5,
                available: 1
            }
        ));
        assert_eq!(migrator.steps(0).unwrap(), 0);
    }

    #[test]
    fn test_failed_revision_leaves_dirty() {
        let dir = fixture();
        write(dir.path(), "3_broken.up.sql", "CREATE TABLE oops (");
        write(dir.path(), "3_broken.down.sql", "");
        let mut migrator =
            Migrator::new(dir.path(), Connection::open_in_memory().unwrap()).unwrap();

        assert!(matches!(migrator.up(), Err(MigrationError::Database(_))));
        assert_eq!(
            migrator.version().unwrap(),
            Some(SchemaVersion {
                version: 3,
                dirty: true
            })
        );
        assert!(matches!(migrator.up(), Err(MigrationError::Dirty(3))));
        assert!(table_exists(&migrator, "tags"));
    }

    #[test]
    fn test_missing_down_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1_only_up.up.sql", "CREATE TABLE t (x INTEGER);");
        let mut migrator =
            Migrator::new(dir.path(), Connection::open_in_memory().unwrap()).unwrap();

        migrator.up().unwrap();
        let err = migrator.down().unwrap_err();
        assert!(matches!(
            err,
            MigrationError::MissingFile {
                version: 1,
                direction: Direction::Down
            }
        ));
    }

    #[test]
    fn test_new_revision() {
        let dir = tempfile::tempdir().unwrap();
        let (up, down) = new_revision(dir.path(), "create_links").unwrap();

        assert!(up.ends_with("_create_links.up.sql"));
        assert!(down.ends_with("_create_links.down.sql"));
        assert_eq!(fs::read_to_string(dir.path().join(&up)).unwrap(), "");
        assert!(dir.path().join(&down).exists());

        let migrator = Migrator::new(dir.path(), Connection::open_in_memory().unwrap()).unwrap();
        let revisions = migrator.revisions().unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].name, "create_links");
    }

    #[test]
    fn test_new_revision_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            new_revision(dir.path(), ""),
            Err(MigrationError::InvalidName(_))
        ));
        assert!(matches!(
            new_revision(dir.path(), "../escape"),
            Err(MigrationError::InvalidName(_))
        ));
    }

    #[test]
    fn test_new_revision_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = new_revision(dir.path().join("absent"), "x").unwrap_err();
        assert!(matches!(err, MigrationError::Io { .. }));
    }

    #[test]
    fn test_shipped_migrations() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        let mut migrator = Migrator::new(dir, Connection::open_in_memory().unwrap()).unwrap();

        assert!(migrator.up().unwrap() >= 1);
        assert!(table_exists(&migrator, "links"));
        migrator.down().unwrap();
        assert!(!table_exists(&migrator, "links"));
    }
}
