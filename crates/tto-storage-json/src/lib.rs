//! tto-storage-json
//!
//! Filesystem-backed [`OfficeStorage`]: the whole book lives in one JSON file
//! that is replaced atomically on every commit, with the previous version kept
//! in a rotating backup directory.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tto_core::{
    Book, BookSnapshot, Clock, CoreError, CoreResult, OfficeStorage, SystemClock, WriteBatch,
};
use tto_domain::{Balance, Income, Payee, PaymentInstruction, Project};

const BOOK_FILE: &str = "book.json";
const BACKUP_PREFIX: &str = "book";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Where the book file and its backups live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub book_path: PathBuf,
    pub backup_root: PathBuf,
}

impl StoragePaths {
    /// `<root>/book.json` plus `<root>/backups/`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            book_path: root.join(BOOK_FILE),
            backup_root: root.join("backups"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackupMetadata {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// JSON persistence for the office book.
///
/// Commits are serialized by a mutex: the batch is applied to a staged copy of
/// the book, the staged copy is written to disk, and only then does it replace
/// the in-memory book. A failed write leaves both the file and memory as they
/// were.
///
/// Backup names are stamped by the injected clock. Writes stamped with the same
/// instant get increasing sequence numbers instead of replacing each other.
pub struct JsonOfficeStorage {
    paths: StoragePaths,
    retention: usize,
    clock: Arc<dyn Clock>,
    book: Mutex<Book>,
}

impl JsonOfficeStorage {
    pub fn open(paths: StoragePaths) -> CoreResult<Self> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    pub fn with_retention(paths: StoragePaths, retention: usize) -> CoreResult<Self> {
        Self::with_clock(paths, retention, Arc::new(SystemClock))
    }

    pub fn with_clock(
        paths: StoragePaths,
        retention: usize,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        if let Some(parent) = paths.book_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&paths.backup_root)?;
        let book = if paths.book_path.exists() {
            Book::from_snapshot(load_snapshot(&paths.book_path)?)
        } else {
            Book::default()
        };
        debug!(path = %paths.book_path.display(), "book opened");
        Ok(Self {
            paths,
            retention: retention.max(1),
            clock,
            book: Mutex::new(book),
        })
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn snapshot(&self) -> CoreResult<BookSnapshot> {
        Ok(self.lock()?.to_snapshot())
    }

    /// Writes a labelled copy of the current book into the backup directory.
    pub fn backup(&self, note: Option<&str>) -> CoreResult<BackupMetadata> {
        let book = self.lock()?;
        let name = self.next_backup_name(note)?;
        let path = self.paths.backup_root.join(&name);
        write_atomic(&path, &serialize_snapshot(&book.to_snapshot())?)?;
        self.prune_backups()?;
        info!(backup = %name, "book backup written");
        backup_metadata(&name, path)
    }

    /// Backups, newest first.
    pub fn list_backups(&self) -> CoreResult<Vec<BackupMetadata>> {
        if !self.paths.backup_root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.paths.backup_root)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION)
            {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort_by(|a, b| b.cmp(a));
        names
            .into_iter()
            .map(|name| {
                let path = self.paths.backup_root.join(&name);
                backup_metadata(&name, path)
            })
            .collect()
    }

    /// Replaces the book with the named backup. The current book is backed up first.
    pub fn restore_backup(&self, name: &str) -> CoreResult<()> {
        let path = self.paths.backup_root.join(name);
        if !path.is_file() {
            return Err(CoreError::Storage(format!("backup `{name}` not found")));
        }
        let restored = Book::from_snapshot(load_snapshot(&path)?);
        let mut book = self.lock()?;
        self.persist(&restored)?;
        *book = restored;
        info!(backup = %name, "book restored from backup");
        Ok(())
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, Book>> {
        self.book
            .lock()
            .map_err(|_| CoreError::Storage("book lock poisoned".into()))
    }

    fn persist(&self, book: &Book) -> CoreResult<()> {
        self.backup_existing_file()?;
        let json = serialize_snapshot(&book.to_snapshot())?;
        write_atomic(&self.paths.book_path, &json)
    }

    fn backup_existing_file(&self) -> CoreResult<()> {
        if !self.paths.book_path.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.paths.backup_root)?;
        let target = self.paths.backup_root.join(self.next_backup_name(None)?);
        fs::copy(&self.paths.book_path, target)?;
        self.prune_backups()
    }

    /// Callers hold the book lock, so no other writer can claim the same sequence.
    fn next_backup_name(&self, note: Option<&str>) -> CoreResult<String> {
        let stamp = backup_stamp(self.clock.now());
        let mut sequence = 0;
        for backup in self.list_backups()? {
            if let Some(taken) = backup_sequence(&backup.name, &stamp) {
                sequence = sequence.max(taken + 1);
            }
        }
        Ok(backup_name(&stamp, sequence, note))
    }

    fn prune_backups(&self) -> CoreResult<()> {
        for stale in self.list_backups()?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&stale.path) {
                warn!(backup = %stale.name, "could not prune backup: {err}");
            }
        }
        Ok(())
    }
}

impl OfficeStorage for JsonOfficeStorage {
    fn project(&self, id: Uuid) -> CoreResult<Option<Project>> {
        Ok(self.lock()?.project(id).cloned())
    }

    fn projects(&self) -> CoreResult<Vec<Project>> {
        Ok(self.lock()?.projects().cloned().collect())
    }

    fn income(&self, id: Uuid) -> CoreResult<Option<Income>> {
        Ok(self.lock()?.income(id).cloned())
    }

    fn incomes_for_project(&self, project_id: Uuid) -> CoreResult<Vec<Income>> {
        Ok(self.lock()?.incomes_for_project(project_id).cloned().collect())
    }

    fn balance(&self, payee: &Payee) -> CoreResult<Option<Balance>> {
        Ok(self.lock()?.balance(payee).cloned())
    }

    fn balances(&self) -> CoreResult<Vec<Balance>> {
        Ok(self.lock()?.balances().cloned().collect())
    }

    fn instruction(&self, id: Uuid) -> CoreResult<Option<PaymentInstruction>> {
        Ok(self.lock()?.instruction(id).cloned())
    }

    fn instructions_for_payee(&self, payee: &Payee) -> CoreResult<Vec<PaymentInstruction>> {
        Ok(self.lock()?.instructions_for_payee(payee).cloned().collect())
    }

    fn commit(&self, batch: WriteBatch) -> CoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut book = self.lock()?;
        let mut staged = book.clone();
        staged.apply(batch)?;
        self.persist(&staged)?;
        *book = staged;
        debug!(path = %self.paths.book_path.display(), "book committed");
        Ok(())
    }
}

/// Reads a book snapshot from an arbitrary path.
pub fn load_snapshot(path: &Path) -> CoreResult<BookSnapshot> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

fn serialize_snapshot(snapshot: &BookSnapshot) -> CoreResult<String> {
    serde_json::to_string_pretty(snapshot).map_err(|err| CoreError::Serde(err.to_string()))
}

/// `book_<date>_<time>_<millis>`, the part of a backup name fixed by the clock.
fn backup_stamp(at: DateTime<Utc>) -> String {
    format!(
        "{BACKUP_PREFIX}_{}_{:03}",
        at.format(BACKUP_TIMESTAMP_FORMAT),
        at.timestamp_subsec_millis()
    )
}

/// `<stamp>_<seq>[_<note>].json`; names sort chronologically.
fn backup_name(stamp: &str, sequence: u32, note: Option<&str>) -> String {
    let mut stem = format!("{stamp}_{sequence:04}");
    if let Some(label) = sanitize_backup_note(note) {
        stem.push('_');
        stem.push_str(&label);
    }
    format!("{stem}.{BACKUP_EXTENSION}")
}

fn backup_sequence(name: &str, stamp: &str) -> Option<u32> {
    let rest = name.strip_prefix(stamp)?.strip_prefix('_')?;
    rest.get(..4)?.parse().ok()
}

fn backup_metadata(name: &str, path: PathBuf) -> CoreResult<BackupMetadata> {
    let size_bytes = fs::metadata(&path)?.len();
    Ok(BackupMetadata {
        name: name.to_string(),
        created_at: parse_backup_timestamp(name),
        size_bytes,
        path,
    })
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let rest = name.strip_prefix(&format!("{BACKUP_PREFIX}_"))?;
    let raw = rest.get(..15)?;
    NaiveDateTime::parse_from_str(raw, BACKUP_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
