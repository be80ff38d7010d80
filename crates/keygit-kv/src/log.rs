use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::{KvEngine, KvPair};
use crate::error::{KvError, KvResult};
use crate::memory::scan_sorted;

/// Name of the log file inside the engine's data directory.
pub const LOG_FILE_NAME: &str = "store.log";

/// Lock file held exclusively by the process that has the engine open.
pub const LOCK_FILE_NAME: &str = "LOCK";

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Dead records tolerated before `open` compacts automatically.
const AUTO_COMPACT_MIN_DEAD: u64 = 64;

/// A single mutation as written to the log.
///
/// On-disk framing:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum LogRecord {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Flush/sync strategy for the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Flush to the OS page cache only.
    #[default]
    OsDefault,
}

/// Configuration for [`LogEngine`].
#[derive(Clone, Debug)]
pub struct LogEngineConfig {
    /// Sync/flush strategy.
    pub sync_mode: SyncMode,
    /// Rewrite the log on open when dead records outnumber live keys.
    pub compact_on_open: bool,
}

impl Default for LogEngineConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            compact_on_open: true,
        }
    }
}

struct LogWriter {
    writer: BufWriter<File>,
    /// Current end of the log file.
    offset: u64,
    /// Records in the file, live or superseded.
    records: u64,
}

/// Persistent engine backed by a CRC-framed append-only log.
///
/// Every mutation is appended to a single log file and applied to an
/// in-memory `BTreeMap` that serves all reads. On open the log is replayed
/// front-to-back: a torn tail stops recovery and is truncated away, records
/// failing the CRC check are skipped.
///
/// Writers are serialized by the log mutex, which is always taken before the
/// map lock, so the file order equals the order in which mutations became
/// visible.
///
/// One process at a time may hold a directory open: `open` takes an
/// exclusive advisory lock on `LOCK` and keeps it until the engine drops.
pub struct LogEngine {
    path: PathBuf,
    _lock: File,
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    writer: Mutex<LogWriter>,
    config: LogEngineConfig,
}

impl LogEngine {
    /// Open (or create) the engine stored in `dir`.
    pub fn open(dir: &Path, config: LogEngineConfig) -> KvResult<Self> {
        fs::create_dir_all(dir)?;
        let lock = acquire_lock(dir)?;
        let path = dir.join(LOG_FILE_NAME);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let (entries, records, valid_len) = replay(&path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "discarding torn log tail"
            );
            file.set_len(valid_len)?;
        }

        let live = entries.len() as u64;
        info!(path = %path.display(), keys = live, records, "opened log engine");

        let engine = Self {
            path,
            _lock: lock,
            entries: RwLock::new(entries),
            writer: Mutex::new(LogWriter {
                writer: BufWriter::new(file),
                offset: valid_len,
                records,
            }),
            config,
        };

        let dead = records.saturating_sub(live);
        if engine.config.compact_on_open && dead >= AUTO_COMPACT_MIN_DEAD && dead > live {
            engine.compact()?;
        }
        Ok(engine)
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the log file in bytes.
    pub fn log_size(&self) -> u64 {
        self.writer.lock().map(|w| w.offset).unwrap_or(0)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite the log so it holds exactly one `Put` per live key.
    ///
    /// The new log is written beside the old one, synced, and renamed over
    /// it, so a crash leaves either the old or the new file intact.
    pub fn compact(&self) -> KvResult<()> {
        let mut w = self.writer.lock().map_err(|_| KvError::Poisoned)?;
        let map = self.entries.read().map_err(|_| KvError::Poisoned)?;

        let tmp_path = self.path.with_extension("log.compact");
        let mut out = BufWriter::new(File::create(&tmp_path)?);
        let mut offset = 0u64;
        for (key, value) in map.iter() {
            offset += write_record(
                &mut out,
                &LogRecord::Put {
                    key: key.clone(),
                    value: value.clone(),
                },
            )?;
        }
        out.flush()?;
        out.get_ref().sync_all()?;
        drop(out);

        fs::rename(&tmp_path, &self.path)?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let before = w.offset;
        w.writer = BufWriter::new(file);
        w.offset = offset;
        w.records = map.len() as u64;

        info!(before, after = offset, keys = map.len(), "compacted log");
        Ok(())
    }

    fn append(&self, w: &mut LogWriter, record: &LogRecord) -> KvResult<()> {
        let written = write_record(&mut w.writer, record)?;
        w.writer.flush()?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }
        debug!(offset = w.offset, len = written, "log append");
        w.offset += written;
        w.records += 1;
        Ok(())
    }
}

impl KvEngine for LogEngine {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        let map = self.entries.read().map_err(|_| KvError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        let mut w = self.writer.lock().map_err(|_| KvError::Poisoned)?;
        self.append(
            &mut w,
            &LogRecord::Put {
                key: key.to_vec(),
                value: value.to_vec(),
            },
        )?;
        let mut map = self.entries.write().map_err(|_| KvError::Poisoned)?;
        map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> KvResult<bool> {
        let mut w = self.writer.lock().map_err(|_| KvError::Poisoned)?;
        if !self.entries.read().map_err(|_| KvError::Poisoned)?.contains_key(key) {
            return Ok(false);
        }
        self.append(&mut w, &LogRecord::Delete { key: key.to_vec() })?;
        let mut map = self.entries.write().map_err(|_| KvError::Poisoned)?;
        Ok(map.remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> KvResult<Vec<KvPair>> {
        let map = self.entries.read().map_err(|_| KvError::Poisoned)?;
        Ok(scan_sorted(&map, prefix))
    }

    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> KvResult<bool> {
        let mut w = self.writer.lock().map_err(|_| KvError::Poisoned)?;
        {
            let map = self.entries.read().map_err(|_| KvError::Poisoned)?;
            if map.get(key).map(Vec::as_slice) != expected {
                return Ok(false);
            }
        }
        let record = match new {
            Some(value) => LogRecord::Put {
                key: key.to_vec(),
                value: value.to_vec(),
            },
            None => LogRecord::Delete { key: key.to_vec() },
        };
        self.append(&mut w, &record)?;

        let mut map = self.entries.write().map_err(|_| KvError::Poisoned)?;
        match new {
            Some(value) => {
                map.insert(key.to_vec(), value.to_vec());
            }
            None => {
                map.remove(key);
            }
        }
        Ok(true)
    }
}

impl std::fmt::Debug for LogEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEngine")
            .field("path", &self.path)
            .field("key_count", &self.len())
            .finish()
    }
}

fn acquire_lock(dir: &Path) -> KvResult<File> {
    let path = dir.join(LOCK_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
            Err(KvError::Locked { path })
        }
        Err(e) => Err(e.into()),
    }
}

/// Frame and write one record. Returns the number of bytes written.
fn write_record<W: Write>(out: &mut W, record: &LogRecord) -> KvResult<u64> {
    let payload =
        bincode::serialize(record).map_err(|e| KvError::Serialization(e.to_string()))?;
    let length = payload.len() as u32;
    let crc = crc32fast::hash(&payload);

    out.write_all(&length.to_le_bytes())?;
    out.write_all(&crc.to_le_bytes())?;
    out.write_all(&payload)?;
    Ok((HEADER_SIZE + payload.len()) as u64)
}

/// Replay the log at `path` into a map.
///
/// Returns the map, the number of records read, and the length of the
/// well-framed prefix of the file.
fn replay(path: &Path) -> KvResult<(BTreeMap<Vec<u8>, Vec<u8>>, u64, u64)> {
    let mut file = BufReader::new(File::open(path)?);
    let file_len = file.get_ref().metadata()?.len();
    let mut entries = BTreeMap::new();
    let mut records = 0u64;
    let mut offset = 0u64;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
            warn!(offset, length, file_len, "invalid log record length; stopping replay");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match file.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated log record; stopping replay");
                break;
            }
            Err(e) => return Err(e.into()),
        }
        offset += HEADER_SIZE as u64 + length as u64;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping log record"
            );
            continue;
        }

        match bincode::deserialize::<LogRecord>(&payload) {
            Ok(LogRecord::Put { key, value }) => {
                entries.insert(key, value);
            }
            Ok(LogRecord::Delete { key }) => {
                entries.remove(&key);
            }
            Err(e) => {
                warn!(offset, error = %e, "undecodable log record; skipping");
                continue;
            }
        }
        records += 1;
    }

    debug!(records, keys = entries.len(), "log replay complete");
    Ok((entries, records, offset))
}
