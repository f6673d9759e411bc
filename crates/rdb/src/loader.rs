//! The snapshot walker.
//!
//! [`Loader`] reads a snapshot front to back exactly once, prices every
//! key/value record and pushes one [`Entry`] per record down a bounded
//! channel. Opcodes that only carry metadata for the next record (expire,
//! idle, frequency) are parked in [`LoaderState`] and cleared after the
//! record that consumes them.
//!
//! ```text
//! header ──► ┌─────────────── opcode loop ───────────────┐ ──► EOF
//!            │ 0xFE select db   0xFC/0xFD expire          │
//!            │ 0xFA aux         0xF8 idle  0xF9 freq      │
//!            │ 0xFB resize      0xF7 module aux           │
//!            │ 0xF5 function    type tag ─► key + value   │
//!            └────────────────────────────────────────────┘
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, trace, warn};

use crate::entry::Entry;
use crate::error::{RdbError, Result};
use crate::format::*;
use crate::module::{module_type_name, skip_module_aux};
use crate::object::RedisObject;
use crate::primitive::read_length;
use crate::string::read_string;

/// Default wall-clock spacing between eligibility checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Decides whether the snapshot source may still be read.
///
/// Consulted by the walker at most once per check interval, never per
/// record.
pub trait EligibilityProbe: Send {
    fn is_eligible(&mut self) -> bool;
}

/// A probe that never cancels the pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysEligible;

impl EligibilityProbe for AlwaysEligible {
    fn is_eligible(&mut self) -> bool {
        true
    }
}

/// What a completed pass saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Format version from the header.
    pub version: u32,
    /// Entries emitted, synthetic script entries included.
    pub entries: u64,
    /// Database id named by the `repl-stream-db` aux field, if any.
    pub repl_stream_db: Option<u64>,
    /// Bytes consumed, header included.
    pub bytes_read: u64,
}

/// Per-pass decoding context.
#[derive(Debug, Default)]
struct LoaderState {
    db: u64,
    /// Milliseconds remaining for the next record, already clamped.
    expire_ms: Option<i64>,
    idle: Option<u64>,
    freq: Option<u8>,
    repl_stream_db: Option<u64>,
}

impl LoaderState {
    /// Clears the hints that apply to a single record.
    fn reset_pending(&mut self) {
        self.expire_ms = None;
        self.idle = None;
        self.freq = None;
    }
}

/// Counts bytes pulled through the inner reader.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Single-pass snapshot walker. See the module docs.
pub struct Loader<R> {
    reader: CountingReader<R>,
    tx: Sender<Entry>,
    probe: Box<dyn EligibilityProbe>,
    check_interval: Duration,
    rng: StdRng,
    state: LoaderState,
    emitted: u64,
}

impl<R> std::fmt::Debug for Loader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("bytes_read", &self.reader.count)
            .field("emitted", &self.emitted)
            .field("db", &self.state.db)
            .field("check_interval", &self.check_interval)
            .finish()
    }
}

impl Loader<BufReader<File>> {
    /// Opens a snapshot file for a pass.
    pub fn open<P: AsRef<Path>>(path: P, tx: Sender<Entry>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::from_reader(BufReader::new(file), tx))
    }
}

impl<R: Read> Loader<R> {
    /// Walks any byte source.
    pub fn from_reader(reader: R, tx: Sender<Entry>) -> Self {
        Self {
            reader: CountingReader {
                inner: reader,
                count: 0,
            },
            tx,
            probe: Box::new(AlwaysEligible),
            check_interval: DEFAULT_CHECK_INTERVAL,
            rng: StdRng::from_entropy(),
            state: LoaderState::default(),
            emitted: 0,
        }
    }

    /// Installs the probe consulted for cooperative cancellation.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn EligibilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Seeds the skip-list level generator so sorted-set estimates repeat.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Runs the pass to completion.
    ///
    /// Dropping `self` at the end closes the entry channel, which is how the
    /// consumer learns the pass is over. Any error aborts the pass; entries
    /// already sent must not be published by the consumer.
    pub fn run(mut self) -> Result<LoadSummary> {
        let version = self.read_header()?;
        let mut last_check = Instant::now();

        loop {
            if last_check.elapsed() >= self.check_interval {
                last_check = Instant::now();
                debug!(
                    bytes_read = self.reader.count,
                    entries = self.emitted,
                    "snapshot progress"
                );
                if !self.probe.is_eligible() {
                    warn!(
                        bytes_read = self.reader.count,
                        "source no longer eligible, stopping pass"
                    );
                    return Err(RdbError::SourceIneligible);
                }
            }

            let opcode = self.reader.read_u8()?;
            match opcode {
                OPCODE_EOF => {
                    self.state.reset_pending();
                    break;
                }
                OPCODE_SELECTDB => {
                    self.state.db = read_length(&mut self.reader)?;
                    self.state.reset_pending();
                    debug!(db = self.state.db, "select db");
                }
                OPCODE_RESIZEDB => {
                    let db_size = read_length(&mut self.reader)?;
                    let expires_size = read_length(&mut self.reader)?;
                    debug!(db = self.state.db, db_size, expires_size, "resize db");
                }
                OPCODE_EXPIRETIME_MS => {
                    let at_ms = self.reader.read_u64::<LittleEndian>()?;
                    self.state.expire_ms = Some(remaining_ms(at_ms));
                }
                OPCODE_EXPIRETIME => {
                    let at_secs = self.reader.read_u32::<LittleEndian>()?;
                    self.state.expire_ms = Some(remaining_ms(u64::from(at_secs) * 1000));
                }
                OPCODE_IDLE => {
                    self.state.idle = Some(read_length(&mut self.reader)?);
                }
                OPCODE_FREQ => {
                    self.state.freq = Some(self.reader.read_u8()?);
                }
                OPCODE_AUX => self.read_aux()?,
                OPCODE_MODULE_AUX => {
                    let module_id = skip_module_aux(&mut self.reader)?;
                    debug!(module = %module_type_name(module_id), "skipped module aux");
                }
                OPCODE_FUNCTION2 => {
                    let library = read_string(&mut self.reader)?;
                    debug!(bytes = library.len(), "skipped function library");
                }
                OPCODE_FUNCTION_PRE_GA => {
                    return Err(RdbError::Unsupported("pre-GA function library"));
                }
                tag if is_value_type(tag) => self.read_record(tag)?,
                other => return Err(RdbError::UnknownOpcode(other)),
            }
        }

        info!(
            version,
            entries = self.emitted,
            bytes_read = self.reader.count,
            "snapshot pass complete"
        );
        Ok(LoadSummary {
            version,
            entries: self.emitted,
            repl_stream_db: self.state.repl_stream_db,
            bytes_read: self.reader.count,
        })
    }

    fn read_header(&mut self) -> Result<u32> {
        let mut header = [0u8; HEADER_BYTES];
        self.reader.read_exact(&mut header)?;

        let mut magic = [0u8; 5];
        magic.copy_from_slice(&header[..5]);
        if &magic != RDB_MAGIC {
            return Err(RdbError::BadMagic(magic));
        }

        let digits = &header[5..];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(RdbError::BadVersion(
                String::from_utf8_lossy(digits).into_owned(),
            ));
        }
        let version = digits
            .iter()
            .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'));

        if version > MAX_KNOWN_VERSION {
            warn!(version, max = MAX_KNOWN_VERSION, "RDB version newer than supported, continuing");
        } else {
            info!(version, "RDB version");
        }
        Ok(version)
    }

    fn read_aux(&mut self) -> Result<()> {
        let key = read_string(&mut self.reader)?;
        let value = read_string(&mut self.reader)?;

        match key.as_slice() {
            AUX_REPL_STREAM_DB => {
                let text = String::from_utf8_lossy(&value);
                let db = text.trim().parse::<u64>().map_err(|_| {
                    RdbError::Corrupt(format!("repl-stream-db is not a number: {:?}", text))
                })?;
                debug!(db, "replication stream db");
                self.state.repl_stream_db = Some(db);
            }
            AUX_LUA => {
                let entry = Entry {
                    id: self.next_id(),
                    db: self.state.db,
                    key: String::new(),
                    is_base: true,
                    is_expiring: false,
                    expire_ms: 0,
                    overhead: 0,
                    script: Some(String::from_utf8_lossy(&value).into_owned()),
                };
                self.emit(entry)?;
            }
            _ => {
                info!(
                    key = %String::from_utf8_lossy(&key),
                    value = %String::from_utf8_lossy(&value),
                    "aux field"
                );
            }
        }
        Ok(())
    }

    fn read_record(&mut self, tag: u8) -> Result<()> {
        let key = read_string(&mut self.reader)?;
        let object = RedisObject::decode(&mut self.reader, tag)?;

        let mut overhead = object.mem_overhead(&key, &mut self.rng);
        let expire_ms = self.state.expire_ms.unwrap_or(0);
        if expire_ms > 0 {
            overhead += memprofile::EXPIRE_ENTRY_OVERHEAD;
        }

        trace!(
            db = self.state.db,
            kind = object.kind(),
            len = object.len(),
            overhead,
            idle = ?self.state.idle,
            freq = ?self.state.freq,
            "record"
        );

        let entry = Entry {
            id: self.next_id(),
            db: self.state.db,
            key: String::from_utf8_lossy(&key).into_owned(),
            is_base: true,
            is_expiring: expire_ms > 0,
            expire_ms,
            overhead,
            script: None,
        };
        self.emit(entry)?;
        self.state.reset_pending();
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.emitted + 1
    }

    fn emit(&mut self, entry: Entry) -> Result<()> {
        self.tx.send(entry).map_err(|_| RdbError::ConsumerGone)?;
        self.emitted += 1;
        Ok(())
    }
}

/// Milliseconds from now until `at_ms` (Unix time), never below 1.
fn remaining_ms(at_ms: u64) -> i64 {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    let at_ms = i64::try_from(at_ms).unwrap_or(i64::MAX);
    at_ms.saturating_sub(now_ms).max(1)
}
