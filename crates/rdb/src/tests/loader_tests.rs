use crate::format::TYPE_HASH_LISTPACK_EX;
use crate::testkit::{module_id, ModuleField, QuicklistNode, RdbBuilder};
use crate::{EligibilityProbe, Entry, LoadSummary, Loader, RdbError, Result};
use std::io::Cursor;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::tempdir;

fn run(bytes: Vec<u8>) -> (Result<LoadSummary>, Vec<Entry>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let result = Loader::from_reader(Cursor::new(bytes), tx)
        .with_rng_seed(7)
        .run();
    let entries = rx.try_iter().collect();
    (result, entries)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Reports eligible for the first `allowed` checks, then ineligible.
struct CountdownProbe {
    allowed: usize,
}

impl EligibilityProbe for CountdownProbe {
    fn is_eligible(&mut self) -> bool {
        if self.allowed == 0 {
            return false;
        }
        self.allowed -= 1;
        true
    }
}

// -------------------- Header --------------------

#[test]
fn header_then_eof_yields_no_entries() -> Result<()> {
    let bytes = RdbBuilder::new().eof().finish();
    let (result, entries) = run(bytes);
    let summary = result?;
    assert_eq!(summary.version, 9);
    assert_eq!(summary.entries, 0);
    assert!(entries.is_empty());
    Ok(())
}

#[test]
fn wrong_magic_fails_before_any_entry() {
    let bytes = RdbBuilder::with_header(b"REDGS", "0009")
        .string("acct:1", "42")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    match result {
        Err(RdbError::BadMagic(magic)) => assert_eq!(&magic, b"REDGS"),
        other => panic!("expected BadMagic, got {:?}", other),
    }
    assert!(entries.is_empty());
}

#[test]
fn non_numeric_version_is_rejected() {
    let bytes = RdbBuilder::with_header(b"REDIS", "00x9").eof().finish();
    let (result, _) = run(bytes);
    assert!(matches!(result, Err(RdbError::BadVersion(v)) if v == "00x9"));
}

#[test]
fn newer_version_still_parses() -> Result<()> {
    let bytes = RdbBuilder::with_header(b"REDIS", "0099")
        .string("k:1", "v")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    assert_eq!(result?.version, 99);
    assert_eq!(entries.len(), 1);
    Ok(())
}

#[test]
fn truncated_header() {
    let (result, _) = run(b"REDIS00".to_vec());
    let err = result.unwrap_err();
    assert!(err.is_framing(), "{:?}", err);
}

#[test]
fn missing_eof_is_framing_error() {
    let bytes = RdbBuilder::new().string("a:1", "x").finish();
    let (result, entries) = run(bytes);
    assert!(result.unwrap_err().is_framing());
    assert_eq!(entries.len(), 1);
}

// -------------------- Records --------------------

#[test]
fn integer_string_costs_header_only() -> Result<()> {
    let bytes = RdbBuilder::new()
        .select_db(0)
        .string("acct:1", "42")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    result?;

    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.id, 1);
    assert_eq!(e.db, 0);
    assert_eq!(e.key, "acct:1");
    assert!(e.is_base);
    assert!(!e.is_expiring);
    assert_eq!(e.expire_ms, 0);
    assert_eq!(e.overhead, 56);
    assert!(e.script.is_none());
    Ok(())
}

#[test]
fn hash_with_three_pairs() -> Result<()> {
    let bytes = RdbBuilder::new()
        .hash("u:42", [("f1", "v1"), ("f2", "v2"), ("f3", "v3")])
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    result?;
    assert_eq!(entries[0].overhead, memprofile::hash_overhead(4, [(2, 2); 3]));
    assert_eq!(entries[0].overhead, 312);
    Ok(())
}

#[test]
fn past_expire_is_clamped_and_flagged() -> Result<()> {
    let bytes = RdbBuilder::new()
        .expire_ms(1_000)
        .string("acct:1", "42")
        .string("acct:2", "43")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    result?;

    let first = &entries[0];
    assert!(first.is_expiring);
    assert_eq!(first.expire_ms, 1);
    assert_eq!(first.overhead, 56 + memprofile::EXPIRE_ENTRY_OVERHEAD);

    // The expire applies to one record only.
    let second = &entries[1];
    assert!(!second.is_expiring);
    assert_eq!(second.overhead, 56);
    Ok(())
}

#[test]
fn future_expire_in_seconds() -> Result<()> {
    let at = (now_ms() / 1000 + 3_600) as u32;
    let bytes = RdbBuilder::new()
        .expire_secs(at)
        .string("session:9", "token")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    result?;
    assert!(entries[0].is_expiring);
    assert!(entries[0].expire_ms > 3_000_000, "{}", entries[0].expire_ms);
    Ok(())
}

#[test]
fn select_db_sets_database_and_clears_pending_expire() -> Result<()> {
    let bytes = RdbBuilder::new()
        .select_db(0)
        .resize_db(10, 2)
        .string("a:1", "x")
        .expire_ms(now_ms() + 60_000)
        .select_db(3)
        .string("b:1", "y")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    result?;
    assert_eq!(entries[0].db, 0);
    assert_eq!(entries[1].db, 3);
    assert!(!entries[1].is_expiring);
    Ok(())
}

#[test]
fn ids_are_sequential() -> Result<()> {
    let mut builder = RdbBuilder::new();
    for i in 0..25 {
        builder = builder.string(format!("k:{}", i), "v");
    }
    let (result, entries) = run(builder.eof().finish());
    assert_eq!(result?.entries, 25);
    let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, (1..=25).collect::<Vec<u64>>());
    Ok(())
}

#[test]
fn every_supported_encoding_yields_one_entry() -> Result<()> {
    let bytes = RdbBuilder::new()
        .string("s:raw", "hello")
        .int_string("s:int", 1234)
        .lzf_string("s:lzf", "abcdabcdabcdabcdabcdabcdabcdabcd")
        .list("l:plain", ["a", "b"])
        .list_ziplist("l:zl", ["a", "1"])
        .list_quicklist("l:ql", &[vec![b"a".to_vec()], vec![b"b".to_vec()]])
        .list_quicklist2(
            "l:ql2",
            &[
                QuicklistNode::Plain(b"big".to_vec()),
                QuicklistNode::Packed(vec![b"x".to_vec(), b"7".to_vec()]),
            ],
        )
        .set("t:plain", ["m"])
        .set_intset("t:int", &[1, 2, 3])
        .set_listpack("t:lp", ["p", "q"])
        .hash("h:plain", [("f", "v")])
        .hash_ziplist("h:zl", [("f", "v")])
        .hash_listpack("h:lp", [("f", "v")])
        .zset("z:text", [("a", 1.5)])
        .zset2("z:bin", [("a", 1.5)])
        .zset_ziplist("z:zl", [("a", 2.0)])
        .zset_listpack("z:lp", [("a", 2.0)])
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    let summary = result?;
    assert_eq!(summary.entries, 17);
    assert_eq!(entries.len(), 17);
    assert!(entries.iter().all(|e| e.overhead > 0));
    Ok(())
}

#[test]
fn zset_estimates_repeat_with_same_seed() -> Result<()> {
    let members: Vec<(String, f64)> = (0..40).map(|i| (format!("p{}", i), f64::from(i))).collect();
    let bytes = RdbBuilder::new()
        .zset2("board:1", members.iter().map(|(m, s)| (m.as_str(), *s)))
        .eof()
        .finish();
    let (a, first) = run(bytes.clone());
    let (b, second) = run(bytes);
    a?;
    b?;
    assert_eq!(first[0].overhead, second[0].overhead);
    Ok(())
}

#[test]
fn unknown_opcode_aborts() {
    let bytes = RdbBuilder::new()
        .string("a:1", "x")
        .raw(&[0xF0])
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    assert!(matches!(result, Err(RdbError::UnknownOpcode(0xF0))));
    assert_eq!(entries.len(), 1);
}

#[test]
fn unsupported_value_aborts_pass() {
    let bytes = RdbBuilder::new()
        .record_raw(15, "stream:1", &[0x00])
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    assert!(matches!(result, Err(RdbError::Unsupported(_))));
    assert!(entries.is_empty());
}

#[test]
fn field_expiry_hash_is_unsupported_not_corrupt() {
    let bytes = RdbBuilder::with_header(b"REDIS", "0012")
        .string("acct:0", "ok")
        .record_raw(TYPE_HASH_LISTPACK_EX, "acct:1", &[0x00])
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    let err = result.unwrap_err();
    assert!(matches!(err, RdbError::Unsupported("hash with field expiry")), "{:?}", err);
    assert!(!err.is_framing());
    assert_eq!(entries.len(), 1);
}

// -------------------- Metadata opcodes --------------------

#[test]
fn aux_fields() -> Result<()> {
    let bytes = RdbBuilder::new()
        .aux("redis-ver", "7.2.4")
        .aux("repl-stream-db", "3")
        .aux("lua", "return 1")
        .string("a:1", "x")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    let summary = result?;
    assert_eq!(summary.repl_stream_db, Some(3));
    assert_eq!(summary.entries, 2);

    let script = &entries[0];
    assert!(script.is_script());
    assert_eq!(script.key, "");
    assert_eq!(script.overhead, 0);
    assert_eq!(script.script.as_deref(), Some("return 1"));
    assert_eq!(entries[1].id, 2);
    Ok(())
}

#[test]
fn bad_repl_stream_db() {
    let bytes = RdbBuilder::new()
        .aux("repl-stream-db", "three")
        .eof()
        .finish();
    let (result, _) = run(bytes);
    assert!(matches!(result, Err(RdbError::Corrupt(_))));
}

#[test]
fn idle_freq_and_functions_are_consumed() -> Result<()> {
    let bytes = RdbBuilder::new()
        .function2("#!lua name=lib\nredis.register_function('f', function() end)")
        .idle(120)
        .string("a:1", "x")
        .freq(5)
        .string("a:2", "y")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    result?;
    assert_eq!(entries.len(), 2);
    Ok(())
}

#[test]
fn pre_ga_function_is_unsupported() {
    let bytes = RdbBuilder::new().raw(&[0xF6, 0x00]).eof().finish();
    let (result, _) = run(bytes);
    assert!(matches!(result, Err(RdbError::Unsupported(_))));
}

#[test]
fn modules_are_skipped() -> Result<()> {
    let id = module_id("ReJSON-RL", 3);
    let bytes = RdbBuilder::new()
        .module_aux(id, 2, &[ModuleField::Uint(1), ModuleField::Str(b"cfg".to_vec())])
        .module2(
            "doc:1",
            id,
            &[
                ModuleField::Sint(5),
                ModuleField::Float(1.0),
                ModuleField::Double(2.0),
                ModuleField::Str(b"{}".to_vec()),
            ],
        )
        .string("a:1", "x")
        .eof()
        .finish();
    let (result, entries) = run(bytes);
    result?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, "doc:1");
    assert_eq!(entries[0].overhead, 0);
    assert_eq!(entries[1].key, "a:1");
    Ok(())
}

#[test]
fn bytes_read_stops_at_eof_opcode() -> Result<()> {
    let bytes = RdbBuilder::new().string("a:1", "x").eof().finish();
    let total = bytes.len() as u64;
    let (result, _) = run(bytes);
    // The 8-byte checksum after EOF is never read.
    assert_eq!(result?.bytes_read, total - 8);
    Ok(())
}

// -------------------- Cancellation --------------------

#[test]
fn ineligible_source_stops_pass() {
    let mut builder = RdbBuilder::new();
    for i in 0..10 {
        builder = builder.string(format!("k:{}", i), "v");
    }
    let (tx, rx) = crossbeam_channel::unbounded();
    let result = Loader::from_reader(Cursor::new(builder.eof().finish()), tx)
        .with_probe(Box::new(CountdownProbe { allowed: 3 }))
        .with_check_interval(Duration::ZERO)
        .run();

    assert!(matches!(result, Err(RdbError::SourceIneligible)));
    let emitted: Vec<Entry> = rx.try_iter().collect();
    assert!(emitted.len() < 10, "emitted {}", emitted.len());
    assert!(!result.unwrap_err().is_framing());
}

#[test]
fn probe_is_not_consulted_within_interval() -> Result<()> {
    let bytes = RdbBuilder::new().string("a:1", "x").eof().finish();
    let (tx, _rx) = crossbeam_channel::unbounded();
    let summary = Loader::from_reader(Cursor::new(bytes), tx)
        .with_probe(Box::new(CountdownProbe { allowed: 0 }))
        .with_check_interval(Duration::from_secs(3_600))
        .run()?;
    assert_eq!(summary.entries, 1);
    Ok(())
}

#[test]
fn dropped_consumer_stops_pass() {
    let bytes = RdbBuilder::new().string("a:1", "x").eof().finish();
    let (tx, rx) = crossbeam_channel::bounded(1);
    drop(rx);
    let result = Loader::from_reader(Cursor::new(bytes), tx).run();
    assert!(matches!(result, Err(RdbError::ConsumerGone)));
}

// -------------------- Files --------------------

#[test]
fn open_reads_from_disk() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("dump.rdb");
    RdbBuilder::new()
        .string("acct:1", "42")
        .string("acct:2", "hello")
        .eof()
        .write_to(&path)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let summary = Loader::open(&path, tx)?.run()?;
    assert_eq!(summary.entries, 2);
    assert_eq!(rx.try_iter().count(), 2);
    Ok(())
}

#[test]
fn open_missing_file_is_io_error() {
    let (tx, _rx) = crossbeam_channel::unbounded();
    match Loader::open("/nonexistent/dump.rdb", tx) {
        Err(RdbError::Io(_)) => {}
        other => panic!("expected io error, got {:?}", other.map(|_| ())),
    }
}
