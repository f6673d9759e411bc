use super::helpers::entry;
use crate::{namespace_of, Aggregator, NamespaceOverhead};
use chrono::{TimeZone, Utc};
use memprofile::bucket_overhead;
use proptest::prelude::*;
use rdb::Entry;

// -------------------- Namespace rule --------------------

#[test]
fn namespace_is_text_before_first_colon() {
    assert_eq!(namespace_of("acct:1"), Some("acct"));
    assert_eq!(namespace_of("a:b:c"), Some("a"));
    assert_eq!(namespace_of("user:"), Some("user"));
}

#[test]
fn keys_without_namespace() {
    assert_eq!(namespace_of(""), None);
    assert_eq!(namespace_of("plainkey"), None);
    assert_eq!(namespace_of(":orphan"), None);
}

// -------------------- Totals --------------------

#[test]
fn totals_and_bucket_shares() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut agg = Aggregator::new(at);
    agg.add(&entry(1, "acct:1", 100, true));
    agg.add(&entry(2, "acct:2", 200, false));
    agg.add(&entry(3, "user:9", 50, false));
    let table = agg.finish();

    // 3 keys: 48 bytes of buckets, 2/3 and 1/3. 1 expiring key: 24 bytes, all to acct.
    assert_eq!(bucket_overhead(3), 48);
    assert_eq!(bucket_overhead(1), 24);

    let acct = table.get("acct").unwrap();
    assert_eq!(acct.key_count, 2);
    assert_eq!(acct.expiring_key_count, 1);
    assert_eq!(acct.overhead, 300 + 32 + 24);
    assert_eq!(acct.analyzed_at, at);

    let user = table.get("user").unwrap();
    assert_eq!(user.key_count, 1);
    assert_eq!(user.expiring_key_count, 0);
    assert_eq!(user.overhead, 50 + 16);

    assert_eq!(table.len(), 2);
    assert_eq!(table.total_keys(), 3);
    assert_eq!(table.analyzed_at(), at);
}

#[test]
fn no_expiring_keys_means_no_expires_share() {
    let mut agg = Aggregator::new(Utc::now());
    agg.add(&entry(1, "a:1", 10, false));
    let table = agg.finish();
    assert_eq!(table.get("a").unwrap().overhead, 10 + bucket_overhead(1));
}

#[test]
fn empty_pass_gives_empty_table() {
    let table = Aggregator::new(Utc::now()).finish();
    assert!(table.is_empty());
    assert_eq!(table.total_overhead(), 0);
}

#[test]
fn unattributable_keys_and_scripts_are_not_counted() {
    let mut agg = Aggregator::new(Utc::now());
    agg.add(&entry(1, "plain", 100, false));
    agg.add(&entry(2, ":x", 100, false));
    agg.add(&Entry {
        script: Some("return 1".to_string()),
        ..entry(3, "", 0, false)
    });
    agg.add(&entry(4, "k:1", 7, false));
    assert_eq!(agg.skipped_keys(), 2);

    let table = agg.finish();
    assert_eq!(table.len(), 1);
    assert_eq!(table.skipped_keys(), 2);
    assert_eq!(table.scripts(), 1);
    assert_eq!(table.total_keys(), 1);
}

#[test]
fn by_overhead_sorts_descending_then_by_name() {
    let mut agg = Aggregator::new(Utc::now());
    agg.add(&entry(1, "b:1", 500, false));
    agg.add(&entry(2, "a:1", 500, false));
    agg.add(&entry(3, "c:1", 900, false));
    let table = agg.finish();
    let order: Vec<&str> = table.by_overhead().iter().map(|r| r.namespace.as_str()).collect();
    assert_eq!(order, ["c", "a", "b"]);
}

// -------------------- Serialization --------------------

#[test]
fn json_field_names() {
    let row = NamespaceOverhead {
        namespace: "acct".to_string(),
        key_count: 2,
        expiring_key_count: 1,
        overhead: 356,
        analyzed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    };
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["namespace"], "acct");
    assert_eq!(json["keyCount"], 2);
    assert_eq!(json["expireKeyCount"], 1);
    assert_eq!(json["overhead"], 356);
    assert_eq!(json["analysisDate"], "2024-05-01T12:00:00Z");

    let back: NamespaceOverhead = serde_json::from_value(json).unwrap();
    assert_eq!(back, row);
}

// -------------------- Order independence --------------------

fn sample_entries() -> Vec<Entry> {
    let keys = [
        "acct:1", "acct:2", "user:1", "user:2", "user:3", "sess:1", "nokey", "sess:2", "x:1",
    ];
    keys.iter()
        .enumerate()
        .map(|(i, k)| entry(i as u64 + 1, k, 40 + 13 * i as u64, i % 3 == 0))
        .collect()
}

proptest! {
    #[test]
    fn aggregation_ignores_arrival_order(shuffled in Just(sample_entries()).prop_shuffle()) {
        let at = Utc::now();
        let mut in_order = Aggregator::new(at);
        for e in &sample_entries() {
            in_order.add(e);
        }
        let mut permuted = Aggregator::new(at);
        for e in &shuffled {
            permuted.add(e);
        }
        prop_assert_eq!(in_order.finish(), permuted.finish());
    }
}
