/// One decoded record, ready for aggregation.
///
/// The walker emits exactly one `Entry` per key/value record, plus a
/// synthetic one for every embedded Lua script (empty `key`, `script` set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// 1-based position in the emission order.
    pub id: u64,
    /// Database the key lives in.
    pub db: u64,
    /// Key bytes, lossily converted to UTF-8.
    pub key: String,
    /// `true` for records that came from the snapshot itself.
    pub is_base: bool,
    pub is_expiring: bool,
    /// Milliseconds until the key expires, clamped to at least 1. Zero when
    /// the key has no TTL.
    pub expire_ms: i64,
    /// Estimated heap bytes the key occupies on the live server.
    pub overhead: u64,
    pub script: Option<String>,
}

impl Entry {
    /// Returns `true` for the synthetic entries carrying a Lua script body.
    #[must_use]
    pub fn is_script(&self) -> bool {
        self.script.is_some()
    }
}
