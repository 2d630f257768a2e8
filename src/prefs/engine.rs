use crate::prefs::types::{EntryType, Scalar};

/// Raw namespace storage engine (e.g. ESP-IDF NVS behind Arduino `Preferences`).
///
/// One instance serves one namespace at a time. All methods other than
/// [`begin`](Engine::begin) assume the namespace is open; implementations
/// report failure (0 bytes, `false`, `None`, or the default) otherwise.
///
/// Typed getters take a default that is returned when the key is absent, so a
/// single `get` cannot tell "absent" from "equals default". Callers are
/// expected to consult [`entry_type`](Engine::entry_type) first.
pub trait Engine {
    /// Opens `namespace`. Returns false if it cannot be opened in that mode.
    fn begin(&mut self, namespace: &str, read_only: bool) -> bool;
    /// Closes the namespace opened by the last successful `begin`.
    fn end(&mut self);

    /// Returns true if an entry exists for `key`.
    fn is_key(&mut self, key: &str) -> bool;
    /// Removes the entry for `key`. Returns true on success.
    fn remove(&mut self, key: &str) -> bool;
    /// Returns the type tag of the entry, or `None` if absent.
    fn entry_type(&mut self, key: &str) -> Option<EntryType>;

    /// Stores a native value. Returns the number of bytes written (0 on failure).
    fn put(&mut self, key: &str, value: Scalar) -> usize;
    /// Reads a native value, returning `default` if it cannot be read.
    fn get(&mut self, key: &str, default: Scalar) -> Scalar;

    /// Stores an opaque blob. Returns the number of bytes written.
    ///
    /// An empty blob is a valid entry. Since a successful empty write also
    /// returns 0, callers confirm it through `entry_type`/`bytes_length`.
    fn put_bytes(&mut self, key: &str, data: &[u8]) -> usize;
    /// Returns the length of the blob stored under `key`, or 0.
    fn bytes_length(&mut self, key: &str) -> usize;
    /// Copies the blob into `out`. Returns the number of bytes copied.
    fn get_bytes(&mut self, key: &str, out: &mut [u8]) -> usize;
}
