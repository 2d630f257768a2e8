use crate::prefs::{
    PrefsError,
    engine::Engine,
    types::EntryType,
    value::{PrefValue, get_blob_exact, put_blob},
};

/// Typed view of an open namespace.
///
/// Obtained through [`Transaction::with_store`](crate::prefs::Transaction::with_store).
/// Every read checks the entry's type tag before decoding, so an absent key,
/// a key of another type and a failed read are always told apart.
pub struct Store<'a, E: Engine> {
    engine: &'a mut E,
}

impl<'a, E: Engine> core::fmt::Debug for Store<'a, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl<'a, E: Engine> Store<'a, E> {
    pub(crate) fn new(engine: &'a mut E) -> Self {
        Self { engine }
    }

    /// Returns true if an entry exists for `key`.
    pub fn is_key(&mut self, key: &str) -> bool {
        self.engine.is_key(key)
    }

    /// Returns the stored type tag, or `None` if absent.
    pub fn entry_type(&mut self, key: &str) -> Option<EntryType> {
        self.engine.entry_type(key)
    }

    /// Writes `value` under `key`.
    pub fn write<T: PrefValue>(&mut self, key: &str, value: &T) -> Result<(), PrefsError> {
        if value.put(&mut *self.engine, key) {
            Ok(())
        } else {
            Err(PrefsError::Storage)
        }
    }

    /// Reads the value stored under `key`.
    ///
    /// Returns `NotFound` if absent, `WrongType` if the entry was written as
    /// another type, and `Storage` if the engine fails to return it intact.
    pub fn read<T: PrefValue>(&mut self, key: &str) -> Result<T, PrefsError> {
        self.check_type(key, T::REPR.entry_type())?;
        T::get(&mut *self.engine, key)
    }

    /// Removes the entry for `key`.
    pub fn clear(&mut self, key: &str) -> Result<(), PrefsError> {
        if self.engine.remove(key) {
            Ok(())
        } else {
            Err(PrefsError::Storage)
        }
    }

    /// Writes raw bytes as a blob.
    pub fn write_bytes(&mut self, key: &str, data: &[u8]) -> Result<(), PrefsError> {
        if put_blob(&mut *self.engine, key, data) {
            Ok(())
        } else {
            Err(PrefsError::Storage)
        }
    }

    /// Copies a blob into `out` and returns its length.
    ///
    /// A zero-length blob yields `Ok(0)`. Returns `Storage` if the blob does
    /// not fit into `out`.
    pub fn read_bytes(&mut self, key: &str, out: &mut [u8]) -> Result<usize, PrefsError> {
        let len = self.bytes_length(key)?;
        if len > out.len() {
            return Err(PrefsError::Storage);
        }
        get_blob_exact(&mut *self.engine, key, &mut out[..len])?;
        Ok(len)
    }

    /// Returns the length of the blob stored under `key`.
    pub fn bytes_length(&mut self, key: &str) -> Result<usize, PrefsError> {
        self.check_type(key, EntryType::Blob)?;
        Ok(self.engine.bytes_length(key))
    }

    fn check_type(&mut self, key: &str, expected: EntryType) -> Result<(), PrefsError> {
        match self.engine.entry_type(key) {
            None => Err(PrefsError::NotFound),
            Some(t) if t != expected => Err(PrefsError::WrongType),
            Some(_) => Ok(()),
        }
    }
}
