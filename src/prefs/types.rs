/// Type tag of an entry as reported by the storage engine.
///
/// An absent key is reported as `None` by [`Engine::entry_type`](crate::prefs::Engine::entry_type)
/// rather than with a dedicated tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    Blob,
}

/// A value held in one of the engine's native typed slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
}

impl Scalar {
    /// Returns the type tag this value is stored under.
    #[inline]
    pub fn entry_type(&self) -> EntryType {
        match self {
            Scalar::U8(_) => EntryType::U8,
            Scalar::I8(_) => EntryType::I8,
            Scalar::U16(_) => EntryType::U16,
            Scalar::I16(_) => EntryType::I16,
            Scalar::U32(_) => EntryType::U32,
            Scalar::I32(_) => EntryType::I32,
            Scalar::U64(_) => EntryType::U64,
            Scalar::I64(_) => EntryType::I64,
        }
    }

    /// Size in bytes of the stored value.
    #[inline]
    pub fn size(&self) -> usize {
        match self {
            Scalar::U8(_) | Scalar::I8(_) => 1,
            Scalar::U16(_) | Scalar::I16(_) => 2,
            Scalar::U32(_) | Scalar::I32(_) => 4,
            Scalar::U64(_) | Scalar::I64(_) => 8,
        }
    }
}

/// How a value type is laid out in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    /// Native typed entry, checked against the given tag on read.
    Native(EntryType),
    /// Opaque byte blob.
    Blob,
}

impl Repr {
    /// The tag an entry must carry to be decoded with this representation.
    #[inline]
    pub fn entry_type(&self) -> EntryType {
        match self {
            Repr::Native(t) => *t,
            Repr::Blob => EntryType::Blob,
        }
    }
}

/// Cache state of a [`Pref`](crate::prefs::Pref).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Storage has not been consulted yet.
    Unknown,
    /// The key is absent; the default value is in effect.
    Unset,
    /// The cached value mirrors what is persisted.
    Set,
    /// The last storage operation failed; the next access re-reads.
    Error,
}

impl CacheState {
    /// Returns true if the cache must be refreshed before use.
    #[inline]
    pub fn needs_sync(&self) -> bool {
        matches!(self, CacheState::Unknown | CacheState::Error)
    }
}
