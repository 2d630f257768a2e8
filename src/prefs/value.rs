//! Mapping from Rust types to their persisted representation.
//!
//! Integers and `bool` use the engine's native typed slots so that reads are
//! type-checked by the engine itself. Everything else (floats, strings, byte
//! vectors and [`Blob`] structs) is stored as an opaque blob.

use crate::prefs::{
    PrefsError,
    blob::{Blob, BlobReader, BlobWriter, MAX_BLOB_SIZE},
    engine::Engine,
    types::{EntryType, Repr, Scalar},
};

/// A type that can be persisted by a [`Pref`](crate::prefs::Pref).
///
/// Implemented for `bool`, all 8 to 64 bit integers, `f32`, `f64`,
/// `heapless::String<N>`, `heapless::Vec<u8, N>`, every [`Blob`], and with
/// the `alloc` feature, `String` and `Vec<u8>`.
pub trait PrefValue: Clone + PartialEq {
    /// Storage representation, used for the type-tag check on read.
    const REPR: Repr;

    /// Writes the value. Returns true if the engine accepted all of it.
    fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool;

    /// Reads the value. Only called once the entry's tag matches [`Self::REPR`].
    fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError>;
}

/// Writes a blob and confirms the engine took all of it.
pub(crate) fn put_blob<E: Engine>(engine: &mut E, key: &str, data: &[u8]) -> bool {
    let written = engine.put_bytes(key, data);
    if data.is_empty() {
        // An empty write reports 0 bytes either way.
        engine.entry_type(key) == Some(EntryType::Blob) && engine.bytes_length(key) == 0
    } else {
        written == data.len()
    }
}

/// Reads a blob of exactly `out.len()` bytes.
pub(crate) fn get_blob_exact<E: Engine>(
    engine: &mut E,
    key: &str,
    out: &mut [u8],
) -> Result<(), PrefsError> {
    if engine.bytes_length(key) != out.len() {
        return Err(PrefsError::Storage);
    }
    if !out.is_empty() && engine.get_bytes(key, out) != out.len() {
        return Err(PrefsError::Storage);
    }
    Ok(())
}

macro_rules! impl_native_value {
    ($type:ty, $variant:ident) => {
        impl PrefValue for $type {
            const REPR: Repr = Repr::Native(EntryType::$variant);

            #[inline]
            fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool {
                engine.put(key, Scalar::$variant(*self)) > 0
            }

            #[inline]
            fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError> {
                match engine.get(key, Scalar::$variant(0)) {
                    Scalar::$variant(v) => Ok(v),
                    _ => Err(PrefsError::Storage),
                }
            }
        }
    };
}

impl_native_value!(u8, U8);
impl_native_value!(i8, I8);
impl_native_value!(u16, U16);
impl_native_value!(i16, I16);
impl_native_value!(u32, U32);
impl_native_value!(i32, I32);
impl_native_value!(u64, U64);
impl_native_value!(i64, I64);

// Booleans share the u8 slot, as they do in NVS.
impl PrefValue for bool {
    const REPR: Repr = Repr::Native(EntryType::U8);

    fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool {
        engine.put(key, Scalar::U8(*self as u8)) > 0
    }

    fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError> {
        match engine.get(key, Scalar::U8(0)) {
            Scalar::U8(v) => Ok(v != 0),
            _ => Err(PrefsError::Storage),
        }
    }
}

macro_rules! impl_float_value {
    ($type:ty, $size:literal) => {
        impl PrefValue for $type {
            const REPR: Repr = Repr::Blob;

            fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool {
                put_blob(engine, key, &self.to_le_bytes())
            }

            fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError> {
                let mut buf = [0u8; $size];
                get_blob_exact(engine, key, &mut buf)?;
                Ok(<$type>::from_le_bytes(buf))
            }
        }
    };
}

impl_float_value!(f32, 4);
impl_float_value!(f64, 8);

impl<const N: usize> PrefValue for heapless::Vec<u8, N> {
    const REPR: Repr = Repr::Blob;

    fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool {
        put_blob(engine, key, self)
    }

    fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError> {
        let len = engine.bytes_length(key);
        let mut buf = heapless::Vec::new();
        buf.resize(len, 0).map_err(|_| PrefsError::Storage)?;
        get_blob_exact(engine, key, &mut buf)?;
        Ok(buf)
    }
}

impl<const N: usize> PrefValue for heapless::String<N> {
    const REPR: Repr = Repr::Blob;

    fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool {
        put_blob(engine, key, self.as_bytes())
    }

    fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError> {
        let bytes = <heapless::Vec<u8, N> as PrefValue>::get(engine, key)?;
        let text = core::str::from_utf8(&bytes).map_err(|_| PrefsError::WrongType)?;
        let mut out = heapless::String::new();
        out.push_str(text).map_err(|_| PrefsError::Storage)?;
        Ok(out)
    }
}

#[cfg(feature = "alloc")]
impl PrefValue for alloc::vec::Vec<u8> {
    const REPR: Repr = Repr::Blob;

    fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool {
        put_blob(engine, key, self)
    }

    fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError> {
        let mut buf = alloc::vec![0u8; engine.bytes_length(key)];
        get_blob_exact(engine, key, &mut buf)?;
        Ok(buf)
    }
}

#[cfg(feature = "alloc")]
impl PrefValue for alloc::string::String {
    const REPR: Repr = Repr::Blob;

    fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool {
        put_blob(engine, key, self.as_bytes())
    }

    fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError> {
        let bytes = <alloc::vec::Vec<u8> as PrefValue>::get(engine, key)?;
        alloc::string::String::from_utf8(bytes).map_err(|_| PrefsError::WrongType)
    }
}

impl<T: Blob> PrefValue for T {
    const REPR: Repr = Repr::Blob;

    fn put<E: Engine>(&self, engine: &mut E, key: &str) -> bool {
        if T::SIZE > MAX_BLOB_SIZE {
            log::error!("blob for {} is {} bytes, limit is {}", key, T::SIZE, MAX_BLOB_SIZE);
            return false;
        }
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let mut w = BlobWriter::new(&mut buf[..T::SIZE]);
        self.encode(&mut w);
        put_blob(engine, key, &buf[..T::SIZE])
    }

    fn get<E: Engine>(engine: &mut E, key: &str) -> Result<Self, PrefsError> {
        if T::SIZE > MAX_BLOB_SIZE {
            return Err(PrefsError::Storage);
        }
        let mut buf = [0u8; MAX_BLOB_SIZE];
        get_blob_exact(engine, key, &mut buf[..T::SIZE])?;
        T::decode(&mut BlobReader::new(&buf[..T::SIZE])).ok_or(PrefsError::WrongType)
    }
}
