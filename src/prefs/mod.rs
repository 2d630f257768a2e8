pub mod blob;
pub mod builder;
pub mod collection;
pub mod engine;
pub mod error;
pub mod lazy;
pub mod memory;
pub mod pref;
pub mod scheduler;
pub mod store;
pub mod transaction;
pub mod types;
pub mod value;

#[cfg(test)]
mod test_support;

pub use blob::{Blob, BlobReader, BlobWriter, MAX_BLOB_SIZE};
pub use builder::LazyWritePrefBuilder;
pub use collection::Collection;
pub use engine::Engine;
pub use error::PrefsError;
pub use lazy::{
    DEFAULT_STABLE_LATENCY, DEFAULT_UNSTABLE_LATENCY, LazyBool, LazyDouble, LazyFloat, LazyI8,
    LazyI16, LazyI32, LazyI64, LazyU8, LazyU16, LazyU32, LazyU64, LazyWritePref,
};
pub use memory::{EngineStats, MAX_KEY_LEN, MemoryEngine};
#[cfg(feature = "alloc")]
pub use pref::{ByteVec, String};
pub use pref::{
    Bool, Bytes, Double, Float, I8, I16, I32, I64, Pref, Str, U8, U16, U32, U64,
};
pub use scheduler::{Instant, ManualScheduler, Priority, Scheduler, SingletonTask};
pub use store::Store;
pub use transaction::Transaction;
pub use types::{CacheState, EntryType, Repr, Scalar};
pub use value::PrefValue;

pub mod prelude {
    pub use super::{
        Blob, BlobReader, BlobWriter, CacheState, Collection, Engine, LazyWritePref,
        LazyWritePrefBuilder, ManualScheduler, MemoryEngine, Pref, PrefValue, PrefsError,
        Priority, Scheduler, Store, Transaction,
    };
}
