//! Typed, lazily cached persistent preferences for embedded systems.
//!
//! This crate layers typed preferences over a raw key-value namespace store
//! such as ESP-IDF NVS. It is `no_std` and needs no allocator.
//!
//! # Features
//!
//! - **Typed preferences** - `Pref<T>` for integers, floats, strings, byte
//!   vectors and fixed-layout structs
//! - **Lazy caching** - Storage is read once, on first access
//! - **Shared opens** - Nested transactions reuse one namespace handle
//! - **Wear friendly** - Unchanged values are never rewritten
//! - **Debounced writes** - `LazyWritePref<T>` coalesces rapid changes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ LazyWritePref│──▶│    Pref      │──▶│ Transaction  │──▶│Collection│
//! │ (pending +   │   │ (cache +     │   │ (scoped open)│   │ (refcount│
//! │  scheduler)  │   │  default)    │   │              │   │  + engine│
//! └──────────────┘   └──────────────┘   └──────┬───────┘   └────┬─────┘
//!                                              │ Store          │ Engine
//!                                              ▼                ▼
//!                                        typed reads/writes  begin/end
//! ```
//!
//! - A **Collection** owns an [`Engine`](prefs::Engine) for one namespace and
//!   opens it only while at least one transaction is alive
//! - A **Transaction** opens or joins the namespace for its scope
//! - A **Pref** caches one key and syncs with storage on demand
//! - A **LazyWritePref** holds back writes until a value settles
//!
//! # Example
//!
//! ```rust
//! use embedded_prefs::prelude::*;
//!
//! let col = Collection::new("settings", MemoryEngine::<16, 64>::new());
//! let volume = Pref::new(&col, "volume", 5u8);
//! let muted = Pref::new(&col, "muted", false);
//!
//! assert_eq!(volume.get(), 5);
//! assert!(!volume.is_set());
//!
//! // Both writes share one namespace open.
//! {
//!     let _t = Transaction::new(&col);
//!     volume.set(8).unwrap();
//!     muted.set(true).unwrap();
//! }
//!
//! assert_eq!(volume.get(), 8);
//! muted.clear().unwrap();
//! assert!(!muted.is_set());
//! ```

#![deny(unsafe_code)]
#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod prefs;

pub mod prelude {
    pub use crate::prefs::prelude::*;
}
