//! Settings example: typed preferences over one namespace
//!
//! This example demonstrates:
//! - One collection shared by several preferences
//! - Lazy reads, cached after the first access
//! - Grouping accesses in one transaction
//! - A struct persisted as a blob
//! - Debounced writes for a frequently changing value

use core::time::Duration;

use embedded_prefs::prelude::*;
use embedded_prefs::prefs::{Bool, Str, U8};

type Nvs = MemoryEngine<16, 64>;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Calibration {
    offset: i16,
    gain: f32,
}

impl Blob for Calibration {
    const SIZE: usize = 6;

    fn encode(&self, w: &mut BlobWriter<'_>) {
        w.write_i16(self.offset);
        w.write_f32(self.gain);
    }

    fn decode(r: &mut BlobReader<'_>) -> Option<Self> {
        let offset = r.read_i16();
        let gain = r.read_f32();
        gain.is_finite().then_some(Self { offset, gain })
    }
}

fn main() {
    println!("=== Settings Example ===\n");

    let settings: Collection<Nvs> = Collection::new("settings", MemoryEngine::new());

    let volume: U8<'_, Nvs> = Pref::new(&settings, "volume", 5);
    let muted: Bool<'_, Nvs> = Pref::new(&settings, "muted", false);
    let name: Str<'_, 16, Nvs> = Pref::new(&settings, "name", heapless::String::new());
    let calibration = Pref::new(
        &settings,
        "calib",
        Calibration {
            offset: 0,
            gain: 1.0,
        },
    );

    println!("First boot:");
    println!("  volume = {} (set: {})", volume.get(), volume.is_set());
    println!("  muted  = {}", muted.get());
    println!("  name   = {:?}", name.get());
    println!("  calib  = {:?}\n", calibration.get());

    // One namespace open for all four writes.
    {
        let _t = Transaction::new(&settings);
        volume.set(8).unwrap();
        muted.set(true).unwrap();
        let mut device = heapless::String::new();
        device.push_str("kitchen").unwrap();
        name.set(device).unwrap();
        calibration
            .set(Calibration {
                offset: -12,
                gain: 1.25,
            })
            .unwrap();
    }

    let stats = settings.with_engine(|e| e.stats());
    println!(
        "After grouped writes: {} opens, {} writes",
        stats.begins, stats.writes
    );

    // Writing the same value again costs nothing.
    volume.set(8).unwrap();
    println!(
        "Rewriting volume: {} writes\n",
        settings.with_engine(|e| e.stats().writes)
    );

    // A fresh pref on the same key reads what was persisted.
    let reloaded: U8<'_, Nvs> = Pref::new(&settings, "volume", 0);
    println!("Reloaded volume = {}", reloaded.get());

    muted.clear().unwrap();
    println!("Cleared muted   = {} (set: {})\n", muted.get(), muted.is_set());

    // A brightness slider moved every 500 ms for 6 s, then left alone.
    let clock = ManualScheduler::new();
    let brightness = LazyWritePref::new(&settings, &clock, "bright", 50u8);
    settings.with_engine(|e| e.reset_stats());

    for step in 0..12u8 {
        brightness.set(50 + step * 4);
        clock.advance(Duration::from_millis(500));
        if clock.take_due() && brightness.run_due() {
            println!("  t={:>5} ms: flushed {}", clock.now().as_millis(), brightness.get());
        }
    }
    for _ in 0..10 {
        clock.advance(Duration::from_millis(500));
        if clock.take_due() && brightness.run_due() {
            println!("  t={:>5} ms: flushed {}", clock.now().as_millis(), brightness.get());
        }
    }

    println!(
        "Slider: 12 changes, {} writes, persisted {}",
        settings.with_engine(|e| e.stats().writes),
        brightness.pref().get()
    );
}
