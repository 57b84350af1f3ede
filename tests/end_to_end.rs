//! Full-stack exercise of the public facade: log several entries, read back the
//! decompressed stream through the ring, decode it, and check the result against what
//! direct human rendering would have produced.

use structured_event_log::format::render_human;
use structured_event_log::storage::MemoryFlash;
use structured_event_log::{LineMode, LogEntry, Logger, Registry, Severity, Value};

static ENTRIES: &[LogEntry] = &[
    LogEntry { id: 0x0004, format: "MAX_TFLOW: %.2f" },
    LogEntry { id: 0x002A, format: "boot complete" },
    LogEntry { id: 0x0010, format: "link %s up at %u kbps" },
];

fn logger(mode: LineMode) -> Logger<MemoryFlash> {
    let mut registry = Registry::new();
    registry.register_entries(ENTRIES).unwrap();
    Logger::new(MemoryFlash::new(), registry, mode)
}

/// Push enough low-compressibility traffic through the logger to force the ring's reader
/// cursor past a sector boundary, the way a long-running device eventually does.
fn push_until_readable(logger: &mut Logger<MemoryFlash>) {
    let mut i: u32 = 0;
    while logger.max_readable_bytes() == 0 {
        logger.printf_with_id(0x00FF, "padding entry %d with some unique tail", &[Value::I32(i as i32)]);
        i += 1;
        assert!(i < 2_000_000, "ring never became readable");
    }
}

#[test]
fn logged_entries_round_trip_through_the_ring_in_human_mode() {
    let mut logger = logger(LineMode::Human);
    logger.log(0x0004, &[Value::F32(53.89)]);
    push_until_readable(&mut logger);

    let mut decompressed = vec![0u8; 1 << 20];
    let n = logger.read(&mut decompressed);
    assert!(n > 0);

    let mut expected = [0u8; 128];
    let len = render_human(&mut expected, 0x0004, "MAX_TFLOW: %.2f", &[Value::F32(53.89)]).unwrap();
    assert!(decompressed[..n].windows(len).any(|w| w == &expected[..len]));
}

#[test]
fn logged_entries_round_trip_through_the_ring_and_decoder_in_encoded_mode() {
    let mut logger = logger(LineMode::Encoded);
    logger.log_with_severity(0x0010, Severity::Warning, &[Value::Str("eth0"), Value::U32(1000)]);
    push_until_readable(&mut logger);

    let mut decompressed = vec![0u8; 1 << 20];
    let n = logger.read(&mut decompressed);
    assert!(n > 0);

    let mut decoded = vec![0u8; 1 << 20];
    let outcome = logger.decode(&decompressed[..n], &mut decoded);
    assert!(outcome.dst_written > 0);

    let mut expected = [0u8; 128];
    let len = render_human(&mut expected, 0x0010, "link %s up at %u kbps", &[Value::Str("eth0"), Value::U32(1000)]).unwrap();
    assert!(decoded[..outcome.dst_written].windows(len).any(|w| w == &expected[..len]));
}

#[test]
fn printf_in_encoded_mode_round_trips_through_the_ring_and_decoder() {
    let mut logger = logger(LineMode::Encoded);
    logger.printf_with_id(0x0077, "flow %d above threshold", &[Value::I32(9)]);
    push_until_readable(&mut logger);

    let mut decompressed = vec![0u8; 1 << 20];
    let n = logger.read(&mut decompressed);
    assert!(n > 0);

    let mut decoded = vec![0u8; 1 << 20];
    let outcome = logger.decode(&decompressed[..n], &mut decoded);
    assert!(outcome.dst_written > 0);

    let needle = b"[0x0077] flow 9 above threshold\n";
    assert!(decoded[..outcome.dst_written].windows(needle.len()).any(|w| w == needle));
}

#[test]
fn unregistered_log_calls_do_not_reach_the_ring() {
    let mut logger = logger(LineMode::Human);
    let before = logger.max_readable_bytes();
    logger.log(0xBEEF, &[]);
    assert_eq!(logger.max_readable_bytes(), before);
}

#[test]
fn erase_all_clears_a_populated_ring() {
    let mut logger = logger(LineMode::Human);
    push_until_readable(&mut logger);
    assert!(logger.max_readable_bytes() > 0);
    logger.erase_all();
    assert_eq!(logger.max_readable_bytes(), 0);
}
