use crate::{LedgerEntry, ProcessedLedger};

use chrono::Utc;

fn entry(name: &str, success: bool) -> LedgerEntry {
    LedgerEntry {
        display_name: name.to_string(),
        processed_at: Utc::now(),
        success,
        error: (!success).then(|| "transcription failed".to_string()),
        written_row: success.then_some(7),
    }
}

/// WHAT: Recorded outcomes survive a reload from disk
/// WHY: Dedup must hold across process restarts
#[test]
fn given_recorded_item_when_reopening_then_entry_persisted() {
    // Given: A ledger with one successful item
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    {
        let mut ledger = ProcessedLedger::open(&path);
        ledger.mark_processed("call-1", entry("call-1.mp3", true)).unwrap();
    }

    // When: Reopening the ledger
    let reopened = ProcessedLedger::open(&path);

    // Then: The item is still recorded with its row
    assert!(reopened.is_processed("call-1"));
    let entry = reopened.entry("call-1").unwrap();
    assert!(entry.success);
    assert_eq!(entry.written_row, Some(7));
}

/// WHAT: Failed attempts gate reprocessing too
/// WHY: A failed item is retried only by explicit operator action
#[test]
fn given_failed_attempt_when_checking_then_item_counts_as_processed() {
    // Given: A ledger with one failed item
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let mut ledger = ProcessedLedger::open(&path);
    ledger.mark_processed("call-2", entry("call-2.mp3", false)).unwrap();

    // When/Then: The item is processed despite the failure
    assert!(ledger.is_processed("call-2"));
    assert_eq!(
        ledger.entry("call-2").unwrap().error.as_deref(),
        Some("transcription failed")
    );
}

/// WHAT: Removing an entry re-enables processing
/// WHY: Entry removal is the designated retry mechanism
#[test]
fn given_removed_entry_when_checking_then_item_unprocessed() {
    // Given: A recorded then removed item
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let mut ledger = ProcessedLedger::open(&path);
    ledger.mark_processed("call-3", entry("call-3.mp3", true)).unwrap();

    // When: Removing it
    let removed = ledger.remove("call-3").unwrap();

    // Then: It no longer gates processing, and the removal persisted
    assert!(removed);
    assert!(!ledger.is_processed("call-3"));
    let reopened = ProcessedLedger::open(&path);
    assert!(!reopened.is_processed("call-3"));
}

/// WHAT: A corrupt ledger file yields an empty ledger
/// WHY: A bad file must not block processing forever
#[test]
fn given_corrupt_file_when_opening_then_empty_ledger() {
    // Given: A file that is not valid JSON
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, "{ not json").unwrap();

    // When: Opening
    let ledger = ProcessedLedger::open(&path);

    // Then: The ledger starts empty
    assert_eq!(ledger.stats().total, 0);
}

/// WHAT: Clearing empties the ledger on disk
/// WHY: Operators can force a full re-run
#[test]
fn given_entries_when_clearing_then_ledger_empty_after_reload() {
    // Given: Two recorded items
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let mut ledger = ProcessedLedger::open(&path);
    ledger.mark_processed("a", entry("a.mp3", true)).unwrap();
    ledger.mark_processed("b", entry("b.mp3", false)).unwrap();

    // When: Clearing
    ledger.clear().unwrap();

    // Then: Nothing survives a reload
    let reopened = ProcessedLedger::open(&path);
    assert_eq!(reopened.stats().total, 0);
}

/// WHAT: Stats split attempts into successes and failures
/// WHY: Startup logging summarizes past work from these counters
#[test]
fn given_mixed_outcomes_when_counting_then_stats_split() {
    // Given: Two successes and one failure
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let mut ledger = ProcessedLedger::open(&path);
    ledger.mark_processed("a", entry("a.mp3", true)).unwrap();
    ledger.mark_processed("b", entry("b.mp3", true)).unwrap();
    ledger.mark_processed("c", entry("c.mp3", false)).unwrap();

    // When: Reading stats
    let stats = ledger.stats();

    // Then: The counters split correctly
    assert_eq!(stats.total, 3);
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 1);
}

/// WHAT: Re-recording an item overwrites its previous outcome
/// WHY: Every attempt writes the latest outcome, success or failure
#[test]
fn given_reprocessed_item_when_recording_then_outcome_overwritten() {
    // Given: An item first recorded as failed
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let mut ledger = ProcessedLedger::open(&path);
    ledger.mark_processed("call-4", entry("call-4.mp3", false)).unwrap();

    // When: Recording a later successful attempt
    ledger.mark_processed("call-4", entry("call-4.mp3", true)).unwrap();

    // Then: The success replaces the failure
    assert!(ledger.entry("call-4").unwrap().success);
    assert_eq!(ledger.stats().total, 1);
}
