// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::clock::from_millis;
use yare::parameterized;

fn server_record(id: &str) -> Record {
    Record {
        id: id.to_string(),
        text: "server".to_string(),
        completed: false,
        priority: Priority::Medium,
        created_at: from_millis(1_000),
        updated_at: Some(from_millis(2_000)),
        pending_create: false,
    }
}

#[parameterized(
    low = { "low", Priority::Low },
    medium = { "medium", Priority::Medium },
    high = { "HIGH", Priority::High },
)]
fn priority_from_str(input: &str, expected: Priority) {
    assert_eq!(input.parse::<Priority>().unwrap(), expected);
}

#[test]
fn priority_from_str_rejects_unknown() {
    let err = "urgent".parse::<Priority>().unwrap_err();
    assert!(matches!(err, Error::InvalidPriority(_)));
}

#[test]
fn new_local_mints_timestamp_id() {
    let record = Record::new_local("Buy milk", Priority::Low, 1_700_000_000_000);
    assert_eq!(record.id, "1700000000000");
    assert_eq!(record.created_at.timestamp_millis(), 1_700_000_000_000);
    assert!(record.pending_create);
    assert!(record.is_pending_create());
    assert!(record.updated_at.is_none());
    assert!(!record.completed);
}

#[test]
fn server_record_is_not_pending() {
    assert!(!server_record("3f2b8c1e-uuid").is_pending_create());
}

#[test]
fn numeric_server_id_is_not_pending() {
    // Only the flag marks a record as unsynced, whatever its id looks like.
    let mut record = server_record("42");
    assert!(!record.is_pending_create());
    record.updated_at = None;
    assert!(!record.is_pending_create());
}

#[test]
fn same_content_ignores_identity_and_timestamps() {
    let a = server_record("a");
    let mut b = server_record("b");
    b.updated_at = None;
    assert!(a.same_content(&b));
    b.completed = true;
    assert!(!a.same_content(&b));
}

#[test]
fn remote_payload_drops_pending_flag() {
    let local = Record::new_local("x", Priority::Medium, 5);
    let payload = local.remote_payload();
    assert!(!payload.pending_create);
    assert_eq!(payload.id, local.id);
    let json = serde_json::to_value(&payload).unwrap();
    assert!(json.get("pendingCreate").is_none());
}

#[test]
fn effective_timestamp_prefers_updated_at() {
    let record = server_record("u1");
    assert_eq!(record.effective_timestamp(), from_millis(2_000));

    let mut record = record;
    record.updated_at = None;
    assert_eq!(record.effective_timestamp(), from_millis(1_000));
}

#[test]
fn apply_patch_reports_changes() {
    let mut record = server_record("u1");
    assert!(record.apply_patch(&RecordPatch::completed(true)));
    assert!(record.completed);
    assert!(!record.apply_patch(&RecordPatch::completed(true)));
    assert!(record.apply_patch(&RecordPatch::text("renamed")));
    assert_eq!(record.text, "renamed");
    assert!(record.apply_patch(&RecordPatch::priority(Priority::High)));
    assert!(!record.apply_patch(&RecordPatch::default()));
}

#[test]
fn serializes_camel_case_and_omits_false_flag() {
    let json = serde_json::to_value(server_record("u1")).unwrap();
    assert!(json.get("createdAt").is_some());
    assert!(json.get("updatedAt").is_some());
    assert!(json.get("pendingCreate").is_none());

    let local = Record::new_local("x", Priority::Medium, 5);
    let json = serde_json::to_value(local).unwrap();
    assert_eq!(json["pendingCreate"], serde_json::json!(true));
    assert!(json.get("updatedAt").is_none());
}

#[test]
fn deserializes_remote_payload_with_defaults() {
    let json = r#"{"id":"u1","text":"Remote","createdAt":"2024-01-01T00:00:00Z"}"#;
    let record: Record = serde_json::from_str(json).unwrap();
    assert_eq!(record.priority, Priority::Medium);
    assert!(!record.completed);
    assert!(!record.pending_create);
}
