use chrono::{Local, NaiveDate, TimeDelta, TimeZone, Utc};
use serde_json::json;

use daybucket::core::clock::{Clock, FixedClock};
use daybucket::core::recurrence::{Recurrence, RecurrenceUnit};
use daybucket::core::{Bucket, TaskDraft, TaskPatch};
use daybucket::document::RawDocument;
use daybucket::document::local::LocalFile;
use daybucket::document::reconcile::{load_store, reconcile};
use daybucket::session::Session;
use daybucket::sync::merge::merge_documents;

fn wednesday_morning() -> FixedClock {
    FixedClock::new(Local.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap())
}

#[test]
fn legacy_document_loads_and_advances() {
    let raw = RawDocument::parse(
        &json!({
            "version": "1.0",
            "tasks": [
                { "id": "p1", "title": "Old project task", "project": "Garden" },
                { "id": "d1", "title": "Stale monday", "bucket": "monday",
                  "createdAt": "2026-02-20T09:00:00Z", "updatedAt": "2026-02-20T09:00:00Z" },
                { "title": "No id" }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let (store, report) = load_store(raw, wednesday_morning());
    assert_eq!(report.total, 3);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(store.get("p1").unwrap().bucket, Bucket::Someday);
    assert_eq!(store.get("d1").unwrap().bucket, Bucket::Tuesday);
}

#[test]
fn recurring_completion_survives_a_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let mut session = Session::open(LocalFile::new(&path), wednesday_morning()).unwrap();

    let task = session
        .store_mut()
        .add(
            TaskDraft::new("Water plants")
                .due(NaiveDate::from_ymd_opt(2026, 3, 4).unwrap())
                .repeating(Recurrence::every(1, RecurrenceUnit::Weekly)),
        )
        .unwrap();
    let outcome = session.store_mut().toggle_completion(&task.id).unwrap();
    let next = outcome.successor.unwrap();
    assert_eq!(next.due_date, NaiveDate::from_ymd_opt(2026, 3, 11));
    assert_eq!(next.bucket, Bucket::Recurring);
    session.commit().unwrap();

    let reopened = Session::open(LocalFile::new(&path), wednesday_morning()).unwrap();
    assert_eq!(reopened.store().len(), 2);
    let done = reopened.store().get(&task.id).unwrap();
    assert!(done.completed);
    assert_eq!(done.bucket, Bucket::Recurring);
}

#[test]
fn edits_on_two_devices_merge_by_timestamp() {
    let clock = wednesday_morning();
    let mut laptop = daybucket::core::TaskStore::with_clock(clock);
    let shared = laptop.add(TaskDraft::new("Plan trip").in_bucket(Bucket::Friday)).unwrap();
    let base = laptop.to_document();

    // The phone edits first, the laptop a minute later.
    let (mut phone_doc, _) = reconcile(
        RawDocument::from_document(&base).unwrap(),
        laptop.clock().now(),
    );
    phone_doc.tasks[0].title = "Plan trip to Lisbon".to_string();
    phone_doc.tasks[0].updated_at = shared.updated_at + TimeDelta::seconds(30);

    laptop.clock().advance(TimeDelta::minutes(1));
    laptop
        .update(
            &shared.id,
            TaskPatch {
                description: Some("Book flights".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    laptop.add(TaskDraft::new("Laptop only")).unwrap();

    let merged = merge_documents(&laptop.to_document(), &phone_doc, Utc::now());
    assert_eq!(merged.tasks.len(), 2);
    let trip = merged.tasks.iter().find(|t| t.id == shared.id).unwrap();
    assert_eq!(trip.title, "Plan trip");
    assert_eq!(trip.description, "Book flights");
}
