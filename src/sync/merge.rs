use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::core::task::Task;
use crate::document::{DOCUMENT_VERSION, Document};

/// Merge a local document with the remote copy.
///
/// Every id from either side survives. When both sides hold the same id,
/// the local version wins only if it was updated strictly later; ties go
/// to the remote. Remote tasks keep their order, local-only tasks follow.
pub fn merge_documents(local: &Document, remote: &Document, now: DateTime<Utc>) -> Document {
    let mut merged: Vec<Task> = Vec::with_capacity(remote.tasks.len() + local.tasks.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut replaced = 0;

    for task in &remote.tasks {
        match index.get(&task.id) {
            Some(&i) => merged[i] = task.clone(),
            None => {
                index.insert(task.id.clone(), merged.len());
                merged.push(task.clone());
            }
        }
    }

    for task in &local.tasks {
        match index.get(&task.id) {
            Some(&i) => {
                if task.updated_at > merged[i].updated_at {
                    merged[i] = task.clone();
                    replaced += 1;
                }
            }
            None => {
                index.insert(task.id.clone(), merged.len());
                merged.push(task.clone());
            }
        }
    }

    log::info!(
        "Merged {} local and {} remote task(s) into {} ({} newer locally)",
        local.tasks.len(),
        remote.tasks.len(),
        merged.len(),
        replaced
    );

    let version = [&remote.version, &local.version]
        .into_iter()
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| DOCUMENT_VERSION.to_string());

    Document {
        version,
        last_sync: Some(now),
        tasks: merged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bucket::Bucket;
    use crate::core::recurrence::Recurrence;
    use chrono::{TimeDelta, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, hour, 0, 0).unwrap()
    }

    fn task(id: &str, title: &str, updated: DateTime<Utc>) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            due_date: None,
            bucket: Bucket::ThisWeek,
            order: 10000,
            tags: Vec::new(),
            recurring: Recurrence::Off,
            flagged: false,
            completed: false,
            completed_at: None,
            created_at: at(1),
            updated_at: updated,
        }
    }

    fn doc(tasks: Vec<Task>) -> Document {
        Document::new(tasks, at(0))
    }

    #[test]
    fn newer_remote_wins() {
        let local = doc(vec![task("a", "local", at(8))]);
        let remote = doc(vec![task("a", "remote", at(9))]);
        let merged = merge_documents(&local, &remote, at(12));
        assert_eq!(merged.tasks.len(), 1);
        assert_eq!(merged.tasks[0].title, "remote");
        assert_eq!(merged.last_sync, Some(at(12)));
    }

    #[test]
    fn newer_local_wins() {
        let local = doc(vec![task("a", "local", at(9) + TimeDelta::milliseconds(1))]);
        let remote = doc(vec![task("a", "remote", at(9))]);
        let merged = merge_documents(&local, &remote, at(12));
        assert_eq!(merged.tasks[0].title, "local");
    }

    #[test]
    fn tie_keeps_remote() {
        let local = doc(vec![task("a", "local", at(9))]);
        let remote = doc(vec![task("a", "remote", at(9))]);
        let merged = merge_documents(&local, &remote, at(12));
        assert_eq!(merged.tasks[0].title, "remote");
    }

    #[test]
    fn union_keeps_remote_first() {
        let local = doc(vec![task("l", "local only", at(9)), task("s", "shared", at(9))]);
        let remote = doc(vec![task("s", "shared", at(8)), task("r", "remote only", at(9))]);
        let merged = merge_documents(&local, &remote, at(12));
        let ids: Vec<&str> = merged.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["s", "r", "l"]);
    }

    #[test]
    fn version_prefers_remote() {
        let mut local = doc(Vec::new());
        local.version = "0.9".to_string();
        let mut remote = doc(Vec::new());
        remote.version = "1.1".to_string();
        assert_eq!(merge_documents(&local, &remote, at(12)).version, "1.1");

        remote.version.clear();
        assert_eq!(merge_documents(&local, &remote, at(12)).version, "0.9");

        local.version.clear();
        assert_eq!(merge_documents(&local, &remote, at(12)).version, DOCUMENT_VERSION);
    }
}
