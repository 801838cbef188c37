// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};

use tether_core::{
    BackgroundRunStats, ConflictRecord, ConnectionEvent, QueuedAction, ResolvedBy, ResolvedSide,
    SyncItem,
};
use tether_engine::EngineStatus;

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn side_label(side: ResolvedSide) -> &'static str {
    match side {
        ResolvedSide::Local => "local",
        ResolvedSide::Server => "server",
        ResolvedSide::Merged => "merged",
        ResolvedSide::Custom => "custom",
    }
}

fn actor_label(by: ResolvedBy) -> &'static str {
    match by {
        ResolvedBy::System => "system",
        ResolvedBy::User => "user",
        ResolvedBy::Background => "background",
    }
}

/// One line per action: `- [priority] (status) id: kind target`.
///
/// Retried actions show their attempt count, failed ones their last error.
pub fn format_action_line(action: &QueuedAction) -> String {
    let mut line = format!(
        "- [{}] ({}) {}: {}",
        action.priority, action.status, action.id, action.kind
    );
    if let Some(target) = &action.target_id {
        line.push(' ');
        line.push_str(target);
    }
    if action.retry_count > 0 {
        line.push_str(&format!(
            " (retry {}/{})",
            action.retry_count, action.max_retries
        ));
    }
    if let Some(err) = &action.last_error {
        line.push_str(&format!(" - {}", err));
    }
    line
}

/// One line per sync item: `- [priority] id: domain target (after deps)`.
pub fn format_item_line(item: &SyncItem) -> String {
    let mut line = format!("- [{}] {}: {}", item.priority, item.id, item.domain);
    if let Some(target) = &item.target_id {
        line.push(' ');
        line.push_str(target);
    }
    if !item.dependencies.is_empty() {
        let deps: Vec<&str> = item.dependencies.iter().map(String::as_str).collect();
        line.push_str(&format!(" (after {})", deps.join(", ")));
    }
    if item.retry_count > 0 {
        line.push_str(&format!(" (retry {}/{})", item.retry_count, item.max_retries));
    }
    line
}

/// One line per conflict: `- (status) id: kind entity [fields]`.
pub fn format_conflict_line(record: &ConflictRecord) -> String {
    let mut line = format!(
        "- ({}) {}: {} {}",
        record.status, record.id, record.kind, record.entity_id
    );
    if !record.conflicted_fields.is_empty() {
        line.push_str(&format!(" [{}]", record.conflicted_fields.join(", ")));
    }
    line
}

/// Multi-line view of a conflict and, once settled, its resolution.
pub fn format_conflict_details(record: &ConflictRecord) -> String {
    let mut out = vec![
        format!("[{}] {}", record.kind, record.id),
        format!("Status: {}", record.status),
        format!("Entity: {} {}", record.entity_type, record.entity_id),
        format!("Detected: {}", format_timestamp(&record.created_at)),
    ];
    if !record.description.is_empty() {
        out.push(format!("Description: {}", record.description));
    }
    out.push(String::new());
    out.push(format!(
        "Local ({}):  {}",
        format_timestamp(&record.local_timestamp),
        record.local_version
    ));
    out.push(format!(
        "Server ({}): {}",
        format_timestamp(&record.server_timestamp),
        record.server_version
    ));

    if let Some(resolution) = &record.resolution {
        out.push(String::new());
        out.push(format!(
            "Resolved by {} with {}: {} wins",
            actor_label(resolution.resolved_by),
            resolution.strategy,
            side_label(resolution.winner)
        ));
        out.push(format!("  {}", resolution.reason));
        out.push(format!("  value: {}", resolution.value));
    }
    out.join("\n")
}

/// `  <timestamp>  <kind>  <type>/<quality>` plus probe latency when known.
pub fn format_event_line(event: &ConnectionEvent) -> String {
    let mut line = format!(
        "  {}  {}  {}/{}",
        format_timestamp(&event.at),
        event.kind,
        event.connection_type,
        event.quality
    );
    if let Some(ms) = event.latency_ms {
        line.push_str(&format!(" ({}ms)", ms));
    }
    line
}

pub fn format_status(status: &EngineStatus) -> String {
    let connection = if status.online {
        format!("online ({}, {})", status.connection_type, status.quality)
    } else {
        "offline".to_string()
    };
    let last_sync = status
        .last_sync_at
        .as_ref()
        .map(format_timestamp)
        .unwrap_or_else(|| "never".to_string());

    [
        format!("Connection: {}", connection),
        format!(
            "Actions: {} pending, {} processing, {} failed, {} completed, {} cancelled",
            status.queue.pending,
            status.queue.processing,
            status.queue.failed,
            status.queue.completed,
            status.queue.cancelled
        ),
        format!("Sync items: {}", status.pending_sync_items),
        format!("Conflicts: {} pending", status.pending_conflicts),
        format!("Last sync: {}", last_sync),
    ]
    .join("\n")
}

pub fn format_run_stats(stats: &BackgroundRunStats) -> String {
    let mut out = vec![
        format!(
            "Runs: {} total, {} successful ({} partial), {} failed",
            stats.total_runs, stats.successful_runs, stats.partial_runs, stats.failed_runs
        ),
        format!("Items synced: {}", stats.items_synced),
        format!("Conflicts resolved: {}", stats.conflicts_resolved),
        format!("Average run time: {:.0}ms", stats.average_run_time_ms),
        format!(
            "Last run: {}",
            stats
                .last_run_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "never".to_string())
        ),
    ];
    if !stats.recent_errors.is_empty() {
        out.push(String::new());
        out.push("Recent errors:".to_string());
        for err in &stats.recent_errors {
            out.push(format!("  {}  {}", format_timestamp(&err.at), err.message));
        }
    }
    out.join("\n")
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
