//! Plain-text tables for the terminal.

use chrono::{DateTime, Local};
use std::fmt::Write;

use crate::{
    filter::{page_count, paginate},
    google_users::GoogleUser,
    recipients::CollectReport,
    registry::RegistryRecord,
    sessions::MessagingSession,
};

fn cell(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("-")
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

/// One line per visible row plus a pagination footer.
pub fn render_records(rows: &[&RegistryRecord], page: usize, rows_per_page: usize, total: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<11} {:<32} {:<18} {:<6} {:<14} {:<10}",
        "#", "NPI", "NAME", "CITY", "STATE", "PHONE", "UPDATED"
    );
    for (i, row) in rows.iter().enumerate() {
        let updated = row.updated_at.as_deref().map(|v| v.get(..10).unwrap_or(v));
        let _ = writeln!(
            out,
            "{:<4} {:<11} {:<32} {:<18} {:<6} {:<14} {:<10}",
            page * rows_per_page + i + 1,
            row.npi,
            clip(&row.display_name(), 32),
            clip(cell(row.city.as_deref()), 18),
            cell(row.state.as_deref()),
            cell(row.phone.as_deref()),
            cell(updated),
        );
    }
    if rows.is_empty() {
        let _ = writeln!(out, "No records found");
    }
    let _ = write!(
        out,
        "Page {} of {} ({} rows, {} per page)",
        if total == 0 { 0 } else { page + 1 },
        page_count(total, rows_per_page),
        total,
        rows_per_page
    );
    out
}

fn local_time(value: Option<&str>) -> String {
    match value.and_then(|v| DateTime::parse_from_rfc3339(v).ok()) {
        Some(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => cell(value).to_string(),
    }
}

pub fn render_sessions(sessions: &[MessagingSession], page: usize, rows_per_page: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<8} {:<10} {:<30} {:<17} {:>6} {:>6} {:>8}  {}",
        "#", "ID", "STATUS", "MESSAGE", "CREATED", "TOTAL", "SENT", "PENDING", "ACTIONS"
    );
    for (i, session) in paginate(sessions, page, rows_per_page).iter().enumerate() {
        let actions: Vec<String> = session.status.actions().iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{:<4} {:<8} {:<10} {:<30} {:<17} {:>6} {:>6} {:>8}  {}",
            page * rows_per_page + i + 1,
            session.id,
            session.status.to_string(),
            clip(cell(session.message.as_deref()), 30),
            local_time(session.created_at.as_deref()),
            session.total_phones(),
            session.sent_count(),
            session.pending_count(),
            if actions.is_empty() { "-".to_string() } else { actions.join(", ") },
        );
    }
    if sessions.is_empty() {
        let _ = writeln!(out, "No sessions found");
    }
    let _ = write!(
        out,
        "Page {} of {} ({} sessions)",
        if sessions.is_empty() { 0 } else { page + 1 },
        page_count(sessions.len(), rows_per_page),
        sessions.len()
    );
    out
}

pub fn render_google_users(users: &[GoogleUser]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<24} {:<32} {:<10} {:<9}",
        "ID", "NAME", "EMAIL", "ROLE", "STATUS"
    );
    for user in users {
        let _ = writeln!(
            out,
            "{:<6} {:<24} {:<32} {:<10} {:<9}",
            user.id,
            clip(&user.name, 24),
            clip(&user.email, 32),
            clip(&user.role, 10),
            user.status_label()
        );
    }
    if users.is_empty() {
        let _ = writeln!(out, "No users found");
    }
    out.trim_end().to_string()
}

pub fn describe_collect(report: &CollectReport, total: usize) -> String {
    format!(
        "Added {} number(s); skipped {} duplicate, {} landline, {} invalid. {} recipient(s) selected.",
        report.added, report.duplicates, report.landlines, report.invalid, total
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_table_shows_one_line_per_row_and_page_footer() {
        let rows: Vec<RegistryRecord> = (0..3)
            .map(|i| RegistryRecord {
                npi: format!("100000000{i}"),
                first_name: Some("Ada".into()),
                ..Default::default()
            })
            .collect();
        let refs: Vec<&RegistryRecord> = rows.iter().collect();
        let text = render_records(&refs, 0, 25, 3);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("1000000000"));
        assert_eq!(lines[4], "Page 1 of 1 (3 rows, 25 per page)");
    }

    #[test]
    fn empty_tables_say_so() {
        assert!(render_records(&[], 0, 25, 0).contains("No records found"));
        assert!(render_sessions(&[], 0, 10).ends_with("Page 0 of 0 (0 sessions)"));
        assert!(render_google_users(&[]).contains("No users found"));
    }

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("abcdef", 4), "abc~");
        assert_eq!(clip("abc", 4), "abc");
    }
}
