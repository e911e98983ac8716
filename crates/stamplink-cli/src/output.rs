//! Output formatting utilities.

use chrono::{DateTime, Utc};
use stamplink_core::{Member, StampEvent};
use stamplink_ledger::Progress;

/// Formats a millisecond timestamp as RFC 3339, or the raw number if it is
/// out of range.
pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

/// Formats a member as a table row.
pub fn format_member_row(member: &Member) -> String {
    format!(
        "{:<24} {:<24} {:<16} {:>2}/{}",
        truncate(member.id.as_str(), 24),
        truncate(&member.name, 24),
        truncate(&member.phone, 16),
        member.stamps,
        member.max_stamps
    )
}

/// Prints the member table header.
#[allow(clippy::print_literal)]
pub fn print_member_header() {
    println!(
        "{:<24} {:<24} {:<16} {}",
        "ID", "NAME", "PHONE", "STAMPS"
    );
    println!("{}", "-".repeat(72));
}

/// Formats a history entry as a table row.
pub fn format_event_row(event: &StampEvent) -> String {
    format!(
        "{:<28} {:<18} {:>6} {}",
        truncate(&format_timestamp(event.timestamp), 28),
        event.kind.as_str(),
        event.amount,
        event.id
    )
}

/// Prints the history table header.
#[allow(clippy::print_literal)]
pub fn print_event_header() {
    println!("{:<28} {:<18} {:>6} {}", "WHEN", "TYPE", "AMOUNT", "EVENT_ID");
    println!("{}", "-".repeat(72));
}

/// Prints a member card with reward progress.
pub fn print_member(member: &Member, progress: &Progress) {
    println!("Member:  {} ({})", member.name, member.id);
    if !member.phone.is_empty() {
        println!("Phone:   {}", member.phone);
    }
    println!(
        "Stamps:  {}/{} ({} remaining)",
        progress.stamps, progress.max_stamps, progress.remaining
    );
    for checkpoint in &progress.earned {
        println!("Earned:  {} at {}", checkpoint.reward, checkpoint.stamp_count);
    }
    match &progress.next {
        Some((checkpoint, needed)) => println!(
            "Next:    {} in {} stamp{}",
            checkpoint.reward,
            needed,
            if *needed == 1 { "" } else { "s" }
        ),
        None => println!("Next:    -"),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_truncated_on_char_boundaries() {
        assert_eq!(truncate("Ayu", 24), "Ayu");
        assert_eq!(truncate("Ñoño Ñoño Ñoño", 8), "Ñoño ...");
    }

    #[test]
    fn timestamps_render_as_rfc3339() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
    }
}
