//! History command implementation.

use chrono::{DateTime, NaiveDate};
use stamplink_canonical::MemberId;
use stamplink_core::StampEventType;
use stamplink_ledger::{filter_history, AndFilter, EventTypeFilter, TimeRangeFilter};

use crate::context::Context;
use crate::output;

pub async fn run(
    ctx: &Context,
    id: String,
    kind: Option<String>,
    since: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = MemberId::parse(id)?;

    let mut filter = AndFilter::default();
    if let Some(kind) = kind {
        let kind = StampEventType::parse(&kind)
            .ok_or_else(|| format!("unknown event type: {}", kind))?;
        filter = filter.with(EventTypeFilter { kind });
    }
    if let Some(since) = since {
        filter = filter.with(TimeRangeFilter {
            after: Some(parse_since(&since)?),
            before: None,
        });
    }

    let history = ctx.gateway.get_history(&id).await?;
    let events = filter_history(&history, &filter);

    if !json {
        output::print_event_header();
    }
    for event in events {
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            println!("{}", output::format_event_row(event));
        }
    }
    Ok(())
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_since(value: &str) -> Result<i64, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| format!("invalid --since value: {}", value))
}
