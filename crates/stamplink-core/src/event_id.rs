/// Prefix of ids minted client-side for optimistic placeholders.
///
/// The ledger never issues ids with this prefix, so a placeholder can always
/// be told apart from an authoritative event.
pub const SYNTHETIC_PREFIX: &str = "temp-";

/// Mints an id for an optimistic placeholder event created at `now_ms`.
pub fn synthetic_event_id(now_ms: i64) -> String {
    format!("{SYNTHETIC_PREFIX}{now_ms}")
}

/// Returns true if `id` was minted by [`synthetic_event_id`].
pub fn is_synthetic(id: &str) -> bool {
    id.starts_with(SYNTHETIC_PREFIX)
}
