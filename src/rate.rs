//! Human-readable rate formatting for meter report lines.

/// Unit label for rates at or above one tenth of an event per second.
pub const UNIT_ITEMS_PER_SECOND: &str = "items-per-second";

/// Unit label for slow rates, which read better inverted.
pub const UNIT_SECONDS_PER_ITEM: &str = "seconds-per-item";

/// Numeric field width, keeps columns aligned across report lines.
const NUMBER_WIDTH: usize = 6;

/// Format `n` events over `elapsed_secs` as a rate with a unit.
///
/// Rates below 0.1/s are shown inverted ("20 seconds-per-item" instead of
/// "0.05 items-per-second") and without decimals. Zero elapsed time and zero
/// counts both render as `0.0 items-per-second`, never a division error.
pub fn format_rate(n: u64, elapsed_secs: f64) -> String {
    let (value, unit, decimals) = if elapsed_secs <= 0.0 {
        (0.0, UNIT_ITEMS_PER_SECOND, 1)
    } else {
        let rate = n as f64 / elapsed_secs;
        if rate > 0.0 && rate < 0.1 {
            (1.0 / rate, UNIT_SECONDS_PER_ITEM, 0)
        } else {
            (rate, UNIT_ITEMS_PER_SECOND, 1)
        }
    };
    let number = format!("{value:.decimals$}");
    format!("{number:>width$} {unit}", width = NUMBER_WIDTH)
}
