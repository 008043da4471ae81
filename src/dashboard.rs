//! ==============================================================================
//! dashboard.rs - single-page html dashboard
//! ==============================================================================
//!
//! purpose:
//!     serves the page that polls /api/data. the page itself is static; the
//!     only server-side values are the poll period and the version string.
//!
//! degradation:
//!     if a poll fails the page keeps the last good assessment on screen and
//!     shows a "stale" banner instead of blanking out.
//!
//! ==============================================================================

const TEMPLATE: &str = include_str!("../templates/dashboard.html");

pub fn render(refresh_ms: u64) -> String {
    TEMPLATE
        .replace("{{refresh_ms}}", &refresh_ms.to_string())
        .replace("{{version}}", env!("CARGO_PKG_VERSION"))
}
