//! Default User-Agent string for catalog, translation and download traffic.
//!
//! The catalog service serves browsers; requests identify as a desktop
//! Firefox so the API answers the same way it does for the public site.

/// Desktop Firefox User-Agent sent when none is configured.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Default User-Agent for every outbound request.
#[must_use]
pub(crate) fn default_user_agent() -> &'static str {
    BROWSER_USER_AGENT
}
