//! Network URL constants.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Platform tag sent with notification queries.
pub const DEFAULT_PLATFORM: &str = "web";
