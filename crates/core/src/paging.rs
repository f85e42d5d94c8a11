//! Pagination defaults and clamping for preview and session listings.

/// Default number of preview records per page.
pub const DEFAULT_PREVIEW_LIMIT: i64 = 50;

/// Maximum number of preview records per page.
pub const MAX_PREVIEW_LIMIT: i64 = 200;

/// Default number of sessions per listing page.
pub const DEFAULT_SESSION_LIMIT: i64 = 20;

/// Maximum number of sessions per listing page.
pub const MAX_SESSION_LIMIT: i64 = 100;

/// Clamp a user-provided limit to `1..=max`, falling back to the default.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_uses_default_when_none() {
        assert_eq!(clamp_limit(None, DEFAULT_PREVIEW_LIMIT, MAX_PREVIEW_LIMIT), 50);
    }

    #[test]
    fn clamp_limit_respects_bounds() {
        assert_eq!(clamp_limit(Some(500), 50, 200), 200);
        assert_eq!(clamp_limit(Some(0), 50, 200), 1);
        assert_eq!(clamp_limit(Some(-3), 50, 200), 1);
        assert_eq!(clamp_limit(Some(75), 50, 200), 75);
    }

    #[test]
    fn clamp_offset_floors_at_zero() {
        assert_eq!(clamp_offset(None), 0);
        assert_eq!(clamp_offset(Some(-10)), 0);
        assert_eq!(clamp_offset(Some(30)), 30);
    }
}
