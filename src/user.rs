//! Caller identity and region scoping.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// The authenticated caller, as decoded from the gateway's token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedUser {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Region claim granted by the identity provider.
    pub current_region: Option<String>,
}

impl ConnectedUser {
    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            username: None,
            email: None,
            current_region: Some(region.into()),
        }
    }
}

/// Region codes are stored without leading zeros.
pub fn sanitize_region(region: &str) -> String {
    let trimmed = region.trim_start_matches('0');
    if trimmed.is_empty() && !region.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Resolve the region the request operates under: an explicit parameter
/// wins over the caller's claim. The request may go unscoped only when a
/// data-source filter narrows it instead.
pub fn resolve_source_region(
    requested: Option<&str>,
    user: &ConnectedUser,
    data_source: Option<&str>,
) -> Result<Option<String>> {
    let region = requested.or(user.current_region.as_deref());
    match region {
        Some(r) => Ok(Some(sanitize_region(r))),
        None if data_source.is_some() => Ok(None),
        None => Err(QueryError::UnresolvableRegion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── region sanitizing ────────────────────────────────────────

    #[test]
    fn leading_zeros_are_stripped() {
        assert_eq!(sanitize_region("053"), "53");
        assert_eq!(sanitize_region("53"), "53");
        assert_eq!(sanitize_region("000"), "0");
    }

    // ── scope resolution ─────────────────────────────────────────

    #[test]
    fn explicit_parameter_wins_over_the_claim() {
        let user = ConnectedUser::with_region("11");
        let region = resolve_source_region(Some("053"), &user, None).unwrap();
        assert_eq!(region.as_deref(), Some("53"));
    }

    #[test]
    fn claim_applies_when_no_parameter() {
        let user = ConnectedUser::with_region("076");
        let region = resolve_source_region(None, &user, None).unwrap();
        assert_eq!(region.as_deref(), Some("76"));
    }

    #[test]
    fn unscoped_request_needs_a_data_source() {
        let user = ConnectedUser {
            username: Some("agent".into()),
            email: None,
            current_region: None,
        };
        let err = resolve_source_region(None, &user, None).unwrap_err();
        assert!(matches!(err, QueryError::UnresolvableRegion));

        let ok = resolve_source_region(None, &user, Some("REGION")).unwrap();
        assert!(ok.is_none());
    }
}
