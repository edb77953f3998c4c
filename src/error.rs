use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid filter combination: {0}")]
    InvalidFilterCombination(String),

    #[error("no region available: neither an explicit source_region nor a connected-user claim")]
    UnresolvableRegion,

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl QueryError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidFilterCombination(_) => 400,
            Self::UnresolvableRegion => 400,
            Self::PreconditionViolation(_) => 500,
            Self::Database(_) => 500,
            Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ── http_status: exhaustive variant coverage ──────────────────

    #[test]
    fn http_status_invalid_filter_combination() {
        let e = QueryError::InvalidFilterCombination("x".into());
        assert_eq!(e.http_status(), 400);
    }

    #[test]
    fn http_status_unresolvable_region() {
        assert_eq!(QueryError::UnresolvableRegion.http_status(), 400);
    }

    #[test]
    fn http_status_precondition_violation() {
        let e = QueryError::PreconditionViolation("x".into());
        assert_eq!(e.http_status(), 500);
    }

    #[test]
    fn http_status_database() {
        let e = QueryError::Database(sqlx::Error::RowNotFound);
        assert_eq!(e.http_status(), 500);
    }

    #[test]
    fn http_status_internal() {
        let e = QueryError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(e.http_status(), 500);
    }

    // ── Display ──────────────────────────────────────────────────

    #[test]
    fn display_invalid_filter_combination() {
        let e = QueryError::InvalidFilterCombination("'sort_by' requires 'sort_order'".into());
        assert_eq!(
            e.to_string(),
            "invalid filter combination: 'sort_by' requires 'sort_order'"
        );
    }

    #[test]
    fn display_internal() {
        let e = QueryError::Internal(anyhow::anyhow!("segfault"));
        assert_eq!(e.to_string(), "internal: segfault");
    }
}
