//! Query execution against the flattened view.
//!
//! The composer renders; this module runs. Pagination uses a one-row
//! lookahead so the presence of a next page is known without a second
//! round trip.

use sqlx::PgPool;
use tracing::debug;

use crate::composer::QueryComposer;
use crate::error::Result;
use crate::model::{FinancialLine, GroupedLine, Total};

/// Split a lookahead result set: keep at most `page_size` rows, report
/// whether the extra row was fetched.
pub(crate) fn split_lookahead<T>(mut rows: Vec<T>, page_size: usize) -> (Vec<T>, bool) {
    let has_next = rows.len() > page_size;
    rows.truncate(page_size);
    (rows, has_next)
}

/// Fetch one page of individual lines.
pub async fn select_lines(
    pool: &PgPool,
    composer: &QueryComposer<'_>,
    page_size: usize,
) -> Result<(Vec<FinancialLine>, bool)> {
    debug!(where_clause = %composer.where_sql(), "fetching financial lines");
    let rows: Vec<FinancialLine> = composer
        .build_select()
        .build_query_as()
        .fetch_all(pool)
        .await?;
    Ok(split_lookahead(rows, page_size))
}

/// Fetch one page of aggregated groups.
pub async fn select_groups(
    pool: &PgPool,
    composer: &QueryComposer<'_>,
    page_size: usize,
) -> Result<(Vec<GroupedLine>, bool)> {
    debug!(where_clause = %composer.where_sql(), "fetching grouped lines");
    let rows: Vec<GroupedLine> = composer
        .build_select()
        .build_query_as()
        .fetch_all(pool)
        .await?;
    Ok(split_lookahead(rows, page_size))
}

/// Fetch a single line by its technical identity, or None.
pub async fn select_one(
    pool: &PgPool,
    composer: &QueryComposer<'_>,
) -> Result<Option<FinancialLine>> {
    let row: Option<FinancialLine> = composer
        .build_select_one()
        .build_query_as()
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Run the aggregate-totals query for the composer's WHERE clause.
pub async fn fetch_total(pool: &PgPool, composer: &QueryComposer<'_>) -> Result<Total> {
    debug!(where_clause = %composer.where_sql(), "fetching totals");
    let total: Total = composer
        .build_total()
        .build_query_as()
        .fetch_one(pool)
        .await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── lookahead split ──────────────────────────────────────────

    #[test]
    fn full_page_plus_lookahead_has_next() {
        let (rows, has_next) = split_lookahead(vec![1, 2, 3, 4], 3);
        assert_eq!(rows, vec![1, 2, 3]);
        assert!(has_next);
    }

    #[test]
    fn exact_page_has_no_next() {
        let (rows, has_next) = split_lookahead(vec![1, 2, 3], 3);
        assert_eq!(rows, vec![1, 2, 3]);
        assert!(!has_next);
    }

    #[test]
    fn short_page_has_no_next() {
        let (rows, has_next) = split_lookahead(vec![1], 3);
        assert_eq!(rows, vec![1]);
        assert!(!has_next);
    }

    #[test]
    fn empty_result_is_empty_page() {
        let (rows, has_next) = split_lookahead(Vec::<i32>::new(), 3);
        assert!(rows.is_empty());
        assert!(!has_next);
    }
}
