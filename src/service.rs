//! Request orchestration.
//!
//! [`BudgetLinesService`] ties the pieces together for one request: scope
//! resolution, query composition, execution, totals (cached when the
//! request is eligible) and page assembly.

use std::sync::Arc;

use serde::Serialize;
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, instrument};

use crate::composer::QueryComposer;
use crate::error::{QueryError, Result};
use crate::fetch;
use crate::model::line::FINANCIAL_LINES_VIEW;
use crate::model::{DataType, FinancialLine, GroupedLine, Total};
use crate::params::LineQueryParams;
use crate::registry::COLONNES_TABLEAU;
use crate::total_cache::{TotalCache, TotalCacheKey};
use crate::user::{resolve_source_region, sanitize_region, ConnectedUser};

/// One page of results: individual lines, or groups when a drill-down
/// level is still pending.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LinesData {
    Lignes(Vec<FinancialLine>),
    Groupes(Vec<GroupedLine>),
}

#[derive(Debug, Clone, Serialize)]
pub struct LinesPage {
    pub data: LinesData,
    pub total: Total,
    /// Code of the column the page is grouped by, when aggregated.
    pub grouped_by: Option<&'static str>,
    pub has_next: bool,
}

pub struct BudgetLinesService {
    pool: PgPool,
    cache: Arc<TotalCache>,
}

impl BudgetLinesService {
    pub fn new(pool: PgPool, cache: Arc<TotalCache>) -> Self {
        Self { pool, cache }
    }

    pub fn total_cache(&self) -> Arc<TotalCache> {
        Arc::clone(&self.cache)
    }

    /// Fetch one page of budget lines for the caller.
    ///
    /// `additional_source_region` further narrows the query to lines that
    /// explicitly carry that region, on top of the caller's scope.
    #[instrument(skip_all, fields(page = params.page, page_size = params.page_size))]
    pub async fn get_lignes(
        &self,
        user: &ConnectedUser,
        params: LineQueryParams,
        additional_source_region: Option<&str>,
    ) -> Result<LinesPage> {
        let source_region = resolve_source_region(
            params.source_region.as_deref(),
            user,
            params.data_source.as_deref(),
        )?;
        let params = params
            .with_source_region(source_region)
            .with_colonnes(COLONNES_TABLEAU.iter().collect());

        let scope: Option<Vec<String>> = params.source_region.clone().map(|r| vec![r]);
        let additional = additional_source_region.map(sanitize_region);

        let composer = self.compose(&params, scope.as_deref(), additional.as_deref())?;
        debug!(where_clause = %composer.where_sql(), "composed line query");

        let grouped_by = composer.groupby_colonne().map(|c| c.code);
        let page_size = params.page_size as usize;
        let (data, has_next) = if composer.is_aggregation() {
            let (groups, has_next) =
                fetch::select_groups(&self.pool, &composer, page_size).await?;
            (LinesData::Groupes(groups), has_next)
        } else {
            let (lines, has_next) =
                fetch::select_lines(&self.pool, &composer, page_size).await?;
            (LinesData::Lignes(lines), has_next)
        };

        let key = TotalCacheKey::derive(&params, scope.as_deref(), additional.as_deref());
        let total = self
            .cache
            .retrieve_total(key, || fetch::fetch_total(&self.pool, &composer))
            .await?;

        Ok(LinesPage {
            data,
            total,
            grouped_by,
            has_next,
        })
    }

    /// The full predicate chain, in one place so the data and totals
    /// queries of a request can never disagree.
    fn compose<'p>(
        &self,
        params: &'p LineQueryParams,
        scope: Option<&[String]>,
        additional_source_region: Option<&str>,
    ) -> Result<QueryComposer<'p>> {
        let region = params.source_region.as_deref();
        let mut composer = QueryComposer::new(params)?
            .source_region_in(scope, true)
            .data_source_is(params.data_source.as_deref())
            .source_is(params.source)
            .n_ej_in(params.n_ej.as_deref())
            .code_programme_in(params.code_programme.as_deref())
            .themes_in(params.theme.as_deref())
            .beneficiaire_siret_in(params.beneficiaire_code.as_deref())
            .annee_in(&params.annee)
            .niveau_code_geo_in(params.niveau_geo, params.code_geo.as_deref(), region)
            .niveau_code_qpv_in(params.ref_qpv, params.code_qpv.as_deref())
            .centres_couts_in(params.centres_couts.as_deref())
            .domaine_fonctionnel_in(params.domaine_fonctionnel.as_deref())
            .referentiel_programmation_in(params.referentiel_programmation.as_deref())
            .tags_fullname_in(params.tags.as_deref())
            .categorie_juridique_in(
                params.beneficiaire_categorie_juridique_type.as_deref(),
                includes_none(params),
            )
            .search()
            .sort_by_params();
        if let Some(additional) = additional_source_region {
            composer = composer.source_region_in(Some(&[additional.to_string()]), false);
        }
        Ok(composer)
    }

    /// Fetch a single line by its technical identity.
    pub async fn get_ligne(
        &self,
        user: &ConnectedUser,
        source: Option<DataType>,
        id: i64,
    ) -> Result<Option<FinancialLine>> {
        let source = source.ok_or_else(|| {
            QueryError::PreconditionViolation("a data type is required to identify a line".into())
        })?;
        // scope comes from the caller's claim here, so its absence is a
        // server-side guard, not a client error
        let source_region = resolve_source_region(None, user, None).map_err(|_| {
            QueryError::PreconditionViolation(
                "single-line lookup requires a resolvable region scope".into(),
            )
        })?;
        let params = LineQueryParams::make_default()
            .with_colonnes(COLONNES_TABLEAU.iter().collect());
        let scope: Option<Vec<String>> = source_region.map(|r| vec![r]);

        let composer = QueryComposer::new(&params)?
            .par_identifiant_technique(source, id)
            .source_region_in(scope.as_deref(), true);
        fetch::select_one(&self.pool, &composer).await
    }

    /// The distinct budget years visible under the caller's scope, most
    /// recent first.
    pub async fn get_annees(&self, user: &ConnectedUser) -> Result<Vec<i64>> {
        let source_region = resolve_source_region(None, user, None)?;
        let mut qb = annees_query(source_region);
        let annees: Vec<i64> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        Ok(annees)
    }
}

fn annees_query(source_region: Option<String>) -> QueryBuilder<'static, sqlx::Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT DISTINCT \"annee\" FROM {FINANCIAL_LINES_VIEW} \
         WHERE \"annee\" IS NOT NULL"
    ));
    if let Some(region) = source_region {
        qb.push(" AND (\"source_region\" = ");
        qb.push_bind(region);
        qb.push(" OR \"source_region\" IS NULL)");
    }
    qb.push(" ORDER BY \"annee\" DESC");
    qb
}

/// Legal-category lists containing the "autres" bucket also match rows
/// without a category.
fn includes_none(params: &LineQueryParams) -> bool {
    params
        .beneficiaire_categorie_juridique_type
        .as_deref()
        .is_some_and(|types| types.iter().any(|t| t == "autres"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RawLineQueryParams;

    #[test]
    fn autres_widens_the_legal_category_match() {
        let params = LineQueryParams::parse(RawLineQueryParams {
            beneficiaire_categorie_juridique_type: Some("association,autres".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(includes_none(&params));

        let narrow = LineQueryParams::parse(RawLineQueryParams {
            beneficiaire_categorie_juridique_type: Some("association".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(!includes_none(&narrow));
    }

    #[test]
    fn annees_are_listed_most_recent_first() {
        let sql = annees_query(Some("53".into())).into_sql();
        assert!(sql.contains(r#"SELECT DISTINCT "annee""#));
        assert!(sql.ends_with(r#"ORDER BY "annee" DESC"#));
        assert!(sql.contains(r#""source_region" IS NULL"#));

        let unscoped = annees_query(None).into_sql();
        assert!(!unscoped.contains("source_region"));
        assert!(unscoped.ends_with(r#"ORDER BY "annee" DESC"#));
    }
}
