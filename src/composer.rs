//! Per-request query composition.
//!
//! [`QueryComposer`] owns one query under construction. Predicates are
//! accumulated as SQL fragments with typed bind values, then rendered onto
//! a `sqlx::QueryBuilder` — once for the paginated data query and once,
//! stripped of projection/grouping/ordering, for the aggregate totals. All
//! SQL is runtime-checked so no live database is needed at compile time.
//!
//! Every predicate method is a no-op when its filter value is absent or
//! empty, and returns the composer for chaining.

use sqlx::{Postgres, QueryBuilder};

use crate::error::{QueryError, Result};
use crate::geo::{
    beneficiaire_column, localisation_interministerielle_column,
    localisation_interministerielle_prefixes, BenefOrLoc, TypeCodeGeo,
};
use crate::model::line::FINANCIAL_LINES_VIEW;
use crate::model::{Colonne, ColonneKind, DataType};
use crate::params::{LineQueryParams, QpvVintage, SortOrder};
use crate::registry::COLONNES_TABLEAU;

/// Site code of the interministerial location, matched by prefix.
const LOC_INTERMINISTERIELLE_CODE: &str = "localisationInterministerielle_code";
/// Project-action priority-zone code, matched directly.
const LIEU_ACTION_CODE_QPV: &str = "lieu_action_code_qpv";

/// A typed bind value carried alongside the SQL fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Text(String),
    Int(i64),
}

#[derive(Debug, Clone)]
enum Frag {
    Sql(String),
    Bind(Bind),
}

/// One WHERE conjunct: SQL text interleaved with bind values.
#[derive(Debug, Clone, Default)]
struct Predicate {
    frags: Vec<Frag>,
}

impl Predicate {
    fn new() -> Self {
        Self::default()
    }

    fn sql(mut self, sql: impl Into<String>) -> Self {
        self.frags.push(Frag::Sql(sql.into()));
        self
    }

    fn bind(mut self, bind: Bind) -> Self {
        self.frags.push(Frag::Bind(bind));
        self
    }

    /// `"column" IN ($1, $2, ...)`
    fn in_list(column: &str, binds: Vec<Bind>) -> Self {
        let mut p = Self::new().sql(format!("{} IN (", quote(column)));
        for (i, bind) in binds.into_iter().enumerate() {
            if i > 0 {
                p = p.sql(", ");
            }
            p = p.bind(bind);
        }
        p.sql(")")
    }

    /// OR-join a set of sub-predicates into one parenthesized conjunct.
    fn any(parts: Vec<Predicate>) -> Self {
        let mut p = Self::new().sql("(");
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                p = p.sql(" OR ");
            }
            p.frags.extend(part.frags);
        }
        p.sql(")")
    }
}

fn quote(column: &str) -> String {
    format!("\"{column}\"")
}

#[derive(Debug, Clone)]
enum Projection {
    /// Explicit column list; always carries the identity pair.
    Columns(Vec<&'static str>),
    /// Aggregation over the active grouping key.
    Aggregation(&'static Colonne),
}

/// Stateful, fluent query composer for the financial-lines view.
///
/// One instance per request; never shared. Constructed from the validated
/// criteria; the drill-down chain is consumed eagerly so the remaining
/// group-by column (if any) is known up front.
#[derive(Debug)]
pub struct QueryComposer<'p> {
    params: &'p LineQueryParams,
    predicates: Vec<Predicate>,
    projection: Projection,
    sort_applied: bool,
}

impl<'p> QueryComposer<'p> {
    pub fn new(params: &'p LineQueryParams) -> Result<Self> {
        let mut composer = Self {
            params,
            predicates: Vec::new(),
            projection: Projection::Columns(Self::projection_columns(params)),
            sort_applied: false,
        };
        composer.consume_grouping_chain()?;
        Ok(composer)
    }

    fn projection_columns(params: &LineQueryParams) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = vec!["source", "id"];
        let requested: Vec<&'static str> = match &params.colonnes {
            Some(colonnes) => colonnes.iter().map(|c| c.code).collect(),
            None => COLONNES_TABLEAU.iter().map(|c| c.code).collect(),
        };
        for code in requested {
            if !columns.contains(&code) {
                columns.push(code);
            }
        }
        columns
    }

    /// Walk the drill-down chain: every already-chosen value becomes an
    /// equality condition, the first pending element becomes the active
    /// aggregation key. A fully-resolved chain leaves the composer as a
    /// plain filtered listing.
    fn consume_grouping_chain(&mut self) -> Result<()> {
        let Some(chain) = &self.params.grouping else {
            return Ok(());
        };
        let chosen = self.params.grouped.as_deref().unwrap_or(&[]);

        for (colonne, value) in chain.iter().zip(chosen) {
            let bind = cast_value(colonne, value)?;
            self.predicates.push(
                Predicate::new()
                    .sql(format!("{} = ", quote(colonne.code)))
                    .bind(bind),
            );
        }

        if let Some(active) = chain.get(chosen.len()) {
            self.projection = Projection::Aggregation(active);
        }
        Ok(())
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self.projection, Projection::Aggregation(_))
    }

    /// The active group-by column, when the request aggregates.
    pub fn groupby_colonne(&self) -> Option<&'static Colonne> {
        match self.projection {
            Projection::Aggregation(colonne) => Some(colonne),
            Projection::Columns(_) => None,
        }
    }

    // ── generic predicate helpers ─────────────────────────────────

    fn where_field_in(mut self, column: &str, values: Option<&[String]>, can_be_null: bool) -> Self {
        let Some(values) = values else { return self };
        if values.is_empty() {
            return self;
        }
        let binds = values.iter().map(|v| Bind::Text(v.clone())).collect();
        let in_list = Predicate::in_list(column, binds);
        let predicate = if can_be_null {
            Predicate::any(vec![
                in_list,
                Predicate::new().sql(format!("{} IS NULL", quote(column))),
            ])
        } else {
            in_list
        };
        self.predicates.push(predicate);
        self
    }

    fn where_field_not_in(mut self, column: &str, values: Option<&[String]>) -> Self {
        let Some(values) = values else { return self };
        if values.is_empty() {
            return self;
        }
        let binds: Vec<Bind> = values.iter().map(|v| Bind::Text(v.clone())).collect();
        let mut p = Predicate::new().sql(format!("{} NOT IN (", quote(column)));
        for (i, bind) in binds.into_iter().enumerate() {
            if i > 0 {
                p = p.sql(", ");
            }
            p = p.bind(bind);
        }
        self.predicates.push(p.sql(")"));
        self
    }

    // ── one predicate per filter dimension ────────────────────────

    pub fn source_is(mut self, source: Option<DataType>) -> Self {
        if let Some(source) = source {
            self.predicates.push(
                Predicate::new()
                    .sql("\"source\" = ")
                    .bind(Bind::Text(source.as_str().to_string())),
            );
        }
        self
    }

    /// Permissive of rows without a data source.
    pub fn data_source_is(self, data_source: Option<&str>) -> Self {
        match data_source {
            Some(ds) => self.where_field_in("data_source", Some(&[ds.to_string()]), true),
            None => self,
        }
    }

    /// Source-region filter. Deliberately permissive of rows without a
    /// source region when `can_be_null` holds.
    pub fn source_region_in(self, regions: Option<&[String]>, can_be_null: bool) -> Self {
        self.where_field_in("source_region", regions, can_be_null)
    }

    /// Single-record lookup by the technical identity pair (source, id).
    pub fn par_identifiant_technique(mut self, source: DataType, id: i64) -> Self {
        self.predicates.push(
            Predicate::new()
                .sql("\"source\" = ")
                .bind(Bind::Text(source.as_str().to_string())),
        );
        self.predicates
            .push(Predicate::new().sql("\"id\" = ").bind(Bind::Int(id)));
        self
    }

    pub fn n_ej_in(self, n_ej: Option<&[String]>) -> Self {
        self.where_field_in("n_ej", n_ej, false)
    }

    pub fn themes_in(self, themes: Option<&[String]>) -> Self {
        self.where_field_in("programme_theme", themes, false)
    }

    pub fn code_programme_in(self, codes: Option<&[String]>) -> Self {
        self.where_field_in("programme_code", codes, false)
    }

    pub fn code_programme_not_in(self, codes: Option<&[String]>) -> Self {
        self.where_field_not_in("programme_code", codes)
    }

    pub fn beneficiaire_siret_in(self, sirets: Option<&[String]>) -> Self {
        self.where_field_in("beneficiaire_code", sirets, false)
    }

    pub fn annee_in(mut self, annees: &[i64]) -> Self {
        if annees.is_empty() {
            return self;
        }
        let binds = annees.iter().map(|a| Bind::Int(*a)).collect();
        self.predicates.push(Predicate::in_list("annee", binds));
        self
    }

    pub fn centres_couts_in(self, centres_couts: Option<&[String]>) -> Self {
        self.where_field_in("centreCouts_code", centres_couts, false)
    }

    pub fn domaine_fonctionnel_in(self, dfs: Option<&[String]>) -> Self {
        self.where_field_in("domaineFonctionnel_code", dfs, false)
    }

    pub fn referentiel_programmation_in(self, ref_prog: Option<&[String]>) -> Self {
        self.where_field_in("referentielProgrammation_code", ref_prog, false)
    }

    /// Legal-category membership. `includes_none` widens the match to rows
    /// without a category (the "autres" bucket).
    pub fn categorie_juridique_in(
        self,
        types_beneficiaires: Option<&[String]>,
        includes_none: bool,
    ) -> Self {
        self.where_field_in(
            "beneficiaire_categorieJuridique_type",
            types_beneficiaires,
            includes_none,
        )
    }

    /// Tag membership through the polymorphic association: the line matches
    /// when any of its tags carries one of the requested fullnames.
    pub fn tags_fullname_in(mut self, fullnames: Option<&[String]>) -> Self {
        let Some(fullnames) = fullnames else { return self };
        if fullnames.is_empty() {
            return self;
        }
        let mut p = Predicate::new().sql(
            "EXISTS (SELECT 1 FROM tags t \
             JOIN tag_association ta ON ta.tag_id = t.id \
             WHERE (t.type || ':' || COALESCE(t.value, '')) IN (",
        );
        for (i, fullname) in fullnames.iter().enumerate() {
            if i > 0 {
                p = p.sql(", ");
            }
            p = p.bind(Bind::Text(fullname.clone()));
        }
        p = p.sql(format!(
            ") AND ((ta.financial_ae = {view}.\"id\" AND {view}.\"source\" = 'FINANCIAL_DATA_AE') \
             OR (ta.financial_cp = {view}.\"id\" AND {view}.\"source\" = 'FINANCIAL_DATA_CP') \
             OR (ta.ademe = {view}.\"id\" AND {view}.\"source\" = 'ADEME')))",
            view = FINANCIAL_LINES_VIEW
        ));
        self.predicates.push(p);
        self
    }

    /// Geography membership: see [`crate::geo`] for the three-way OR.
    pub fn niveau_code_geo_in(
        self,
        niveau_geo: Option<TypeCodeGeo>,
        code_geo: Option<&[String]>,
        source_region: Option<&str>,
    ) -> Self {
        match (niveau_geo, code_geo) {
            (Some(niveau), Some(codes)) => self.where_geo(niveau, codes, source_region, None),
            _ => self,
        }
    }

    /// Priority-zone membership: matches the project-action field directly,
    /// bypassing beneficiary and interministerial columns.
    pub fn niveau_code_qpv_in(
        self,
        ref_qpv: Option<QpvVintage>,
        code_qpv: Option<&[String]>,
    ) -> Self {
        match (ref_qpv, code_qpv) {
            (Some(_vintage), Some(codes)) => {
                self.where_geo_restricted_to(LIEU_ACTION_CODE_QPV, codes)
            }
            _ => self,
        }
    }

    fn where_geo_restricted_to(self, column: &'static str, codes: &[String]) -> Self {
        self.where_field_in(column, Some(codes), false)
    }

    /// OR across the enabled aspects: interministerial prefix, location
    /// commune, beneficiary commune. The prefix clause stays active only
    /// without restriction or under the location restriction.
    pub fn where_geo(
        mut self,
        niveau: TypeCodeGeo,
        codes: &[String],
        source_region: Option<&str>,
        benef_or_loc: Option<BenefOrLoc>,
    ) -> Self {
        if codes.is_empty() {
            return self;
        }
        let mut parts: Vec<Predicate> = Vec::new();

        if matches!(benef_or_loc, None | Some(BenefOrLoc::LocalisationInter)) {
            let prefixes =
                localisation_interministerielle_prefixes(niveau, codes, source_region);
            if !prefixes.is_empty() {
                let clauses = prefixes
                    .into_iter()
                    .map(|prefix| {
                        Predicate::new()
                            .sql(format!("{} ILIKE ", quote(LOC_INTERMINISTERIELLE_CODE)))
                            .bind(Bind::Text(format!("{prefix}%")))
                    })
                    .collect();
                parts.push(Predicate::any(clauses));
            }

            if let Some(column) = localisation_interministerielle_column(niveau) {
                let binds = codes.iter().map(|c| Bind::Text(c.clone())).collect();
                parts.push(Predicate::in_list(column, binds));
            }
        }

        if matches!(benef_or_loc, None | Some(BenefOrLoc::Beneficiaire)) {
            if let Some(column) = beneficiaire_column(niveau) {
                let binds = codes.iter().map(|c| Bind::Text(c.clone())).collect();
                parts.push(Predicate::in_list(column, binds));
            }
        }

        if matches!(benef_or_loc, Some(BenefOrLoc::LocalisationQpv)) {
            let binds = codes.iter().map(|c| Bind::Text(c.clone())).collect();
            parts.push(Predicate::in_list(LIEU_ACTION_CODE_QPV, binds));
        }

        if !parts.is_empty() {
            self.predicates.push(Predicate::any(parts));
        }
        self
    }

    /// Free-text search across the requested fields.
    pub fn search(mut self) -> Self {
        let (Some(search), Some(fields)) = (&self.params.search, &self.params.fields_search)
        else {
            return self;
        };
        let needle = format!("%{search}%");
        let clauses = fields
            .iter()
            .map(|colonne| {
                Predicate::new()
                    .sql(format!("{} ILIKE ", quote(colonne.code)))
                    .bind(Bind::Text(needle.clone()))
            })
            .collect::<Vec<_>>();
        if !clauses.is_empty() {
            self.predicates.push(Predicate::any(clauses));
        }
        self
    }

    /// Apply the explicit sort. The identifier tiebreak itself is appended
    /// at render time for every non-aggregated query.
    pub fn sort_by_params(mut self) -> Self {
        self.sort_applied = true;
        self
    }

    // ── rendering ────────────────────────────────────────────────

    fn select_clause(&self) -> String {
        match &self.projection {
            Projection::Columns(columns) => {
                let list = columns
                    .iter()
                    .map(|c| quote(c))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("SELECT {list} FROM {FINANCIAL_LINES_VIEW}")
            }
            Projection::Aggregation(colonne) => {
                let code = quote(colonne.code);
                let value_expr = format!("CAST({code} AS TEXT)");
                let label_expr = match colonne.concatenate {
                    Some(companion) => {
                        format!("CAST({code} AS TEXT) || ' - ' || {}", quote(companion))
                    }
                    None => value_expr.clone(),
                };
                format!(
                    "SELECT {value_expr} AS colonne, {label_expr} AS label, \
                     COUNT(\"id\") AS total, \
                     SUM(\"montant_ae\") AS total_montant_engage, \
                     SUM(\"montant_cp\") AS total_montant_paye \
                     FROM {FINANCIAL_LINES_VIEW}"
                )
            }
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if self.predicates.is_empty() {
            return;
        }
        qb.push(" WHERE ");
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            for frag in &predicate.frags {
                match frag {
                    Frag::Sql(sql) => {
                        qb.push(sql.as_str());
                    }
                    Frag::Bind(Bind::Text(value)) => {
                        qb.push_bind(value.clone());
                    }
                    Frag::Bind(Bind::Int(value)) => {
                        qb.push_bind(*value);
                    }
                }
            }
        }
    }

    fn push_order_by(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        let mut clauses: Vec<String> = Vec::new();
        if self.sort_applied {
            if let Some(sort_by) = self.params.sort_by {
                let order = self.params.sort_order.unwrap_or(SortOrder::Asc);
                clauses.push(format!("{} {}", quote(sort_by.code), order.as_sql()));
            }
        }
        // stable pagination across ties
        if !self.is_aggregation() {
            clauses.push("\"id\" ASC".to_string());
        }
        if !clauses.is_empty() {
            qb.push(format!(" ORDER BY {}", clauses.join(", ")));
        }
    }

    /// The paginated data query, with one lookahead row.
    pub fn build_select(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(self.select_clause());
        self.push_where(&mut qb);
        if let Projection::Aggregation(colonne) = &self.projection {
            let mut groups = vec![quote(colonne.code)];
            if let Some(companion) = colonne.concatenate {
                groups.push(quote(companion));
            }
            qb.push(format!(" GROUP BY {}", groups.join(", ")));
        }
        self.push_order_by(&mut qb);
        let offset = (self.params.page as i64 - 1) * self.params.page_size as i64;
        qb.push(format!(
            " LIMIT {} OFFSET {}",
            self.params.page_size as i64 + 1,
            offset
        ));
        qb
    }

    /// One row by identity, no pagination.
    pub fn build_select_one(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(self.select_clause());
        self.push_where(&mut qb);
        qb
    }

    /// The aggregate-totals query: same WHERE, no projection, grouping,
    /// ordering or pagination.
    pub fn build_total(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT COALESCE(COUNT(\"id\"), 0) AS total, \
             COALESCE(SUM(\"montant_ae\"), 0) AS total_montant_engage, \
             COALESCE(SUM(\"montant_cp\"), 0) AS total_montant_paye \
             FROM {FINANCIAL_LINES_VIEW}"
        ));
        self.push_where(&mut qb);
        qb
    }

    /// Debug rendering of the WHERE clause with `$n` placeholders.
    /// Used by logging and by tests; never sent to the database.
    pub fn where_sql(&self) -> String {
        let mut out = String::new();
        let mut n = 0usize;
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            for frag in &predicate.frags {
                match frag {
                    Frag::Sql(sql) => out.push_str(sql),
                    Frag::Bind(_) => {
                        n += 1;
                        out.push_str(&format!("${n}"));
                    }
                }
            }
        }
        out
    }

    /// Bind values in placeholder order.
    pub fn bind_values(&self) -> Vec<&Bind> {
        self.predicates
            .iter()
            .flat_map(|p| &p.frags)
            .filter_map(|frag| match frag {
                Frag::Bind(bind) => Some(bind),
                Frag::Sql(_) => None,
            })
            .collect()
    }
}

fn cast_value(colonne: &Colonne, value: &str) -> Result<Bind> {
    match colonne.kind {
        ColonneKind::Text => Ok(Bind::Text(value.to_string())),
        ColonneKind::Integer => value.parse::<i64>().map(Bind::Int).map_err(|_| {
            QueryError::InvalidFilterCombination(format!(
                "value '{}' for column '{}' is not an integer",
                value, colonne.code
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RawLineQueryParams;

    fn params(raw: RawLineQueryParams) -> LineQueryParams {
        LineQueryParams::parse(raw).unwrap()
    }

    // ── no-op contract ───────────────────────────────────────────

    #[test]
    fn absent_filters_add_no_predicate() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p)
            .unwrap()
            .n_ej_in(None)
            .themes_in(None)
            .code_programme_in(None)
            .beneficiaire_siret_in(None)
            .annee_in(&[])
            .centres_couts_in(None)
            .domaine_fonctionnel_in(None)
            .referentiel_programmation_in(None)
            .source_is(None)
            .data_source_is(None)
            .source_region_in(None, true)
            .categorie_juridique_in(None, false)
            .tags_fullname_in(None)
            .niveau_code_geo_in(None, None, Some("53"))
            .niveau_code_qpv_in(None, None)
            .search();
        assert_eq!(composer.where_sql(), "");
        assert!(composer.bind_values().is_empty());
    }

    #[test]
    fn empty_code_list_is_a_noop() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p)
            .unwrap()
            .where_geo(TypeCodeGeo::Region, &[], Some("53"), None);
        assert_eq!(composer.where_sql(), "");
    }

    // ── field membership ─────────────────────────────────────────

    #[test]
    fn source_region_filter_is_null_permissive() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p)
            .unwrap()
            .source_region_in(Some(&["53".to_string()]), true);
        assert_eq!(
            composer.where_sql(),
            r#"("source_region" IN ($1) OR "source_region" IS NULL)"#
        );
    }

    #[test]
    fn categorie_juridique_autres_includes_null() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p).unwrap().categorie_juridique_in(
            Some(&["association".to_string(), "autres".to_string()]),
            true,
        );
        let sql = composer.where_sql();
        assert!(sql.contains(r#""beneficiaire_categorieJuridique_type" IN ($1, $2)"#));
        assert!(sql.contains(r#""beneficiaire_categorieJuridique_type" IS NULL"#));
    }

    #[test]
    fn code_programme_exclusion() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p)
            .unwrap()
            .code_programme_not_in(Some(&["109".to_string()]));
        assert_eq!(composer.where_sql(), r#""programme_code" NOT IN ($1)"#);
    }

    #[test]
    fn tags_render_an_exists_subquery() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p)
            .unwrap()
            .tags_fullname_in(Some(&["relance:2021".to_string()]));
        let sql = composer.where_sql();
        assert!(sql.starts_with("EXISTS (SELECT 1 FROM tags t"));
        assert!(sql.contains("ta.financial_ae = flatten_financial_lines.\"id\""));
        assert_eq!(
            composer.bind_values(),
            vec![&Bind::Text("relance:2021".to_string())]
        );
    }

    // ── geography ────────────────────────────────────────────────

    #[test]
    fn departement_filter_is_a_three_way_or() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p).unwrap().niveau_code_geo_in(
            Some(TypeCodeGeo::Departement),
            Some(&["35".to_string()]),
            Some("53"),
        );
        let sql = composer.where_sql();
        assert!(sql.contains(r#""localisationInterministerielle_code" ILIKE $1"#));
        assert!(sql.contains(r#""localisationInterministerielle_commune_codeDepartement" IN ($2)"#));
        assert!(sql.contains(r#""beneficiaire_commune_codeDepartement" IN ($3)"#));
        assert!(sql.contains(" OR "));
        assert!(!sql.contains(" AND "));
        assert_eq!(
            composer.bind_values()[0],
            &Bind::Text("N5335%".to_string())
        );
    }

    #[test]
    fn departement_without_source_region_emits_no_prefix_clause() {
        // an unscoped request must not fall back to the region prefix space
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p).unwrap().niveau_code_geo_in(
            Some(TypeCodeGeo::Departement),
            Some(&["35".to_string()]),
            None,
        );
        let sql = composer.where_sql();
        assert!(!sql.contains("ILIKE"));
        assert!(sql.contains(r#""localisationInterministerielle_commune_codeDepartement" IN ($1)"#));
        assert!(sql.contains(r#""beneficiaire_commune_codeDepartement" IN ($2)"#));
        for bind in composer.bind_values() {
            assert_ne!(bind, &Bind::Text("N35%".to_string()));
        }
    }

    #[test]
    fn beneficiary_restriction_drops_prefix_and_location() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p).unwrap().where_geo(
            TypeCodeGeo::Departement,
            &["35".to_string()],
            Some("53"),
            Some(BenefOrLoc::Beneficiaire),
        );
        let sql = composer.where_sql();
        assert!(!sql.contains("ILIKE"));
        assert!(!sql.contains("localisationInterministerielle"));
        assert!(sql.contains(r#""beneficiaire_commune_codeDepartement" IN ($1)"#));
    }

    #[test]
    fn location_restriction_keeps_prefix_but_drops_beneficiary() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p).unwrap().where_geo(
            TypeCodeGeo::Departement,
            &["35".to_string()],
            Some("53"),
            Some(BenefOrLoc::LocalisationInter),
        );
        let sql = composer.where_sql();
        assert!(sql.contains("ILIKE"));
        assert!(sql.contains("localisationInterministerielle_commune_codeDepartement"));
        assert!(!sql.contains("beneficiaire"));
    }

    #[test]
    fn qpv_filter_targets_the_project_action_field_only() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p)
            .unwrap()
            .niveau_code_qpv_in(Some(QpvVintage::Y2024), Some(&["QP093028".to_string()]));
        assert_eq!(composer.where_sql(), r#""lieu_action_code_qpv" IN ($1)"#);
    }

    #[test]
    fn region_level_expands_codes_to_prefixes() {
        let p = LineQueryParams::make_default();
        let composer = QueryComposer::new(&p).unwrap().niveau_code_geo_in(
            Some(TypeCodeGeo::Region),
            Some(&["53".to_string(), "11".to_string()]),
            Some("53"),
        );
        let binds = composer.bind_values();
        assert_eq!(binds[0], &Bind::Text("N53%".to_string()));
        assert_eq!(binds[1], &Bind::Text("N11%".to_string()));
    }

    // ── grouping chain ───────────────────────────────────────────

    #[test]
    fn pending_chain_element_becomes_the_groupby_column() {
        let p = params(RawLineQueryParams {
            grouping: Some("annee,programme_code".into()),
            grouped: Some("2023".into()),
            ..Default::default()
        });
        let composer = QueryComposer::new(&p).unwrap();
        assert!(composer.is_aggregation());
        assert_eq!(composer.groupby_colonne().unwrap().code, "programme_code");
        // the chosen value is an equality condition, cast through Integer
        assert_eq!(composer.where_sql(), r#""annee" = $1"#);
        assert_eq!(composer.bind_values(), vec![&Bind::Int(2023)]);
    }

    #[test]
    fn fully_resolved_chain_degrades_to_listing() {
        let p = params(RawLineQueryParams {
            grouping: Some("annee".into()),
            grouped: Some("2023".into()),
            ..Default::default()
        });
        let composer = QueryComposer::new(&p).unwrap();
        assert!(!composer.is_aggregation());
        assert_eq!(composer.where_sql(), r#""annee" = $1"#);
    }

    #[test]
    fn non_integer_value_for_integer_column_fails() {
        let p = params(RawLineQueryParams {
            grouping: Some("annee".into()),
            grouped: Some("abc".into()),
            ..Default::default()
        });
        let err = QueryComposer::new(&p).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilterCombination(_)));
    }

    #[test]
    fn aggregation_projection_carries_count_sums_and_label() {
        let p = params(RawLineQueryParams {
            grouping: Some("programme_code".into()),
            ..Default::default()
        });
        let composer = QueryComposer::new(&p).unwrap();
        let sql = composer.build_select().into_sql();
        assert!(sql.contains(r#"CAST("programme_code" AS TEXT) AS colonne"#));
        assert!(sql.contains(r#"|| ' - ' || "programme_label""#));
        assert!(sql.contains(r#"COUNT("id") AS total"#));
        assert!(sql.contains(r#"SUM("montant_ae") AS total_montant_engage"#));
        assert!(sql.contains(r#"SUM("montant_cp") AS total_montant_paye"#));
        assert!(sql.contains(r#"GROUP BY "programme_code", "programme_label""#));
        // no identifier tiebreak on aggregated queries
        assert!(!sql.contains(r#""id" ASC"#));
    }

    #[test]
    fn grouping_without_companion_labels_with_the_code_itself() {
        let p = params(RawLineQueryParams {
            grouping: Some("annee".into()),
            ..Default::default()
        });
        let sql = QueryComposer::new(&p).unwrap().build_select().into_sql();
        assert!(sql.contains(r#"CAST("annee" AS TEXT) AS colonne"#));
        assert!(sql.contains(r#"CAST("annee" AS TEXT) AS label"#));
        assert!(sql.contains(r#"GROUP BY "annee""#));
    }

    // ── sort and pagination ──────────────────────────────────────

    #[test]
    fn explicit_sort_keeps_identifier_tiebreak() {
        let p = params(RawLineQueryParams {
            sort_by: Some("annee".into()),
            sort_order: Some("desc".into()),
            ..Default::default()
        });
        let sql = QueryComposer::new(&p)
            .unwrap()
            .sort_by_params()
            .build_select()
            .into_sql();
        assert!(sql.contains(r#"ORDER BY "annee" DESC, "id" ASC"#));
    }

    #[test]
    fn unsorted_listing_still_orders_by_identifier() {
        let p = LineQueryParams::make_default();
        let sql = QueryComposer::new(&p)
            .unwrap()
            .sort_by_params()
            .build_select()
            .into_sql();
        assert!(sql.contains(r#"ORDER BY "id" ASC"#));
    }

    #[test]
    fn pagination_fetches_one_lookahead_row() {
        let p = params(RawLineQueryParams {
            page: Some(3),
            page_size: Some(50),
            ..Default::default()
        });
        let sql = QueryComposer::new(&p).unwrap().build_select().into_sql();
        assert!(sql.ends_with("LIMIT 51 OFFSET 100"));
    }

    // ── projection ───────────────────────────────────────────────

    #[test]
    fn projection_always_carries_the_identity_pair() {
        let p = params(RawLineQueryParams {
            colonnes: Some("annee,montant_ae".into()),
            ..Default::default()
        });
        let sql = QueryComposer::new(&p).unwrap().build_select().into_sql();
        assert!(sql.starts_with(r#"SELECT "source", "id", "annee", "montant_ae" FROM"#));
    }

    // ── totals ───────────────────────────────────────────────────

    #[test]
    fn total_query_shares_the_where_clause_and_drops_the_rest() {
        let p = params(RawLineQueryParams {
            annee: Some("2023".into()),
            sort_by: Some("annee".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        });
        let composer = QueryComposer::new(&p)
            .unwrap()
            .annee_in(&p.annee)
            .sort_by_params();
        let sql = composer.build_total().into_sql();
        assert!(sql.contains(r#"COALESCE(COUNT("id"), 0) AS total"#));
        assert!(sql.contains(r#""annee" IN ("#));
        assert!(!sql.contains("ORDER BY"));
        assert!(!sql.contains("LIMIT"));
    }

    // ── search ───────────────────────────────────────────────────

    #[test]
    fn search_ors_an_ilike_per_field() {
        let p = params(RawLineQueryParams {
            search: Some("lycée".into()),
            fields_search: Some("beneficiaire_denomination,programme_label".into()),
            ..Default::default()
        });
        let composer = QueryComposer::new(&p).unwrap().search();
        let sql = composer.where_sql();
        assert_eq!(
            sql,
            r#"("beneficiaire_denomination" ILIKE $1 OR "programme_label" ILIKE $2)"#
        );
        assert_eq!(
            composer.bind_values()[0],
            &Bind::Text("%lycée%".to_string())
        );
    }
}
