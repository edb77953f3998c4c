//! Filter parameter model.
//!
//! Raw multi-value request parameters are parsed once into an immutable
//! [`LineQueryParams`]. Every paired-parameter invariant and every column
//! whitelist check happens here, before any query state exists; after
//! `parse` succeeds the criteria are read-only for the rest of the request
//! (updates go through the functional `with_*` constructors).

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{QueryError, Result};
use crate::geo::TypeCodeGeo;
use crate::model::{Colonne, DataType, Tag};
use crate::registry::{resolve_colonne, RegistryKind};

/// Priority-zone code vintage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QpvVintage {
    Y2015,
    Y2024,
}

impl QpvVintage {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "2015" => Ok(Self::Y2015),
            "2024" => Ok(Self::Y2024),
            other => Err(QueryError::InvalidFilterCombination(format!(
                "unknown ref_qpv '{other}', expected 2015 or 2024"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(QueryError::InvalidFilterCombination(format!(
                "unknown sort_order '{other}', expected asc or desc"
            ))),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw request parameters, exactly as the transport layer hands them over.
/// Multi-value fields are unsplit strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLineQueryParams {
    pub source_region: Option<String>,
    pub data_source: Option<String>,
    pub source: Option<String>,
    pub n_ej: Option<String>,
    pub code_programme: Option<String>,
    pub niveau_geo: Option<String>,
    pub code_geo: Option<String>,
    pub ref_qpv: Option<String>,
    pub code_qpv: Option<String>,
    pub theme: Option<String>,
    pub beneficiaire_code: Option<String>,
    pub beneficiaire_categorie_juridique_type: Option<String>,
    pub annee: Option<String>,
    pub centres_couts: Option<String>,
    pub domaine_fonctionnel: Option<String>,
    pub referentiel_programmation: Option<String>,
    pub tags: Option<String>,
    pub grouping: Option<String>,
    pub grouped: Option<String>,
    pub colonnes: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub search: Option<String>,
    pub fields_search: Option<String>,
}

/// Validated, immutable criteria for one request.
#[derive(Debug, Clone)]
pub struct LineQueryParams {
    pub source_region: Option<String>,
    pub data_source: Option<String>,
    pub source: Option<DataType>,
    pub n_ej: Option<Vec<String>>,
    pub code_programme: Option<Vec<String>>,
    pub niveau_geo: Option<TypeCodeGeo>,
    pub code_geo: Option<Vec<String>>,
    pub ref_qpv: Option<QpvVintage>,
    pub code_qpv: Option<Vec<String>>,
    pub theme: Option<Vec<String>>,
    pub beneficiaire_code: Option<Vec<String>>,
    pub beneficiaire_categorie_juridique_type: Option<Vec<String>>,
    pub annee: Vec<i64>,
    pub centres_couts: Option<Vec<String>>,
    pub domaine_fonctionnel: Option<Vec<String>>,
    pub referentiel_programmation: Option<Vec<String>>,
    /// Sanitized `type:value` fullnames.
    pub tags: Option<Vec<String>>,
    /// Ordered drill-down chain, validated against the grouping registry.
    pub grouping: Option<Vec<&'static Colonne>>,
    /// Already-chosen values for the leading portion of the chain.
    pub grouped: Option<Vec<String>>,
    /// Projection columns, validated against the tabular registry.
    pub colonnes: Option<Vec<&'static Colonne>>,
    pub page: u32,
    pub page_size: u32,
    pub sort_by: Option<&'static Colonne>,
    pub sort_order: Option<SortOrder>,
    pub search: Option<String>,
    pub fields_search: Option<Vec<&'static Colonne>>,
}

fn split(value: Option<&str>, separator: char) -> Option<Vec<String>> {
    let value = value?;
    if value.is_empty() {
        return None;
    }
    Some(value.split(separator).map(str::to_string).collect())
}

fn paired(name_a: &str, present_a: bool, name_b: &str, present_b: bool) -> Result<()> {
    if present_a != present_b {
        return Err(QueryError::InvalidFilterCombination(format!(
            "parameters '{name_a}' and '{name_b}' must be supplied together"
        )));
    }
    Ok(())
}

impl LineQueryParams {
    pub fn parse(raw: RawLineQueryParams) -> Result<Self> {
        paired(
            "niveau_geo",
            raw.niveau_geo.is_some(),
            "code_geo",
            raw.code_geo.is_some(),
        )?;
        paired(
            "ref_qpv",
            raw.ref_qpv.is_some(),
            "code_qpv",
            raw.code_qpv.is_some(),
        )?;
        paired(
            "sort_by",
            raw.sort_by.is_some(),
            "sort_order",
            raw.sort_order.is_some(),
        )?;
        paired(
            "search",
            raw.search.is_some(),
            "fields_search",
            raw.fields_search.is_some(),
        )?;

        let page = raw.page.unwrap_or(1);
        if page < 1 {
            return Err(QueryError::InvalidFilterCombination(
                "'page' must be >= 1".into(),
            ));
        }
        let page_size = raw.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size < 1 || page_size > MAX_PAGE_SIZE {
            return Err(QueryError::InvalidFilterCombination(format!(
                "'page_size' must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let annee = match split(raw.annee.as_deref(), ',') {
            None => Vec::new(),
            Some(values) => values
                .iter()
                .map(|a| {
                    a.parse::<i64>().map_err(|_| {
                        QueryError::InvalidFilterCombination(format!(
                            "'annee' value '{a}' is not an integer"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let tags = split(raw.tags.as_deref(), ',')
            .map(|values| {
                values
                    .iter()
                    .map(|t| {
                        Tag::sanitize(t).ok_or_else(|| {
                            QueryError::InvalidFilterCombination(format!("malformed tag '{t}'"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let colonnes = split(raw.colonnes.as_deref(), ',')
            .map(|codes| {
                codes
                    .iter()
                    .map(|code| resolve_colonne(RegistryKind::Tableau, code))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let grouping = split(raw.grouping.as_deref(), ',')
            .map(|codes| {
                codes
                    .iter()
                    .map(|code| resolve_colonne(RegistryKind::Grouping, code))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;
        let grouped = split(raw.grouped.as_deref(), ',');

        if let Some(grouping) = &grouping {
            match &grouped {
                None if grouping.len() > 1 => {
                    return Err(QueryError::InvalidFilterCombination(
                        "'grouped' is required when the grouping chain has more than one element"
                            .into(),
                    ));
                }
                Some(grouped)
                    if grouping.len() != grouped.len() && grouping.len() != grouped.len() + 1 =>
                {
                    return Err(QueryError::InvalidFilterCombination(
                        "'grouped' must cover the grouping chain entirely or all but its last element"
                            .into(),
                    ));
                }
                _ => {}
            }
        } else if grouped.is_some() {
            return Err(QueryError::InvalidFilterCombination(
                "'grouped' requires 'grouping'".into(),
            ));
        }

        let sort_by = raw
            .sort_by
            .as_deref()
            .map(|code| resolve_colonne(RegistryKind::Tableau, code))
            .transpose()?;
        let sort_order = raw.sort_order.as_deref().map(SortOrder::parse).transpose()?;

        let fields_search = split(raw.fields_search.as_deref(), ',')
            .map(|codes| {
                codes
                    .iter()
                    .map(|code| resolve_colonne(RegistryKind::Tableau, code))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let source = raw
            .source
            .as_deref()
            .map(|s| {
                DataType::parse(s).ok_or_else(|| {
                    QueryError::InvalidFilterCombination(format!("unknown source '{s}'"))
                })
            })
            .transpose()?;

        Ok(Self {
            source_region: raw.source_region,
            data_source: raw.data_source,
            source,
            n_ej: split(raw.n_ej.as_deref(), ','),
            code_programme: split(raw.code_programme.as_deref(), ','),
            niveau_geo: raw.niveau_geo.as_deref().map(TypeCodeGeo::parse).transpose()?,
            code_geo: split(raw.code_geo.as_deref(), ','),
            ref_qpv: raw.ref_qpv.as_deref().map(QpvVintage::parse).transpose()?,
            code_qpv: split(raw.code_qpv.as_deref(), ','),
            // themes may contain commas, hence the pipe separator
            theme: split(raw.theme.as_deref(), '|'),
            beneficiaire_code: split(raw.beneficiaire_code.as_deref(), ','),
            beneficiaire_categorie_juridique_type: split(
                raw.beneficiaire_categorie_juridique_type.as_deref(),
                ',',
            ),
            annee,
            centres_couts: split(raw.centres_couts.as_deref(), ','),
            domaine_fonctionnel: split(raw.domaine_fonctionnel.as_deref(), ','),
            referentiel_programmation: split(raw.referentiel_programmation.as_deref(), ','),
            tags,
            grouping,
            grouped,
            colonnes,
            page,
            page_size,
            sort_by,
            sort_order,
            search: raw.search,
            fields_search,
        })
    }

    /// Default criteria: page 1, default page size, no filter at all.
    pub fn make_default() -> Self {
        Self {
            source_region: None,
            data_source: None,
            source: None,
            n_ej: None,
            code_programme: None,
            niveau_geo: None,
            code_geo: None,
            ref_qpv: None,
            code_qpv: None,
            theme: None,
            beneficiaire_code: None,
            beneficiaire_categorie_juridique_type: None,
            annee: Vec::new(),
            centres_couts: None,
            domaine_fonctionnel: None,
            referentiel_programmation: None,
            tags: None,
            grouping: None,
            grouped: None,
            colonnes: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_order: None,
            search: None,
            fields_search: None,
        }
    }

    /// Functional update: same criteria with another projection.
    pub fn with_colonnes(mut self, colonnes: Vec<&'static Colonne>) -> Self {
        self.colonnes = Some(colonnes);
        self
    }

    /// Functional update: same criteria scoped to another source region.
    pub fn with_source_region(mut self, source_region: Option<String>) -> Self {
        self.source_region = source_region;
        self
    }

    /// A partially-resolved drill-down: the chain is longer than the chosen
    /// values, so an aggregation key remains active.
    pub fn is_group_request(&self) -> bool {
        let len_grouping = self.grouping.as_ref().map_or(0, Vec::len);
        let len_grouped = self.grouped.as_ref().map_or(0, Vec::len);
        len_grouping != len_grouped
    }
}

impl Default for LineQueryParams {
    fn default() -> Self {
        Self::make_default()
    }
}
