//! Geography resolution.
//!
//! A "geography" filter has three mutually exclusive readings depending on
//! the record shape: the beneficiary commune, the commune attached to the
//! interministerial location, or the hierarchical interministerial site
//! code itself (matched by prefix). Matching is an OR across the aspects a
//! restriction leaves enabled, never an AND.

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Geographic granularity of a code list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCodeGeo {
    Region,
    Departement,
    Epci,
    Crte,
    Arrondissement,
    Commune,
    Qpv,
    Qpv24,
}

impl TypeCodeGeo {
    /// Case-insensitive parse of the `niveau_geo` request parameter.
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value.to_ascii_uppercase().as_str() {
            "REGION" => Ok(Self::Region),
            "DEPARTEMENT" => Ok(Self::Departement),
            "EPCI" => Ok(Self::Epci),
            "CRTE" => Ok(Self::Crte),
            "ARRONDISSEMENT" => Ok(Self::Arrondissement),
            "COMMUNE" => Ok(Self::Commune),
            "QPV" => Ok(Self::Qpv),
            "QPV24" => Ok(Self::Qpv24),
            other => Err(QueryError::InvalidFilterCombination(format!(
                "unknown niveau_geo '{other}'"
            ))),
        }
    }
}

/// Narrows geo matching to one aspect. `None` keeps every aspect enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenefOrLoc {
    Beneficiaire,
    LocalisationInter,
    /// Matches the project-action priority-zone field directly, bypassing
    /// both the beneficiary and interministerial columns.
    LocalisationQpv,
}

/// Commune column of the interministerial location for a granularity.
/// Unsupported combinations resolve to `None` (a skip, not an error).
pub fn localisation_interministerielle_column(niveau: TypeCodeGeo) -> Option<&'static str> {
    match niveau {
        TypeCodeGeo::Region => Some("localisationInterministerielle_commune_codeRegion"),
        TypeCodeGeo::Departement => Some("localisationInterministerielle_commune_codeDepartement"),
        TypeCodeGeo::Epci => Some("localisationInterministerielle_commune_codeEpci"),
        TypeCodeGeo::Crte => Some("localisationInterministerielle_commune_codeCrte"),
        TypeCodeGeo::Arrondissement => {
            Some("localisationInterministerielle_commune_arrondissement_code")
        }
        TypeCodeGeo::Commune => Some("localisationInterministerielle_commune_code"),
        TypeCodeGeo::Qpv | TypeCodeGeo::Qpv24 => None,
    }
}

/// Beneficiary-commune column for a granularity.
pub fn beneficiaire_column(niveau: TypeCodeGeo) -> Option<&'static str> {
    match niveau {
        TypeCodeGeo::Region => Some("beneficiaire_commune_codeRegion"),
        TypeCodeGeo::Departement => Some("beneficiaire_commune_codeDepartement"),
        TypeCodeGeo::Epci => Some("beneficiaire_commune_codeEpci"),
        TypeCodeGeo::Crte => Some("beneficiaire_commune_codeCrte"),
        TypeCodeGeo::Arrondissement => Some("beneficiaire_commune_arrondissement_code"),
        TypeCodeGeo::Commune => Some("beneficiaire_commune_code"),
        TypeCodeGeo::Qpv => Some("beneficiaire_qpv_code"),
        TypeCodeGeo::Qpv24 => Some("beneficiaire_qpv24_code"),
    }
}

/// Interministerial site-code prefixes derived from a code list.
///
/// Only REGION and DEPARTEMENT produce prefixes: REGION expands each code
/// to `N{code}`, DEPARTEMENT to `N{source_region}{code}`. Other levels
/// yield no prefix clause at all. A DEPARTEMENT prefix without a source
/// region would collide with the REGION prefix space, so an absent or
/// empty region disables the clause entirely.
pub fn localisation_interministerielle_prefixes(
    niveau: TypeCodeGeo,
    codes: &[String],
    source_region: Option<&str>,
) -> Vec<String> {
    match niveau {
        TypeCodeGeo::Region => codes.iter().map(|c| format!("N{c}")).collect(),
        TypeCodeGeo::Departement => match source_region {
            Some(region) if !region.is_empty() => {
                codes.iter().map(|c| format!("N{region}{c}")).collect()
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
