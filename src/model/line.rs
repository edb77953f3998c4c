//! Row types for the `flatten_financial_lines` view.
//!
//! The view is wide and denormalized on purpose: one row per engagement,
//! payment or subsidy line, carrying every geographic granularity for both
//! the beneficiary commune and the interministerial location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Name of the denormalized view every query targets.
pub const FINANCIAL_LINES_VIEW: &str = "flatten_financial_lines";

/// Origin of a financial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    FinancialDataAe,
    FinancialDataCp,
    Ademe,
    France2030,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinancialDataAe => "FINANCIAL_DATA_AE",
            Self::FinancialDataCp => "FINANCIAL_DATA_CP",
            Self::Ademe => "ADEME",
            Self::France2030 => "FRANCE_2030",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FINANCIAL_DATA_AE" => Some(Self::FinancialDataAe),
            "FINANCIAL_DATA_CP" => Some(Self::FinancialDataCp),
            "ADEME" => Some(Self::Ademe),
            "FRANCE_2030" => Some(Self::France2030),
            _ => None,
        }
    }
}

/// One row of the flattened financial-lines view.
///
/// Every column except the identity pair is nullable. Fields carry
/// `#[sqlx(default)]` so a restricted projection still decodes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FinancialLine {
    pub source: String,
    pub id: i64,

    #[sqlx(default)]
    pub n_ej: Option<String>,
    #[sqlx(default)]
    pub n_poste_ej: Option<i64>,

    #[sqlx(default)]
    pub annee: Option<i64>,
    #[sqlx(default)]
    pub contrat_etat_region: Option<String>,
    #[sqlx(default)]
    pub compte_budgetaire: Option<String>,

    #[sqlx(default)]
    pub montant_ae: Option<f64>,
    #[sqlx(default)]
    pub montant_cp: Option<f64>,

    #[sqlx(default, rename = "dateDeDernierPaiement")]
    #[serde(rename = "dateDeDernierPaiement")]
    pub date_de_dernier_paiement: Option<DateTime<Utc>>,
    #[sqlx(default, rename = "dateDeCreation")]
    #[serde(rename = "dateDeCreation")]
    pub date_de_creation: Option<DateTime<Utc>>,

    #[sqlx(default, rename = "domaineFonctionnel_code")]
    #[serde(rename = "domaineFonctionnel_code")]
    pub domaine_fonctionnel_code: Option<String>,
    #[sqlx(default, rename = "domaineFonctionnel_label")]
    #[serde(rename = "domaineFonctionnel_label")]
    pub domaine_fonctionnel_label: Option<String>,

    #[sqlx(default, rename = "referentielProgrammation_code")]
    #[serde(rename = "referentielProgrammation_code")]
    pub referentiel_programmation_code: Option<String>,
    #[sqlx(default, rename = "referentielProgrammation_label")]
    #[serde(rename = "referentielProgrammation_label")]
    pub referentiel_programmation_label: Option<String>,

    #[sqlx(default, rename = "groupeMarchandise_code")]
    #[serde(rename = "groupeMarchandise_code")]
    pub groupe_marchandise_code: Option<String>,
    #[sqlx(default, rename = "groupeMarchandise_label")]
    #[serde(rename = "groupeMarchandise_label")]
    pub groupe_marchandise_label: Option<String>,

    #[sqlx(default)]
    pub programme_code: Option<String>,
    #[sqlx(default)]
    pub programme_label: Option<String>,
    #[sqlx(default)]
    pub programme_theme: Option<String>,

    #[sqlx(default)]
    pub beneficiaire_code: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_denomination: Option<String>,
    #[sqlx(default, rename = "beneficiaire_categorieJuridique_type")]
    #[serde(rename = "beneficiaire_categorieJuridique_type")]
    pub beneficiaire_categorie_juridique_type: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_qpv_code: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_qpv_label: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_qpv24_code: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_qpv24_label: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_commune_code: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_commune_label: Option<String>,
    #[sqlx(default, rename = "beneficiaire_commune_codeRegion")]
    #[serde(rename = "beneficiaire_commune_codeRegion")]
    pub beneficiaire_commune_code_region: Option<String>,
    #[sqlx(default, rename = "beneficiaire_commune_labelRegion")]
    #[serde(rename = "beneficiaire_commune_labelRegion")]
    pub beneficiaire_commune_label_region: Option<String>,
    #[sqlx(default, rename = "beneficiaire_commune_codeDepartement")]
    #[serde(rename = "beneficiaire_commune_codeDepartement")]
    pub beneficiaire_commune_code_departement: Option<String>,
    #[sqlx(default, rename = "beneficiaire_commune_labelDepartement")]
    #[serde(rename = "beneficiaire_commune_labelDepartement")]
    pub beneficiaire_commune_label_departement: Option<String>,
    #[sqlx(default, rename = "beneficiaire_commune_codeEpci")]
    #[serde(rename = "beneficiaire_commune_codeEpci")]
    pub beneficiaire_commune_code_epci: Option<String>,
    #[sqlx(default, rename = "beneficiaire_commune_labelEpci")]
    #[serde(rename = "beneficiaire_commune_labelEpci")]
    pub beneficiaire_commune_label_epci: Option<String>,
    #[sqlx(default, rename = "beneficiaire_commune_codeCrte")]
    #[serde(rename = "beneficiaire_commune_codeCrte")]
    pub beneficiaire_commune_code_crte: Option<String>,
    #[sqlx(default, rename = "beneficiaire_commune_labelCrte")]
    #[serde(rename = "beneficiaire_commune_labelCrte")]
    pub beneficiaire_commune_label_crte: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_commune_arrondissement_code: Option<String>,
    #[sqlx(default)]
    pub beneficiaire_commune_arrondissement_label: Option<String>,

    #[sqlx(default, rename = "localisationInterministerielle_code")]
    #[serde(rename = "localisationInterministerielle_code")]
    pub localisation_interministerielle_code: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_label")]
    #[serde(rename = "localisationInterministerielle_label")]
    pub localisation_interministerielle_label: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_codeDepartement")]
    #[serde(rename = "localisationInterministerielle_codeDepartement")]
    pub localisation_interministerielle_code_departement: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_code")]
    #[serde(rename = "localisationInterministerielle_commune_code")]
    pub localisation_interministerielle_commune_code: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_label")]
    #[serde(rename = "localisationInterministerielle_commune_label")]
    pub localisation_interministerielle_commune_label: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_codeRegion")]
    #[serde(rename = "localisationInterministerielle_commune_codeRegion")]
    pub localisation_interministerielle_commune_code_region: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_labelRegion")]
    #[serde(rename = "localisationInterministerielle_commune_labelRegion")]
    pub localisation_interministerielle_commune_label_region: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_codeDepartement")]
    #[serde(rename = "localisationInterministerielle_commune_codeDepartement")]
    pub localisation_interministerielle_commune_code_departement: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_labelDepartement")]
    #[serde(rename = "localisationInterministerielle_commune_labelDepartement")]
    pub localisation_interministerielle_commune_label_departement: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_codeEpci")]
    #[serde(rename = "localisationInterministerielle_commune_codeEpci")]
    pub localisation_interministerielle_commune_code_epci: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_labelEpci")]
    #[serde(rename = "localisationInterministerielle_commune_labelEpci")]
    pub localisation_interministerielle_commune_label_epci: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_codeCrte")]
    #[serde(rename = "localisationInterministerielle_commune_codeCrte")]
    pub localisation_interministerielle_commune_code_crte: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_labelCrte")]
    #[serde(rename = "localisationInterministerielle_commune_labelCrte")]
    pub localisation_interministerielle_commune_label_crte: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_arrondissement_code")]
    #[serde(rename = "localisationInterministerielle_commune_arrondissement_code")]
    pub localisation_interministerielle_commune_arrondissement_code: Option<String>,
    #[sqlx(default, rename = "localisationInterministerielle_commune_arrondissement_label")]
    #[serde(rename = "localisationInterministerielle_commune_arrondissement_label")]
    pub localisation_interministerielle_commune_arrondissement_label: Option<String>,

    #[sqlx(default)]
    pub source_region: Option<String>,

    #[sqlx(default, rename = "centreCouts_code")]
    #[serde(rename = "centreCouts_code")]
    pub centre_couts_code: Option<String>,
    #[sqlx(default, rename = "centreCouts_label")]
    #[serde(rename = "centreCouts_label")]
    pub centre_couts_label: Option<String>,
    #[sqlx(default, rename = "centreCouts_description")]
    #[serde(rename = "centreCouts_description")]
    pub centre_couts_description: Option<String>,

    #[sqlx(default)]
    pub data_source: Option<String>,
    #[sqlx(default)]
    pub lieu_action_code_qpv: Option<String>,
    #[sqlx(default)]
    pub lieu_action_label_qpv: Option<String>,

    #[sqlx(default)]
    pub date_modification: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One bucket of a drill-down aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupedLine {
    /// Value of the active group-by column, cast to text.
    pub colonne: Option<String>,
    /// Human label: the value concatenated with its companion when declared.
    pub label: Option<String>,
    pub total: i64,
    pub total_montant_engage: Option<f64>,
    pub total_montant_paye: Option<f64>,
}

/// Aggregate totals over the full filtered scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Total {
    pub total: i64,
    pub total_montant_engage: f64,
    pub total_montant_paye: f64,
}
