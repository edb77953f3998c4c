//! Column registries: the single source of truth for the queryable surface.
//!
//! Two independently curated registries exist because not every tabular
//! column is a legal aggregation key. Both are static, built once at
//! startup; requests referencing a code outside the applicable registry
//! fail at parse time and the registries never grow from user input.

use std::sync::LazyLock;

use crate::error::{QueryError, Result};
use crate::model::Colonne;

/// Columns exposed by the tabular (listing) view.
pub static COLONNES_TABLEAU: LazyLock<Vec<Colonne>> = LazyLock::new(|| {
    vec![
        Colonne::text("source", "Source de données"),
        Colonne::text("n_ej", "N° EJ"),
        Colonne::integer("n_poste_ej", "N° Poste EJ"),
        Colonne::text("montant_ae", "Montant engagé"),
        Colonne::text("montant_cp", "Montant payé"),
        Colonne::text("programme_theme", "Thème"),
        Colonne::text("programme_code", "Code programme"),
        Colonne::text("programme_label", "Programme"),
        Colonne::text("domaineFonctionnel_code", "Code domaine fonctionnel"),
        Colonne::text("domaineFonctionnel_label", "Domaine fonctionnel"),
        Colonne::text("referentielProgrammation_label", "Ref Programmation"),
        Colonne::text("beneficiaire_commune_label", "Commune du SIRET"),
        Colonne::text("beneficiaire_commune_labelCrte", "CRTE du SIRET"),
        Colonne::text("beneficiaire_commune_labelEpci", "EPCI du SIRET"),
        Colonne::text(
            "beneficiaire_commune_arrondissement_label",
            "Arrondissement du SIRET",
        ),
        Colonne::text("beneficiaire_commune_labelDepartement", "Département du SIRET"),
        Colonne::text("beneficiaire_commune_labelRegion", "Région du SIRET"),
        Colonne::text(
            "localisationInterministerielle_code",
            "Code localisation interministérielle",
        ),
        Colonne::text(
            "localisationInterministerielle_label",
            "Localisation interministérielle",
        ),
        Colonne::text("compte_budgetaire", "Compte budgétaire"),
        Colonne::text("contrat_etat_region", "CPER"),
        Colonne::text("groupeMarchandise_code", "Code groupe marchandise"),
        Colonne::text("groupeMarchandise_label", "Groupe marchandise"),
        Colonne::text("beneficiaire_code", "SIRET"),
        Colonne::text("beneficiaire_denomination", "Bénéficiaire"),
        Colonne::text("beneficiaire_categorieJuridique_type", "Type d'établissement"),
        Colonne::text("beneficiaire_qpv_code", "Code QPV").hidden(),
        Colonne::text("beneficiaire_qpv_label", "QPV"),
        Colonne::text("beneficiaire_qpv24_code", "Code QPV 2024").hidden(),
        Colonne::text("beneficiaire_qpv24_label", "QPV 2024").hidden(),
        Colonne::text("dateDeDernierPaiement", "Date dernier paiement"),
        Colonne::text("dateDeCreation", "Date création EJ"),
        Colonne::integer("annee", "Année Exercice comptable"),
        Colonne::text("centreCouts_code", "Code centre coûts"),
        Colonne::text("centreCouts_label", "Label centre coûts"),
        Colonne::text("centreCouts_description", "Centre coûts"),
        Colonne::text("data_source", "Source Chorus"),
        Colonne::text("date_modification", "Date modification EJ"),
        Colonne::text("source_region", "Région source").hidden(),
        Colonne::text("lieu_action_code_qpv", "Code QPV du lieu d'action").hidden(),
        Colonne::text("lieu_action_label_qpv", "QPV du lieu d'action").hidden(),
    ]
});

/// Columns accepted as grouping (drill-down) keys.
pub static COLONNES_GROUPING: LazyLock<Vec<Colonne>> = LazyLock::new(|| {
    vec![
        Colonne::integer("annee", "Année exercice comptable"),
        Colonne::text("beneficiaire_commune_labelRegion", "Région du SIRET"),
        Colonne::text("beneficiaire_commune_labelDepartement", "Département du SIRET"),
        Colonne::text("beneficiaire_commune_labelCrte", "CRTE du SIRET"),
        Colonne::text("beneficiaire_commune_labelEpci", "EPCI du SIRET"),
        Colonne::text("beneficiaire_commune_label", "Commune du SIRET"),
        Colonne::text("beneficiaire_qpv_label", "QPV"),
        Colonne::text(
            "localisationInterministerielle_label",
            "Localisation interministérielle",
        ),
        Colonne::text("programme_theme", "Thème"),
        Colonne::text("programme_code", "Programme").with_concatenate("programme_label"),
        Colonne::text("domaineFonctionnel_label", "Domaine fonctionnel"),
        Colonne::text("referentielProgrammation_label", "Ref Programmation"),
        Colonne::text("centreCouts_description", "Centre coûts"),
        Colonne::text("beneficiaire_denomination", "Bénéficiaire"),
        Colonne::text("beneficiaire_categorieJuridique_type", "Type d'établissement"),
        Colonne::text("compte_budgetaire", "Compte budgétaire"),
        Colonne::text("groupeMarchandise_label", "Groupe marchandise"),
    ]
});

/// Which registry a lookup validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Tableau,
    Grouping,
}

impl RegistryKind {
    fn colonnes(self) -> &'static [Colonne] {
        match self {
            Self::Tableau => &COLONNES_TABLEAU,
            Self::Grouping => &COLONNES_GROUPING,
        }
    }

    fn surface(self) -> &'static str {
        match self {
            Self::Tableau => "tableau",
            Self::Grouping => "grouping",
        }
    }
}

/// Look a code up, failing with a client error naming the offending column.
pub fn resolve_colonne(kind: RegistryKind, code: &str) -> Result<&'static Colonne> {
    kind.colonnes()
        .iter()
        .find(|c| c.code == code)
        .ok_or_else(|| {
            QueryError::InvalidFilterCombination(format!(
                "unknown column '{}' for the {} surface",
                code,
                kind.surface()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tableau_codes_are_unique() {
        let codes: HashSet<_> = COLONNES_TABLEAU.iter().map(|c| c.code).collect();
        assert_eq!(codes.len(), COLONNES_TABLEAU.len());
    }

    #[test]
    fn grouping_codes_are_unique() {
        let codes: HashSet<_> = COLONNES_GROUPING.iter().map(|c| c.code).collect();
        assert_eq!(codes.len(), COLONNES_GROUPING.len());
    }

    #[test]
    fn resolve_known_tableau_code() {
        let col = resolve_colonne(RegistryKind::Tableau, "annee").unwrap();
        assert_eq!(col.label, "Année Exercice comptable");
    }

    #[test]
    fn resolve_unknown_code_names_the_column() {
        let err = resolve_colonne(RegistryKind::Grouping, "no_such_column").unwrap_err();
        assert!(err.to_string().contains("no_such_column"));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn grouping_keys_exist_on_the_tabular_surface() {
        for col in COLONNES_GROUPING.iter() {
            assert!(
                COLONNES_TABLEAU.iter().any(|c| c.code == col.code),
                "grouping column {} missing from tableau surface",
                col.code
            );
        }
    }

    #[test]
    fn programme_code_carries_its_label_companion() {
        let col = resolve_colonne(RegistryKind::Grouping, "programme_code").unwrap();
        assert_eq!(col.concatenate, Some("programme_label"));
    }
}
