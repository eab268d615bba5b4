//! Classification rule engine for inventory records.
//!
//! This module maps one record to its destination sheet label by walking an
//! ordered rule table. Rules are evaluated strictly in priority order and the
//! first match wins, so a handheld scanner can never fall through to the
//! generic scanner rule. Classification is per-record and carries no state
//! across records.

use serde::{Deserialize, Serialize};

/// Classification view of one record.
///
/// Fields are explicitly optional: a column missing from the export is `None`
/// and is treated as an empty value, never as an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyInput<'a> {
    /// Device type (`TIPO`).
    pub tipo: Option<&'a str>,
    /// Device sub-type (`SUB TIPO`).
    pub sub_tipo: Option<&'a str>,
    /// Free-text complement (`COMPLEMENTO`).
    pub complemento: Option<&'a str>,
}

/// One entry of the rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// `TIPO` values this rule applies to. Compared upper-cased; tables built
    /// by hand should go through [`RuleSet::from_json`], which normalizes.
    pub types: Vec<String>,
    /// Substring markers searched in `SUB TIPO` and `COMPLEMENTO`. Empty
    /// means the rule matches on `TIPO` alone.
    #[serde(default)]
    pub markers: Vec<String>,
    /// Destination sheet label.
    pub label: String,
}

impl Rule {
    /// Whether this rule matches the already upper-cased field values.
    fn matches(&self, tipo: &str, sub_tipo: &str, complemento: &str) -> bool {
        if !self.types.iter().any(|t| t == tipo) {
            return false;
        }
        if self.markers.is_empty() {
            return true;
        }
        self.markers
            .iter()
            .any(|m| sub_tipo.contains(m.as_str()) || complemento.contains(m.as_str()))
    }
}

/// Ordered classification rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Rules in priority order; first match wins.
    pub rules: Vec<Rule>,
    /// Label used when `TIPO` is blank or absent.
    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,
}

fn default_fallback_label() -> String {
    "OUTROS".to_string()
}

impl Default for RuleSet {
    /// The built-in table for branch asset inventory exports.
    ///
    /// Unaccented marker variants are included because real exports spell
    /// inconsistently.
    fn default() -> Self {
        RuleSet {
            rules: vec![
                rule(&["SCANER"], &["MÃO", "MAO"], "SCANER DE MÃO"),
                rule(&["SCANER"], &[], "SCANER"),
                rule(&["SERVIDOR", "TAPE", "RACK", "STORAGE"], &[], "SERVIDOR"),
                rule(&["IMPRESSORA"], &["CHEQUE"], "IMPRESSORA CHEQUE"),
                rule(&["IMPRESSORA"], &["CHECK-IN", "CHECKIN"], "IMPRESSORA CHECK-IN"),
                rule(&["IMPRESSORA"], &["TÉRMICA", "TERMICA"], "IMPRESSORA TÉRMICA"),
                rule(&["IMPRESSORA"], &[], "IMPRESSORA"),
                rule(&["CPU"], &["PDV"], "CPU (PDV)"),
                rule(&["CPU"], &[], "CPU (ESCRITÓRIO)"),
            ],
            fallback_label: default_fallback_label(),
        }
    }
}

fn rule(types: &[&str], markers: &[&str], label: &str) -> Rule {
    Rule {
        types: types.iter().map(|t| t.to_string()).collect(),
        markers: markers.iter().map(|m| m.to_string()).collect(),
        label: label.to_string(),
    }
}

impl RuleSet {
    /// Parse a rule table from JSON, upper-casing types and markers so a
    /// hand-edited table matches regardless of case.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut set: RuleSet = serde_json::from_str(text)?;
        for rule in &mut set.rules {
            for t in &mut rule.types {
                *t = t.trim().to_uppercase();
            }
            for m in &mut rule.markers {
                *m = m.trim().to_uppercase();
            }
        }
        Ok(set)
    }

    /// Compute the destination sheet label for one record.
    ///
    /// Values are upper-cased before comparison. When no rule matches, the
    /// label is `TIPO` verbatim (upper-cased), or the fallback label if
    /// `TIPO` is blank or absent.
    pub fn classify(&self, input: &ClassifyInput) -> String {
        let tipo = normalize(input.tipo);
        let sub_tipo = normalize(input.sub_tipo);
        let complemento = normalize(input.complemento);

        for rule in &self.rules {
            if rule.matches(&tipo, &sub_tipo, &complemento) {
                return rule.label.clone();
            }
        }

        if tipo.is_empty() {
            self.fallback_label.clone()
        } else {
            tipo
        }
    }
}

fn normalize(value: Option<&str>) -> String {
    value.unwrap_or("").trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(tipo: &'a str, sub_tipo: &'a str, complemento: &'a str) -> ClassifyInput<'a> {
        ClassifyInput {
            tipo: Some(tipo),
            sub_tipo: Some(sub_tipo),
            complemento: Some(complemento),
        }
    }

    #[test]
    fn test_handheld_scanner_beats_generic_scanner() {
        let rules = RuleSet::default();
        assert_eq!(rules.classify(&input("SCANER", "MÃO", "")), "SCANER DE MÃO");
        assert_eq!(
            rules.classify(&input("SCANER", "", "LEITOR DE MÃO")),
            "SCANER DE MÃO"
        );
        assert_eq!(rules.classify(&input("SCANER", "MESA", "")), "SCANER");
    }

    #[test]
    fn test_infrastructure_types_unify() {
        let rules = RuleSet::default();
        for tipo in ["SERVIDOR", "TAPE", "RACK", "STORAGE"] {
            assert_eq!(rules.classify(&input(tipo, "", "")), "SERVIDOR");
        }
    }

    #[test]
    fn test_printer_markers_checked_in_order() {
        let rules = RuleSet::default();
        assert_eq!(
            rules.classify(&input("IMPRESSORA", "CHEQUE", "")),
            "IMPRESSORA CHEQUE"
        );
        assert_eq!(
            rules.classify(&input("IMPRESSORA", "", "BALCÃO CHECK-IN")),
            "IMPRESSORA CHECK-IN"
        );
        assert_eq!(
            rules.classify(&input("IMPRESSORA", "TÉRMICA", "")),
            "IMPRESSORA TÉRMICA"
        );
        assert_eq!(
            rules.classify(&input("IMPRESSORA", "TERMICA", "")),
            "IMPRESSORA TÉRMICA"
        );
        assert_eq!(rules.classify(&input("IMPRESSORA", "LASER", "")), "IMPRESSORA");
        // A value carrying both markers resolves to the earlier rule.
        assert_eq!(
            rules.classify(&input("IMPRESSORA", "CHEQUE TÉRMICA", "")),
            "IMPRESSORA CHEQUE"
        );
    }

    #[test]
    fn test_cpu_pdv_vs_office() {
        let rules = RuleSet::default();
        assert_eq!(rules.classify(&input("CPU", "PDV", "")), "CPU (PDV)");
        assert_eq!(
            rules.classify(&input("CPU", "", "CAIXA PDV 03")),
            "CPU (PDV)"
        );
        assert_eq!(rules.classify(&input("CPU", "", "")), "CPU (ESCRITÓRIO)");
    }

    #[test]
    fn test_unknown_type_is_verbatim() {
        let rules = RuleSet::default();
        assert_eq!(rules.classify(&input("NOBREAK", "", "")), "NOBREAK");
        assert_eq!(rules.classify(&input("nobreak", "", "")), "NOBREAK");
    }

    #[test]
    fn test_blank_type_falls_back() {
        let rules = RuleSet::default();
        assert_eq!(rules.classify(&input("", "", "")), "OUTROS");
        assert_eq!(rules.classify(&input("   ", "", "")), "OUTROS");
        assert_eq!(rules.classify(&ClassifyInput::default()), "OUTROS");
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let rules = RuleSet::default();
        assert_eq!(rules.classify(&input("Scaner", "mão", "")), "SCANER DE MÃO");
        assert_eq!(rules.classify(&input("tape", "", "")), "SERVIDOR");
    }

    #[test]
    fn test_absent_fields_treated_as_empty() {
        let rules = RuleSet::default();
        let partial = ClassifyInput {
            tipo: Some("SCANER"),
            sub_tipo: None,
            complemento: None,
        };
        assert_eq!(rules.classify(&partial), "SCANER");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let rules = RuleSet::default();
        let record = input("SCANER", "MÃO", "");
        assert_eq!(rules.classify(&record), rules.classify(&record));
    }

    #[test]
    fn test_custom_rule_table_from_json() {
        let json = r#"{
            "rules": [
                { "types": ["notebook"], "markers": ["gerência"], "label": "NOTEBOOK GERÊNCIA" },
                { "types": ["notebook"], "label": "NOTEBOOK" }
            ]
        }"#;
        let rules = RuleSet::from_json(json).unwrap();
        assert_eq!(
            rules.classify(&input("NOTEBOOK", "GERÊNCIA", "")),
            "NOTEBOOK GERÊNCIA"
        );
        assert_eq!(rules.classify(&input("NOTEBOOK", "VENDAS", "")), "NOTEBOOK");
        // Fallback label defaults when the JSON omits it.
        assert_eq!(rules.classify(&input("", "", "")), "OUTROS");
    }
}
