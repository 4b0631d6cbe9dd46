// ==============================================================================
// filters.rs - Variant Filter Chain
// ==============================================================================
// Description: Ordered reportability rules applied to every WGS variant call
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Rule order (evaluation stops at the first failure):
//   1. Read depth > 20
//   2. Single VAF value > 0.25 (multi-allelic calls are reported and dropped)
//   3. Sequence ontology names a damaging consequence
//   4. gnomAD alt allele frequency < 0.05
//   5. ClinVar / ACMG classification reconciliation
//   6. At least one gene on the panel
//   7. Population zygosity below the limit for the phenotype's inheritance
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::config::ZygosityThresholds;
use crate::gene_panel::GenePanel;
use crate::models::{parse_fraction, Inheritance, VariantRecord};

const MIN_READ_DEPTH: u64 = 20;
const MIN_VARIANT_ALLELE_FREQUENCY: f64 = 0.25;
const MAX_GNOMAD_ALT_ALLELE_FREQUENCY: f64 = 0.05;

/// Consequence terms that make a variant worth reporting
const DAMAGING_CONSEQUENCES: [&str; 5] =
    ["frameshift", "missense", "disruptive_inframe", "splice", "stop"];

/// One reportability rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    ReadDepth,
    VariantAlleleFrequency,
    SequenceOntology,
    PopulationFrequency,
    Classification,
    GenePanel,
    Zygosity,
}

/// Rules in evaluation order; later rules rely on earlier ones having passed
pub const RULE_ORDER: [Rule; 7] = [
    Rule::ReadDepth,
    Rule::VariantAlleleFrequency,
    Rule::SequenceOntology,
    Rule::PopulationFrequency,
    Rule::Classification,
    Rule::GenePanel,
    Rule::Zygosity,
];

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::ReadDepth => "read_depth",
            Rule::VariantAlleleFrequency => "variant_allele_frequency",
            Rule::SequenceOntology => "sequence_ontology",
            Rule::PopulationFrequency => "population_frequency",
            Rule::Classification => "classification",
            Rule::GenePanel => "gene_panel",
            Rule::Zygosity => "zygosity",
        }
    }

    /// Evaluate this rule alone against a record
    pub fn check(&self, record: &VariantRecord, ctx: &RuleContext<'_>) -> RuleOutcome {
        match self {
            Rule::ReadDepth => read_depth(record).into(),
            Rule::VariantAlleleFrequency => variant_allele_frequency(record),
            Rule::SequenceOntology => sequence_ontology(record).into(),
            Rule::PopulationFrequency => population_frequency(record).into(),
            Rule::Classification => classification(record).into(),
            Rule::GenePanel => gene_panel_membership(record, ctx.panel).into(),
            Rule::Zygosity => zygosity(record, ctx.panel, ctx.thresholds).into(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only inputs shared by every rule
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub panel: &'a GenePanel,
    pub thresholds: &'a ZygosityThresholds,
}

/// Multi-allelic VAF that could not be judged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousValue {
    pub row_number: usize,
    pub chromosome: String,
    pub position: String,
    pub variant_id: String,
    pub raw_vaf: String,
}

impl AmbiguousValue {
    fn from_record(record: &VariantRecord) -> Self {
        Self {
            row_number: record.row_number,
            chromosome: record.chromosome.clone(),
            position: record.position.clone(),
            variant_id: record.variant_id.clone(),
            raw_vaf: record.variant_allele_frequencies.clone(),
        }
    }
}

impl fmt::Display for AmbiguousValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} ({}:{} {}) has multiple VAF values '{}'",
            self.row_number, self.chromosome, self.position, self.variant_id, self.raw_vaf
        )
    }
}

/// Result of a single rule
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Pass,
    Fail,
    /// Failed because the value cannot be judged; carries the diagnostic
    Ambiguous(AmbiguousValue),
}

impl From<bool> for RuleOutcome {
    fn from(passed: bool) -> Self {
        if passed {
            RuleOutcome::Pass
        } else {
            RuleOutcome::Fail
        }
    }
}

/// Result of running the whole chain on one record
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// First rule that failed, `None` when the record is reportable
    pub rejected_by: Option<Rule>,
    pub diagnostic: Option<AmbiguousValue>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.rejected_by.is_none()
    }
}

/// Ordered AND over the reportability rules
#[derive(Debug, Clone)]
pub struct VariantFilterChain<'a> {
    panel: &'a GenePanel,
    thresholds: ZygosityThresholds,
    rules: Vec<Rule>,
}

impl<'a> VariantFilterChain<'a> {
    pub fn new(panel: &'a GenePanel, thresholds: ZygosityThresholds) -> Self {
        Self {
            panel,
            thresholds,
            rules: RULE_ORDER.to_vec(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run the rules in order, stopping at the first failure
    ///
    /// Ambiguous VAF values are logged here, once per evaluation, and also
    /// returned in the verdict.
    pub fn evaluate(&self, record: &VariantRecord) -> Verdict {
        let ctx = RuleContext {
            panel: self.panel,
            thresholds: &self.thresholds,
        };

        for rule in &self.rules {
            match rule.check(record, &ctx) {
                RuleOutcome::Pass => continue,
                RuleOutcome::Fail => {
                    return Verdict {
                        rejected_by: Some(*rule),
                        diagnostic: None,
                    };
                }
                RuleOutcome::Ambiguous(diagnostic) => {
                    warn!("Ambiguous variant allele frequency: {}", diagnostic);
                    return Verdict {
                        rejected_by: Some(*rule),
                        diagnostic: Some(diagnostic),
                    };
                }
            }
        }

        Verdict {
            rejected_by: None,
            diagnostic: None,
        }
    }
}

// Rules

pub fn read_depth(record: &VariantRecord) -> bool {
    record.read_depth.is_some_and(|depth| depth > MIN_READ_DEPTH)
}

pub fn variant_allele_frequency(record: &VariantRecord) -> RuleOutcome {
    match record.vaf_values().as_slice() {
        [single] => parse_fraction(single)
            .is_some_and(|vaf| vaf <= 1.0 && vaf > MIN_VARIANT_ALLELE_FREQUENCY)
            .into(),
        [] => RuleOutcome::Fail,
        _ => RuleOutcome::Ambiguous(AmbiguousValue::from_record(record)),
    }
}

pub fn sequence_ontology(record: &VariantRecord) -> bool {
    DAMAGING_CONSEQUENCES
        .iter()
        .any(|term| record.sequence_ontology.contains(term))
}

pub fn population_frequency(record: &VariantRecord) -> bool {
    record
        .gnomad_alt_allele_frequency
        .is_some_and(|af| af < MAX_GNOMAD_ALT_ALLELE_FREQUENCY)
}

/// Reconcile the ClinVar and ACMG calls
///
/// Clauses are checked in order and the first that applies decides:
/// an uncertain ClinVar call always fails; without a ClinVar call the ACMG
/// call decides; a conflicting ClinVar call needs pathogenic aggregated
/// submissions and a supporting ACMG call; a pathogenic ClinVar call passes
/// regardless of ACMG.
pub fn classification(record: &VariantRecord) -> bool {
    let clinvar = record.clinvar_classification.trim();
    let acmg = record.acmg_classification.as_str();
    let acmg_supports = acmg.contains("pathogenic") || acmg.contains("conflicting");

    if clinvar.contains("vus") || clinvar.contains("uncertain") {
        false
    } else if clinvar.is_empty() && acmg.contains("vus") {
        false
    } else if clinvar.is_empty() && acmg_supports {
        true
    } else if clinvar.contains("conflicting") {
        record.clinvar_aggregated_classification.contains("pathogenic") && acmg_supports
    } else {
        clinvar.contains("pathogenic")
    }
}

pub fn gene_panel_membership(record: &VariantRecord, panel: &GenePanel) -> bool {
    record.genes.iter().any(|gene| panel.contains(gene))
}

pub fn zygosity(record: &VariantRecord, panel: &GenePanel, thresholds: &ZygosityThresholds) -> bool {
    let Some((_, phenotype)) = panel.resolve(&record.genes) else {
        // No panel gene: no constraint
        return true;
    };

    let below = |count: Option<u64>, limit: u64| count.is_some_and(|c| c < limit);

    match phenotype.inheritance {
        Inheritance::AR | Inheritance::SD => {
            below(record.homozygous_count, thresholds.recessive_homozygous_limit)
        }
        Inheritance::AD => below(record.homozygous_count, thresholds.dominant_homozygous_limit),
        Inheritance::XL => below(record.hemizygous_count, thresholds.x_linked_hemizygous_limit),
        Inheritance::Other(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnLayout;
    use crate::models::Phenotype;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn panel() -> GenePanel {
        let entry = |symbol: &str, inheritance: Inheritance, name: &str| {
            (
                symbol.to_string(),
                Phenotype {
                    name: name.to_string(),
                    inheritance,
                    reference_codes: "000000".to_string(),
                },
            )
        };

        vec![
            entry("KCNQ1", Inheritance::AD, "Long QT syndrome 1"),
            entry("ATP7B", Inheritance::AR, "Wilson disease"),
            entry("HBB", Inheritance::SD, "Sickle cell anemia"),
            entry("DMD", Inheritance::XL, "Duchenne muscular dystrophy"),
            entry("MT-ND4", Inheritance::Other("Mi".to_string()), "LHON"),
        ]
        .into_iter()
        .collect()
    }

    /// Record that passes every rule against `panel()`
    fn reportable() -> VariantRecord {
        let mut record = VariantRecord::from_cells(3, Vec::new(), &ColumnLayout::default());
        record.chromosome = "chr11".to_string();
        record.position = "2549269".to_string();
        record.variant_id = "rs120074178".to_string();
        record.read_depth = Some(42);
        record.variant_allele_frequencies = "0.48".to_string();
        record.sequence_ontology = "missense_variant".to_string();
        record.gnomad_alt_allele_frequency = Some(0.0002);
        record.clinvar_classification = "pathogenic".to_string();
        record.acmg_classification = "likely pathogenic".to_string();
        record.genes = vec!["KCNQ1".to_string()];
        record.homozygous_count = Some(0);
        record.hemizygous_count = Some(0);
        record
    }

    fn with_classification(clinvar: &str, aggregated: &str, acmg: &str) -> VariantRecord {
        VariantRecord {
            clinvar_classification: clinvar.to_lowercase(),
            clinvar_aggregated_classification: aggregated.to_lowercase(),
            acmg_classification: acmg.to_lowercase(),
            ..reportable()
        }
    }

    #[test]
    fn test_reportable_record_passes() {
        let panel = panel();
        let chain = VariantFilterChain::new(&panel, ZygosityThresholds::default());
        let verdict = chain.evaluate(&reportable());
        assert!(verdict.passed());
        assert!(verdict.diagnostic.is_none());
    }

    #[test]
    fn test_read_depth_boundary() {
        for (depth, expected) in [(Some(21), true), (Some(20), false), (Some(0), false), (None, false)] {
            let record = VariantRecord {
                read_depth: depth,
                ..reportable()
            };
            assert_eq!(read_depth(&record), expected, "depth {:?}", depth);
        }
    }

    #[test]
    fn test_shallow_record_never_passes() {
        let panel = panel();
        let chain = VariantFilterChain::new(&panel, ZygosityThresholds::default());
        for depth in 0..=20 {
            let record = VariantRecord {
                read_depth: Some(depth),
                ..reportable()
            };
            assert_eq!(chain.evaluate(&record).rejected_by, Some(Rule::ReadDepth));
        }
    }

    #[test]
    fn test_vaf_single_values() {
        let pass = VariantRecord {
            variant_allele_frequencies: "0.30".to_string(),
            ..reportable()
        };
        assert_eq!(variant_allele_frequency(&pass), RuleOutcome::Pass);

        let low = VariantRecord {
            variant_allele_frequencies: "0.20".to_string(),
            ..reportable()
        };
        assert_eq!(variant_allele_frequency(&low), RuleOutcome::Fail);

        let garbage = VariantRecord {
            variant_allele_frequencies: "n/a".to_string(),
            ..reportable()
        };
        assert_eq!(variant_allele_frequency(&garbage), RuleOutcome::Fail);

        let empty = VariantRecord {
            variant_allele_frequencies: String::new(),
            ..reportable()
        };
        assert_eq!(variant_allele_frequency(&empty), RuleOutcome::Fail);

        // Not a fraction
        for raw in ["inf", "infinity", "-inf", "NaN", "1.5"] {
            let record = VariantRecord {
                variant_allele_frequencies: raw.to_string(),
                ..reportable()
            };
            assert_eq!(variant_allele_frequency(&record), RuleOutcome::Fail, "{raw}");
        }

        let full = VariantRecord {
            variant_allele_frequencies: "1.0".to_string(),
            ..reportable()
        };
        assert_eq!(variant_allele_frequency(&full), RuleOutcome::Pass);
    }

    #[test]
    fn test_multi_allelic_vaf_emits_one_diagnostic() {
        let panel = panel();
        let chain = VariantFilterChain::new(&panel, ZygosityThresholds::default());
        let record = VariantRecord {
            variant_allele_frequencies: "0.30,0.40".to_string(),
            ..reportable()
        };

        let verdict = chain.evaluate(&record);
        assert_eq!(verdict.rejected_by, Some(Rule::VariantAlleleFrequency));

        let diagnostic = verdict.diagnostic.expect("diagnostic for ambiguous VAF");
        assert_eq!(diagnostic.raw_vaf, "0.30,0.40");
        assert_eq!(diagnostic.row_number, 3);
        assert_eq!(diagnostic.position, "2549269");
        assert_eq!(diagnostic.variant_id, "rs120074178");
    }

    /// Log sink shared between a test and its subscriber
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_multi_allelic_vaf_logs_one_warning() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let panel = panel();
        let chain = VariantFilterChain::new(&panel, ZygosityThresholds::default());
        let ambiguous = VariantRecord {
            variant_allele_frequencies: "0.30,0.40".to_string(),
            ..reportable()
        };

        tracing::subscriber::with_default(subscriber, || {
            chain.evaluate(&ambiguous);
            chain.evaluate(&reportable());
        });

        let output = logs.contents();
        assert_eq!(output.matches("Ambiguous variant allele frequency").count(), 1);
        assert!(output.contains("WARN"));
        assert!(output.contains("'0.30,0.40'"));
        assert!(output.contains("rs120074178"));
    }

    #[test]
    fn test_sequence_ontology_terms() {
        for term in [
            "frameshift_variant",
            "missense_variant",
            "disruptive_inframe_deletion",
            "splice_acceptor_variant",
            "stop_gained",
        ] {
            let record = VariantRecord {
                sequence_ontology: term.to_string(),
                ..reportable()
            };
            assert!(sequence_ontology(&record), "{term}");
        }

        let synonymous = VariantRecord {
            sequence_ontology: "synonymous_variant".to_string(),
            ..reportable()
        };
        assert!(!sequence_ontology(&synonymous));
    }

    #[test]
    fn test_population_frequency() {
        let common = VariantRecord {
            gnomad_alt_allele_frequency: Some(0.05),
            ..reportable()
        };
        assert!(!population_frequency(&common));

        let missing = VariantRecord {
            gnomad_alt_allele_frequency: None,
            ..reportable()
        };
        assert!(!population_frequency(&missing));

        let rare = VariantRecord {
            gnomad_alt_allele_frequency: Some(0.049),
            ..reportable()
        };
        assert!(population_frequency(&rare));
    }

    #[test]
    fn test_uncertain_clinvar_dominates_acmg() {
        assert!(!classification(&with_classification("Uncertain significance", "", "Pathogenic")));
        assert!(!classification(&with_classification("VUS", "", "Pathogenic")));
    }

    #[test]
    fn test_missing_clinvar_defers_to_acmg() {
        assert!(classification(&with_classification("", "", "Pathogenic")));
        assert!(classification(&with_classification("", "", "Conflicting")));
        assert!(!classification(&with_classification("", "", "VUS")));
        assert!(!classification(&with_classification("", "", "Benign")));
    }

    #[test]
    fn test_conflicting_clinvar_needs_pathogenic_support() {
        let conflicting = "Conflicting interpretations of pathogenicity";
        let aggregated = "Pathogenic(2); Uncertain significance(1)";

        assert!(classification(&with_classification(conflicting, aggregated, "Likely pathogenic")));
        assert!(classification(&with_classification(
            conflicting,
            aggregated,
            "Conflicting interpretations"
        )));
        assert!(!classification(&with_classification(conflicting, aggregated, "Benign")));
        assert!(!classification(&with_classification(
            conflicting,
            "Benign(3); Uncertain significance(1)",
            "Pathogenic"
        )));
    }

    #[test]
    fn test_pathogenic_clinvar_dominates_acmg() {
        assert!(classification(&with_classification("Pathogenic", "", "Benign")));
        assert!(classification(&with_classification("Likely pathogenic", "", "")));
        assert!(!classification(&with_classification("Benign", "", "Pathogenic")));
    }

    #[test]
    fn test_gene_panel_membership_any_listed_gene() {
        let panel = panel();
        let record = VariantRecord {
            genes: vec!["TTN".to_string(), "ATP7B".to_string()],
            ..reportable()
        };
        assert!(gene_panel_membership(&record, &panel));

        let off_panel = VariantRecord {
            genes: vec!["TTN".to_string()],
            ..reportable()
        };
        assert!(!gene_panel_membership(&off_panel, &panel));
    }

    #[test]
    fn test_dominant_zygosity() {
        let panel = panel();
        let thresholds = ZygosityThresholds::default();
        let record = |hom| VariantRecord {
            genes: vec!["KCNQ1".to_string()],
            homozygous_count: hom,
            ..reportable()
        };

        assert!(zygosity(&record(Some(0)), &panel, &thresholds));
        assert!(!zygosity(&record(Some(1)), &panel, &thresholds));
        assert!(!zygosity(&record(None), &panel, &thresholds));
    }

    #[test]
    fn test_recessive_and_semi_dominant_zygosity() {
        let panel = panel();
        let thresholds = ZygosityThresholds::default();

        for gene in ["ATP7B", "HBB"] {
            let record = |hom| VariantRecord {
                genes: vec![gene.to_string()],
                homozygous_count: Some(hom),
                ..reportable()
            };
            assert!(zygosity(&record(4), &panel, &thresholds), "{gene}");
            assert!(!zygosity(&record(5), &panel, &thresholds), "{gene}");
        }
    }

    #[test]
    fn test_x_linked_zygosity_uses_hemizygous_count() {
        let panel = panel();
        let record = |hem| VariantRecord {
            genes: vec!["DMD".to_string()],
            homozygous_count: Some(100),
            hemizygous_count: hem,
            ..reportable()
        };

        let strict = ZygosityThresholds::default();
        assert!(zygosity(&record(Some(0)), &panel, &strict));
        assert!(!zygosity(&record(Some(1)), &panel, &strict));
        assert!(!zygosity(&record(None), &panel, &strict));

        let lenient = ZygosityThresholds::default().with_x_linked_limit(5);
        assert!(zygosity(&record(Some(4)), &panel, &lenient));
        assert!(!zygosity(&record(Some(5)), &panel, &lenient));
    }

    #[test]
    fn test_zygosity_resolves_first_panel_gene() {
        let panel = panel();
        // ATP7B (AR) is listed before KCNQ1 (AD), so the recessive limit applies
        let record = VariantRecord {
            genes: vec!["TTN".to_string(), "ATP7B".to_string(), "KCNQ1".to_string()],
            homozygous_count: Some(3),
            ..reportable()
        };
        assert!(zygosity(&record, &panel, &ZygosityThresholds::default()));
    }

    #[test]
    fn test_unconstrained_inheritance_and_unresolved_gene() {
        let panel = panel();
        let thresholds = ZygosityThresholds::default();

        let other = VariantRecord {
            genes: vec!["MT-ND4".to_string()],
            homozygous_count: None,
            ..reportable()
        };
        assert!(zygosity(&other, &panel, &thresholds));

        let unresolved = VariantRecord {
            genes: vec!["TTN".to_string()],
            homozygous_count: None,
            ..reportable()
        };
        assert!(zygosity(&unresolved, &panel, &thresholds));
    }

    #[test]
    fn test_chain_short_circuits_in_order() {
        let panel = panel();
        let chain = VariantFilterChain::new(&panel, ZygosityThresholds::default());
        assert_eq!(chain.rules(), &RULE_ORDER);

        // Fails VAF (ambiguous) and gene panel; only the earlier rule is reported
        let record = VariantRecord {
            variant_allele_frequencies: "0.3,0.4".to_string(),
            genes: vec!["TTN".to_string()],
            ..reportable()
        };
        let verdict = chain.evaluate(&record);
        assert_eq!(verdict.rejected_by, Some(Rule::VariantAlleleFrequency));

        let off_panel = VariantRecord {
            genes: vec!["TTN".to_string()],
            ..reportable()
        };
        assert_eq!(chain.evaluate(&off_panel).rejected_by, Some(Rule::GenePanel));

        let common_dominant = VariantRecord {
            homozygous_count: Some(3),
            ..reportable()
        };
        assert_eq!(chain.evaluate(&common_dominant).rejected_by, Some(Rule::Zygosity));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let panel = panel();
        let chain = VariantFilterChain::new(&panel, ZygosityThresholds::default());
        let records = [
            reportable(),
            VariantRecord {
                variant_allele_frequencies: "0.30,0.40".to_string(),
                ..reportable()
            },
            VariantRecord {
                clinvar_classification: "benign".to_string(),
                ..reportable()
            },
        ];

        for record in &records {
            let before = record.clone();
            assert_eq!(chain.evaluate(record), chain.evaluate(record));
            assert_eq!(record, &before);
        }
    }
}
