// ==============================================================================
// gene_panel.rs - Gene Panel Reference Table
// ==============================================================================
// Description: Loads the gene symbol -> phenotype table used by the filter chain
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Format: comma-delimited, no header, one gene per line
//   symbol,inheritance,phenotype name,reference codes
// Example:
//   BRCA1,AD,Hereditary Breast Cancer,604370
//   KCNQ1,AD,Long QT syndrome 1,192500
// ==============================================================================

use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::models::{Inheritance, Phenotype};

const SYMBOL: usize = 0;
const INHERITANCE: usize = 1;
const NAME: usize = 2;
const REFERENCE_CODES: usize = 3;

/// Errors that can occur while loading the gene panel
#[derive(Error, Debug)]
pub enum GenePanelError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid line format at line {line}: {details}")]
    InvalidFormat { line: u64, details: String },

    #[error("Duplicate gene symbol '{symbol}' at line {line}")]
    DuplicateGene { line: u64, symbol: String },

    #[error("Gene panel is empty or contains only comments")]
    EmptyPanel,
}

/// Read-only gene symbol -> phenotype mapping
#[derive(Debug, Clone, Default)]
pub struct GenePanel {
    genes: HashMap<String, Phenotype>,
}

impl GenePanel {
    /// Load a panel from a file on disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GenePanelError> {
        let file = File::open(path.as_ref())?;
        let panel = Self::from_reader(file)?;

        info!("Loaded {} genes from {:?}", panel.len(), path.as_ref());
        Ok(panel)
    }

    /// Parse a panel from any reader
    ///
    /// Lines starting with '#' and blank lines are skipped. Columns beyond the
    /// fourth are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GenePanelError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_reader(reader);

        let mut genes = HashMap::new();

        for result in csv_reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            if record.len() < 4 {
                return Err(GenePanelError::InvalidFormat {
                    line,
                    details: format!("Expected 4 comma-delimited fields, found {}", record.len()),
                });
            }

            let symbol = record[SYMBOL].to_string();
            if symbol.is_empty() {
                return Err(GenePanelError::InvalidFormat {
                    line,
                    details: "Gene symbol is empty".to_string(),
                });
            }

            let phenotype = Phenotype {
                name: record[NAME].to_string(),
                inheritance: Inheritance::from(&record[INHERITANCE]),
                reference_codes: record[REFERENCE_CODES].to_string(),
            };

            if genes.insert(symbol.clone(), phenotype).is_some() {
                return Err(GenePanelError::DuplicateGene { line, symbol });
            }
        }

        if genes.is_empty() {
            return Err(GenePanelError::EmptyPanel);
        }

        Ok(Self { genes })
    }

    pub fn get(&self, symbol: &str) -> Option<&Phenotype> {
        self.genes.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.genes.contains_key(symbol)
    }

    /// First listed gene that belongs to the panel, with its phenotype
    pub fn resolve<'a, S: AsRef<str>>(&'a self, genes: &'a [S]) -> Option<(&'a str, &'a Phenotype)> {
        genes.iter().find_map(|gene| {
            let gene = gene.as_ref();
            self.genes.get(gene).map(|phenotype| (gene, phenotype))
        })
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl FromIterator<(String, Phenotype)> for GenePanel {
    fn from_iter<I: IntoIterator<Item = (String, Phenotype)>>(iter: I) -> Self {
        Self {
            genes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_columns_map_to_fields() {
        let panel = GenePanel::from_reader("BRCA1,AD,Hereditary Breast Cancer,604370\n".as_bytes())
            .unwrap();

        let phenotype = panel.get("BRCA1").unwrap();
        assert_eq!(phenotype.inheritance, Inheritance::AD);
        assert_eq!(phenotype.name, "Hereditary Breast Cancer");
        assert_eq!(phenotype.reference_codes, "604370");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# symbol,inheritance,name,codes").unwrap();
        writeln!(file, "KCNQ1,AD,Long QT syndrome 1,192500").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "ATP7B,AR,Wilson disease,277900").unwrap();
        writeln!(file, "DMD,XL,\"Muscular dystrophy, Duchenne\",310200").unwrap();
        file.flush().unwrap();

        let panel = GenePanel::load(file.path()).unwrap();

        assert_eq!(panel.len(), 3);
        assert_eq!(panel.get("ATP7B").unwrap().inheritance, Inheritance::AR);
        assert_eq!(panel.get("DMD").unwrap().name, "Muscular dystrophy, Duchenne");
        assert!(!panel.contains("TTN"));
    }

    #[test]
    fn test_too_few_fields() {
        let result = GenePanel::from_reader("BRCA1,AD,Hereditary Breast Cancer\n".as_bytes());
        match result.unwrap_err() {
            GenePanelError::InvalidFormat { line, .. } => assert_eq!(line, 1),
            other => panic!("Expected InvalidFormat error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_symbol() {
        let contents = "\
BRCA1,AD,Hereditary Breast Cancer,604370
BRCA2,AD,Hereditary Breast Cancer 2,612555
BRCA1,AR,Fanconi anemia,617883
";
        match GenePanel::from_reader(contents.as_bytes()).unwrap_err() {
            GenePanelError::DuplicateGene { line, symbol } => {
                assert_eq!(line, 3);
                assert_eq!(symbol, "BRCA1");
            }
            other => panic!("Expected DuplicateGene error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_panel() {
        let result = GenePanel::from_reader("# nothing here\n".as_bytes());
        assert!(matches!(result, Err(GenePanelError::EmptyPanel)));
    }

    #[test]
    fn test_resolve_uses_first_panel_gene() {
        let contents = "\
KCNH2,AD,Long QT syndrome 2,152427
SCN5A,AD,Brugada syndrome 1,601144
";
        let panel = GenePanel::from_reader(contents.as_bytes()).unwrap();
        let genes = vec!["TTN".to_string(), "SCN5A".to_string(), "KCNH2".to_string()];

        let (gene, phenotype) = panel.resolve(&genes).unwrap();
        assert_eq!(gene, "SCN5A");
        assert_eq!(phenotype.name, "Brugada syndrome 1");

        let unlisted = vec!["TTN"];
        assert!(panel.resolve(&unlisted).is_none());
    }
}
