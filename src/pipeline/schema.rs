//! Column names and the output schema descriptor
//!
//! The input contract is a cleaned table with a document checklist (presence
//! indicators, 1 = present) and six categorical columns. Output column names
//! are fixed so downstream renderers can rely on them.

use serde::Serialize;

/// Default document checklist used by the personnel records.
pub const DEFAULT_DOCUMENT_COLUMNS: [&str; 11] = [
    "FOTO 1/2 BADAN (*)",
    "FOTO FULL BODY (*)",
    "AKTA LAHIR (*)",
    "KTP (*)",
    "NPWP(*)",
    "SUMPAH PNS",
    "NOTA BKN",
    "SPMT CPNS",
    "KARTU ASN VIRTUAL",
    "NO NPWP",
    "NO BPJS",
];

pub const UNIT_COLUMN: &str = "UNIT KERJA";
pub const LOCATION_COLUMN: &str = "LOKASI";
pub const STATUS_COLUMN: &str = "STATUS";
pub const GENDER_COLUMN: &str = "JENIS KELAMIN";
pub const MONTH_COLUMN: &str = "BULAN";
pub const YEAR_COLUMN: &str = "TAHUN";

/// Categorical columns every input table must carry.
pub const CATEGORICAL_COLUMNS: [&str; 6] = [
    UNIT_COLUMN,
    LOCATION_COLUMN,
    STATUS_COLUMN,
    GENDER_COLUMN,
    MONTH_COLUMN,
    YEAR_COLUMN,
];

pub const COMPLETENESS_COLUMN: &str = "Completeness_Percentage";
pub const WEIGHTED_COMPLETENESS_COLUMN: &str = "Weighted_Completeness";
pub const CLUSTER_COLUMN: &str = "Cluster";
pub const CLUSTER_LABEL_COLUMN: &str = "Cluster_Label";
pub const ACTUAL_LABEL_COLUMN: &str = "Actual_Label";

/// Multiplier applied to the completeness percentage to emphasize it in clustering.
pub const WEIGHT_FACTOR: f64 = 5.0;

/// Semantic type of an output column, for renderers that format by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Text,
    Integer,
    Percentage,
    Score,
    Label,
}

/// One column of a rendered table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Display width in millimetres for fixed-width page layouts.
    pub display_width: u16,
}

impl ColumnSpec {
    pub fn new(name: &str, semantic_type: SemanticType, display_width: u16) -> Self {
        Self {
            name: name.to_string(),
            semantic_type,
            display_width,
        }
    }
}

/// Ordered column layout handed to the rendering collaborator.
///
/// Renderers must look columns up by name through this descriptor rather
/// than assume a positional layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSchema {
    pub columns: Vec<ColumnSpec>,
}

impl OutputSchema {
    /// Layout of the labeled-record report view.
    pub fn labeled_records() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new(UNIT_COLUMN, SemanticType::Text, 75),
                ColumnSpec::new(LOCATION_COLUMN, SemanticType::Text, 10),
                ColumnSpec::new(STATUS_COLUMN, SemanticType::Text, 10),
                ColumnSpec::new(GENDER_COLUMN, SemanticType::Text, 18),
                ColumnSpec::new(MONTH_COLUMN, SemanticType::Text, 10),
                ColumnSpec::new(YEAR_COLUMN, SemanticType::Integer, 9),
                ColumnSpec::new(COMPLETENESS_COLUMN, SemanticType::Percentage, 25),
                ColumnSpec::new(WEIGHTED_COMPLETENESS_COLUMN, SemanticType::Score, 24),
                ColumnSpec::new(CLUSTER_LABEL_COLUMN, SemanticType::Label, 14),
            ],
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn total_width(&self) -> u32 {
        self.columns.iter().map(|c| c.display_width as u32).sum()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}
