//! Matching rules for the sheet conventions.
//!
//! Every heuristic the engine applies (which rows are headers, which titles name
//! a category, which column holds the due date, which columns are displayed) is
//! a list of tokens here, so a differently worded workbook only needs a new
//! configuration, not new code.
use crate::calibration::normalize::normalize_column_name;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;

/// Logical sub-table a block belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Plant,
    Vst2,
    Vst3,
}

impl Category {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plant => "PLANT",
            Self::Vst2 => "VST2",
            Self::Vst3 => "VST3",
        }
    }

    /// Category by block position: 0 is PLANT, 1 is VST2, everything after is VST3.
    pub const fn from_position(index: usize) -> Self {
        match index {
            0 => Self::Plant,
            1 => Self::Vst2,
            _ => Self::Vst3,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label spellings that map to one category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub tokens: Vec<String>,
}

/// Token tables driving segmentation, normalization and projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// A row containing any of these (case-insensitive) is a header row
    pub header_keywords: Vec<String>,
    /// Category title tokens, tried in order; the first one found in a row becomes the label
    pub title_tokens: Vec<String>,
    /// Label to category mapping, checked rule by rule
    pub categories: Vec<CategoryRule>,
    /// How many rows above a header are searched for a category title
    pub category_scan_depth: usize,
    /// Spellings of the due-date column, compared after normalization
    pub due_date_aliases: Vec<String>,
    /// Spellings of the identification column; a block without values there is skipped
    pub identification_keys: Vec<String>,
    /// Report columns, each selecting the first column whose name contains it
    pub display_columns: Vec<String>,
}

impl Default for MatchRules {
    fn default() -> Self {
        let strings = |values: &[&str]| values.iter().map(|value| value.to_string()).collect();
        MatchRules {
            header_keywords: strings(&["IDENTIFICACIÓN", "EQUIPO", "INSTRUMENTO", "FABRICANTE"]),
            title_tokens: strings(&["PLANTA", "VST2", "VST 2", "VST3", "VST 3", "VST-2", "VST-3"]),
            categories: vec![
                CategoryRule {
                    category: Category::Plant,
                    tokens: strings(&["PLANTA"]),
                },
                CategoryRule {
                    category: Category::Vst2,
                    tokens: strings(&["VST2", "VST02"]),
                },
                CategoryRule {
                    category: Category::Vst3,
                    tokens: strings(&["VST3", "VST03"]),
                },
            ],
            category_scan_depth: 10,
            due_date_aliases: strings(&[
                "FECHA PROXIMA CALIBRACION",
                "FECHA PROXIMA CALIBRACIÓN",
                "PROXIMA CALIBRACION",
                "PROXIMA CALIBRACIÓN",
                "FECHA PROXIMA CAL",
            ]),
            identification_keys: strings(&["IDENTIFICACION", "IDENTIFICACIÓN"]),
            display_columns: strings(&[
                "IDENTIFICACION",
                "IDENTIFICACIÓN",
                "EQUIPO  /  INSTRUMENTO",
                "EQUIPO / INSTRUMENTO",
                "FABRICANTE",
                "FECHA_PROXIMA",
            ]),
        }
    }
}

/// Removes whitespace and hyphens and upper-cases, so "vst-2" and "VST 2" compare equal.
pub(crate) fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|character| !character.is_whitespace() && *character != '-')
        .collect::<String>()
        .to_uppercase()
}

impl MatchRules {
    /// Whether an upper-cased row text marks a header row.
    pub fn is_header(&self, row_text: &str) -> bool {
        self.header_keywords
            .iter()
            .filter(|keyword| !keyword.trim().is_empty())
            .any(|keyword| row_text.contains(&keyword.to_uppercase()))
    }

    /// First category token found in an upper-cased row text, compacted into a label.
    pub fn find_category_label(&self, row_text: &str) -> Option<String> {
        self.title_tokens
            .iter()
            .filter(|token| !token.trim().is_empty())
            .find(|token| row_text.contains(&token.to_uppercase()))
            .map(|token| compact(token))
    }

    /// Maps a recovered label back to its category.
    pub fn category_of(&self, label: &str) -> Option<Category> {
        let label = compact(label);
        self.categories
            .iter()
            .find(|rule| {
                rule.tokens
                    .iter()
                    .map(|token| compact(token))
                    .any(|token| !token.is_empty() && label.contains(&token))
            })
            .map(|rule| rule.category)
    }

    /// Whether a normalized column name is one of the due-date spellings.
    pub fn is_due_date_field(&self, field: &str) -> bool {
        contains_any(field, &self.due_date_aliases)
    }

    /// Whether a normalized column name is the identification column.
    pub fn is_identification_field(&self, field: &str) -> bool {
        contains_any(field, &self.identification_keys)
    }

    /// Display targets in configured order, normalized and without duplicates.
    pub fn display_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for target in self.display_columns.iter().map(|column| normalize_column_name(column)) {
            if !target.is_empty() && !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }
}

fn contains_any(field: &str, aliases: &[String]) -> bool {
    aliases
        .iter()
        .map(|alias| normalize_column_name(alias))
        .any(|alias| !alias.is_empty() && field.contains(&alias))
}
