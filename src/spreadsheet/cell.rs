use chrono::NaiveDate;
use std::fmt::Display;

/// A single grid value as produced by a grid provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    /// Shared, inline, formula and boolean strings
    Text(String),
    /// Numbers without a date format
    Number(f64),
    /// Date-formatted numbers and ISO dates, time of day dropped
    Date(NaiveDate),
}

impl Cell {
    /// Returns true for missing cells and empty strings.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.is_empty(),
            _ => false,
        }
    }

    /// Returns true when the cell holds no visible text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Text(value) => value.trim().is_empty(),
            _ => self.is_empty(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_owned())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(value) => write!(f, "{}", value),
            // Integral values print without a fraction: codes and serials read better
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => write!(f, "{:.0}", value),
            Cell::Number(value) => write!(f, "{}", value),
            Cell::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_emptiness() {
        assert!(Cell::Empty.is_empty());
        assert!(Cell::from("").is_empty());
        assert!(!Cell::from(" ").is_empty());
        assert!(Cell::from(" ").is_blank());
        assert!(!Cell::from(0.0).is_empty());
    }

    #[test]
    fn cell_display() {
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::from("Balanza").to_string(), "Balanza");
        assert_eq!(Cell::from(12.0).to_string(), "12");
        assert_eq!(Cell::from(0.25).to_string(), "0.25");
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(Cell::from(date).to_string(), "2025-03-07");
    }
}
