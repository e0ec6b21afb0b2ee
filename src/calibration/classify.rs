use crate::calibration::normalize::parse_due_date;
use crate::calibration::table::Record;
use crate::calibration::table::Table;
use chrono::NaiveDate;

/// Where a record lands relative to today and the alert window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bucket {
    Overdue,
    Upcoming,
    None,
}

impl Bucket {
    /// Negative days are overdue, `0..=threshold` is upcoming, anything else is neither.
    pub fn of(days_remaining: Option<i64>, threshold: i64) -> Self {
        match days_remaining {
            Some(days) if days < 0 => Bucket::Overdue,
            Some(days) if days <= threshold => Bucket::Upcoming,
            _ => Bucket::None,
        }
    }
}

/// A record with its day difference and bucket attached.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub days_remaining: Option<i64>,
    pub bucket: Bucket,
}

/// Records of one table split by bucket; `Bucket::None` records are discarded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classification {
    pub overdue: Vec<ClassifiedRecord>,
    pub upcoming: Vec<ClassifiedRecord>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.upcoming.is_empty()
    }
}

/// Whole calendar days from `today` to `due_date`, negative when already past.
pub fn days_remaining(due_date: NaiveDate, today: NaiveDate) -> i64 {
    due_date.signed_duration_since(today).num_days()
}

/// Classifies every record of a table against its due-date column.
///
/// # Arguments
///
/// * `table` - Normalized table
/// * `due_index` - Position of the due-date field; `None` yields an empty classification
/// * `today` - Reference date
/// * `threshold` - Last day (inclusive) of the upcoming window
pub fn classify(table: &Table, due_index: Option<usize>, today: NaiveDate, threshold: i64) -> Classification {
    let mut classification = Classification::default();
    let Some(due_index) = due_index else {
        return classification;
    };

    for record in &table.records {
        let days = record
            .get(due_index)
            .and_then(parse_due_date)
            .map(|due_date| days_remaining(due_date, today));
        let bucket = Bucket::of(days, threshold);
        let classified = ClassifiedRecord {
            record: record.clone(),
            days_remaining: days,
            bucket,
        };
        match bucket {
            Bucket::Overdue => classification.overdue.push(classified),
            Bucket::Upcoming => classification.upcoming.push(classified),
            Bucket::None => (),
        }
    }
    classification
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::Cell;
    use chrono::Days;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn table(due_dates: Vec<Cell>) -> Table {
        Table {
            fields: vec!["IDENTIFICACION".into(), "FECHA_PROXIMA".into()],
            records: due_dates
                .into_iter()
                .enumerate()
                .map(|(index, due)| Record {
                    row: index + 1,
                    cells: vec![Cell::Text(format!("EQ-{}", index)), due],
                })
                .collect(),
        }
    }

    #[test]
    fn window_boundaries() {
        assert_eq!(Bucket::of(Some(-1), 15), Bucket::Overdue);
        assert_eq!(Bucket::of(Some(-400), 15), Bucket::Overdue);
        assert_eq!(Bucket::of(Some(0), 15), Bucket::Upcoming);
        assert_eq!(Bucket::of(Some(15), 15), Bucket::Upcoming);
        assert_eq!(Bucket::of(Some(16), 15), Bucket::None);
        assert_eq!(Bucket::of(None, 15), Bucket::None);
        assert_eq!(Bucket::of(Some(0), 0), Bucket::Upcoming);
    }

    #[test]
    fn day_difference_is_signed() {
        let due = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        assert_eq!(days_remaining(due, today()), -5);
        assert_eq!(days_remaining(today(), today()), 0);
        let due = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
        assert_eq!(days_remaining(due, today()), 365);
    }

    #[test]
    fn records_are_partitioned() {
        let table = table(vec![
            Cell::Date(today() - Days::new(1)),
            Cell::Date(today()),
            Cell::Date(today() + Days::new(15)),
            Cell::Date(today() + Days::new(16)),
            Cell::from("2025-06-01"),
            Cell::from("sin fecha"),
            Cell::Empty,
        ]);
        let classification = classify(&table, Some(1), today(), 15);

        let rows = |records: &[ClassifiedRecord]| records.iter().map(|record| record.record.row).collect::<Vec<_>>();
        assert_eq!(rows(&classification.overdue), vec![1, 5]);
        assert_eq!(rows(&classification.upcoming), vec![2, 3]);
        assert_eq!(classification.overdue[1].days_remaining, Some(-9));
        assert_eq!(classification.upcoming[1].days_remaining, Some(15));
        assert!(classification
            .overdue
            .iter()
            .all(|record| record.bucket == Bucket::Overdue));
    }

    #[test]
    fn missing_due_column_classifies_nothing() {
        let table = table(vec![Cell::Date(today())]);
        assert!(classify(&table, None, today(), 15).is_empty());
        assert!(classify(&table, Some(9), today(), 15).is_empty());
    }
}
