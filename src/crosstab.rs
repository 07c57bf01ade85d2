use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Field, Record};
use crate::tokenizer::{tokenize, Vocabulary};

/// Pairwise occurrence counts between the tokens of two fields.
///
/// Every record contributes the full Cartesian product of its two token
/// lists. Counts are kept sparse, keyed by vocabulary slots, so the reverse
/// direction is a key swap rather than a second pass over the records.
#[derive(Debug, Clone)]
pub struct CrossTab {
    row_field: Field,
    column_field: Field,
    row_vocab: Vocabulary,
    column_vocab: Vocabulary,
    counts: BTreeMap<(usize, usize), u64>,
}

impl CrossTab {
    pub fn compute(records: &[Record], row_field: Field, column_field: Field) -> Self {
        let mut row_vocab = Vocabulary::of_field(records, row_field);
        let mut column_vocab = Vocabulary::of_field(records, column_field);
        let mut counts = BTreeMap::new();

        for record in records {
            let rows: Vec<usize> = tokenize(row_field.raw(record))
                .into_iter()
                .map(|t| row_vocab.intern(t))
                .collect();
            let columns: Vec<usize> = tokenize(column_field.raw(record))
                .into_iter()
                .map(|t| column_vocab.intern(t))
                .collect();

            for &r in &rows {
                for &c in &columns {
                    *counts.entry((r, c)).or_insert(0) += 1;
                }
            }
        }

        debug!(rows = %row_field, columns = %column_field, pairs = counts.len(), "cross-tabulated");
        Self { row_field, column_field, row_vocab, column_vocab, counts }
    }

    /// Same table indexed the other way round.
    pub fn transpose(&self) -> Self {
        Self {
            row_field: self.column_field,
            column_field: self.row_field,
            row_vocab: self.column_vocab.clone(),
            column_vocab: self.row_vocab.clone(),
            counts: self.counts.iter().map(|(&(r, c), &n)| ((c, r), n)).collect(),
        }
    }

    pub fn row_field(&self) -> Field {
        self.row_field
    }

    pub fn column_field(&self) -> Field {
        self.column_field
    }

    /// Count for the pair, case-insensitive, 0 when never seen together.
    pub fn get(&self, row: &str, column: &str) -> u64 {
        match (self.row_vocab.slot(row), self.column_vocab.slot(column)) {
            (Some(r), Some(c)) => self.counts.get(&(r, c)).copied().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn row_total(&self, row: &str) -> u64 {
        match self.row_vocab.slot(row) {
            Some(r) => self.counts.range((r, 0)..=(r, usize::MAX)).map(|(_, n)| n).sum(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Every non-zero pair as `(row, column, count)`, using display forms.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, u64)> + '_ {
        self.counts
            .iter()
            .map(|(&(r, c), &n)| (self.row_vocab.form(r), self.column_vocab.form(c), n))
    }

    /// Rows in first-seen order, cells descending by count.
    pub fn report(&self) -> CrossTabReport {
        let mut rows: Vec<CrossTabRow> = Vec::new();
        let mut current: Option<usize> = None;

        // BTreeMap order groups by row slot, and row slots are first-seen order.
        for (&(r, c), &count) in &self.counts {
            if current != Some(r) {
                current = Some(r);
                rows.push(CrossTabRow {
                    token: self.row_vocab.form(r).to_string(),
                    total: 0,
                    cells: Vec::new(),
                });
            }
            if let Some(row) = rows.last_mut() {
                row.total += count;
                row.cells.push(CrossTabCell { token: self.column_vocab.form(c).to_string(), count });
            }
        }

        for row in &mut rows {
            row.cells.sort_by(|a, b| b.count.cmp(&a.count));
        }

        CrossTabReport { row_field: self.row_field, column_field: self.column_field, rows }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CrossTabCell {
    pub token: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CrossTabRow {
    pub token: String,
    pub total: u64,
    pub cells: Vec<CrossTabCell>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CrossTabReport {
    pub row_field: Field,
    pub column_field: Field,
    pub rows: Vec<CrossTabRow>,
}

impl CrossTabReport {
    pub fn row(&self, token: &str) -> Option<&CrossTabRow> {
        let key = crate::tokenizer::fold(token);
        self.rows.iter().find(|r| crate::tokenizer::fold(&r.token) == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(crop: &str, pests: &str, pesticides: &str) -> Record {
        Record {
            id: 1,
            crop: crop.into(),
            pests: pests.into(),
            pesticides: pesticides.into(),
            area_hectares: 1.0,
            cities: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn full_cartesian_product_per_record() {
        let records = vec![record("Soja", "A, B", "X")];
        let tab = CrossTab::compute(&records, Field::Pests, Field::Pesticides);
        assert_eq!(tab.get("A", "X"), 1);
        assert_eq!(tab.get("B", "X"), 1);
        assert_eq!(tab.pairs().count(), 2);
    }

    #[test]
    fn empty_side_contributes_nothing() {
        let records = vec![record("Soja", "A", ""), record("Milho", "", "X")];
        let tab = CrossTab::compute(&records, Field::Pests, Field::Pesticides);
        assert!(tab.is_empty());
        assert!(tab.report().rows.is_empty());
        assert!(CrossTab::compute(&[], Field::Crop, Field::Pests).is_empty());
    }

    #[test]
    fn transpose_matches_direct_computation() {
        let records = vec![
            record("Soja", "Lagarta, Percevejo", "Imidacloprido, Tiametoxam"),
            record("Milho", "lagarta, Lagarta", "Imidacloprido"),
            record("Algodão", "", "Glifosato"),
            record("Soja", "Mosca-Branca", ""),
        ];
        let direct = CrossTab::compute(&records, Field::Pests, Field::Pesticides);
        let reverse = CrossTab::compute(&records, Field::Pesticides, Field::Pests);
        let derived = direct.transpose();

        for (a, b, n) in direct.pairs() {
            assert_eq!(reverse.get(b, a), n);
        }
        for (b, a, n) in reverse.pairs() {
            assert_eq!(direct.get(a, b), n);
        }
        assert_eq!(derived.report(), reverse.report());
        assert_eq!(direct.get("LAGARTA", "imidacloprido"), 3);
    }

    #[test]
    fn pests_per_crop_report() {
        let records = vec![
            record("Soja", "Lagarta, Percevejo", ""),
            record("Soja", "Percevejo", ""),
            record("Milho", "Lagarta", ""),
        ];
        let report = CrossTab::compute(&records, Field::Crop, Field::Pests).report();
        let soja = report.row("soja").unwrap();
        assert_eq!(soja.total, 3);
        assert_eq!(soja.cells[0], CrossTabCell { token: "Percevejo".into(), count: 2 });
        assert_eq!(report.rows[1].token, "Milho");
    }
}
