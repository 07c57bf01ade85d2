//! Splitting of comma-separated multi-valued fields.

use std::collections::HashMap;

use crate::model::{Field, Record};

/// Splits on `,`, trims every piece and drops the empty ones.
/// Order and duplicates are kept.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Case-insensitive comparison key for a token.
pub fn fold(token: &str) -> String {
    token.to_lowercase()
}

/// Folded key -> first original-cased form seen, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    forms: Vec<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vocabulary of one field across all records, in record order.
    pub fn of_field(records: &[Record], field: Field) -> Self {
        let mut vocab = Self::new();
        for record in records {
            for token in tokenize(field.raw(record)) {
                vocab.intern(token);
            }
        }
        vocab
    }

    /// Returns the slot of `token`, registering it on first sight.
    pub fn intern(&mut self, token: &str) -> usize {
        let key = fold(token);
        if let Some(&slot) = self.index.get(&key) {
            return slot;
        }
        let slot = self.forms.len();
        self.index.insert(key, slot);
        self.forms.push(token.to_string());
        slot
    }

    pub fn slot(&self, token: &str) -> Option<usize> {
        self.index.get(&fold(token)).copied()
    }

    /// Display form for a slot.
    pub fn form(&self, slot: usize) -> &str {
        self.forms.get(slot).map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
        assert!(tokenize(",,,").is_empty());
        assert!(tokenize(" , ,\t, ").is_empty());
    }

    #[test]
    fn keeps_order_and_duplicates() {
        assert_eq!(tokenize("Aphid, Mite ,  Aphid"), vec!["Aphid", "Mite", "Aphid"]);
        assert_eq!(tokenize("Soja"), vec!["Soja"]);
    }

    #[test]
    fn vocabulary_keeps_first_form() {
        let mut vocab = Vocabulary::new();
        let a = vocab.intern("Lagarta");
        let b = vocab.intern("LAGARTA");
        let c = vocab.intern("Percevejo");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(vocab.form(a), "Lagarta");
        assert_eq!(vocab.slot("lagarta"), Some(a));
        assert_eq!(vocab.len(), 2);
    }
}
