use std::fmt;
use std::sync::Arc;

use crate::error::CoreError;

/// Sentinel returned when no valid recording exists.
pub const NOT_AVAILABLE: &str = "N/A";

/// Chord vocabulary in training order. The order is part of the model contract.
pub const DEFAULT_CHORDS: &[&str] = &["Am", "Bb", "Bdim", "C", "Dm", "Em", "F", "G"];

/// A classification outcome: one chord of the vocabulary, or the sentinel.
///
/// There is no public constructor; labels only come out of a [`LabelResolver`].
///
/// # Example
/// ```
/// use gc_core::label::LabelResolver;
/// let resolver = LabelResolver::default();
/// let label = resolver.resolve(3).unwrap();
/// assert_eq!(label.as_str(), "C");
/// assert!(label.is_available());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(LabelKind);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum LabelKind {
    Chord { index: usize, name: Arc<str> },
    NotAvailable,
}

impl Label {
    /// Chord name, or `"N/A"` for the sentinel.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match &self.0 {
            LabelKind::Chord { name, .. } => name,
            LabelKind::NotAvailable => NOT_AVAILABLE,
        }
    }

    /// `false` for the sentinel.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self.0, LabelKind::Chord { .. })
    }

    /// Class index in the label table, `None` for the sentinel.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self.0 {
            LabelKind::Chord { index, .. } => Some(index),
            LabelKind::NotAvailable => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps classifier output indices to chord names.
///
/// # Example
/// ```
/// use gc_core::label::LabelResolver;
/// let resolver = LabelResolver::new(["Em", "G"]).unwrap();
/// assert_eq!(resolver.resolve(1).unwrap().as_str(), "G");
/// assert!(resolver.resolve(2).is_err());
/// assert_eq!(resolver.not_available().as_str(), "N/A");
/// ```
#[derive(Clone, Debug)]
pub struct LabelResolver {
    table: Vec<Arc<str>>,
}

impl LabelResolver {
    /// Build a resolver from an ordered table.
    ///
    /// # Errors
    /// Returns [`CoreError::LabelTable`] if the table is empty, contains a
    /// blank or duplicated name, or uses the reserved `"N/A"` sentinel.
    pub fn new<I, S>(labels: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table: Vec<Arc<str>> = Vec::new();
        for label in labels {
            let name = label.as_ref().trim();
            if name.is_empty() {
                return Err(CoreError::LabelTable("nom de label vide".into()));
            }
            if name == NOT_AVAILABLE {
                return Err(CoreError::LabelTable(format!(
                    "'{NOT_AVAILABLE}' est réservé à la sentinelle"
                )));
            }
            if table.iter().any(|existing| existing.as_ref() == name) {
                return Err(CoreError::LabelTable(format!("label dupliqué '{name}'")));
            }
            table.push(Arc::from(name));
        }
        if table.is_empty() {
            return Err(CoreError::LabelTable("table vide".into()));
        }
        Ok(Self { table })
    }

    /// Map a class index to its label.
    ///
    /// # Errors
    /// Returns [`CoreError::InvariantViolation`] when `index` is out of range.
    /// The index is never clamped.
    pub fn resolve(&self, index: usize) -> Result<Label, CoreError> {
        self.table
            .get(index)
            .map(|name| {
                Label(LabelKind::Chord {
                    index,
                    name: Arc::clone(name),
                })
            })
            .ok_or(CoreError::InvariantViolation {
                index,
                len: self.table.len(),
            })
    }

    /// The "no valid input" sentinel.
    #[must_use]
    pub fn not_available(&self) -> Label {
        Label(LabelKind::NotAvailable)
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Always `false`: construction rejects empty tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Ordered chord names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.iter().map(AsRef::as_ref)
    }
}

impl Default for LabelResolver {
    fn default() -> Self {
        Self {
            table: DEFAULT_CHORDS.iter().map(|&name| Arc::from(name)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_in_table_order() {
        let resolver = LabelResolver::default();
        let names: Vec<String> = (0..resolver.len())
            .map(|i| resolver.resolve(i).unwrap().to_string())
            .collect();
        assert_eq!(names, DEFAULT_CHORDS);
        assert_eq!(resolver.resolve(5).unwrap().index(), Some(5));
    }

    #[test]
    fn out_of_range_is_invariant_violation() {
        let resolver = LabelResolver::default();
        assert_eq!(
            resolver.resolve(8),
            Err(CoreError::InvariantViolation { index: 8, len: 8 })
        );
        assert!(resolver.resolve(usize::MAX).is_err(), "never clamped");
    }

    #[test]
    fn sentinel_is_distinct_from_vocabulary() {
        let resolver = LabelResolver::default();
        let na = resolver.not_available();
        assert_eq!(na.as_str(), "N/A");
        assert!(!na.is_available());
        assert_eq!(na.index(), None);
        assert!((0..resolver.len()).all(|i| resolver.resolve(i).unwrap() != na));
    }

    #[test]
    fn rejects_invalid_tables() {
        assert!(LabelResolver::new(Vec::<String>::new()).is_err());
        assert!(LabelResolver::new(["C", "C"]).is_err());
        assert!(LabelResolver::new(["C", "N/A"]).is_err());
        assert!(LabelResolver::new(["C", "  "]).is_err());
    }
}
