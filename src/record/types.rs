use std::fmt;
use std::sync::Arc;

/// Physical strand of the double-stranded molecule a record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Strand {
    /// Template strand (`t`).
    Template,
    /// Complement strand (`c`).
    Complement,
}

impl Strand {
    /// Single-letter code used in the alignment table.
    pub fn code(&self) -> &'static str {
        match self {
            Strand::Template => "t",
            Strand::Complement => "c",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Strand::Template => "template",
            Strand::Complement => "complement",
        }
    }

    /// Parse the alignment-table strand code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "t" => Some(Strand::Template),
            "c" => Some(Strand::Complement),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction a record's base was read relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Orientation {
    /// Read in the reference direction.
    Forward,
    /// Read against the reference direction.
    Reverse,
}

impl Orientation {
    /// Anything other than the literal `forward` is treated as reverse.
    pub fn from_label(label: &str) -> Self {
        if label == "forward" {
            Orientation::Forward
        } else {
            Orientation::Reverse
        }
    }
}

/// One per-base probability observation for a single read at one
/// reference position.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    /// 0-based reference coordinate.
    pub ref_pos: i64,
    /// Candidate base symbol (`A`, `C`, `G`, `T`, or a modified-base code).
    pub base: String,
    /// Model confidence that `base` occurs at `ref_pos` in this observation.
    pub probability: f64,
    /// Strand the observation came from.
    pub strand: Strand,
    /// Read direction relative to the reference.
    pub orientation: Orientation,
    /// Molecule/read identifier.
    pub read_label: Arc<str>,
}

impl AlignmentRecord {
    /// Construct a new record.
    pub fn new(
        ref_pos: i64,
        base: impl Into<String>,
        probability: f64,
        strand: Strand,
        orientation: Orientation,
        read_label: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            ref_pos,
            base: base.into(),
            probability,
            strand,
            orientation,
            read_label: read_label.into(),
        }
    }

    /// Whether the base is already expressed on the coding strand, i.e. a
    /// template read forward or a complement read in reverse.
    pub fn is_coding_oriented(&self) -> bool {
        matches!(
            (self.strand, self.orientation),
            (Strand::Template, Orientation::Forward) | (Strand::Complement, Orientation::Reverse)
        )
    }
}

/// Ordered, append-only collection of shared records.
///
/// Used both for the whole run and for every grouped subset; subsets share
/// the underlying records instead of copying them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentSet {
    records: Vec<Arc<AlignmentRecord>>,
}

impl AlignmentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Build a set owning the given records.
    pub fn from_records(records: Vec<AlignmentRecord>) -> Self {
        records.into_iter().collect()
    }

    /// Append a record.
    pub fn push(&mut self, record: AlignmentRecord) {
        self.records.push(Arc::new(record));
    }

    /// Append a record already shared with another set.
    pub fn push_shared(&mut self, record: Arc<AlignmentRecord>) {
        self.records.push(record);
    }

    /// Append every record of `other`.
    pub fn extend_from(&mut self, other: &AlignmentSet) {
        self.records.extend(other.records.iter().cloned());
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record, if any.
    pub fn first(&self) -> Option<&AlignmentRecord> {
        self.records.first().map(Arc::as_ref)
    }

    /// Iterate over the records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AlignmentRecord> {
        self.records.iter().map(Arc::as_ref)
    }

    /// Shared handles to the records.
    pub fn shared(&self) -> &[Arc<AlignmentRecord>] {
        &self.records
    }
}

impl FromIterator<AlignmentRecord> for AlignmentSet {
    fn from_iter<I: IntoIterator<Item = AlignmentRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

impl FromIterator<Arc<AlignmentRecord>> for AlignmentSet {
    fn from_iter<I: IntoIterator<Item = Arc<AlignmentRecord>>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
