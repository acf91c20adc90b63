//! Readers for the alignment table and the reference sequence.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use super::{AlignmentRecord, AlignmentSet, Orientation, Strand};
use crate::config::NumericPolicy;
use crate::error::{Result, VclrError};

const POSITION_COLUMN: usize = 1;
const BASE_COLUMN: usize = 2;
const PROBABILITY_COLUMN: usize = 3;
const STRAND_COLUMN: usize = 4;
const ORIENTATION_COLUMN: usize = 5;
const LABEL_COLUMN: usize = 6;
const MIN_COLUMNS: usize = LABEL_COLUMN + 1;

/// Load the tab-separated alignment table at `path`.
pub fn read_alignment_file<P: AsRef<Path>>(path: P, policy: NumericPolicy) -> Result<AlignmentSet> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| VclrError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_alignment_table(BufReader::new(file), policy).map_err(|err| match err {
        VclrError::Io { source, .. } => VclrError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    info!(path = %path.display(), records = records.len(), "loaded alignment table");
    Ok(records)
}

/// Parse alignment rows from any buffered reader.
///
/// Rows are `[_, position, base, probability, strand, orientation, read]`.
/// Blank lines are skipped. How unparsable numbers are handled depends on
/// `policy`.
pub fn parse_alignment_table<R: BufRead>(reader: R, policy: NumericPolicy) -> Result<AlignmentSet> {
    let mut records = AlignmentSet::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| VclrError::Io {
            path: Default::default(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_line(&line, idx + 1, policy)?);
    }
    Ok(records)
}

fn parse_line(line: &str, line_no: usize, policy: NumericPolicy) -> Result<AlignmentRecord> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() < MIN_COLUMNS {
        return Err(VclrError::malformed(
            line_no,
            fields.len(),
            format!("expected at least {MIN_COLUMNS} columns, found {}", fields.len()),
        ));
    }

    let ref_pos = parse_numeric::<i64>(fields[POSITION_COLUMN], line_no, POSITION_COLUMN, policy)?;
    let mut probability =
        parse_numeric::<f64>(fields[PROBABILITY_COLUMN], line_no, PROBABILITY_COLUMN, policy)?;
    // NaN fails the range test too.
    if !(0.0..=1.0).contains(&probability) {
        match policy {
            NumericPolicy::Strict => {
                return Err(VclrError::malformed(
                    line_no,
                    PROBABILITY_COLUMN,
                    format!("probability {probability} outside [0, 1]"),
                ))
            }
            NumericPolicy::Lenient => {
                warn!(
                    line = line_no,
                    column = PROBABILITY_COLUMN,
                    value = fields[PROBABILITY_COLUMN],
                    "coercing out-of-range probability to zero"
                );
                probability = 0.0;
            }
        }
    }

    let base = fields[BASE_COLUMN];
    if base.is_empty() {
        return Err(VclrError::malformed(line_no, BASE_COLUMN, "empty base symbol"));
    }

    let strand = Strand::from_code(fields[STRAND_COLUMN]).ok_or_else(|| {
        VclrError::malformed(
            line_no,
            STRAND_COLUMN,
            format!("unknown strand code '{}'", fields[STRAND_COLUMN]),
        )
    })?;

    Ok(AlignmentRecord::new(
        ref_pos,
        base,
        probability,
        strand,
        Orientation::from_label(fields[ORIENTATION_COLUMN]),
        fields[LABEL_COLUMN],
    ))
}

fn parse_numeric<T>(text: &str, line_no: usize, column: usize, policy: NumericPolicy) -> Result<T>
where
    T: std::str::FromStr + Default,
{
    match text.trim().parse::<T>() {
        Ok(value) => Ok(value),
        Err(_) => match policy {
            NumericPolicy::Strict => Err(VclrError::malformed(
                line_no,
                column,
                format!("invalid number '{text}'"),
            )),
            NumericPolicy::Lenient => {
                warn!(line = line_no, column, value = text, "coercing unparsable number to zero");
                Ok(T::default())
            }
        },
    }
}

/// Read the first sequence of a FASTA or FASTQ file, uppercased.
pub fn read_reference<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| VclrError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let sequence = first_sequence(&contents);
    if sequence.is_empty() {
        return Err(VclrError::EmptyReference {
            path: path.to_path_buf(),
        });
    }
    Ok(sequence)
}

fn first_sequence(contents: &str) -> Vec<u8> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty()).peekable();
    let fastq = lines.peek().is_some_and(|line| line.starts_with('@'));

    let sequence: String = if fastq {
        lines.nth(1).map(|line| line.trim().to_string()).unwrap_or_default()
    } else {
        let mut seen_header = false;
        lines
            .skip_while(|line| {
                if line.starts_with('>') && !seen_header {
                    seen_header = true;
                    true
                } else {
                    false
                }
            })
            .take_while(|line| !line.starts_with('>'))
            .map(str::trim)
            .collect()
    };
    sequence.to_ascii_uppercase().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "x\t10\tA\t0.9\tt\tforward\tread1\n\
                         x\t10\tI\t0.1\tc\tbackward\tread1\n\
                         \n\
                         x\t11\tA\t0.8\tt\tforward\tread2\n";

    #[test]
    fn parses_rows_and_skips_blank_lines() {
        let set = parse_alignment_table(TABLE.as_bytes(), NumericPolicy::Strict).unwrap();
        assert_eq!(set.len(), 3);
        let first = set.first().unwrap();
        assert_eq!(first.ref_pos, 10);
        assert_eq!(first.base, "A");
        assert_eq!(first.strand, Strand::Template);
        assert_eq!(first.orientation, Orientation::Forward);
        let second = set.iter().nth(1).unwrap();
        assert_eq!(second.strand, Strand::Complement);
        assert_eq!(second.orientation, Orientation::Reverse);
    }

    #[test]
    fn strict_policy_rejects_bad_numbers() {
        let err = parse_alignment_table("x\tten\tA\t0.9\tt\tforward\tr\n".as_bytes(), NumericPolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, VclrError::MalformedRecord { line: 1, column: 1, .. }));

        let err = parse_alignment_table("x\t1\tA\t1.5\tt\tforward\tr\n".as_bytes(), NumericPolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, VclrError::MalformedRecord { column: 3, .. }));
    }

    #[test]
    fn lenient_policy_coerces_to_zero() {
        let set = parse_alignment_table("x\t1\tA\tnan?\tt\tforward\tr\n".as_bytes(), NumericPolicy::Lenient)
            .unwrap();
        assert_eq!(set.first().unwrap().probability, 0.0);
    }

    #[test]
    fn non_finite_probabilities_never_reach_the_caller() {
        for value in ["NaN", "inf", "-0.5", "1.5"] {
            let row = format!("x\t5\tA\t{value}\tt\tforward\tr\n");
            let err = parse_alignment_table(row.as_bytes(), NumericPolicy::Strict).unwrap_err();
            assert!(matches!(err, VclrError::MalformedRecord { column: 3, .. }), "{value}");
            let set = parse_alignment_table(row.as_bytes(), NumericPolicy::Lenient).unwrap();
            assert_eq!(set.first().unwrap().probability, 0.0, "{value}");
        }
    }

    #[test]
    fn lenient_nan_loses_to_real_mass() {
        let table = "x\t5\tA\tNaN\tt\tforward\tr\nx\t5\tC\t0.9\tt\tforward\tr\n";
        let set = parse_alignment_table(table.as_bytes(), NumericPolicy::Lenient).unwrap();
        let call = crate::caller::call_site(&set, 0.0, crate::caller::CallMode::Raw).unwrap();
        assert_eq!(call.symbol(), "C");
        assert_eq!(call.probability, 1.0);
    }

    #[test]
    fn short_rows_and_unknown_strands_fail() {
        let err = parse_alignment_table("x\t1\tA\t0.5\n".as_bytes(), NumericPolicy::Lenient).unwrap_err();
        assert!(matches!(err, VclrError::MalformedRecord { .. }));
        let err = parse_alignment_table("x\t1\tA\t0.5\tq\tforward\tr\n".as_bytes(), NumericPolicy::Lenient)
            .unwrap_err();
        assert!(matches!(err, VclrError::MalformedRecord { column: 4, .. }));
    }

    #[test]
    fn reference_takes_first_fasta_record() {
        let seq = first_sequence(">chr\nacgt\nGGCC\n>other\nTTTT\n");
        assert_eq!(seq, b"ACGTGGCC".to_vec());
    }

    #[test]
    fn reference_reads_fastq_sequence_line() {
        let seq = first_sequence("@read\nacga\n+\nIIII\n");
        assert_eq!(seq, b"ACGA".to_vec());
    }

    #[test]
    fn reference_accepts_headerless_sequence() {
        assert_eq!(first_sequence("AC\nGT\n"), b"ACGT".to_vec());
    }
}
