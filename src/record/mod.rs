//! Record store: per-base probability observations and the readers that
//! load them.
//!
//! Records are created once at load time and shared immutably between the
//! run-wide set and every grouped subset derived from it.

mod types;
pub mod io;

pub use io::{parse_alignment_table, read_alignment_file, read_reference};
pub use types::{AlignmentRecord, AlignmentSet, Orientation, Strand};
