#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use vclr::record::{read_alignment_file, read_reference};
use vclr::{AlignmentSet, NumericPolicy};

fn tests_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests")
}

/// Load a fixture from `tests/data`.
pub fn load_fixture(name: &str) -> AlignmentSet {
    let path = tests_root().join("data").join(name);
    read_alignment_file(&path, NumericPolicy::Strict)
        .unwrap_or_else(|err| panic!("fixture {:?} failed to load: {err}", path))
}

/// Reference sequence shipped with the canonical fixture.
pub fn load_reference() -> Vec<u8> {
    read_reference(tests_root().join("data").join("reference.fa")).expect("reference loads")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = tests_root().join("snapshots").join(name);
    if std::env::var("VCLR_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set VCLR_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}
