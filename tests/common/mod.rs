#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use cellcast::{
    AssignError, Column, FieldSpec, FieldValues, FromRow, Header, Record, RecordDefinition,
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// A record with a mandatory name, an integer age and an optional score.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i64,
    pub score: Option<f64>,
}

impl FromRow for Person {
    fn from_row(values: &mut FieldValues) -> Result<Self, AssignError> {
        Ok(Self {
            name: values.take("name")?,
            age: values.take("age")?,
            score: values.take("score")?,
        })
    }
}

impl Record for Person {
    fn definition() -> RecordDefinition {
        people_definition(Header::new(2))
    }
}

/// Person's definition under a caller-chosen header.
pub fn people_definition(header: Header) -> RecordDefinition {
    RecordDefinition::new()
        .header(
            header
                .column("A", "name")
                .column("B", "age")
                .column("C", "score"),
        )
        .field(FieldSpec::of::<String>("name").column(Column::new().rule("required").mandatory()))
        .field(FieldSpec::of::<i64>("age").column(Column::new().rule("integer")))
        .field(FieldSpec::of::<Option<f64>>("score").column(Column::new().rule("numeric")))
}

/// Two header rows, then three data rows; the second data row has a bad age.
pub fn people_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Name", "Age", "Score"],
        vec!["", "years", "points"],
        vec!["Ann", "34", "9.5"],
        vec!["Bob", "3x", "7"],
        vec!["Cy", "51", ""],
    ]
}
