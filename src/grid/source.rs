use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array2;
use tracing::debug;

use crate::error::Error;

/// Anything able to produce a named numeric matrix (an axis or a value grid).
pub trait GridSource: Send + Sync {
    fn load(&self, name: &str) -> Result<Array2<f64>, Error>;
}

/// Plain-text matrices stored under a dataset root directory.
///
/// One matrix row per line, values separated by whitespace or commas. Blank
/// lines and everything after a `#` are ignored.
#[derive(Debug, Clone)]
pub struct TextDirSource {
    root: PathBuf,
}

impl TextDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TextDirSource { root: root.into() }
    }
}

impl GridSource for TextDirSource {
    fn load(&self, name: &str) -> Result<Array2<f64>, Error> {
        let path = self.root.join(name);
        debug!(path = %path.display(), "reading dataset");
        let text = fs::read_to_string(&path)
            .map_err(|err| Error::dataset_load(name, err))?;
        parse_matrix(&text).map_err(|reason| Error::dataset_load(name, reason))
    }
}

fn parse_matrix(text: &str) -> Result<Array2<f64>, String> {
    let mut values: Vec<f64> = vec![];
    let mut n_cols: Option<usize> = None;
    let mut n_rows = 0;

    for (line_number, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    format!("line {}: invalid number '{}'", line_number + 1, token)
                })
            })
            .collect::<Result<Vec<f64>, String>>()?;

        match n_cols {
            None => n_cols = Some(row.len()),
            Some(n) if n != row.len() => {
                return Err(format!(
                    "line {}: expected {} columns, got {}",
                    line_number + 1,
                    n,
                    row.len()
                ))
            }
            Some(_) => {}
        }
        values.extend(row);
        n_rows += 1;
    }

    let n_cols = n_cols.ok_or_else(|| "file contains no data".to_string())?;
    Array2::from_shape_vec((n_rows, n_cols), values)
        .map_err(|err| err.to_string())
}

/// In-memory matrices, counting how many times each name is loaded.
#[derive(Debug, Default)]
pub struct MemorySource {
    matrices: HashMap<String, Array2<f64>>,
    loads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, matrix: Array2<f64>) -> Self {
        self.insert(name, matrix);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, matrix: Array2<f64>) {
        self.matrices.insert(name.into(), matrix);
    }

    /// Total number of successful and failed `load` calls.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl GridSource for MemorySource {
    fn load(&self, name: &str) -> Result<Array2<f64>, Error> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.matrices
            .get(name)
            .cloned()
            .ok_or_else(|| Error::dataset_load(name, "no such dataset"))
    }
}
