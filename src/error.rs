use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("version {0} is not implemented for the ITU-R P.837 model (valid options: 6, 7)")]
    InvalidVersion(i64),
    #[error("could not load dataset '{name}': {reason}")]
    DatasetLoad { name: String, reason: String },
    #[error("malformed grid: {0}")]
    MalformedGrid(String),
    #[error("latitude and longitude shapes cannot be broadcast together (got {0:?} and {1:?})")]
    ShapeMismatch(Vec<usize>, Vec<usize>),
    #[error("month must be in 1..=12 (got {0})")]
    InvalidMonth(u32),
    #[error("no sign change in the bracket [{0}, {1}]")]
    NoRootBracketed(f64, f64),
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn dataset_load(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::DatasetLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(feature = "python")]
impl From<Error> for pyo3::PyErr {
    fn from(err: Error) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
