use std::path::PathBuf;

use crate::material_balance::Stream;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single K-value interpolation.
#[derive(thiserror::Error, std::fmt::Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("need at least {required} temperature samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("temperature {temperature} appears twice (K-values {first} and {second})")]
    DuplicateTemperature {
        temperature: f64,
        first: f64,
        second: f64,
    },

    #[error("sample {index} is not finite (temperature {temperature}, K-value {k_value})")]
    NonFiniteSample {
        index: usize,
        temperature: f64,
        k_value: f64,
    },

    #[error("Temperature {query} out of bounds ({min} - {max})")]
    OutOfRange { query: f64, min: f64, max: f64 },

    #[error("query temperature {0} is not a number")]
    NonFiniteQuery(f64),

    #[error("the spline moment system of {knots} knots is singular")]
    SingularSystem { knots: usize },
}

#[derive(thiserror::Error, std::fmt::Debug)]
pub enum Error {
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error("compound {compound}: {source}")]
    Compound {
        compound: String,
        #[source]
        source: InterpolationError,
    },

    #[error("unknown compound {0:?}")]
    UnknownCompound(String),

    #[error("no {role} key given and the data set has only {compounds} compounds")]
    MissingKey {
        role: &'static str,
        compounds: usize,
    },

    #[error("compound {compound:?} is defined by both {first:?} and {second:?}")]
    DuplicateCompound {
        compound: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("no CSV files found in {0:?}")]
    NoCompounds(PathBuf),

    #[error("{path:?} needs a header with a temperature and a K-value column")]
    MissingColumns { path: PathBuf },

    #[error("{path:?}, line {line}: {value:?} is not a number")]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{stream} flow rate of {compound} is invalid: {rate}")]
    InvalidFlowRate {
        stream: Stream,
        compound: String,
        rate: f64,
    },

    #[error("{0} flow rates sum to zero")]
    ZeroTotalFlow(Stream),

    #[error("the Fenske equation is undefined: {0}")]
    FenskeUndefined(String),

    #[error("{path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{0:?} exists, pass --force to overwrite it")]
    ConfigExists(PathBuf),

    #[error("cannot parse configuration: {0}")]
    ConfigRead(#[from] toml::de::Error),

    #[error("cannot serialise configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}
