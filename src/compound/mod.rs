use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::interpolation_table::SampleCurve;

/// Cells that count as missing values rather than malformed numbers.
const MISSING_VALUES: [&str; 9] = ["", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "null", "NULL"];

/// The K-value curve of one compound.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundTable {
    name: String,
    source: Option<PathBuf>,
    curve: SampleCurve,
}

impl CompoundTable {
    pub fn new(name: impl Into<String>, curve: SampleCurve) -> Self {
        Self {
            name: name.into(),
            source: None,
            curve,
        }
    }

    /// Load a table whose first column holds temperatures and whose second column holds K-values.
    /// The header of the second column names the compound.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path)
    }

    /// Like [`Self::load`], `path` only labels the table and its errors.
    pub fn from_reader(reader: impl Read, path: &Path) -> Result<Self> {
        let csv_error = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(csv_error)?;
        let name = match headers.get(1) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(Error::MissingColumns {
                    path: path.to_path_buf(),
                })
            }
        };

        let mut samples = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let line = record.position().map_or(0, |position| position.line());
            let temperature = parse_cell(record.get(0), path, line)?;
            let k_value = parse_cell(record.get(1), path, line)?;

            match (temperature, k_value) {
                (Some(temperature), Some(k_value)) => samples.push((temperature, k_value)),
                _ => debug!("{name}: dropping line {line} of {path:?} with a missing value"),
            }
        }

        let curve = SampleCurve::new(samples).map_err(|source| Error::Compound {
            compound: name.clone(),
            source,
        })?;
        debug!("{name}: {} samples from {path:?}", curve.len());

        Ok(Self {
            name,
            source: Some(path.to_path_buf()),
            curve,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file the table was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn curve(&self) -> &SampleCurve {
        &self.curve
    }
}

fn parse_cell(cell: Option<&str>, path: &Path, line: u64) -> Result<Option<f64>> {
    match cell {
        None => Ok(None),
        Some(cell) if MISSING_VALUES.contains(&cell) => Ok(None),
        Some(cell) => match cell.parse::<f64>() {
            Ok(value) if value.is_nan() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(Error::InvalidNumber {
                path: path.to_path_buf(),
                line,
                value: cell.to_string(),
            }),
        },
    }
}

/// The K-value tables of all compounds under consideration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    compounds: Vec<CompoundTable>,
}

impl DataSet {
    /// Compound names must be unique.
    pub fn new(compounds: Vec<CompoundTable>) -> Result<Self> {
        for (i, compound) in compounds.iter().enumerate() {
            if let Some(other) = compounds[..i]
                .iter()
                .find(|other| other.name == compound.name)
            {
                return Err(Error::DuplicateCompound {
                    compound: compound.name.clone(),
                    first: other.source.clone().unwrap_or_default(),
                    second: compound.source.clone().unwrap_or_default(),
                });
            }
        }

        Ok(Self { compounds })
    }

    /// Load every CSV file of the directory, in file name order.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let io_error = |source| Error::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let is_csv = path
                .extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
            if is_csv && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(Error::NoCompounds(dir.to_path_buf()));
        }

        let compounds = paths
            .iter()
            .map(|path| CompoundTable::load(path))
            .collect::<Result<Vec<_>>>()?;
        let data_set = Self::new(compounds)?;
        info!("Loaded {} compounds from {dir:?}", data_set.len());
        Ok(data_set)
    }

    pub fn compounds(&self) -> &[CompoundTable] {
        &self.compounds
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.compounds.iter().map(CompoundTable::name)
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CompoundTable> {
        self.compounds.iter().find(|compound| compound.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&CompoundTable> {
        self.get(name)
            .ok_or_else(|| Error::UnknownCompound(name.to_string()))
    }

    /// The lowest and highest temperature sampled by any compound.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        self.compounds
            .iter()
            .map(|compound| compound.curve.bounds())
            .reduce(|(min, max), (low, high)| (min.min(low), max.max(high)))
    }
}
