use eyre::{bail, ensure, Result, WrapErr};
use ndarray::{Array1, ArrayView1};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// An ordered, immutable set of scalar observations.
///
/// The observations are assumed to be an i.i.d. sample, so the order carries
/// no meaning for the likelihood, but it is preserved so that runs over the
/// same file are reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    values: Vec<f64>,
}

impl Observations {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Get a view of the observed values.
    pub fn values(&self) -> ArrayView1<f64> {
        ArrayView1::from(self.values.as_slice())
    }

    /// Get the observed values as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sample mean, or NaN for an empty set.
    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Read observations from a CSV file, see [Observations::from_reader].
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Reading observations from {}", path.display());
        let file = File::open(path)
            .wrap_err_with(|| format!("Unable to open the data file '{}'", path.display()))?;
        Self::from_reader(file)
    }

    /// Read observations from CSV data.
    ///
    /// The data must contain exactly one numeric column. A header row is
    /// optional; if present, the column must be named `value`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut values = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.wrap_err_with(|| format!("Malformed CSV on line {}", line + 1))?;
            if record.len() != 1 {
                bail!(
                    "Expected a single column on line {}, found {}",
                    line + 1,
                    record.len()
                );
            }
            let field = &record[0];
            if line == 0 && field.eq_ignore_ascii_case("value") {
                continue;
            }
            let value: f64 = field
                .parse()
                .wrap_err_with(|| format!("Unable to parse '{}' on line {}", field, line + 1))?;
            values.push(value);
        }

        ensure!(!values.is_empty(), "The data file contains no observations");
        Ok(Self::new(values))
    }
}

impl From<Vec<f64>> for Observations {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<Array1<f64>> for Observations {
    fn from(values: Array1<f64>) -> Self {
        Self::new(values.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_reader_with_header() {
        let csv = "value\n1.5\n-2.0\n 3.25 \n";
        let obs = Observations::from_reader(Cursor::new(csv)).unwrap();
        assert_eq!(obs.as_slice(), &[1.5, -2.0, 3.25]);
    }

    #[test]
    fn test_from_reader_without_header() {
        let csv = "0.5\n0.25\n";
        let obs = Observations::from_reader(Cursor::new(csv)).unwrap();
        assert_eq!(obs.len(), 2);
        assert!((obs.mean() - 0.375).abs() < 1e-15);
    }

    #[test]
    fn test_from_reader_rejects_bad_input() {
        assert!(Observations::from_reader(Cursor::new("value\n")).is_err());
        assert!(Observations::from_reader(Cursor::new("1.0,2.0\n")).is_err());
        assert!(Observations::from_reader(Cursor::new("1.0\nabc\n")).is_err());
    }
}
