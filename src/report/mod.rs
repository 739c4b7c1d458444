//! CSV export and console rendering of the result tables.

use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use log::info;
use prettytable::{Cell, Row, Table};

use crate::error::{Error, Result};
use crate::material_balance::{MaterialBalance, Stream};
use crate::volatility::{Evaluation, VolatilityTable};

const NOT_AVAILABLE: &str = "N/A";

pub const K_VALUE_HEADER: [&str; 8] = [
    "Compound",
    "K_FEED",
    "K_BOTTOM",
    "K_TOP",
    "Alpha_FEED (α)",
    "Alpha_BOTTOM (α)",
    "Alpha_TOP (α)",
    "Alpha_AVG (α)",
];

pub const FRACTION_HEADER: [&str; 7] = [
    "Compound",
    "Feed (lbmol/h)",
    "z (fraction)",
    "Top (lbmol/h)",
    "xd (fraction)",
    "Bottom (lbmol/h)",
    "xb (fraction)",
];

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |value| format!("{value:.2}"))
}

/// The K-value table as text, two decimals, `N/A` for anything not computed.
pub fn k_value_records(table: &VolatilityTable) -> Vec<[String; 8]> {
    table
        .rows()
        .iter()
        .map(|row| {
            let k_value = |stream| format_value(row.k_values.get(stream).value());
            let alpha = |stream| format_value(row.alphas.get(stream).value());
            [
                row.compound.clone(),
                k_value(Stream::Feed),
                k_value(Stream::Bottom),
                k_value(Stream::Top),
                alpha(Stream::Feed),
                alpha(Stream::Bottom),
                alpha(Stream::Top),
                format_value(row.alpha_average),
            ]
        })
        .collect()
}

/// The fractions table as text, full precision, empty cells for absent flows.
pub fn fraction_records(balance: &MaterialBalance) -> Vec<[String; 7]> {
    balance
        .rows()
        .iter()
        .map(|row| {
            let mut record: [String; 7] = Default::default();
            record[0] = row.compound.clone();
            for (i, stream) in [Stream::Feed, Stream::Top, Stream::Bottom]
                .into_iter()
                .enumerate()
            {
                if let Some(flow) = row.flow(stream) {
                    record[1 + 2 * i] = flow.rate.to_string();
                    record[2 + 2 * i] = flow.fraction.to_string();
                }
            }
            record
        })
        .collect()
}

fn write_records<const N: usize>(
    writer: impl Write,
    header: [&str; N],
    records: &[[String; N]],
) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(header)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_k_values(writer: impl Write, table: &VolatilityTable) -> csv::Result<()> {
    write_records(writer, K_VALUE_HEADER, &k_value_records(table))
}

pub fn write_fractions(writer: impl Write, balance: &MaterialBalance) -> csv::Result<()> {
    write_records(writer, FRACTION_HEADER, &fraction_records(balance))
}

fn create(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn export_k_values(path: &Path, table: &VolatilityTable) -> Result<()> {
    write_k_values(create(path)?, table).map_err(|source| Error::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote K-values of {} compounds to {path:?}", table.rows().len());
    Ok(())
}

pub fn export_fractions(path: &Path, balance: &MaterialBalance) -> Result<()> {
    write_fractions(create(path)?, balance).map_err(|source| Error::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote fractions of {} compounds to {path:?}", balance.rows().len());
    Ok(())
}

/// Console table with the header as its first row.
fn console_table<const N: usize>(header: [&str; N], records: &[[String; N]]) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(header.into_iter().map(Cell::new).collect()));
    for record in records {
        table.add_row(Row::new(record.iter().map(|cell| Cell::new(cell)).collect()));
    }
    table
}

impl Display for VolatilityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let temperatures = self.temperatures();
        writeln!(
            f,
            "T feed: {}; T bottom: {}; T top: {}; light key: {}; heavy key: {}",
            temperatures.feed,
            temperatures.bottom,
            temperatures.top,
            self.keys().light,
            self.keys().heavy
        )?;
        write!(f, "{}", console_table(K_VALUE_HEADER, &k_value_records(self)))?;

        for (compound, stream, error) in self.failures() {
            writeln!(f, "{compound} ({stream}): {error}")?;
        }
        for row in self.rows() {
            let undefined = Stream::ALL
                .into_iter()
                .filter(|&stream| row.alphas.get(stream) == &Evaluation::Undefined)
                .map(|stream| stream.to_string())
                .collect::<Vec<_>>();
            if !undefined.is_empty() {
                writeln!(
                    f,
                    "{}: relative volatility undefined at {} (heavy key K is zero)",
                    row.compound,
                    undefined.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

impl Display for MaterialBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", console_table(FRACTION_HEADER, &fraction_records(self)))?;
        write!(
            f,
            "Totals: feed {} lbmol/h; top {} lbmol/h; bottom {} lbmol/h",
            self.total(Stream::Feed),
            self.total(Stream::Top),
            self.total(Stream::Bottom)
        )
    }
}
