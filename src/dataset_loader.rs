use failure::Fail;
use std::io;
use std::path::Path;

use log::{info, warn};

use super::comparable_finder::{non_blank, parse_numeric, ColumnLayout, FieldRole, PropertyRecord};

#[derive(Debug, Fail)]
pub enum DatasetError {
    #[fail(display = "Dataset is missing required columns: {}", _0)]
    MissingColumns(String),
    #[fail(display = "Cannot open dataset {}: {}", _0, _1)]
    FileNotFound(String, io::Error),
    #[fail(display = "Csv error: {}", _0)]
    Csv(csv::Error),
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> DatasetError {
        DatasetError::Csv(err)
    }
}

/// Immutable, validated set of property records.
#[derive(Debug)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub layout: ColumnLayout,
    pub records: Vec<PropertyRecord>,
    columns: ColumnIndexes,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Position of `role`'s column in `headers`.
    pub fn column_index(&self, role: FieldRole) -> usize {
        self.columns.get(role)
    }
}

/// Column positions of each role, resolved once from the header row.
#[derive(Debug)]
struct ColumnIndexes([usize; 9]);

impl ColumnIndexes {
    fn resolve(headers: &[String], layout: &ColumnLayout) -> Result<ColumnIndexes, DatasetError> {
        let mut indexes = [0; 9];
        let mut missing = Vec::new();

        for (slot, role) in indexes.iter_mut().zip(FieldRole::ALL.iter()) {
            let wanted = layout.header(*role);
            match headers.iter().position(|h| h == wanted) {
                Some(idx) => *slot = idx,
                None => missing.push(format!("'{}'", wanted)),
            }
        }

        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns(missing.join(", ")));
        }
        Ok(ColumnIndexes(indexes))
    }

    #[inline]
    fn get(&self, role: FieldRole) -> usize {
        self.0[role as usize]
    }
}

fn to_record(cells: Vec<String>, columns: &ColumnIndexes) -> PropertyRecord {
    let cell = |role| cells[columns.get(role)].as_str();

    PropertyRecord {
        name: non_blank(cell(FieldRole::Name)),
        address: non_blank(cell(FieldRole::Address)),
        owner_name: non_blank(cell(FieldRole::OwnerName)),
        owner_address: non_blank(cell(FieldRole::OwnerAddress)),
        account_number: cell(FieldRole::AccountNumber).to_owned(),
        class: non_blank(cell(FieldRole::Class)),
        property_type: cell(FieldRole::PropertyType).to_owned(),
        market_value: parse_numeric(cell(FieldRole::MarketValue)),
        ratio: parse_numeric(cell(FieldRole::Ratio)),
        cells,
    }
}

/// Reads a delimited dataset with a header row.
///
/// Required columns are checked before any row is read. Short rows are padded
/// with empty cells, so a missing value shows up as `None` on the record.
/// Cells that are not valid UTF-8 are decoded lossily, so every data row of the
/// file keeps its position in `records`.
pub fn read_dataset<R: io::Read>(
    input: R,
    delimiter: u8,
    layout: ColumnLayout,
) -> Result<Dataset, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();
    let columns = ColumnIndexes::resolve(&headers, &layout)?;

    let mut records = Vec::new();
    for (row_number, row) in csv_reader.byte_records().enumerate() {
        let row = row?;

        if std::str::from_utf8(row.as_slice()).is_err() {
            warn!("Row {} is not valid UTF-8, replacing invalid bytes", row_number);
        }
        let mut cells: Vec<String> = row
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect();
        cells.resize(headers.len(), String::new());
        records.push(to_record(cells, &columns));
    }

    info!("Loaded {} properties", records.len());

    Ok(Dataset {
        headers,
        layout,
        records,
        columns,
    })
}

pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    delimiter: u8,
    layout: ColumnLayout,
) -> Result<Dataset, DatasetError> {
    info!("Loading dataset from {}", path.as_ref().display());

    let file = std::fs::File::open(&path)
        .map_err(|e| DatasetError::FileNotFound(path.as_ref().display().to_string(), e))?;

    read_dataset(io::BufReader::new(file), delimiter, layout)
}
