use super::comparable_finder::{FieldRole, PropertyRecord, MAX_COMPARABLES};
use super::dataset_loader::Dataset;

/// One report row, aligned with `RowFlattener::header`. `None` is an empty cell.
pub type FlatRecord = Vec<Option<String>>;

/// Merges a subject and its comparables into a fixed-width row.
///
/// Subject cells are copied as they are, under the dataset's own headers. Each
/// comparable slot copies the nine layout columns under `compK <header>`, so
/// the width does not depend on how many comparables were found nor on any
/// extra dataset columns.
pub struct RowFlattener {
    subject_headers: Vec<String>,
    comp_columns: Vec<(usize, String)>,
}

impl RowFlattener {
    pub fn new(dataset: &Dataset) -> RowFlattener {
        let comp_columns = FieldRole::ALL
            .iter()
            .map(|role| {
                (
                    dataset.column_index(*role),
                    dataset.layout.header(*role).to_owned(),
                )
            })
            .collect();

        RowFlattener {
            subject_headers: dataset.headers.clone(),
            comp_columns,
        }
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = self.subject_headers.clone();
        for slot in 1..=MAX_COMPARABLES {
            for (_, name) in &self.comp_columns {
                header.push(format!("comp{} {}", slot, name));
            }
        }
        header
    }

    pub fn width(&self) -> usize {
        self.subject_headers.len() + MAX_COMPARABLES * self.comp_columns.len()
    }

    pub fn flatten(&self, subject: &PropertyRecord, comparables: &[&PropertyRecord]) -> FlatRecord {
        let mut row: FlatRecord = Vec::with_capacity(self.width());

        row.extend(
            (0..self.subject_headers.len()).map(|idx| subject.cells.get(idx).cloned()),
        );

        for slot in 0..MAX_COMPARABLES {
            match comparables.get(slot) {
                Some(comp) => row.extend(
                    self.comp_columns
                        .iter()
                        .map(|(idx, _)| comp.cells.get(*idx).cloned()),
                ),
                None => row.extend(self.comp_columns.iter().map(|_| None)),
            }
        }

        row
    }
}
