use crate::errors::ChiMergeError;
use crate::interval::{ChiMergeConfig, IntervalTable};

/// An ordered collection of (attribute values, class label) tuples.
///
/// Class labels are interned in first-seen order; the resulting index
/// assignment fixes the layout of every class-frequency vector built from
/// this dataset.
#[derive(Debug, Default)]
pub struct Dataset {
    data: Vec<(Vec<f64>, usize)>,
    class_list: Vec<String>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset::default()
    }

    /// Parse comma-separated rows where the last field is the class label
    /// and every preceding field is a floating-point attribute value.
    /// Blank lines are skipped; every row must carry the same number of
    /// attribute columns as the first.
    pub fn from_csv_str(contents: &str) -> Result<Self, ChiMergeError> {
        let mut dataset = Dataset::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields: Vec<&str> = line.split(',').collect();
            let label = fields.pop().unwrap_or_default().trim();
            let values = fields
                .iter()
                .map(|field| {
                    field
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| ChiMergeError::ParseValue(field.trim().to_string()))
                })
                .collect::<Result<Vec<f64>, ChiMergeError>>()?;
            if !dataset.is_empty() && values.len() != dataset.n_attributes() {
                return Err(ChiMergeError::RaggedRow {
                    row: line_no + 1,
                    expected: dataset.n_attributes(),
                    found: values.len(),
                });
            }
            dataset.push(values, label);
        }
        Ok(dataset)
    }

    /// Append one tuple, interning the class label on first sight.
    pub fn push(&mut self, values: Vec<f64>, label: &str) {
        let class_index = match self.class_list.iter().position(|c| c == label) {
            Some(index) => index,
            None => {
                self.class_list.push(label.to_string());
                self.class_list.len() - 1
            }
        };
        self.data.push((values, class_index));
    }

    /// Number of attribute columns, taken from the first tuple.
    pub fn n_attributes(&self) -> usize {
        self.data
            .first()
            .map(|(values, _)| values.len())
            .unwrap_or(0)
    }

    pub fn n_classes(&self) -> usize {
        self.class_list.len()
    }

    /// Distinct class labels in first-seen order.
    pub fn class_list(&self) -> &[String] {
        &self.class_list
    }

    pub(crate) fn tuples(&self) -> &[(Vec<f64>, usize)] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Discretize one attribute column with ChiMerge, running the merge
    /// loop to completion.
    pub fn discretize_by_chi(
        &self,
        column: usize,
        config: ChiMergeConfig,
    ) -> Result<IntervalTable, ChiMergeError> {
        let mut table = IntervalTable::new(self, column, config)?;
        table.chimerge()?;
        Ok(table)
    }
}
