use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChiMergeError {
    #[error("attribute column {column} out of range, dataset has {n_attributes} attribute columns")]
    ColumnOutOfRange { column: usize, n_attributes: usize },
    #[error("chi-square test over frequencies with a grand total of zero")]
    DegenerateFrequencies,
    #[error("chi cache desynchronized after merge: {chi_len} cached scores for {interval_len} intervals")]
    CacheDesync { chi_len: usize, interval_len: usize },
    #[error("could not parse {0:?} as an attribute value")]
    ParseValue(String),
    #[error("row {row} has {found} attribute columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("chi-square test needs at least two frequency vectors, got {0}")]
    TooFewEvents(usize),
    #[error("chi-square test over frequency vectors of unequal length")]
    UnevenEventLengths,
}
