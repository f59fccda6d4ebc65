//! Dense id types for the three id spaces the engine operates over: datasets,
//! columns, and histograms (numeric columns only). All three are assigned by
//! the external indexer at build time; the engine only ever consumes them.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A dataset id, dense and stable across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub u32);

/// A column id, dense per (dataset, column) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

/// A histogram id, dense over numeric columns only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HistogramId(pub u32);

impl From<u32> for DatasetId {
    fn from(v: u32) -> Self {
        DatasetId(v)
    }
}
impl From<u32> for ColumnId {
    fn from(v: u32) -> Self {
        ColumnId(v)
    }
}
impl From<u32> for HistogramId {
    fn from(v: u32) -> Self {
        HistogramId(v)
    }
}

/// The precomputed id-space tables exposed to the engine by the external
/// indexer (§3, §6 `meta.*`).
///
/// `column_to_dataset` is a total function: every column belongs to exactly
/// one dataset. `histogram_to_column` is partial: only numeric columns have
/// a histogram.
#[derive(Debug, Clone)]
pub struct MetaTables {
    /// `column_to_dataset[column_id] == dataset_id`. Total.
    column_to_dataset: Vec<DatasetId>,
    /// `histogram_to_column[histogram_id] == column_id`. Total over the
    /// histogram domain (every histogram id maps to some column), but the
    /// inverse (column -> histogram) is partial.
    histogram_to_column: Vec<ColumnId>,
    /// Reverse of `column_to_dataset`, precomputed: every dataset's columns
    /// in ascending order. Needed by the column-scope boundary to expand a
    /// dataset-id candidate set to column ids (§4.4).
    dataset_to_columns: Vec<Vec<ColumnId>>,
    /// Reverse of `histogram_to_column`, precomputed and partial: `None` for
    /// columns with no histogram. Needed by the percentile leaf to convert a
    /// column-id candidate set to the histogram-id space `percentile.search`
    /// expects.
    column_to_histogram: Vec<Option<HistogramId>>,
    num_datasets: u32,
}

impl MetaTables {
    pub fn new(column_to_dataset: Vec<DatasetId>, histogram_to_column: Vec<ColumnId>) -> Self {
        let num_datasets = column_to_dataset.iter().map(|d| d.0).max().map_or(0, |m| m + 1);

        let mut dataset_to_columns = vec![Vec::new(); num_datasets as usize];
        for (column_idx, dataset) in column_to_dataset.iter().enumerate() {
            dataset_to_columns[dataset.0 as usize].push(ColumnId(column_idx as u32));
        }

        let mut column_to_histogram = vec![None; column_to_dataset.len()];
        for (histogram_idx, column) in histogram_to_column.iter().enumerate() {
            column_to_histogram[column.0 as usize] = Some(HistogramId(histogram_idx as u32));
        }

        MetaTables {
            column_to_dataset,
            histogram_to_column,
            dataset_to_columns,
            column_to_histogram,
            num_datasets,
        }
    }

    pub fn column_to_dataset(&self, column: ColumnId) -> DatasetId {
        self.column_to_dataset[column.0 as usize]
    }

    pub fn histogram_to_column(&self, histogram: HistogramId) -> ColumnId {
        self.histogram_to_column[histogram.0 as usize]
    }

    /// Partial: `None` if the column has no histogram.
    pub fn column_to_histogram(&self, column: ColumnId) -> Option<HistogramId> {
        self.column_to_histogram[column.0 as usize]
    }

    /// All columns belonging to a dataset, ascending.
    pub fn dataset_to_columns(&self, dataset: DatasetId) -> &[ColumnId] {
        &self.dataset_to_columns[dataset.0 as usize]
    }

    /// Batch conversion, O(n).
    pub fn columns_to_datasets(&self, columns: impl IntoIterator<Item = ColumnId>) -> Vec<DatasetId> {
        columns.into_iter().map(|c| self.column_to_dataset(c)).collect()
    }

    /// Batch conversion, O(n).
    pub fn histograms_to_columns(&self, histograms: impl IntoIterator<Item = HistogramId>) -> Vec<ColumnId> {
        histograms.into_iter().map(|h| self.histogram_to_column(h)).collect()
    }

    /// Expand a dataset-id set to the union of their columns, O(n) in the
    /// output size.
    pub fn datasets_to_columns(&self, datasets: impl IntoIterator<Item = DatasetId>) -> Vec<ColumnId> {
        datasets.into_iter().flat_map(|d| self.dataset_to_columns(d).iter().copied()).collect()
    }

    /// Narrow a column-id set to the histogram ids of the columns that have
    /// one; columns without a histogram are silently dropped.
    pub fn columns_to_histograms(&self, columns: impl IntoIterator<Item = ColumnId>) -> Vec<HistogramId> {
        columns.into_iter().filter_map(|c| self.column_to_histogram(c)).collect()
    }

    pub fn num_histograms(&self) -> u32 {
        self.histogram_to_column.len() as u32
    }

    /// `meta.dataset_universe` — every dataset id known to the engine.
    pub fn dataset_universe(&self) -> Range<u32> {
        0..self.num_datasets
    }

    /// All column ids known to the engine (dense domain size), used as the
    /// universe for NOT inside a column scope per the resolved Open
    /// Question in SPEC_FULL.md §D.1: the universe is every column, not just
    /// histogrammed ones.
    pub fn column_universe(&self) -> Range<u32> {
        0..(self.column_to_dataset.len() as u32)
    }

    pub fn num_datasets(&self) -> u32 {
        self.num_datasets
    }

    pub fn num_columns(&self) -> u32 {
        self.column_to_dataset.len() as u32
    }
}
