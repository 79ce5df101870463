//! Data pipeline: ingestion from external sources and batch transformations

pub mod adapters;
pub mod ingestion;
pub mod transformers;

pub use adapters::{CsvFileAdapter, NoaaAdapter};
pub use ingestion::{DataRecord, DataSourceAdapter, IngestionPipeline, records_to_batch};
pub use transformers::{
    Conversion, DropNullsTransformer, InterpolateTransformer, InterpolationMethod, Pipeline,
    Transformer, UnitConversionTransformer,
};
