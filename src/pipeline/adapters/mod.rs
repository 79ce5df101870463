//! Data source adapters

pub mod csv_file;
pub mod noaa;

pub use csv_file::CsvFileAdapter;
pub use noaa::NoaaAdapter;
