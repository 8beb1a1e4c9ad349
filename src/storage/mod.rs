pub mod catalog_cache;
pub mod storage_manager;
pub mod workbook_reader;
pub mod workbook_writer;

pub use catalog_cache::*;
pub use storage_manager::*;
pub use workbook_reader::*;
pub use workbook_writer::*;
