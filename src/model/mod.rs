//! Database models
//!
//! `AssetRecord` doubles as the canonical pipeline output and the
//! `asset_history` row; `Table` is the typed pool handle DAOs hang off.

mod asset_record;
mod table;

pub use asset_record::AssetRecord;
pub use table::Table;
