mod optics;
mod strengths;

pub use optics::{KeywordTables, OpticsTable, REQUIRED_OPTICS_COLUMNS};
pub use strengths::StrengthTable;
