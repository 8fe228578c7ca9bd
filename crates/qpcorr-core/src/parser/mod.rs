mod sequence;
mod tfs;

pub use sequence::{parse_sequence_strengths, DEFAULT_LENGTH_PARAMETER, DEFAULT_STRENGTH_PARAMETER};
pub use tfs::{parse_tfs, TfsHeader, TfsRow, TfsTable};

use crate::domain::{CorrError, CorrResult};
use std::fs;
use std::path::Path;

pub fn read_input_source(path: &Path, artifact_name: &str) -> CorrResult<String> {
    fs::read_to_string(path).map_err(|source| {
        CorrError::io_system(
            "IO.INPUT_READ",
            format!(
                "failed to read {} '{}': {}",
                artifact_name,
                path.display(),
                source
            ),
        )
    })
}
