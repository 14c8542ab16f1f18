use thiserror::Error;

/// Recoverable failure kinds inside one fetch cycle.
///
/// Neither variant is fatal to the process: the scheduler maps validation
/// failures to a retry wait and persistence failures to a logged warning.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A record in the snapshot does not match the expected shape.
    #[error("Validation Error: {0}")]
    Validation(String),

    /// The spreadsheet could not be written.
    #[error("Persistence Error: {0}")]
    Persistence(String),
}

impl From<rust_xlsxwriter::XlsxError> for PipelineError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}
