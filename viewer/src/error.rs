use watchless::timecode::TimecodeError;

pub type ViewerResult<T> = Result<T, ViewerError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    #[error(transparent)]
    Timecode(#[from] TimecodeError),

    #[error("no control with id {0}")]
    UnknownControl(usize),
}
