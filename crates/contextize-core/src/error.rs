use thiserror::Error;

pub type Result<T> = std::result::Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("render did not settle after {passes} passes")]
    Unsettled { passes: usize },

    #[error("no button labelled {label:?} in the current frame")]
    NoSuchTarget { label: String },
}
