use thiserror::Error;

/// Failures the streaming loop has to tell apart
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("landmark set has {len} points, index {index} is out of range")]
    MissingLandmark { index: usize, len: usize },

    #[error("payload has {0} floats, need at least 2 for yaw and pitch")]
    TooShort(usize),

    #[error("giving up after {failures} consecutive send failures")]
    TransportDown {
        failures: u32,
        #[source]
        source: std::io::Error,
    },
}
