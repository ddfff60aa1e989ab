use core::fmt;

/// Failure reported by a device collaborator.
///
/// Render passes turn these into `false` results; callers decide whether to
/// skip the draw or abandon the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    OutOfMemory,
    /// Program could not be compiled or linked.
    PipelineCreation(String),
    /// A handle does not name a live device object.
    InvalidResource,
    /// The device was lost; no further work will complete.
    Lost,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "device out of memory"),
            Self::PipelineCreation(msg) => write!(f, "pipeline creation failed: {msg}"),
            Self::InvalidResource => write!(f, "invalid resource handle"),
            Self::Lost => write!(f, "device lost"),
        }
    }
}

impl std::error::Error for DeviceError {}
