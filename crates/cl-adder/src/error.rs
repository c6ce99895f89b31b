use std::path::PathBuf;

use crate::pipeline::Stage;

/// `CL_DEVICE_NOT_FOUND`
pub const CL_DEVICE_NOT_FOUND: i32 = -1;
/// `CL_PLATFORM_NOT_FOUND_KHR`, liefert der ICD-Loader ohne installierte Plattform
pub const CL_PLATFORM_NOT_FOUND_KHR: i32 = -1001;

/// Fehler eines einzelnen Runtime-Aufrufs (roher OpenCL-Statuscode).
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClError {
    #[error("OpenCL error code {0}")]
    Api(i32),
}

#[cfg(feature = "opencl")]
impl From<opencl3::error_codes::ClError> for ClError {
    fn from(err: opencl3::error_codes::ClError) -> Self {
        ClError::Api(err.0)
    }
}

impl From<i32> for ClError {
    fn from(code: i32) -> Self {
        ClError::Api(code)
    }
}

/// Abbruchgrund eines Laufs; genau eine Variante pro Stufe.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("unable to get platforms: {0}")]
    NoPlatform(#[source] ClError),

    #[error("can't create OpenCL context: {0}")]
    ContextCreation(#[source] ClError),

    #[error("can't create command queue: {0}")]
    QueueCreation(#[source] ClError),

    #[error("can't create OpenCL buffer `{name}` ({bytes} bytes): {source}")]
    BufferAllocation {
        name: &'static str,
        bytes: usize,
        #[source]
        source: ClError,
    },

    #[error("input lengths differ: {left} vs {right} elements")]
    MismatchedInputs { left: usize, right: usize },

    #[error("can't load program source {}: {source}", .path.display())]
    ProgramLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't create program object: {0}")]
    ProgramCreation(#[source] ClError),

    #[error("can't build program: {source}")]
    ProgramBuild {
        log: String,
        #[source]
        source: ClError,
    },

    #[error("can't load kernel `{name}`: {source}")]
    KernelResolution {
        name: String,
        #[source]
        source: ClError,
    },

    #[error("can't run kernel or read back data: {0}")]
    Execution(#[source] ClError),
}

impl PipelineError {
    /// Stufe, in der der Lauf abgebrochen ist.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::NoPlatform(_)
            | PipelineError::ContextCreation(_)
            | PipelineError::QueueCreation(_) => Stage::Initial,
            PipelineError::BufferAllocation { .. } | PipelineError::MismatchedInputs { .. } => {
                Stage::MemoryCopy
            }
            PipelineError::ProgramLoad { .. }
            | PipelineError::ProgramCreation(_)
            | PipelineError::ProgramBuild { .. }
            | PipelineError::KernelResolution { .. } => Stage::LoadProgram,
            PipelineError::Execution(_) => Stage::Execute,
        }
    }

    /// Prozess-Exitcode; 0 und 1 sind für korrekte/inkorrekte Ergebnisse reserviert.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::NoPlatform(_) => 2,
            PipelineError::ContextCreation(_) => 3,
            PipelineError::QueueCreation(_) => 4,
            PipelineError::BufferAllocation { .. } => 5,
            PipelineError::ProgramLoad { .. } => 6,
            PipelineError::ProgramCreation(_) => 7,
            PipelineError::ProgramBuild { .. } => 8,
            PipelineError::KernelResolution { .. } => 9,
            PipelineError::Execution(_) => 10,
            PipelineError::MismatchedInputs { .. } => 11,
        }
    }

    /// Compiler-Log des Geräts, falls der Build gescheitert ist.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            PipelineError::ProgramBuild { log, .. } => Some(log),
            _ => None,
        }
    }
}
