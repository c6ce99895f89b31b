//! Vektoraddition `result = a + b` auf einem OpenCL-Gerät.
//!
//! Ablauf und Fehlerbehandlung stecken in [`pipeline`]; die Runtime ist über
//! [`ComputeRuntime`] austauschbar, [`OpenClRuntime`] ist die echte.

pub mod buffer;
pub mod error;
pub mod host;
pub mod metrics;
pub mod pipeline;
pub mod runtime;
pub mod verify;

#[cfg(feature = "opencl")]
mod opencl;
#[cfg(feature = "opencl")]
pub use opencl::OpenClRuntime;

pub use buffer::{Access, DeviceBuffer, ReadOnly, WriteOnly};
pub use error::{ClError, PipelineError};
pub use host::{HostInputs, DEFAULT_ELEMENTS};
pub use metrics::StageTimings;
pub use pipeline::{
    run, run_recorded, AdderKernel, PipelineConfig, Progress, Report, Session, Stage,
    StagedBuffers, DEFAULT_KERNEL_PATH, ENTRY_POINT,
};
pub use runtime::{ComputeRuntime, DeviceType, MemAccess};
pub use verify::{verify_sum, Verdict};
