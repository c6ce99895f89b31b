//! Schnittstelle zwischen Pipeline und Compute-Runtime.
//!
//! Alle Handle-Typen geben ihre Ressource im `Drop` frei. Die Pipeline hält
//! die Handles in lokalen Variablen bzw. Struct-Feldern, deren Drop-Reihenfolge
//! der umgekehrten Anlage-Reihenfolge entspricht.

use crate::error::ClError;

/// Geräteklasse, nach der der Kontext sein Gerät auflöst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DeviceType {
    #[default]
    Default,
    Cpu,
    Gpu,
    Accelerator,
    All,
}

/// Zugriffsmodus eines Device-Buffers aus Sicht des Kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

pub trait ComputeRuntime {
    type Platform;
    type Device: Copy + std::fmt::Debug;
    type Context;
    type Queue;
    type Buffer;
    type Program;
    type Kernel;

    /// Alle Plattformen; eine leere Liste ist kein Fehler der Runtime.
    fn platforms(&self) -> Result<Vec<Self::Platform>, ClError>;

    /// Kontext mit der Property-Liste `{ CL_CONTEXT_PLATFORM, platform, 0 }`.
    fn create_context(
        &self,
        platform: &Self::Platform,
        device_type: DeviceType,
    ) -> Result<Self::Context, ClError>;

    fn context_devices(&self, context: &Self::Context) -> Result<Vec<Self::Device>, ClError>;

    fn device_name(&self, device: Self::Device) -> Result<String, ClError>;

    /// In-order Queue ohne Properties.
    fn create_queue(
        &self,
        context: &Self::Context,
        device: Self::Device,
    ) -> Result<Self::Queue, ClError>;

    /// `host = Some(..)` kopiert die Daten beim Anlegen (`CL_MEM_COPY_HOST_PTR`).
    fn create_buffer(
        &self,
        context: &Self::Context,
        access: MemAccess,
        bytes: usize,
        host: Option<&[u8]>,
    ) -> Result<Self::Buffer, ClError>;

    fn create_program(
        &self,
        context: &Self::Context,
        source: &str,
    ) -> Result<Self::Program, ClError>;

    /// Synchroner Build für genau ein Gerät.
    fn build_program(
        &self,
        program: &mut Self::Program,
        device: Self::Device,
        options: &str,
    ) -> Result<(), ClError>;

    fn build_log(&self, program: &Self::Program, device: Self::Device) -> Result<String, ClError>;

    fn create_kernel(&self, program: &Self::Program, name: &str) -> Result<Self::Kernel, ClError>;

    fn set_buffer_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        buffer: &Self::Buffer,
    ) -> Result<(), ClError>;

    /// 1-D NDRange ohne Offset und ohne lokale Work-Group-Größe. Blockiert nicht.
    fn enqueue_kernel(
        &self,
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        global_work_size: usize,
    ) -> Result<(), ClError>;

    /// Blockierendes Zurücklesen; kehrt erst nach vollständigem Transfer zurück.
    fn read_buffer(
        &self,
        queue: &Self::Queue,
        buffer: &mut Self::Buffer,
        out: &mut [u8],
    ) -> Result<(), ClError>;
}
