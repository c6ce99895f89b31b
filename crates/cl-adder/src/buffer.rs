use bytemuck::{cast_slice, cast_slice_mut};
use std::marker::PhantomData;

use crate::error::ClError;
use crate::runtime::{ComputeRuntime, MemAccess};

// ─── Zugriffs‑Marker ─────────────────────────────────────────────────
mod sealed {
    pub trait Sealed {}
}

pub trait Access: sealed::Sealed {
    const MODE: MemAccess;
}

/// Kernel liest nur.
pub struct ReadOnly;
impl sealed::Sealed for ReadOnly {}
impl Access for ReadOnly {
    const MODE: MemAccess = MemAccess::ReadOnly;
}

/// Kernel schreibt nur; einziger Zustand, der zurückgelesen werden darf.
pub struct WriteOnly;
impl sealed::Sealed for WriteOnly {}
impl Access for WriteOnly {
    const MODE: MemAccess = MemAccess::WriteOnly;
}

// ─── Device‑Buffer ───────────────────────────────────────────────────

/// `f32`-Buffer auf dem Gerät; Freigabe über den Drop des Runtime-Handles.
pub struct DeviceBuffer<R: ComputeRuntime, A: Access> {
    raw: R::Buffer,
    len: usize,
    _access: PhantomData<A>,
}

impl<R: ComputeRuntime> DeviceBuffer<R, ReadOnly> {
    /// legt den Buffer an und kopiert `host` gleich mit (copy-on-create)
    pub fn from_host(rt: &R, ctx: &R::Context, host: &[f32]) -> Result<Self, ClError> {
        let bytes: &[u8] = cast_slice(host);
        let raw = rt.create_buffer(ctx, ReadOnly::MODE, bytes.len(), Some(bytes))?;
        Ok(Self { raw, len: host.len(), _access: PhantomData })
    }
}

impl<R: ComputeRuntime> DeviceBuffer<R, WriteOnly> {
    /// uninitialisierter Ergebnis-Buffer
    pub fn uninit(rt: &R, ctx: &R::Context, len: usize) -> Result<Self, ClError> {
        let raw = rt.create_buffer(ctx, WriteOnly::MODE, byte_size(len), None)?;
        Ok(Self { raw, len, _access: PhantomData })
    }

    /// blockierendes Zurücklesen in `out` (Länge muss passen)
    pub fn read_into(&mut self, rt: &R, queue: &R::Queue, out: &mut [f32]) -> Result<(), ClError> {
        debug_assert_eq!(out.len(), self.len, "Host output length mismatch");
        rt.read_buffer(queue, &mut self.raw, cast_slice_mut(out))
    }
}

impl<R: ComputeRuntime, A: Access> DeviceBuffer<R, A> {
    /// Zugriff auf das Runtime-Handle, z.B. für Kernel-Argumente
    pub fn raw(&self) -> &R::Buffer {
        &self.raw
    }

    /// Anzahl `f32`-Elemente
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Größe in Bytes
    pub fn size_bytes(&self) -> usize {
        byte_size(self.len)
    }
}

/// `elements * size_of::<f32>()`
pub fn byte_size(elements: usize) -> usize {
    elements * std::mem::size_of::<f32>()
}
