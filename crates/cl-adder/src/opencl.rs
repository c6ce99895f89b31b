//! `ComputeRuntime` über `opencl3`.
//!
//! Die opencl3-Typen geben ihre Handles im `Drop` frei
//! (`clReleaseContext`, `clReleaseCommandQueue`, `clReleaseMemObject`, ...).

use opencl3::{
    command_queue::CommandQueue,
    context::{context::CL_CONTEXT_PLATFORM, Context},
    device::{
        Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU,
        CL_DEVICE_TYPE_DEFAULT, CL_DEVICE_TYPE_GPU,
    },
    kernel::Kernel,
    memory::{Buffer, CL_MEM_COPY_HOST_PTR, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY},
    platform::{get_platforms, Platform},
    program::Program,
    types::{
        cl_context_properties, cl_device_id, cl_device_type, cl_mem_flags, cl_platform_id,
        CL_BLOCKING,
    },
};
use std::{ffi::c_void, ptr};

use crate::error::ClError;
use crate::runtime::{ComputeRuntime, DeviceType, MemAccess};

/// zustandslos; alle Handles gehören der Pipeline
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClRuntime;

impl OpenClRuntime {
    pub fn new() -> Self {
        OpenClRuntime
    }
}

fn device_type_bits(device_type: DeviceType) -> cl_device_type {
    match device_type {
        DeviceType::Default => CL_DEVICE_TYPE_DEFAULT,
        DeviceType::Cpu => CL_DEVICE_TYPE_CPU,
        DeviceType::Gpu => CL_DEVICE_TYPE_GPU,
        DeviceType::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
        DeviceType::All => CL_DEVICE_TYPE_ALL,
    }
}

/// Property-Liste: (Schlüssel, Wert)-Paare, mit 0 abgeschlossen
fn context_properties(platform: cl_platform_id) -> [cl_context_properties; 3] {
    [CL_CONTEXT_PLATFORM as cl_context_properties, platform as cl_context_properties, 0]
}

fn mem_flags(access: MemAccess) -> cl_mem_flags {
    match access {
        MemAccess::ReadOnly => CL_MEM_READ_ONLY,
        MemAccess::WriteOnly => CL_MEM_WRITE_ONLY,
        MemAccess::ReadWrite => CL_MEM_READ_WRITE,
    }
}

impl ComputeRuntime for OpenClRuntime {
    type Platform = Platform;
    type Device = cl_device_id;
    type Context = Context;
    type Queue = CommandQueue;
    type Buffer = Buffer<u8>;
    type Program = Program;
    type Kernel = Kernel;

    fn platforms(&self) -> Result<Vec<Platform>, ClError> {
        Ok(get_platforms()?)
    }

    fn create_context(
        &self,
        platform: &Platform,
        device_type: DeviceType,
    ) -> Result<Context, ClError> {
        // das Gerät wählt die Runtime anhand der Geräteklasse
        let properties = context_properties(platform.id());
        Ok(Context::from_device_type(
            device_type_bits(device_type),
            &properties,
            None,
            ptr::null_mut(),
        )?)
    }

    fn context_devices(&self, context: &Context) -> Result<Vec<cl_device_id>, ClError> {
        Ok(context.devices().to_vec())
    }

    fn device_name(&self, device: cl_device_id) -> Result<String, ClError> {
        let name = Device::new(device).name()?;
        Ok(name.trim_end_matches('\0').trim().to_string())
    }

    fn create_queue(&self, context: &Context, device: cl_device_id) -> Result<CommandQueue, ClError> {
        Ok(CommandQueue::create(context, device, 0)?)
    }

    fn create_buffer(
        &self,
        context: &Context,
        access: MemAccess,
        bytes: usize,
        host: Option<&[u8]>,
    ) -> Result<Buffer<u8>, ClError> {
        let (flags, host_ptr) = match host {
            Some(data) => {
                debug_assert_eq!(data.len(), bytes, "Host data length mismatch");
                // COPY_HOST_PTR liest nur, der Cast auf *mut ist daher unkritisch
                (mem_flags(access) | CL_MEM_COPY_HOST_PTR, data.as_ptr() as *mut c_void)
            }
            None => (mem_flags(access), ptr::null_mut()),
        };
        Ok(Buffer::<u8>::create(context, flags, bytes, host_ptr)?)
    }

    fn create_program(&self, context: &Context, source: &str) -> Result<Program, ClError> {
        Ok(Program::create_from_source(context, source)?)
    }

    fn build_program(
        &self,
        program: &mut Program,
        device: cl_device_id,
        options: &str,
    ) -> Result<(), ClError> {
        Ok(program.build(&[device], options)?)
    }

    fn build_log(&self, program: &Program, device: cl_device_id) -> Result<String, ClError> {
        Ok(program.get_build_log(device)?)
    }

    fn create_kernel(&self, program: &Program, name: &str) -> Result<Kernel, ClError> {
        Ok(Kernel::create(program, name)?)
    }

    fn set_buffer_arg(
        &self,
        kernel: &mut Kernel,
        index: u32,
        buffer: &Buffer<u8>,
    ) -> Result<(), ClError> {
        kernel.set_arg(index, buffer)?; // Buffer implementiert KernelArg
        Ok(())
    }

    fn enqueue_kernel(
        &self,
        queue: &CommandQueue,
        kernel: &Kernel,
        global_work_size: usize,
    ) -> Result<(), ClError> {
        let global = [global_work_size, 1, 1];
        // Event wird nicht gebraucht, die In-Order-Queue ordnet das Zurücklesen dahinter
        let _evt = queue.enqueue_nd_range_kernel(
            kernel.get(),
            1,
            ptr::null(),
            global.as_ptr(),
            ptr::null(),
            &[],
        )?;
        Ok(())
    }

    fn read_buffer(
        &self,
        queue: &CommandQueue,
        buffer: &mut Buffer<u8>,
        out: &mut [u8],
    ) -> Result<(), ClError> {
        let _evt = queue.enqueue_read_buffer(buffer, CL_BLOCKING, 0, out, &[])?;
        Ok(())
    }
}
