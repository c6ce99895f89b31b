// Simulierte Runtime: "Device-Speicher" auf dem Host, ein Handle-Ledger über
// jede Anlage und Freigabe, Fehlerinjektion pro Aufruf.
#![allow(dead_code)]

use cl_adder::{ClError, ComputeRuntime, DeviceType, MemAccess};
use std::{cell::RefCell, collections::HashMap, path::PathBuf, rc::Rc};

pub const CL_OUT_OF_RESOURCES: i32 = -5;
pub const CL_OUT_OF_HOST_MEMORY: i32 = -6;
pub const CL_MEM_OBJECT_ALLOCATION_FAILURE: i32 = -4;
pub const CL_BUILD_PROGRAM_FAILURE: i32 = -11;
pub const CL_INVALID_VALUE: i32 = -30;
pub const CL_INVALID_KERNEL_NAME: i32 = -46;
pub const CL_INVALID_ARG_INDEX: i32 = -49;
pub const CL_INVALID_KERNEL_ARGS: i32 = -52;
pub const CL_INVALID_BUFFER_SIZE: i32 = -61;

pub const BUILD_ERROR_LOG: &str = "<source>:5:1: error: expected '}'";

/// Der Device-Quelltext des Repos.
pub fn shader_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../shader.cl"))
}

/// Schreibt `source` in eine Temp-Datei pro Prozess und liefert den Pfad.
pub fn temp_source(tag: &str, source: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("cl-adder-{}-{tag}.cl", std::process::id()));
    std::fs::write(&path, source).unwrap();
    path
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    NoPlatforms,
    PlatformQuery,
    Context,
    /// Kontext entsteht, enthält aber kein Gerät
    NoDevices,
    DeviceName,
    Queue,
    /// die n-te Buffer-Anlage (ab 0) schlägt fehl
    Buffer(usize),
    CreateProgram,
    Enqueue,
    ReadBack,
}

#[derive(Debug, Default)]
pub struct Ledger {
    next_id: usize,
    buffers_requested: usize,
    pub created: Vec<(usize, &'static str)>,
    pub released: Vec<usize>,
    pub calls: Vec<&'static str>,
    pub build_options: Vec<String>,
    memory: HashMap<usize, Vec<u8>>,
}

impl Ledger {
    pub fn called(&self, name: &str) -> bool {
        self.calls.iter().any(|c| *c == name)
    }

    pub fn created_kinds(&self) -> Vec<&'static str> {
        self.created.iter().map(|(_, kind)| *kind).collect()
    }

    /// Jedes Handle genau einmal freigegeben, umgekehrt zur Anlage.
    pub fn assert_all_released_in_reverse(&self) {
        let mut expected: Vec<usize> = self.created.iter().map(|(id, _)| *id).collect();
        expected.reverse();
        assert_eq!(
            self.released, expected,
            "created {:?}, released {:?}",
            self.created, self.released
        );
    }
}

pub struct Handle {
    id: usize,
    ledger: Rc<RefCell<Ledger>>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        let mut ledger = self.ledger.borrow_mut();
        ledger.released.push(self.id);
        ledger.memory.remove(&self.id);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FakePlatform;

pub struct FakeProgram {
    handle: Handle,
    source: String,
    built: bool,
}

pub struct FakeKernel {
    handle: Handle,
    args: [Option<usize>; 3],
}

pub struct FakeRuntime {
    ledger: Rc<RefCell<Ledger>>,
    pub fault: Fault,
    pub max_alloc_bytes: usize,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::with_fault(Fault::None)
    }

    pub fn with_fault(fault: Fault) -> Self {
        Self {
            ledger: Rc::new(RefCell::new(Ledger::default())),
            fault,
            max_alloc_bytes: 64 * 1024 * 1024,
        }
    }

    pub fn ledger(&self) -> std::cell::Ref<'_, Ledger> {
        self.ledger.borrow()
    }

    fn acquire(&self, kind: &'static str) -> Handle {
        let mut ledger = self.ledger.borrow_mut();
        let id = ledger.next_id;
        ledger.next_id += 1;
        ledger.created.push((id, kind));
        Handle { id, ledger: Rc::clone(&self.ledger) }
    }

    fn call(&self, name: &'static str) {
        self.ledger.borrow_mut().calls.push(name);
    }

    fn read_f32(&self, id: usize) -> Vec<f32> {
        self.ledger.borrow().memory[&id]
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
            .collect()
    }
}

fn balanced(source: &str) -> bool {
    let mut stack = Vec::new();
    for ch in source.chars() {
        match ch {
            '{' | '(' | '[' => stack.push(ch),
            '}' if stack.pop() != Some('{') => return false,
            ')' if stack.pop() != Some('(') => return false,
            ']' if stack.pop() != Some('[') => return false,
            _ => {}
        }
    }
    stack.is_empty()
}

impl ComputeRuntime for FakeRuntime {
    type Platform = FakePlatform;
    type Device = usize;
    type Context = Handle;
    type Queue = Handle;
    type Buffer = Handle;
    type Program = FakeProgram;
    type Kernel = FakeKernel;

    fn platforms(&self) -> Result<Vec<FakePlatform>, ClError> {
        self.call("platforms");
        match self.fault {
            Fault::PlatformQuery => Err(ClError::Api(CL_INVALID_VALUE)),
            Fault::NoPlatforms => Ok(Vec::new()),
            _ => Ok(vec![FakePlatform, FakePlatform]),
        }
    }

    fn create_context(&self, _: &FakePlatform, _: DeviceType) -> Result<Handle, ClError> {
        self.call("create_context");
        if self.fault == Fault::Context {
            return Err(ClError::Api(CL_OUT_OF_HOST_MEMORY));
        }
        Ok(self.acquire("context"))
    }

    fn context_devices(&self, _: &Handle) -> Result<Vec<usize>, ClError> {
        self.call("context_devices");
        match self.fault {
            Fault::NoDevices => Ok(Vec::new()),
            _ => Ok(vec![0]),
        }
    }

    fn device_name(&self, _: usize) -> Result<String, ClError> {
        if self.fault == Fault::DeviceName {
            return Err(ClError::Api(CL_INVALID_VALUE));
        }
        Ok("Simulated Device".to_owned())
    }

    fn create_queue(&self, _: &Handle, _: usize) -> Result<Handle, ClError> {
        self.call("create_queue");
        if self.fault == Fault::Queue {
            return Err(ClError::Api(CL_OUT_OF_RESOURCES));
        }
        Ok(self.acquire("queue"))
    }

    fn create_buffer(
        &self,
        _: &Handle,
        _: MemAccess,
        bytes: usize,
        host: Option<&[u8]>,
    ) -> Result<Handle, ClError> {
        self.call("create_buffer");
        let nth = {
            let mut ledger = self.ledger.borrow_mut();
            ledger.buffers_requested += 1;
            ledger.buffers_requested - 1
        };
        if bytes == 0 {
            return Err(ClError::Api(CL_INVALID_BUFFER_SIZE));
        }
        if bytes > self.max_alloc_bytes || self.fault == Fault::Buffer(nth) {
            return Err(ClError::Api(CL_MEM_OBJECT_ALLOCATION_FAILURE));
        }
        let handle = self.acquire("buffer");
        let data = host.map(<[u8]>::to_vec).unwrap_or_else(|| vec![0; bytes]);
        self.ledger.borrow_mut().memory.insert(handle.id, data);
        Ok(handle)
    }

    fn create_program(&self, _: &Handle, source: &str) -> Result<FakeProgram, ClError> {
        self.call("create_program");
        if self.fault == Fault::CreateProgram {
            return Err(ClError::Api(CL_OUT_OF_HOST_MEMORY));
        }
        Ok(FakeProgram { handle: self.acquire("program"), source: source.to_owned(), built: false })
    }

    fn build_program(
        &self,
        program: &mut FakeProgram,
        _: usize,
        options: &str,
    ) -> Result<(), ClError> {
        self.call("build_program");
        self.ledger.borrow_mut().build_options.push(options.to_owned());
        if !balanced(&program.source) {
            return Err(ClError::Api(CL_BUILD_PROGRAM_FAILURE));
        }
        program.built = true;
        Ok(())
    }

    fn build_log(&self, program: &FakeProgram, _: usize) -> Result<String, ClError> {
        Ok(if program.built { String::new() } else { BUILD_ERROR_LOG.to_owned() })
    }

    fn create_kernel(&self, program: &FakeProgram, name: &str) -> Result<FakeKernel, ClError> {
        self.call("create_kernel");
        let declared = program.source.contains("__kernel")
            && program.source.contains(&format!("void {name}("));
        if !program.built || !declared {
            return Err(ClError::Api(CL_INVALID_KERNEL_NAME));
        }
        Ok(FakeKernel { handle: self.acquire("kernel"), args: [None; 3] })
    }

    fn set_buffer_arg(&self, kernel: &mut FakeKernel, index: u32, buffer: &Handle) -> Result<(), ClError> {
        let slot = kernel.args.get_mut(index as usize).ok_or(ClError::Api(CL_INVALID_ARG_INDEX))?;
        *slot = Some(buffer.id);
        Ok(())
    }

    fn enqueue_kernel(&self, _: &Handle, kernel: &FakeKernel, global: usize) -> Result<(), ClError> {
        self.call("enqueue_kernel");
        if self.fault == Fault::Enqueue {
            return Err(ClError::Api(CL_OUT_OF_RESOURCES));
        }
        let [Some(x), Some(y), Some(out)] = kernel.args else {
            return Err(ClError::Api(CL_INVALID_KERNEL_ARGS));
        };
        let (x, y) = (self.read_f32(x), self.read_f32(y));
        let mut dst = self.read_f32(out);
        if global > dst.len() || global > x.len() || global > y.len() {
            return Err(ClError::Api(CL_OUT_OF_RESOURCES));
        }
        for i in 0..global {
            dst[i] = x[i] + y[i];
        }
        let bytes = dst.iter().flat_map(|v| v.to_ne_bytes()).collect();
        self.ledger.borrow_mut().memory.insert(out, bytes);
        Ok(())
    }

    fn read_buffer(&self, _: &Handle, buffer: &mut Handle, out: &mut [u8]) -> Result<(), ClError> {
        self.call("read_buffer");
        if self.fault == Fault::ReadBack {
            return Err(ClError::Api(CL_OUT_OF_RESOURCES));
        }
        let ledger = self.ledger.borrow();
        let data = &ledger.memory[&buffer.id];
        if data.len() != out.len() {
            return Err(ClError::Api(CL_INVALID_VALUE));
        }
        out.copy_from_slice(data);
        Ok(())
    }
}
