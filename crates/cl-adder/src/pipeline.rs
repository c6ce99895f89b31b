//! Der lineare Ablauf: Plattform → Kontext/Queue → Buffer → Programm → Ausführung → Prüfung.
//!
//! Jede Stufe ist einzeln aufrufbar; [`run`] setzt sie in der festen
//! Reihenfolge zusammen und misst die Zeit pro Stufe. Bei einem Fehler werden
//! alle bis dahin angelegten Handles über `Drop` in umgekehrter Reihenfolge
//! freigegeben.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::buffer::{byte_size, Access, DeviceBuffer, ReadOnly, WriteOnly};
use crate::error::{ClError, PipelineError, CL_DEVICE_NOT_FOUND, CL_PLATFORM_NOT_FOUND_KHR};
use crate::host::HostInputs;
use crate::metrics::StageTimings;
use crate::runtime::{ComputeRuntime, DeviceType};
use crate::verify::{verify_sum, Verdict};

pub const DEFAULT_KERNEL_PATH: &str = "shader.cl";
pub const ENTRY_POINT: &str = "adder";

/// Messabschnitte der Zeitausgabe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Initial,
    MemoryCopy,
    LoadProgram,
    Execute,
    Verify,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Initial => "opencl initial",
            Stage::MemoryCopy => "memory copy",
            Stage::LoadProgram => "load program",
            Stage::Execute => "execute and get result",
            Stage::Verify => "cpu verify",
        }
    }
}

/// Fortschritt eines Laufs, nur fürs Logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    PlatformFound,
    ContextReady,
    QueueReady,
    BuffersAllocated,
    ProgramBuilt,
    KernelBound,
    Dispatched,
    ResultRead,
    Verified,
    Aborted,
}

fn enter(state: State) {
    tracing::debug!(?state, "pipeline state");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub kernel_path: PathBuf,
    pub entry_point: String,
    pub build_options: String,
    pub device_type: DeviceType,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kernel_path: PathBuf::from(DEFAULT_KERNEL_PATH),
            entry_point: ENTRY_POINT.to_owned(),
            build_options: String::new(),
            device_type: DeviceType::Default,
        }
    }
}

// ─── 1. Plattform ────────────────────────────────────────────────────

/// Erste Plattform; keine Plattform ist ein Fehler, kein Fallback.
pub fn discover_platform<R: ComputeRuntime>(rt: &R) -> Result<R::Platform, PipelineError> {
    let mut platforms = rt.platforms().map_err(PipelineError::NoPlatform)?;
    tracing::debug!(count = platforms.len(), "OpenCL platforms");
    if platforms.is_empty() {
        return Err(PipelineError::NoPlatform(ClError::Api(CL_PLATFORM_NOT_FOUND_KHR)));
    }
    enter(State::PlatformFound);
    Ok(platforms.swap_remove(0))
}

// ─── 2. Kontext & Queue ──────────────────────────────────────────────

/// Kontext, Queue und das aufgelöste Gerät.
pub struct Session<R: ComputeRuntime> {
    // Felder droppen in Deklarationsreihenfolge: erst Queue, dann Kontext
    queue: R::Queue,
    context: R::Context,
    device: R::Device,
    device_name: String,
}

impl<R: ComputeRuntime> Session<R> {
    pub fn open(
        rt: &R,
        platform: &R::Platform,
        device_type: DeviceType,
    ) -> Result<Self, PipelineError> {
        let context = rt
            .create_context(platform, device_type)
            .map_err(PipelineError::ContextCreation)?;
        let device = rt
            .context_devices(&context)
            .map_err(PipelineError::ContextCreation)?
            .first()
            .copied()
            .ok_or(PipelineError::ContextCreation(ClError::Api(CL_DEVICE_NOT_FOUND)))?;

        let device_name = match rt.device_name(device) {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!(?device, %err, "device name query failed");
                String::from("<unknown>")
            }
        };
        enter(State::ContextReady);

        let queue = rt
            .create_queue(&context, device)
            .map_err(PipelineError::QueueCreation)?;
        enter(State::QueueReady);

        Ok(Self { queue, context, device, device_name })
    }

    pub fn context(&self) -> &R::Context {
        &self.context
    }

    pub fn queue(&self) -> &R::Queue {
        &self.queue
    }

    pub fn device(&self) -> R::Device {
        self.device
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

// ─── 3. Buffer ───────────────────────────────────────────────────────

/// Die drei Device-Buffer eines Laufs.
pub struct StagedBuffers<R: ComputeRuntime> {
    // umgekehrt zur Anlage deklariert, damit `out` zuerst freigegeben wird
    out: DeviceBuffer<R, WriteOnly>,
    b: DeviceBuffer<R, ReadOnly>,
    a: DeviceBuffer<R, ReadOnly>,
}

fn alloc_error(name: &'static str, bytes: usize) -> impl FnOnce(ClError) -> PipelineError {
    move |source| PipelineError::BufferAllocation { name, bytes, source }
}

impl<R: ComputeRuntime> StagedBuffers<R> {
    /// `a` und `b` werden beim Anlegen kopiert, `out` bleibt uninitialisiert.
    pub fn stage(rt: &R, session: &Session<R>, inputs: &HostInputs) -> Result<Self, PipelineError> {
        let (left, right) = (inputs.a.len(), inputs.b.len());
        if left != right {
            return Err(PipelineError::MismatchedInputs { left, right });
        }
        let bytes = byte_size(left);
        let ctx = session.context();

        let a = DeviceBuffer::<R, ReadOnly>::from_host(rt, ctx, &inputs.a)
            .map_err(alloc_error("a", bytes))?;
        let b = DeviceBuffer::<R, ReadOnly>::from_host(rt, ctx, &inputs.b)
            .map_err(alloc_error("b", bytes))?;
        let out = DeviceBuffer::<R, WriteOnly>::uninit(rt, ctx, left)
            .map_err(alloc_error("result", bytes))?;
        tracing::debug!(elements = left, bytes, "device buffers allocated");
        enter(State::BuffersAllocated);

        Ok(Self { out, b, a })
    }

    pub fn a(&self) -> &DeviceBuffer<R, ReadOnly> {
        &self.a
    }

    pub fn b(&self) -> &DeviceBuffer<R, ReadOnly> {
        &self.b
    }

    pub fn out(&self) -> &DeviceBuffer<R, WriteOnly> {
        &self.out
    }

    /// Elemente pro Buffer
    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }
}

// ─── 4. Programm & Dispatch ──────────────────────────────────────────

pub fn load_source(path: &Path) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|source| PipelineError::ProgramLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// Gebautes Programm plus aufgelöster Einsprungpunkt.
pub struct AdderKernel<R: ComputeRuntime> {
    // Kernel vor Programm freigeben
    kernel: R::Kernel,
    program: R::Program,
    name: String,
}

impl<R: ComputeRuntime> AdderKernel<R> {
    /// Legt das Programm an, baut es synchron und löst `entry` auf.
    /// Schlägt der Build fehl, landet das Compiler-Log im Fehler.
    pub fn build(
        rt: &R,
        session: &Session<R>,
        source: &str,
        entry: &str,
        options: &str,
    ) -> Result<Self, PipelineError> {
        let mut program = rt
            .create_program(session.context(), source)
            .map_err(PipelineError::ProgramCreation)?;

        if let Err(source) = rt.build_program(&mut program, session.device(), options) {
            let log = rt.build_log(&program, session.device()).unwrap_or_else(|err| {
                tracing::warn!(%err, "build log unavailable");
                String::new()
            });
            return Err(PipelineError::ProgramBuild { log, source });
        }
        enter(State::ProgramBuilt);

        let kernel = rt
            .create_kernel(&program, entry)
            .map_err(|source| PipelineError::KernelResolution { name: entry.to_owned(), source })?;

        Ok(Self { kernel, program, name: entry.to_owned() })
    }

    /// Bindet `buffer` an Argumentposition `index`; die Position muss zur
    /// Signatur im Device-Code passen.
    pub fn bind<A: Access>(
        &mut self,
        rt: &R,
        index: u32,
        buffer: &DeviceBuffer<R, A>,
    ) -> Result<(), PipelineError> {
        rt.set_buffer_arg(&mut self.kernel, index, buffer.raw())
            .map_err(PipelineError::Execution)
    }

    /// Standardbelegung: 0 = a, 1 = b, 2 = Ergebnis.
    pub fn bind_staged(&mut self, rt: &R, staged: &StagedBuffers<R>) -> Result<(), PipelineError> {
        self.bind(rt, 0, staged.a())?;
        self.bind(rt, 1, staged.b())?;
        self.bind(rt, 2, staged.out())?;
        enter(State::KernelBound);
        Ok(())
    }

    /// Reiht den Kernel über `global_work_size` Work-Items ein, ohne zu warten.
    pub fn dispatch(
        &self,
        rt: &R,
        session: &Session<R>,
        global_work_size: usize,
    ) -> Result<(), PipelineError> {
        rt.enqueue_kernel(session.queue(), &self.kernel, global_work_size)
            .map_err(PipelineError::Execution)?;
        enter(State::Dispatched);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &R::Program {
        &self.program
    }
}

// ─── 5. Zurücklesen & Prüfen ─────────────────────────────────────────

/// Blockierendes Zurücklesen des Ergebnis-Buffers; Synchronisationspunkt des Laufs.
pub fn read_back<R: ComputeRuntime>(
    rt: &R,
    session: &Session<R>,
    staged: &mut StagedBuffers<R>,
) -> Result<Vec<f32>, PipelineError> {
    let mut result = vec![0.0_f32; staged.len()];
    staged
        .out
        .read_into(rt, session.queue(), &mut result)
        .map_err(PipelineError::Execution)?;
    enter(State::ResultRead);
    Ok(result)
}

/// Ergebnis eines vollständigen Laufs.
#[derive(Debug)]
pub struct Report {
    pub device_name: String,
    pub timings: StageTimings,
    pub verdict: Verdict,
    pub result: Vec<f32>,
}

/// Was ein Lauf bis zum Abbruch geschafft hat: Gerät und bisherige Messungen.
#[derive(Debug, Default, Clone)]
pub struct Progress {
    pub device_name: Option<String>,
    pub timings: StageTimings,
}

impl Progress {
    pub fn summary_lines(&self) -> Vec<String> {
        let device = self.device_name.iter().map(|name| format!("Device: {name}"));
        device.chain(self.timings.summary_lines()).collect()
    }

    pub fn summary(&self) {
        for line in self.summary_lines() {
            println!("{line}");
        }
    }
}

/// Führt alle fünf Stufen aus. Jeder Fehler beendet den Lauf.
pub fn run<R: ComputeRuntime>(
    rt: &R,
    config: &PipelineConfig,
    inputs: &HostInputs,
) -> Result<Report, PipelineError> {
    run_recorded(rt, config, inputs, &mut Progress::default())
}

/// Wie [`run`], hält aber Gerätename und Stufenzeiten in `progress` fest,
/// damit sie auch nach einem Abbruch noch ausgegeben werden können.
pub fn run_recorded<R: ComputeRuntime>(
    rt: &R,
    config: &PipelineConfig,
    inputs: &HostInputs,
    progress: &mut Progress,
) -> Result<Report, PipelineError> {
    enter(State::Uninitialized);
    run_stages(rt, config, inputs, progress).inspect_err(|err| {
        enter(State::Aborted);
        tracing::debug!(stage = err.stage().label(), "run aborted, resources released");
    })
}

fn run_stages<R: ComputeRuntime>(
    rt: &R,
    config: &PipelineConfig,
    inputs: &HostInputs,
    progress: &mut Progress,
) -> Result<Report, PipelineError> {
    let start = Instant::now();
    let platform = discover_platform(rt)?;
    let session = Session::open(rt, &platform, config.device_type)?;
    progress.device_name = Some(session.device_name().to_owned());
    progress.timings.record(Stage::Initial, start);
    tracing::info!(device = session.device_name(), "device selected");

    let start = Instant::now();
    let mut staged = StagedBuffers::stage(rt, &session, inputs)?;
    progress.timings.record(Stage::MemoryCopy, start);

    let start = Instant::now();
    let source = load_source(&config.kernel_path)?;
    let mut adder = AdderKernel::build(
        rt,
        &session,
        &source,
        &config.entry_point,
        &config.build_options,
    )?;
    adder.bind_staged(rt, &staged)?;
    progress.timings.record(Stage::LoadProgram, start);

    let start = Instant::now();
    adder.dispatch(rt, &session, staged.len())?;
    let result = read_back(rt, &session, &mut staged)?;
    progress.timings.record(Stage::Execute, start);

    let start = Instant::now();
    let verdict = verify_sum(&inputs.a, &inputs.b, &result);
    progress.timings.record(Stage::Verify, start);
    enter(State::Verified);

    Ok(Report {
        device_name: session.device_name().to_owned(),
        timings: progress.timings.clone(),
        verdict,
        result,
    })
}
