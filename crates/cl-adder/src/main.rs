use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cl_adder::{
    run_recorded, DeviceType, HostInputs, OpenClRuntime, PipelineConfig, Progress,
    DEFAULT_ELEMENTS, DEFAULT_KERNEL_PATH, ENTRY_POINT,
};
use tracing_subscriber::EnvFilter;

/// Addiert zwei Zufallsvektoren auf dem OpenCL-Standardgerät und prüft das Ergebnis.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Device-Quelltext mit dem Kernel
    #[arg(long, default_value = DEFAULT_KERNEL_PATH)]
    kernel: PathBuf,

    /// Name des Einsprungpunkts
    #[arg(long, default_value = ENTRY_POINT)]
    entry: String,

    /// Anzahl f32-Elemente pro Vektor
    #[arg(long, default_value_t = DEFAULT_ELEMENTS)]
    elements: usize,

    /// Seed für reproduzierbare Eingaben
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = DeviceType::Default)]
    device_type: DeviceType,

    /// Optionen für den Device-Compiler
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    build_options: String,

    /// Debug-Logging auf stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = PipelineConfig {
        kernel_path: args.kernel,
        entry_point: args.entry,
        build_options: args.build_options,
        device_type: args.device_type,
    };
    let inputs = HostInputs::random(args.elements, args.seed);

    let mut progress = Progress::default();
    match run_recorded(&OpenClRuntime::new(), &config, &inputs, &mut progress) {
        Ok(report) => {
            println!("Device: {}", report.device_name);
            report.timings.summary();
            println!("{}", report.verdict);
            if report.verdict.is_correct() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            // was bis zum Abbruch gelaufen ist, steht trotzdem auf stdout
            progress.summary();
            eprintln!("error in stage `{}`: {err}", err.stage().label());
            if let Some(log) = err.build_log().filter(|log| !log.trim().is_empty()) {
                eprintln!("--- build log ---\n{}", log.trim_end());
            }
            ExitCode::from(err.exit_code())
        }
    }
}
