use std::any::Any;
use std::path::PathBuf;
use std::process::ExitCode;

use arith_core::ProverError;
use arith_prover::commands;
use arith_prover::config::{ProverConfig, DEFAULT_KEY_BUFFER};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_chrome::ChromeLayerBuilder;
use tracing_subscriber::{self, prelude::*, EnvFilter};

/// Groth16 key generation, proving and verification for xjsnark arith circuits.
#[derive(Parser, Debug)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Seed for setup and proving randomness (reproducible runs only)
    #[clap(long, global = true)]
    seed: Option<u64>,

    /// Read buffer size for proving keys, in bytes
    #[clap(long, global = true, default_value_t = DEFAULT_KEY_BUFFER)]
    key_buffer: usize,

    /// Additional trace output
    #[clap(long, global = true, value_enum)]
    format: Option<Format>,
}

#[derive(Debug, Clone, ValueEnum, PartialEq)]
enum Format {
    Chrome,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse an arith file and write the compiled circuit
    Compile { arith: PathBuf, circuit_out: PathBuf },
    /// Generate a proving and a verifying key for a compiled circuit
    Keygen {
        circuit_in: PathBuf,
        pk_out: PathBuf,
        vk_out: PathBuf,
    },
    /// Prove a compiled circuit against a full assignment
    Prove {
        circuit_in: PathBuf,
        pk_in: PathBuf,
        assignment_in: PathBuf,
        proof_out: PathBuf,
    },
    /// Verify a proof against a public assignment
    Verify {
        proof_in: PathBuf,
        vk_in: PathBuf,
        public_in: PathBuf,
    },
}

fn init_tracing(format: Option<&Format>) -> Vec<Box<dyn Any>> {
    let mut layers = Vec::new();
    let mut guards: Vec<Box<dyn Any>> = vec![];

    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_filter(log_filter)
        .boxed();
    layers.push(log_layer);

    if format == Some(&Format::Chrome) {
        let (chrome_layer, guard) = ChromeLayerBuilder::new().include_args(true).build();
        layers.push(chrome_layer.boxed());
        guards.push(Box::new(guard));
    }

    tracing_subscriber::registry().with(layers).init();
    if format == Some(&Format::Chrome) {
        tracing::info!("Running tracing-chrome. Files will be saved as trace-<some timestamp>.json and can be viewed in https://ui.perfetto.dev/");
    }
    guards
}

fn run(cli: Cli) -> eyre::Result<()> {
    let config = ProverConfig {
        seed: cli.global.seed,
        key_buffer_capacity: cli.global.key_buffer,
    };
    match cli.command {
        Commands::Compile { arith, circuit_out } => commands::compile(&arith, &circuit_out),
        Commands::Keygen {
            circuit_in,
            pk_out,
            vk_out,
        } => commands::keygen(&config, &circuit_in, &pk_out, &vk_out),
        Commands::Prove {
            circuit_in,
            pk_in,
            assignment_in,
            proof_out,
        } => commands::prove(&config, &circuit_in, &pk_in, &assignment_in, &proof_out),
        Commands::Verify {
            proof_in,
            vk_in,
            public_in,
        } => commands::verify(&proof_in, &vk_in, &public_in),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guards = init_tracing(cli.global.format.as_ref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::error!("{report:#}");
            let rejected = report
                .downcast_ref::<ProverError>()
                .is_some_and(ProverError::is_rejection);
            if rejected {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
