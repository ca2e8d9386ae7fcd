//! Shorten a FIR to a power-of-two length with a Blackman-Harris window and save it
//! as raw float32.
//!
//! | FIR type            | window      | peak          |
//! |---------------------|-------------|---------------|
//! | minimum phase       | semi        | 0             |
//! | linear phase        | `--sym`     | auto / `-p`   |
//! | linear + min phase  | `--sym`     | auto / `-p`   |

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use firtools::error::AppError;
use firtools::fir::{output_name, trim, PhaseType, TrimConfig};
use firtools::io::{read_impulse, write_pcm_f32};

#[derive(Parser, Debug)]
#[command(name = "trim_fir", version, about = "Window a FIR down to M taps", long_about = None)]
struct Args {
    /// Input FIR (.pcm float32, .wav, .pir or text)
    input: PathBuf,

    /// Output taps, power of two
    #[arg(short = 't', long)]
    taps: usize,

    /// Peak position in the input; searched for when omitted
    #[arg(short = 'p', long)]
    peak: Option<usize>,

    /// Symmetric window centred on the peak (semi window otherwise)
    #[arg(long)]
    sym: bool,

    /// Linear phase: same as --sym with automatic peak search
    #[arg(long, conflicts_with = "mp")]
    lp: bool,

    /// Minimum phase: semi window from sample 0
    #[arg(long)]
    mp: bool,

    /// Overwrite the input instead of writing `{taps}taps_{name}`
    #[arg(short = 'o', long)]
    overwrite: bool,

    /// Sample rate attached to raw and text inputs (Hz)
    #[arg(long, default_value_t = 44100.0)]
    fs: f64,
}

impl Args {
    fn config(&self) -> TrimConfig {
        let phase_type = if self.lp {
            Some(PhaseType::LinearPhase)
        } else if self.mp {
            Some(PhaseType::MinimumPhase)
        } else {
            None
        };
        TrimConfig {
            taps: self.taps,
            peak: self.peak,
            symmetric: self.sym,
            phase_type,
            overwrite: self.overwrite,
        }
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = args.config();
    let imp = read_impulse(&args.input, Some(args.fs))?;
    let result = trim(&imp.samples, &config)?;

    let out = output_name(&args.input, config.taps, config.overwrite);
    write_pcm_f32(&out, &result.samples)?;
    info!("FIR saved to: {}", out.display());
    Ok(())
}

fn main() {
    firtools::init_tracing();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
