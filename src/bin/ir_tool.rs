//! Impulse viewer: magnitude, phase, group delay and linear-phase check of WAV, ARTA
//! PIR, raw float32 or text impulses, written out as a JSON report.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use firtools::error::AppError;
use firtools::inspect::{inspect_all, InspectConfig};
use firtools::io::{read_impulse, write_json};

#[derive(Parser, Debug)]
#[command(name = "ir_tool", version, about = "Inspect FIR impulse responses", long_about = None)]
struct Args {
    /// Impulse files (.wav, .pir, .pcm/.bin/.f32 float32, anything else as text)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Sample rate for raw and text impulses (Hz)
    #[arg(long)]
    fs: Option<f64>,

    /// Frequency range of the reported series, `min-max` in Hz
    #[arg(short = 'f', long, default_value = "20-20000", value_parser = parse_range)]
    freq_range: (f64, f64),

    /// Displayed magnitude range (dB)
    #[arg(long, default_value_t = 65.0)]
    db_range: f64,

    /// Upper display limit (dB)
    #[arg(long, default_value_t = 5.0)]
    db_top: f64,

    /// Single-row layout hint; only recorded in the report's config
    #[arg(short = '1', long)]
    one_row: bool,

    /// Linear-phase tolerance (dB)
    #[arg(long, default_value_t = -60.0, allow_hyphen_values = true)]
    lp_tol: f64,

    /// Include the unwrapped phase series in the report
    #[arg(long)]
    pha: bool,

    /// Add the log-spaced view
    #[arg(long)]
    log_spaced: bool,

    /// Bins of the log-spaced view
    #[arg(long, default_value_t = 500)]
    bins: usize,

    /// JSON report path (default: the input names joined by commas, plus `.json`)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> InspectConfig {
        InspectConfig {
            freq_range: self.freq_range,
            db_top: self.db_top,
            db_range: self.db_range,
            lp_tolerance_db: self.lp_tol,
            one_row: self.one_row,
            show_phase: self.pha,
            log_spaced: self.log_spaced,
            log_bins: self.bins,
            ..Default::default()
        }
    }

    fn report_path(&self) -> PathBuf {
        if let Some(p) = &self.output {
            return p.clone();
        }
        let names: Vec<String> = self
            .files
            .iter()
            .filter_map(|f| f.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        PathBuf::from(format!("{}.json", names.join(",")))
    }
}

fn parse_range(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once('-')
        .ok_or_else(|| format!("expected min-max, got '{s}'"))?;
    let lo: f64 = lo.trim().parse().map_err(|_| format!("bad minimum '{lo}'"))?;
    let hi: f64 = hi.trim().parse().map_err(|_| format!("bad maximum '{hi}'"))?;
    Ok((lo, hi))
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = args.config();
    config.validate()?;

    let impulses = args
        .files
        .iter()
        .map(|f| read_impulse(f, args.fs))
        .collect::<Result<Vec<_>, _>>()?;

    let report = inspect_all(&impulses, &config)?;
    print!("{}", report.summary());

    let path = args.report_path();
    write_json(&path, &report)?;
    info!("report saved to: {}", path.display());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("20-20000").unwrap(), (20.0, 20000.0));
        assert!(parse_range("20").is_err());
        assert!(parse_range("a-b").is_err());
    }

    #[test]
    fn test_args_map_to_config() {
        let args = Args::parse_from(["ir_tool", "a.wav", "b.pcm", "--fs", "48000", "-1", "--lp-tol", "-40"]);
        let cfg = args.config();
        assert!(cfg.one_row);
        assert_eq!(cfg.lp_tolerance_db, -40.0);
        assert_eq!(cfg.freq_range, (20.0, 20000.0));
        assert_eq!(args.report_path(), PathBuf::from("a.wav,b.pcm.json"));
    }
}
