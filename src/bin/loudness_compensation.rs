//! Loudness-compensation curves for listening levels referred to a reference phon
//! level, following the ISO 226:2003 equal-loudness contours.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use firtools::error::AppError;
use firtools::iso::IsoSeries;
use firtools::loudness::{compensation_curves, default_folder, save_curves, LoudnessConfig, MAX_PHON};

#[derive(Parser, Debug)]
#[command(
    name = "loudness_compensation",
    version,
    about = "Build ISO 226 loudness-compensation EQ curves",
    long_about = None
)]
struct Args {
    /// Listening reference level, 0..=90 phon (~dB SPL)
    #[arg(long = "ref", default_value_t = 83)]
    reference: usize,

    /// ISO R series of the output bands: R10, R20, R40, R80
    #[arg(short = 'R', long, default_value = "R20")]
    series: IsoSeries,

    /// Sample rate: 44100, 48000 or 96000 Hz
    #[arg(long, default_value_t = 44100, value_parser = parse_fs)]
    fs: u32,

    /// Lowest output band (Hz), must belong to the series
    #[arg(long, default_value_t = 10.0)]
    fmin: f64,

    /// Save freq / mag / phase tables
    #[arg(short, long)]
    save: bool,

    /// Store rows from 90 phon down to 0, as FIRtro expects
    #[arg(long)]
    firtro_order: bool,

    /// Output folder (default: ~/tmp/audiotools/eq)
    #[arg(long)]
    folder: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> LoudnessConfig {
        LoudnessConfig {
            reference_phon: self.reference,
            series: self.series,
            sample_rate: self.fs as f64,
            f_min: self.fmin,
            folder: self.folder.clone().unwrap_or_else(default_folder),
            reverse_rows: self.firtro_order,
        }
    }
}

fn parse_fs(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(fs @ (44100 | 48000 | 96000)) => Ok(fs),
        _ => Err(format!("sample rate must be 44100, 48000 or 96000, got '{s}'")),
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = args.config();
    let curves = compensation_curves(
        config.reference_phon,
        config.series,
        config.sample_rate,
        config.f_min,
    )?;

    let flat = if config.reverse_rows {
        MAX_PHON - config.reference_phon
    } else {
        config.reference_phon
    };
    info!("Ref: {} phon ~ dBSPL listening reference level", config.reference_phon);
    info!("flat curve index: {}", flat);

    if args.save {
        save_curves(&curves, &config)?;
    }
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
    fn test_defaults() {
        let cfg = Args::parse_from(["loudness_compensation"]).config();
        assert_eq!(cfg.reference_phon, 83);
        assert_eq!(cfg.series, IsoSeries::R20);
        assert_eq!(cfg.sample_rate, 44100.0);
        assert!(!cfg.reverse_rows);
    }

    #[test]
    fn test_options() {
        let args = Args::parse_from([
            "loudness_compensation",
            "--ref",
            "75",
            "-R",
            "r10",
            "--fs",
            "96000",
            "--firtro-order",
            "--folder",
            "/tmp/eq",
        ]);
        let cfg = args.config();
        assert_eq!(cfg.reference_phon, 75);
        assert_eq!(cfg.series, IsoSeries::R10);
        assert_eq!(cfg.sample_rate, 96000.0);
        assert!(cfg.reverse_rows);
        assert_eq!(cfg.folder, PathBuf::from("/tmp/eq"));
        assert!(Args::try_parse_from(["loudness_compensation", "--fs", "22050"]).is_err());
    }
}
