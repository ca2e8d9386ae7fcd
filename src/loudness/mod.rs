// Loudness engine: ISO 226:2003 equal-loudness contours and compensation curves
//
// Pipeline:
//   1. Contours for 0..=90 phon on the 29 standard bands (20 Hz .. 12.5 kHz)
//   2. Subtract the reference contour, shift every row by (ref - level)
//   3. Interpolate / linearly extrapolate onto an ISO R-series grid
//   4. Optional export of freq / mag / minimum-phase tables

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dsp::interpolation::interp_linear_extrapolate;
use crate::error::AppError;
use crate::io::write_table;
use crate::iso::{get_iso_r, IsoSeries};
use crate::phase::min_phase_from_real_mag;

/// Highest contour level in phon.
pub const MAX_PHON: usize = 90;

/// FFT length used to derive the phase tables.
const PHASE_FFT_LEN: usize = 1 << 16;

/// ISO 226:2003 standard frequencies (Hz).
pub const ISO226_FREQS: [f64; 29] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 10000.0, 12500.0,
];

/// Exponent for loudness perception (αf).
const ALPHA_F: [f64; 29] = [
    0.532, 0.506, 0.480, 0.455, 0.432, 0.409, 0.387, 0.367, 0.349, 0.330, 0.315, 0.301, 0.288,
    0.276, 0.267, 0.259, 0.253, 0.250, 0.246, 0.244, 0.243, 0.243, 0.243, 0.242, 0.242, 0.245,
    0.254, 0.271, 0.301,
];

/// Magnitude of the linear transfer function normalised at 1 kHz (Lu, dB).
const L_U: [f64; 29] = [
    -31.6, -27.2, -23.0, -19.1, -15.9, -13.0, -10.3, -8.1, -6.2, -4.5, -3.1, -2.0, -1.1, -0.4,
    0.0, 0.3, 0.5, 0.0, -2.7, -4.1, -1.0, 1.7, 2.5, 1.2, -2.1, -7.1, -11.2, -10.7, -3.1,
];

/// Threshold of hearing (Tf, dB SPL).
const T_F: [f64; 29] = [
    78.5, 68.7, 59.5, 51.1, 44.0, 37.5, 31.5, 26.5, 22.1, 17.9, 14.4, 11.4, 8.6, 6.2, 4.4, 3.0,
    2.2, 2.4, 3.5, 1.7, -1.3, -4.2, -6.0, -5.4, -1.5, 6.0, 12.6, 13.9, 12.3,
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoudnessConfig {
    /// Listening reference level, 0..=90 phon.
    pub reference_phon: usize,
    pub series: IsoSeries,
    pub sample_rate: f64,
    /// First band of the output grid, must belong to `series`.
    pub f_min: f64,
    /// Output folder for the `.dat` tables.
    pub folder: PathBuf,
    /// Store rows from 90 phon down to 0 (FIRtro ordering).
    #[serde(default)]
    pub reverse_rows: bool,
}

impl Default for LoudnessConfig {
    fn default() -> Self {
        Self {
            reference_phon: 83,
            series: IsoSeries::R20,
            sample_rate: 44100.0,
            f_min: 10.0,
            folder: default_folder(),
            reverse_rows: false,
        }
    }
}

/// `~/tmp/audiotools/eq`, or a relative `tmp/audiotools/eq` without a home directory.
pub fn default_folder() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join("tmp")
        .join("audiotools")
        .join("eq")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoudnessCurves {
    pub freqs: Vec<f64>,
    /// dB, indexed `[level][band]`; `curves[reference_phon]` is flat.
    pub curves: Vec<Vec<f64>>,
    pub reference_phon: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedCurves {
    pub freq_path: PathBuf,
    pub mag_path: PathBuf,
    pub phase_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Sound pressure level (dB SPL) of the `phon` contour on [`ISO226_FREQS`].
pub fn equal_loudness_contour(phon: f64) -> [f64; 29] {
    let mut spl = [0.0; 29];
    for i in 0..29 {
        let af = 4.47e-3 * (10f64.powf(0.025 * phon) - 1.15)
            + (0.4 * 10f64.powf((T_F[i] + L_U[i]) / 10.0 - 9.0)).powf(ALPHA_F[i]);
        spl[i] = (10.0 / ALPHA_F[i]) * af.log10() - L_U[i] + 94.0;
    }
    spl
}

/// Contours for every level 0..=90 phon, indexed `[phon][band]`.
pub fn equal_loudness_contours() -> Vec<[f64; 29]> {
    (0..=MAX_PHON)
        .map(|phon| equal_loudness_contour(phon as f64))
        .collect()
}

/// Compensation curves referred to `reference_phon` on the `series` grid.
///
/// Row `level` is `contour[level] - contour[ref] - (level - ref)`: the EQ that makes
/// listening at `level` sound like listening at the reference.
pub fn compensation_curves(
    reference_phon: usize,
    series: IsoSeries,
    sample_rate: f64,
    f_min: f64,
) -> Result<LoudnessCurves, AppError> {
    if reference_phon > MAX_PHON {
        return Err(AppError::invalid(format!(
            "reference level must be 0..={MAX_PHON} phon, got {reference_phon}"
        )));
    }
    let freqs = get_iso_r(series, sample_rate, f_min)?;
    let contours = equal_loudness_contours();
    let reference = contours[reference_phon];

    let curves = contours
        .iter()
        .enumerate()
        .map(|(level, contour)| {
            let shift = reference_phon as f64 - level as f64;
            let row: Vec<f64> = contour
                .iter()
                .zip(reference.iter())
                .map(|(c, r)| c - r + shift)
                .collect();
            if level == reference_phon {
                vec![0.0; freqs.len()]
            } else {
                interp_linear_extrapolate(&ISO226_FREQS, &row, &freqs)
            }
        })
        .collect();

    info!(
        "Using {} from {} Hz to {} Hz, ref {} phon",
        series,
        freqs.first().copied().unwrap_or_default(),
        freqs.last().copied().unwrap_or_default(),
        reference_phon
    );
    Ok(LoudnessCurves {
        freqs,
        curves,
        reference_phon,
    })
}

/// Minimum-phase tables (degrees) for each curve, same indexing as the magnitudes.
pub fn phase_curves(curves: &LoudnessCurves, sample_rate: f64) -> Result<Vec<Vec<f64>>, AppError> {
    curves
        .curves
        .iter()
        .map(|row| min_phase_from_real_mag(&curves.freqs, row, sample_rate, PHASE_FFT_LEN))
        .collect()
}

/// Write `freq.dat`, `ref_{ref}_loudness_mag.dat` and `ref_{ref}_loudness_pha.dat`.
///
/// Tables hold one line per band and one column per level.
pub fn save_curves(curves: &LoudnessCurves, config: &LoudnessConfig) -> Result<SavedCurves, AppError> {
    std::fs::create_dir_all(&config.folder)?;

    let mut mags = curves.curves.clone();
    info!("retrieving phase from curves, will take a while ...");
    let mut phases = phase_curves(curves, config.sample_rate)?;
    if config.reverse_rows {
        mags.reverse();
        phases.reverse();
        info!(
            "rows reversed: flat curve stored at index {}",
            MAX_PHON - curves.reference_phon
        );
    }

    let paths = SavedCurves {
        freq_path: config.folder.join("freq.dat"),
        mag_path: config
            .folder
            .join(format!("ref_{}_loudness_mag.dat", curves.reference_phon)),
        phase_path: config
            .folder
            .join(format!("ref_{}_loudness_pha.dat", curves.reference_phon)),
    };

    let freq_rows: Vec<Vec<f64>> = curves.freqs.iter().map(|&f| vec![f]).collect();
    write_table(&paths.freq_path, &freq_rows)?;
    write_table(&paths.mag_path, &transpose(&mags))?;
    write_table(&paths.phase_path, &transpose(&phases))?;
    log_saved(&paths);
    Ok(paths)
}

fn log_saved(paths: &SavedCurves) {
    info!("freqs saved to:  {}", paths.freq_path.display());
    info!("curves saved to: {}", paths.mag_path.display());
    info!("                 {}", paths.phase_path.display());
}

/// `[level][band]` to `[band][level]`.
fn transpose(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = rows.first().map_or(0, |r| r.len());
    (0..width)
        .map(|col| rows.iter().map(|r| r[col]).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
