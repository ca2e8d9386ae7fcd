// Impulse inspection: magnitude, phase, group delay, peak offset, linear-phase check

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dsp::generate_log_freq_grid;
use crate::dsp::spectrum::{
    freqz, group_delay_at, group_delay_fir, magnitude_db, peak_index, response_at, unwrap,
};
use crate::error::AppError;
use crate::io::Impulse;

/// Group-delay samples further than this above the first average are dropped (ms).
const GD_DEVIATION_MS: f64 = 5.0;

/// Lowest frequency of the log-spaced view (ω = 2π / Nyquist).
const LOG_VIEW_F_MIN: f64 = 2.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    /// Displayed frequency range (Hz)
    pub freq_range: (f64, f64),
    /// Upper display limit (dB), raised to fit the loudest impulse
    pub db_top: f64,
    /// Displayed magnitude span below `db_top` (dB)
    pub db_range: f64,
    /// Phase and group delay are hidden below this magnitude (dB)
    pub mag_threshold_db: f64,
    /// Symmetry tolerance for the linear-phase check (dB, <= 0)
    pub lp_tolerance_db: f64,
    /// Layout hint for report consumers, recorded in the report only
    pub one_row: bool,
    /// Include the unwrapped phase series
    pub show_phase: bool,
    /// Also produce the log-spaced view
    pub log_spaced: bool,
    pub log_bins: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            freq_range: (20.0, 20000.0),
            db_top: 5.0,
            db_range: 65.0,
            mag_threshold_db: -50.0,
            lp_tolerance_db: -60.0,
            one_row: false,
            show_phase: false,
            log_spaced: false,
            log_bins: 500,
        }
    }
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        let (f_lo, f_hi) = self.freq_range;
        if !(f_lo > 0.0 && f_hi > f_lo) {
            return Err(AppError::Config {
                message: format!("frequency range must satisfy 0 < min < max, got {f_lo}-{f_hi}"),
            });
        }
        if self.db_range <= 0.0 {
            return Err(AppError::Config {
                message: format!("dB range must be positive, got {}", self.db_range),
            });
        }
        if self.lp_tolerance_db > 0.0 {
            return Err(AppError::Config {
                message: format!(
                    "linear-phase tolerance must be <= 0 dB, got {}",
                    self.lp_tolerance_db
                ),
            });
        }
        if self.log_spaced && self.log_bins < 2 {
            return Err(AppError::Config {
                message: format!("log-spaced view needs at least 2 bins, got {}", self.log_bins),
            });
        }
        Ok(())
    }
}

/// Per-impulse series on the `len / 2` uniform bins that fall inside `freq_range`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpulseAnalysis {
    pub name: String,
    pub sample_rate: f64,
    pub taps: usize,
    pub freqs: Vec<f64>,
    pub magnitude_db: Vec<f64>,
    /// Unwrapped phase (degrees), `None` below the magnitude threshold.
    /// Only present with `show_phase`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_deg: Option<Vec<Option<f64>>>,
    /// Group delay (ms), `None` below the magnitude threshold
    pub group_delay_ms: Vec<Option<f64>>,
    /// Group delay without samples more than 5 ms above the first average
    pub group_delay_filtered_ms: Vec<Option<f64>>,
    pub group_delay_avg_ms: Option<f64>,
    pub peak_offset_ms: f64,
    pub linear_phase: bool,
    /// Smallest multiple of 5 dB above the peak magnitude, plus 5 dB
    pub suggested_db_top: f64,
}

/// Per-impulse series on log-spaced bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSpacedAnalysis {
    pub name: String,
    pub taps: usize,
    pub freqs: Vec<f64>,
    pub magnitude_db: Vec<f64>,
    /// Wrapped phase (degrees)
    pub phase_deg: Vec<f64>,
    /// Group delay relative to the peak (ms)
    pub group_delay_ms: Vec<f64>,
    pub peak_offset_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    pub config: InspectConfig,
    /// Display limits after fitting every impulse
    pub db_top: f64,
    pub db_bottom: f64,
    pub impulses: Vec<ImpulseAnalysis>,
    #[serde(default)]
    pub log_spaced: Vec<LogSpacedAnalysis>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Analyse one impulse on `len / 2` uniform bins.
///
/// Averages, peak and display limits use every bin; the returned series are cut
/// down to `config.freq_range`.
pub fn analyze(imp: &Impulse, config: &InspectConfig) -> Result<ImpulseAnalysis, AppError> {
    let taps = imp.samples.len();
    if taps < 2 {
        return Err(AppError::invalid(format!(
            "{}: at least 2 samples are needed, got {}",
            imp.name, taps
        )));
    }
    if imp.sample_rate <= 0.0 {
        return Err(AppError::invalid(format!(
            "{}: sample rate must be positive",
            imp.name
        )));
    }
    let fs = imp.sample_rate;
    let wor_n = taps / 2;
    let thr = config.mag_threshold_db;

    let fr = freqz(&imp.samples, wor_n, fs);
    let mag_db = magnitude_db(&fr.response);

    let phase_deg: Option<Vec<Option<f64>>> = config.show_phase.then(|| {
        let wrapped: Vec<f64> = fr.response.iter().map(|h| h.arg()).collect();
        unwrap(&wrapped, 2.0 * PI)
            .into_iter()
            .zip(&mag_db)
            .map(|(p, &m)| (m > thr).then(|| p * 180.0 / PI))
            .collect()
    });

    let group_delay_ms: Vec<Option<f64>> = group_delay_fir(&imp.samples, wor_n)
        .into_iter()
        .zip(&mag_db)
        .map(|(gd, &m)| (m >= thr).then(|| gd / fs * 1000.0))
        .collect();
    let (group_delay_filtered_ms, group_delay_avg_ms) = average_group_delay(&group_delay_ms);

    let peak_offset_ms = round_to(peak_index(&imp.samples) as f64 / fs * 1000.0, 1);
    let linear_phase = check_linear_phase(&imp.samples, config.lp_tolerance_db);

    let max_db = mag_db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let suggested_db_top = (max_db / 5.0).ceil() * 5.0 + 5.0;

    let (f_lo, f_hi) = config.freq_range;
    let lo = fr.freqs.partition_point(|&f| f < f_lo);
    let hi = fr.freqs.partition_point(|&f| f <= f_hi).max(lo);
    let crop = |v: &[Option<f64>]| v[lo..hi].to_vec();

    debug!(
        "{}: {} bins, {} inside {}-{} Hz, peak {:.2} dB",
        imp.name,
        wor_n,
        hi - lo,
        f_lo,
        f_hi,
        max_db
    );
    Ok(ImpulseAnalysis {
        name: imp.name.clone(),
        sample_rate: fs,
        taps,
        freqs: fr.freqs[lo..hi].to_vec(),
        magnitude_db: mag_db[lo..hi].to_vec(),
        phase_deg: phase_deg.as_deref().map(crop),
        group_delay_ms: crop(&group_delay_ms[..]),
        group_delay_filtered_ms: crop(&group_delay_filtered_ms[..]),
        group_delay_avg_ms,
        peak_offset_ms,
        linear_phase,
        suggested_db_top,
    })
}

/// Analyse one impulse on `bins` log-spaced frequencies from 2 Hz to Nyquist.
pub fn analyze_log_spaced(imp: &Impulse, bins: usize) -> Result<LogSpacedAnalysis, AppError> {
    if imp.samples.is_empty() || imp.sample_rate <= 0.0 {
        return Err(AppError::invalid(format!(
            "{}: empty impulse or bad sample rate",
            imp.name
        )));
    }
    if bins < 2 {
        return Err(AppError::invalid(format!(
            "log-spaced view needs at least 2 bins, got {bins}"
        )));
    }
    let fs = imp.sample_rate;
    let freqs = generate_log_freq_grid(bins, LOG_VIEW_F_MIN, fs / 2.0);

    let h = response_at(&imp.samples, &[1.0], &freqs, fs);
    let peak_offset_s = round_to(peak_index(&imp.samples) as f64 / fs, 3);
    let group_delay_ms = group_delay_at(&imp.samples, &freqs, fs)
        .into_iter()
        .map(|gd| gd / fs * 1000.0 - peak_offset_s * 1000.0)
        .collect();

    Ok(LogSpacedAnalysis {
        name: imp.name.clone(),
        taps: imp.samples.len(),
        magnitude_db: magnitude_db(&h),
        phase_deg: h.iter().map(|c| c.arg().to_degrees()).collect(),
        group_delay_ms,
        freqs,
        peak_offset_s,
    })
}

/// Analyse a set of impulses and fit the display range to all of them.
pub fn inspect_all(impulses: &[Impulse], config: &InspectConfig) -> Result<InspectionReport, AppError> {
    config.validate()?;
    let analyses = impulses
        .iter()
        .map(|imp| analyze(imp, config))
        .collect::<Result<Vec<_>, _>>()?;

    let log_spaced = if config.log_spaced {
        impulses
            .iter()
            .map(|imp| analyze_log_spaced(imp, config.log_bins))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };

    let db_top = analyses
        .iter()
        .map(|a| a.suggested_db_top)
        .fold(config.db_top, f64::max);

    info!("Inspected {} impulse(s)", analyses.len());
    Ok(InspectionReport {
        config: config.clone(),
        db_top,
        db_bottom: db_top - config.db_range,
        impulses: analyses,
        log_spaced,
    })
}

/// Whether `samples` is symmetric about its (signed) maximum.
///
/// The maximum must sit within one sample of the centre. Samples before it are
/// compared with the reversed samples after it (the first sample is skipped for
/// even lengths) using an absolute tolerance of `10^(tol_db / 20)`.
pub fn check_linear_phase(samples: &[f64], tol_db: f64) -> bool {
    let len = samples.len();
    if len == 0 {
        return false;
    }
    let center = samples
        .iter()
        .enumerate()
        .fold((0usize, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0;
    if center.abs_diff(len / 2) > 1 {
        return false;
    }

    let begin = if len % 2 == 0 { 1 } else { 0 };
    let before = samples.get(begin..center).unwrap_or(&[]);
    let after = &samples[center + 1..];
    if before.len() != after.len() {
        warn!(
            "linear phase check: {} samples before the peak, {} after",
            before.len(),
            after.len()
        );
        return false;
    }

    let atol = 10f64.powf(tol_db / 20.0);
    before
        .iter()
        .zip(after.iter().rev())
        .all(|(a, b)| (a - b).abs() <= atol + 1e-5 * b.abs())
}

impl InspectionReport {
    /// Text summary: one block per impulse plus the group-delay averages.
    pub fn summary(&self) -> String {
        let tol = self.config.lp_tolerance_db;
        let mut out = String::new();
        for a in &self.impulses {
            let kind = if a.linear_phase { "linear phase" } else { "not linear phase" };
            out.push_str(&format!(
                "{}: {} taps - pk offset {} ms\n  {} (tolerance {} dB)\n",
                a.name, a.taps, a.peak_offset_ms, kind, tol
            ));
        }
        let avgs: Vec<String> = self
            .impulses
            .iter()
            .map(|a| match a.group_delay_avg_ms {
                Some(v) => format!("{v}"),
                None => "nan".to_string(),
            })
            .collect();
        out.push_str(&format!("GD avg:    {} (ms)\n", avgs.join("    ")));
        for l in &self.log_spaced {
            out.push_str(&format!(
                "{}: {} taps - pk offset {} s (log-spaced, {} bins)\n",
                l.name,
                l.taps,
                l.peak_offset_s,
                l.freqs.len()
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Two-pass group-delay average.
///
/// The first average is rounded to 0.1 ms and used to drop samples more than 5 ms
/// above it. The reported average is taken again over the unfiltered series, so it
/// equals the first pass; the filtered series is returned alongside.
fn average_group_delay(gd_ms: &[Option<f64>]) -> (Vec<Option<f64>>, Option<f64>) {
    let first = nan_mean(gd_ms).map(|m| round_to(m, 1));
    let filtered = match first {
        Some(avg) => gd_ms
            .iter()
            .map(|v| v.filter(|&x| x < avg + GD_DEVIATION_MS))
            .collect(),
        None => vec![None; gd_ms.len()],
    };
    let second = nan_mean(gd_ms).map(|m| round_to(m, 1));
    (filtered, second)
}

fn nan_mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Round half away from zero to `decimals` places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
