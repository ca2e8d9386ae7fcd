// FIR trimming engine: peak search, symmetric / semi-window trimming, output naming

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dsp::spectrum::peak_index;
use crate::dsp::window::{blackman_harris, semi_blackman_harris};
use crate::error::AppError;

/// Fraction of the output length windowed ahead of the peak in asymmetric mode.
const LEAD_FRACTION: f64 = 0.001;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseType {
    /// Symmetric window centred on the detected peak.
    LinearPhase,
    /// Semi-window starting at sample 0.
    MinimumPhase,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrimConfig {
    /// Output length, power of two.
    pub taps: usize,
    /// Reference sample; `None` searches for the largest absolute sample.
    #[serde(default)]
    pub peak: Option<usize>,
    #[serde(default)]
    pub symmetric: bool,
    /// Shortcut that overrides `peak` and `symmetric`.
    #[serde(default)]
    pub phase_type: Option<PhaseType>,
    #[serde(default)]
    pub overwrite: bool,
}

impl TrimConfig {
    /// `(symmetric, peak)` after applying the phase-type shortcut.
    pub fn resolved(&self) -> (bool, Option<usize>) {
        match self.phase_type {
            Some(PhaseType::LinearPhase) => (true, None),
            Some(PhaseType::MinimumPhase) => (false, Some(0)),
            None => (self.symmetric, self.peak),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimResult {
    pub samples: Vec<f64>,
    /// Reference sample used in the input.
    pub input_peak: usize,
    /// Largest absolute sample of the trimmed FIR.
    pub output_peak: usize,
    pub taps: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && n & (n - 1) == 0
}

/// Window `samples` down to `config.taps` samples around the reference peak.
///
/// Samples outside the input are read as zero, the result always has `taps` samples.
pub fn trim(samples: &[f64], config: &TrimConfig) -> Result<TrimResult, AppError> {
    let m = config.taps;
    if !is_power_of_two(m) {
        return Err(AppError::invalid(format!(
            "trim: taps must be a power of two, got {m}"
        )));
    }
    if samples.is_empty() {
        return Err(AppError::invalid("trim: empty impulse"));
    }

    let (symmetric, peak) = config.resolved();
    let pk = peak.unwrap_or_else(|| peak_index(samples));
    debug!("trim: {} -> {} taps, peak at {}, symmetric={}", samples.len(), m, pk, symmetric);

    let out = if symmetric {
        let mut seg = segment(samples, pk as isize - (m / 2) as isize, m);
        apply(&mut seg, &blackman_harris(m));
        seg
    } else {
        let nleft = (LEAD_FRACTION * m as f64).floor() as usize;
        if nleft <= pk {
            let nright = m - nleft;
            let mut lead: Vec<f64> = segment(samples, (pk - nleft) as isize, nleft);
            let lead_win: Vec<f64> = semi_blackman_harris(nleft).into_iter().rev().collect();
            apply(&mut lead, &lead_win);

            let mut tail = segment(samples, pk as isize, nright);
            apply(&mut tail, &semi_blackman_harris(nright));

            lead.extend(tail);
            lead
        } else {
            let mut seg = segment(samples, 0, m);
            apply(&mut seg, &semi_blackman_harris(m));
            seg
        }
    };

    let output_peak = peak_index(&out);
    info!(
        "FIR trimmed to {} taps (peak: {} peak_{}: {})",
        m, pk, m, output_peak
    );
    Ok(TrimResult {
        samples: out,
        input_peak: pk,
        output_peak,
        taps: m,
    })
}

/// Output path: `{taps}taps_{name}` next to the input (or the input itself when
/// overwriting), with a `.wav` extension replaced by `.pcm`.
pub fn output_name(input: &Path, taps: usize, overwrite: bool) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = file_name.replace(".wav", ".pcm");
    let file_name = if overwrite {
        file_name
    } else {
        format!("{taps}taps_{file_name}")
    };
    input.with_file_name(file_name)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// `len` samples starting at `start`, zero outside `samples`.
fn segment(samples: &[f64], start: isize, len: usize) -> Vec<f64> {
    (0..len as isize)
        .map(|i| {
            let idx = start + i;
            if idx >= 0 {
                samples.get(idx as usize).copied().unwrap_or(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

fn apply(seg: &mut [f64], window: &[f64]) {
    for (s, w) in seg.iter_mut().zip(window) {
        *s *= w;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
