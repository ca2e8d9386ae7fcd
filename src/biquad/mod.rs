// Biquad engine: RBJ cookbook coefficients and Linkwitz shelving sections

use std::f64::consts::{LOG10_2, PI};
use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiquadKind {
    LowPass,
    HighPass,
    Notch,
    PeakingEq,
    LowShelf,
    HighShelf,
}

impl BiquadKind {
    /// Whether `gain_db` changes the section (peaking and shelving types only).
    pub fn uses_gain(self) -> bool {
        matches!(
            self,
            BiquadKind::PeakingEq | BiquadKind::LowShelf | BiquadKind::HighShelf
        )
    }
}

impl FromStr for BiquadKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lpf" => Ok(BiquadKind::LowPass),
            "hpf" => Ok(BiquadKind::HighPass),
            "notch" => Ok(BiquadKind::Notch),
            "peakingeq" => Ok(BiquadKind::PeakingEq),
            "lowshelf" => Ok(BiquadKind::LowShelf),
            "highshelf" => Ok(BiquadKind::HighShelf),
            _ => Err(AppError::invalid(format!("unsupported biquad type '{s}'"))),
        }
    }
}

impl fmt::Display for BiquadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BiquadKind::LowPass => "lpf",
            BiquadKind::HighPass => "hpf",
            BiquadKind::Notch => "notch",
            BiquadKind::PeakingEq => "peakingEQ",
            BiquadKind::LowShelf => "lowShelf",
            BiquadKind::HighShelf => "highShelf",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShelfDirection {
    Low,
    High,
}

/// Second-order section as produced by the cookbook (`a[0]` is not normalised).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl BiquadCoeffs {
    /// Same section scaled so that `a[0] == 1`.
    pub fn normalized(&self) -> BiquadCoeffs {
        let a0 = self.a[0];
        BiquadCoeffs {
            b: [self.b[0] / a0, self.b[1] / a0, self.b[2] / a0],
            a: [1.0, self.a[1] / a0, self.a[2] / a0],
        }
    }

    /// Complex response at `f` Hz.
    pub fn response_at(&self, f: f64, sample_rate: f64) -> Complex64 {
        let w = 2.0 * PI * f / sample_rate;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let den = self.a[0] + z1 * self.a[1] + z2 * self.a[2];
        num / den
    }

    /// Magnitude (dB) and phase (degrees) at `f` Hz.
    pub fn mag_phase_at(&self, f: f64, sample_rate: f64) -> (f64, f64) {
        let h = self.response_at(f, sample_rate);
        let mag = h.norm();
        let mag_db = if mag > 1e-30 { 20.0 * mag.log10() } else { -600.0 };
        (mag_db, h.arg() * 180.0 / PI)
    }

    /// Run `input` through the section (direct form I, zero initial state).
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let c = self.normalized();
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        input
            .iter()
            .map(|&x0| {
                let y0 = c.b[0] * x0 + c.b[1] * x1 + c.b[2] * x2 - c.a[1] * y1 - c.a[2] * y2;
                x2 = x1;
                x1 = x0;
                y2 = y1;
                y1 = y0;
                y0
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Cookbook biquad for `kind` centred on `f0` Hz.
///
/// `gain_db` only affects peaking and shelving sections.
pub fn biquad(
    sample_rate: f64,
    f0: f64,
    q: f64,
    kind: BiquadKind,
    gain_db: f64,
) -> Result<BiquadCoeffs, AppError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(AppError::invalid(format!(
            "biquad: sample rate must be positive, got {sample_rate}"
        )));
    }
    if !(f0.is_finite() && f0 > 0.0) {
        return Err(AppError::invalid(format!(
            "biquad: frequency must be positive, got {f0}"
        )));
    }
    if !(q.is_finite() && q > 0.0) {
        return Err(AppError::invalid(format!("biquad: Q must be positive, got {q}")));
    }
    if kind.uses_gain() && !gain_db.is_finite() {
        return Err(AppError::invalid(format!("biquad: gain must be finite, got {gain_db}")));
    }

    let a = 10f64.powf(gain_db / 40.0);
    let w0 = 2.0 * PI * f0 / sample_rate;
    let cs = w0.cos();
    let alpha = w0.sin() / (2.0 * q);
    let sq = 2.0 * a.sqrt() * alpha;

    let (b, a_coeffs) = match kind {
        BiquadKind::LowPass => (
            [(1.0 - cs) / 2.0, 1.0 - cs, (1.0 - cs) / 2.0],
            [1.0 + alpha, -2.0 * cs, 1.0 - alpha],
        ),
        BiquadKind::HighPass => (
            [(1.0 + cs) / 2.0, -(1.0 + cs), (1.0 + cs) / 2.0],
            [1.0 + alpha, -2.0 * cs, 1.0 - alpha],
        ),
        BiquadKind::Notch => ([1.0, -2.0 * cs, 1.0], [1.0 + alpha, -2.0 * cs, 1.0 - alpha]),
        BiquadKind::PeakingEq => (
            [1.0 + alpha * a, -2.0 * cs, 1.0 - alpha * a],
            [1.0 + alpha / a, -2.0 * cs, 1.0 - alpha / a],
        ),
        BiquadKind::LowShelf => (
            [
                a * ((a + 1.0) - (a - 1.0) * cs + sq),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cs),
                a * ((a + 1.0) - (a - 1.0) * cs - sq),
            ],
            [
                (a + 1.0) + (a - 1.0) * cs + sq,
                -2.0 * ((a - 1.0) + (a + 1.0) * cs),
                (a + 1.0) + (a - 1.0) * cs - sq,
            ],
        ),
        BiquadKind::HighShelf => (
            [
                a * ((a + 1.0) + (a - 1.0) * cs + sq),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cs),
                a * ((a + 1.0) + (a - 1.0) * cs - sq),
            ],
            [
                (a + 1.0) - (a - 1.0) * cs + sq,
                2.0 * ((a - 1.0) - (a + 1.0) * cs),
                (a + 1.0) - (a - 1.0) * cs - sq,
            ],
        ),
    };

    debug!(
        "biquad {} f0={:.2} Hz Q={:.3} gain={:.2} dB",
        kind, f0, q, gain_db
    );
    Ok(BiquadCoeffs { b, a: a_coeffs })
}

/// [`biquad`] with the type given by name (`lpf`, `hpf`, `notch`, `peakingEQ`,
/// `lowShelf`, `highShelf`).
pub fn biquad_str(
    sample_rate: f64,
    f0: f64,
    q: f64,
    kind: &str,
    gain_db: f64,
) -> Result<BiquadCoeffs, AppError> {
    biquad(sample_rate, f0, q, kind.parse()?, gain_db)
}

/// Shelf slope of a 6.02 dB/oct transition, relative to the 12 dB/oct of `S = 1`.
const LINKWITZ_SLOPE: f64 = 20.0 * LOG10_2 / 12.0;

/// Shelf spanning `f1..f2` with the gain of a 6 dB/oct slope across that span.
///
/// Centre `sqrt(f1 * f2)`, gain `20 * log10(f2 / f1)`. The gain always changes by
/// 20·log10(2) ≈ 6.02 dB per octave of the span, so the cookbook shelf slope is
/// that rate over the 12 dB/oct of `S = 1`, about 0.50, below the overshoot limit.
pub fn linkwitz_shelf(
    sample_rate: f64,
    f1: f64,
    f2: f64,
    direction: ShelfDirection,
) -> Result<BiquadCoeffs, AppError> {
    if !(f1.is_finite() && f1 > 0.0) {
        return Err(AppError::invalid(format!(
            "linkwitz_shelf: f1 must be positive, got {f1}"
        )));
    }
    if !(f2.is_finite() && f2 > f1) {
        return Err(AppError::invalid(format!(
            "linkwitz_shelf: f2 ({f2}) must be above f1 ({f1})"
        )));
    }

    let f0 = (f1 * f2).sqrt();
    let gain_db = 20.0 * (f2 / f1).log10();
    let a = 10f64.powf(gain_db / 40.0);
    let q = 1.0 / ((a + 1.0 / a) * (1.0 / LINKWITZ_SLOPE - 1.0) + 2.0).sqrt();

    let kind = match direction {
        ShelfDirection::Low => BiquadKind::LowShelf,
        ShelfDirection::High => BiquadKind::HighShelf,
    };
    biquad(sample_rate, f0, q, kind, gain_db)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 48000.0;

    #[test]
    fn test_lowpass_cookbook_values() {
        let c = biquad(44100.0, 1000.0, 0.707, BiquadKind::LowPass, 0.0).unwrap();
        let expected_b = [0.005066263610029209, 0.010132527220058418, 0.005066263610029209];
        let expected_a = [1.1004203097295804, -1.9797349455598832, 0.8995796902704195];
        for i in 0..3 {
            assert!((c.b[i] - expected_b[i]).abs() < 1e-9, "b{}: {}", i, c.b[i]);
            assert!((c.a[i] - expected_a[i]).abs() < 1e-9, "a{}: {}", i, c.a[i]);
        }
        let by_name = biquad_str(44100.0, 1000.0, 0.707, "lpf", 0.0).unwrap();
        assert_eq!(by_name, c);
    }

    #[test]
    fn test_pass_filters_dc_and_nyquist() {
        let lp = biquad(FS, 2000.0, 0.707, BiquadKind::LowPass, 0.0).unwrap();
        let hp = biquad(FS, 2000.0, 0.707, BiquadKind::HighPass, 0.0).unwrap();
        let sum = |v: &[f64; 3]| v[0] + v[1] + v[2];
        let alt = |v: &[f64; 3]| v[0] - v[1] + v[2];

        assert!((sum(&lp.b) / sum(&lp.a) - 1.0).abs() < 1e-12, "LP DC gain is unity");
        assert!(alt(&lp.b).abs() < 1e-12, "LP blocks Nyquist");
        assert!(sum(&hp.b).abs() < 1e-12, "HP blocks DC");
        assert!((alt(&hp.b) / alt(&hp.a) - 1.0).abs() < 1e-12, "HP Nyquist gain is unity");
        assert!(lp.a[0] > 0.0 && hp.a[0] > 0.0);
    }

    #[test]
    fn test_notch_nulls_center() {
        let c = biquad(FS, 1000.0, 5.0, BiquadKind::Notch, 0.0).unwrap();
        let h = c.response_at(1000.0, FS);
        assert!(h.norm() < 1e-9, "notch should null f0, got {}", h.norm());
    }

    #[test]
    fn test_peaking_gain_at_center() {
        for gain in [-8.0, 6.0] {
            let c = biquad(FS, 500.0, 3.0, BiquadKind::PeakingEq, gain).unwrap();
            let (mag, _) = c.mag_phase_at(500.0, FS);
            assert!((mag - gain).abs() < 1e-9, "At center freq, gain should be {gain} dB, got {mag}");
        }
    }

    #[test]
    fn test_shelves_reach_gain() {
        let low = biquad(FS, 200.0, 0.707, BiquadKind::LowShelf, 6.0).unwrap();
        let high = biquad(FS, 5000.0, 0.707, BiquadKind::HighShelf, -4.0).unwrap();
        assert!((low.mag_phase_at(0.0, FS).0 - 6.0).abs() < 1e-9);
        assert!(low.mag_phase_at(FS / 2.0, FS).0.abs() < 1e-9);
        assert!((high.mag_phase_at(FS / 2.0, FS).0 + 4.0).abs() < 1e-9);
        assert!(high.mag_phase_at(0.0, FS).0.abs() < 1e-9);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(biquad(FS, 1000.0, 0.0, BiquadKind::LowPass, 0.0).is_err());
        assert!(biquad(FS, 1000.0, -1.0, BiquadKind::LowPass, 0.0).is_err());
        assert!(biquad(FS, 0.0, 0.7, BiquadKind::LowPass, 0.0).is_err());
        assert!(biquad(0.0, 1000.0, 0.7, BiquadKind::LowPass, 0.0).is_err());
        assert!(biquad_str(FS, 1000.0, 0.7, "bandpass", 0.0).is_err());
    }

    #[test]
    fn test_kind_parsing_is_case_insensitive() {
        assert_eq!("peakingEQ".parse::<BiquadKind>().unwrap(), BiquadKind::PeakingEq);
        assert_eq!("LOWSHELF".parse::<BiquadKind>().unwrap(), BiquadKind::LowShelf);
        assert_eq!(BiquadKind::HighShelf.to_string(), "highShelf");
    }

    #[test]
    fn test_filter_matches_response() {
        // Steady-state sine through the section must follow |H(f)|
        let c = biquad(FS, 1000.0, 0.707, BiquadKind::LowPass, 0.0).unwrap();
        let f = 3000.0;
        let x: Vec<f64> = (0..48000).map(|i| (2.0 * PI * f * i as f64 / FS).sin()).collect();
        let y = c.filter(&x);
        // 16000 samples hold a whole number of periods
        let tail = &y[32000..];
        let rms = (tail.iter().map(|v| v * v).sum::<f64>() / tail.len() as f64).sqrt();
        let expected = c.response_at(f, FS).norm() / 2f64.sqrt();
        assert!((rms - expected).abs() < 1e-6, "rms {} vs |H|/sqrt(2) {}", rms, expected);
    }

    #[test]
    fn test_linkwitz_shelf() {
        let c = linkwitz_shelf(FS, 100.0, 400.0, ShelfDirection::Low).unwrap();
        let gain = 20.0 * 4.0_f64.log10();
        assert!((c.mag_phase_at(0.0, FS).0 - gain).abs() < 1e-6, "DC gain should be {gain}");
        let (mid, _) = c.mag_phase_at(200.0, FS);
        assert!((mid - gain / 2.0).abs() < 0.1, "half gain at the geometric centre, got {mid}");

        assert!(LINKWITZ_SLOPE < 1.0);
        assert!((LINKWITZ_SLOPE - 0.5017).abs() < 1e-4);

        assert!(linkwitz_shelf(FS, 400.0, 100.0, ShelfDirection::High).is_err());
        assert!(linkwitz_shelf(FS, 0.0, 100.0, ShelfDirection::High).is_err());
    }

    #[test]
    fn test_linkwitz_high_shelf() {
        let c = linkwitz_shelf(FS, 1000.0, 8000.0, ShelfDirection::High).unwrap();
        let gain = 20.0 * 8.0_f64.log10();
        assert!(c.mag_phase_at(0.0, FS).0.abs() < 1e-9, "high shelf leaves DC alone");
        let (nyq, _) = c.mag_phase_at(FS / 2.0, FS);
        assert!((nyq - gain).abs() < 1e-6, "Nyquist gain should be {gain}, got {nyq}");
        let (mid, _) = c.mag_phase_at(8000f64.sqrt() * 1000f64.sqrt(), FS);
        assert!((mid - gain / 2.0).abs() < 0.1, "half gain at the geometric centre, got {mid}");
        // Shelf rises monotonically without overshoot
        let mags: Vec<f64> = [200.0, 1000.0, 2828.0, 8000.0, 20000.0]
            .iter()
            .map(|&f| c.mag_phase_at(f, FS).0)
            .collect();
        assert!(mags.windows(2).all(|w| w[1] > w[0]), "{:?}", mags);
        assert!(mags.iter().all(|&m| m <= gain + 1e-9));
    }
}
