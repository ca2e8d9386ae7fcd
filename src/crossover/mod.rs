// Crossover engine: Butterworth / Linkwitz-Riley FIRs from a unit impulse
//
// Pipeline:
//   1. Pick the band from the cutoffs (LP, HP, BP or none)
//   2. Analog Butterworth prototype poles, frequency transform, bilinear transform
//   3. Either filter a unit impulse directly (IIR-shaped FIR) or keep only |H|
//      and build a windowed linear-phase FIR

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dsp::spectrum::{freqz_whole, ifft};
use crate::dsp::unit_impulse;
use crate::dsp::window::{apply_window, blackman_harris};
use crate::error::AppError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Pass band selected by the `(flp, fhp)` pair, 0 meaning "not used".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Band {
    LowPass(f64),
    HighPass(f64),
    BandPass { low: f64, high: f64 },
    AllPass,
}

impl Band {
    pub fn from_cutoffs(flp: f64, fhp: f64) -> Band {
        match (flp != 0.0, fhp != 0.0) {
            (true, true) => Band::BandPass { low: fhp, high: flp },
            (true, false) => Band::LowPass(flp),
            (false, true) => Band::HighPass(fhp),
            (false, false) => Band::AllPass,
        }
    }
}

/// Digital transfer function B(z)/A(z).
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl TransferFunction {
    /// Direct form II transposed filtering, zero initial state.
    pub fn filter(&self, x: &[f64]) -> Vec<f64> {
        let a0 = self.a[0];
        let b: Vec<f64> = self.b.iter().map(|v| v / a0).collect();
        let a: Vec<f64> = self.a.iter().map(|v| v / a0).collect();
        let order = b.len().max(a.len());
        let coef = |v: &[f64], i: usize| v.get(i).copied().unwrap_or(0.0);

        let mut state = vec![0.0; order];
        x.iter()
            .map(|&xn| {
                let yn = coef(&b, 0) * xn + state[0];
                for i in 1..order {
                    let next = if i < order - 1 { state[i] } else { 0.0 };
                    state[i - 1] = coef(&b, i) * xn - coef(&a, i) * yn + next;
                }
                yn
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Length-`m` FIR: a unit impulse run through the order-`n` Butterworth for the
/// band picked by `flp` / `fhp`. Band-pass designs have order `2n`.
pub fn cross_butterworth(
    sample_rate: f64,
    m: usize,
    n: usize,
    flp: f64,
    fhp: f64,
) -> Result<Vec<f64>, AppError> {
    let band = validate(sample_rate, m, n, flp, fhp)?;
    let imp = unit_impulse(m, 0);
    if band == Band::AllPass {
        info!("cross_butterworth: no cutoff given, returning a unit impulse");
        return Ok(imp);
    }
    let tf = butterworth(n, band, sample_rate)?;
    info!("cross_butterworth: {:?} order {} on {} taps", band, n, m);
    Ok(tf.filter(&imp))
}

/// Linear-phase FIR with the Butterworth magnitude: |H| on `m` bins, inverse FFT,
/// centred on `m / 2` and Blackman-Harris windowed.
pub fn cross_butterworth_linear_phase(
    sample_rate: f64,
    m: usize,
    n: usize,
    flp: f64,
    fhp: f64,
) -> Result<Vec<f64>, AppError> {
    let band = validate(sample_rate, m, n, flp, fhp)?;
    if band == Band::AllPass {
        info!("cross_butterworth_linear_phase: no cutoff given, returning a centred impulse");
        return Ok(unit_impulse(m, m / 2));
    }
    let tf = butterworth(n, band, sample_rate)?;

    let magnitude: Vec<Complex64> = freqz_whole(&tf.b, &tf.a, m)
        .into_iter()
        .map(|h| Complex64::new(h.norm(), 0.0))
        .collect();
    let mut imp: Vec<f64> = ifft(&magnitude).into_iter().map(|c| c.re).collect();
    circular_shift_to_center(&mut imp);
    apply_window(&mut imp, &blackman_harris(m));

    info!(
        "cross_butterworth_linear_phase: {:?} order {} on {} taps",
        band, n, m
    );
    Ok(imp)
}

/// Linkwitz-Riley FIR: the order-`n/2` Butterworth applied twice.
///
/// Odd `n` has no Linkwitz-Riley realisation; the unit impulse is returned unchanged.
pub fn cross_linkwitz_riley(
    sample_rate: f64,
    m: usize,
    n: usize,
    flp: f64,
    fhp: f64,
) -> Result<Vec<f64>, AppError> {
    let band = validate(sample_rate, m, n, flp, fhp)?;
    let imp = unit_impulse(m, 0);
    if n % 2 != 0 {
        warn!("cross_linkwitz_riley: odd order {} is not supported, impulse left unfiltered", n);
        return Ok(imp);
    }
    if band == Band::AllPass {
        info!("cross_linkwitz_riley: no cutoff given, returning a unit impulse");
        return Ok(imp);
    }
    let tf = butterworth(n / 2, band, sample_rate)?;
    info!("cross_linkwitz_riley: {:?} LR{} on {} taps", band, n, m);
    Ok(tf.filter(&tf.filter(&imp)))
}

/// Digital Butterworth design (bilinear transform with prewarped cutoffs).
pub fn butterworth(n: usize, band: Band, sample_rate: f64) -> Result<TransferFunction, AppError> {
    if n == 0 {
        return Err(AppError::invalid("butterworth: order must be at least 1"));
    }
    let warp = |f: f64| 2.0 * sample_rate * (PI * f / sample_rate).tan();
    let proto = prototype_poles(n);

    let (zeros, poles, gain) = match band {
        Band::LowPass(f) => lp_to_lp(&proto, warp(f)),
        Band::HighPass(f) => lp_to_hp(&proto, warp(f)),
        Band::BandPass { low, high } => lp_to_bp(&proto, warp(low), warp(high)),
        Band::AllPass => {
            return Ok(TransferFunction {
                b: vec![1.0],
                a: vec![1.0],
            })
        }
    };
    let (zeros, poles, gain) = bilinear(&zeros, &poles, gain, 2.0 * sample_rate);

    let b: Vec<f64> = poly(&zeros).into_iter().map(|c| gain * c.re).collect();
    let a: Vec<f64> = poly(&poles).into_iter().map(|c| c.re).collect();
    if b.iter().chain(&a).any(|v| !v.is_finite()) {
        return Err(AppError::Dsp {
            message: format!("butterworth: order {n} {band:?} overflows the coefficient range"),
        });
    }
    Ok(TransferFunction { b, a })
}

// ---------------------------------------------------------------------------
// Internal: validation
// ---------------------------------------------------------------------------

fn validate(sample_rate: f64, m: usize, n: usize, flp: f64, fhp: f64) -> Result<Band, AppError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(AppError::invalid(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    if m == 0 {
        return Err(AppError::invalid("FIR length must be at least 1"));
    }
    if n == 0 {
        return Err(AppError::invalid("filter order must be at least 1"));
    }
    let nyquist = sample_rate / 2.0;
    for (name, f) in [("flp", flp), ("fhp", fhp)] {
        if !f.is_finite() || f < 0.0 || f >= nyquist {
            return Err(AppError::invalid(format!(
                "{name} = {f} Hz must be 0 (unused) or inside (0, {nyquist}) Hz"
            )));
        }
    }
    let band = Band::from_cutoffs(flp, fhp);
    if let Band::BandPass { low, high } = band {
        if low >= high {
            return Err(AppError::invalid(format!(
                "band-pass needs fhp < flp, got fhp={low} Hz flp={high} Hz"
            )));
        }
    }
    Ok(band)
}

// ---------------------------------------------------------------------------
// Internal: zero/pole/gain design
// ---------------------------------------------------------------------------

type Zpk = (Vec<Complex64>, Vec<Complex64>, f64);

/// Normalised analog Butterworth poles, θ_k = π(2k + N + 1) / (2N).
fn prototype_poles(n: usize) -> Vec<Complex64> {
    (0..n)
        .map(|k| {
            let theta = PI * (2 * k + n + 1) as f64 / (2 * n) as f64;
            Complex64::from_polar(1.0, theta)
        })
        .collect()
}

fn lp_to_lp(proto: &[Complex64], w0: f64) -> Zpk {
    let poles = proto.iter().map(|&p| p * w0).collect();
    (Vec::new(), poles, w0.powi(proto.len() as i32))
}

fn lp_to_hp(proto: &[Complex64], w0: f64) -> Zpk {
    let poles: Vec<Complex64> = proto.iter().map(|&p| w0 / p).collect();
    let prod_neg = proto
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (-p));
    let gain = (Complex64::new(1.0, 0.0) / prod_neg).re;
    (vec![Complex64::new(0.0, 0.0); proto.len()], poles, gain)
}

fn lp_to_bp(proto: &[Complex64], w_low: f64, w_high: f64) -> Zpk {
    let bw = w_high - w_low;
    let w0 = (w_low * w_high).sqrt();
    let mut poles = Vec::with_capacity(2 * proto.len());
    let scaled: Vec<Complex64> = proto.iter().map(|&p| p * (bw / 2.0)).collect();
    for &p in &scaled {
        poles.push(p + (p * p - w0 * w0).sqrt());
    }
    for &p in &scaled {
        poles.push(p - (p * p - w0 * w0).sqrt());
    }
    (
        vec![Complex64::new(0.0, 0.0); proto.len()],
        poles,
        bw.powi(proto.len() as i32),
    )
}

/// s → z with `fs2 = 2 fs`; zeros at infinity move to z = -1.
fn bilinear(zeros: &[Complex64], poles: &[Complex64], gain: f64, fs2: f64) -> Zpk {
    let map = |&s: &Complex64| (fs2 + s) / (fs2 - s);
    let mut zd: Vec<Complex64> = zeros.iter().map(map).collect();
    let pd: Vec<Complex64> = poles.iter().map(map).collect();
    zd.resize(poles.len(), Complex64::new(-1.0, 0.0));

    let one = Complex64::new(1.0, 0.0);
    let num = zeros.iter().fold(one, |acc, &z| acc * (fs2 - z));
    let den = poles.iter().fold(one, |acc, &p| acc * (fs2 - p));
    (zd, pd, gain * (num / den).re)
}

/// Polynomial coefficients (highest power first) with the given roots.
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &r in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * r;
        }
        coeffs = next;
    }
    coeffs
}

/// Rotate right by `len / 2` so sample 0 lands in the middle.
fn circular_shift_to_center(impulse: &mut [f64]) {
    let n = impulse.len();
    impulse.rotate_right(n / 2);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::spectrum::{peak_index, response_at};

    const FS: f64 = 48000.0;

    fn mag_db_at(imp: &[f64], f: f64) -> f64 {
        20.0 * response_at(imp, &[1.0], &[f], FS)[0].norm().log10()
    }

    #[test]
    fn butterworth_lowpass_minus_3db_at_cutoff() {
        let imp = cross_butterworth(FS, 1024, 2, 100.0, 0.0).unwrap();
        assert_eq!(imp.len(), 1024);
        let at_fc = mag_db_at(&imp, 100.0);
        assert!((at_fc + 3.0103).abs() < 0.05, "-3 dB at cutoff, got {at_fc}");
        assert!(mag_db_at(&imp, 10.0).abs() < 0.05, "passband should be flat");
        // 12 dB/oct well above the cutoff
        let slope = mag_db_at(&imp, 1600.0) - mag_db_at(&imp, 3200.0);
        assert!((slope - 12.0).abs() < 0.5, "expected 12 dB/oct, got {slope}");
    }

    #[test]
    fn butterworth_highpass_blocks_dc() {
        let imp = cross_butterworth(FS, 4096, 3, 0.0, 200.0).unwrap();
        assert!(imp.iter().sum::<f64>().abs() < 1e-3, "DC gain should vanish");
        let at_fc = mag_db_at(&imp, 200.0);
        assert!((at_fc + 3.0103).abs() < 0.05, "-3 dB at cutoff, got {at_fc}");
    }

    #[test]
    fn butterworth_bandpass_doubles_order() {
        let tf = butterworth(2, Band::BandPass { low: 100.0, high: 1000.0 }, FS).unwrap();
        assert_eq!(tf.a.len(), 5, "band-pass of order 2 has 4 poles");
        let imp = cross_butterworth(FS, 8192, 2, 1000.0, 100.0).unwrap();
        let centre = mag_db_at(&imp, (100.0_f64 * 1000.0).sqrt());
        assert!(centre.abs() < 0.05, "unity gain at the geometric centre, got {centre}");
        for f in [100.0, 1000.0] {
            let edge = mag_db_at(&imp, f);
            assert!((edge + 3.0103).abs() < 0.05, "-3 dB at {f} Hz, got {edge}");
        }
    }

    #[test]
    fn no_cutoff_returns_delta() {
        let imp = cross_butterworth(FS, 16, 4, 0.0, 0.0).unwrap();
        assert_eq!(imp[0], 1.0);
        assert!(imp[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn linear_phase_without_cutoff_is_centered_delta() {
        let imp = cross_butterworth_linear_phase(FS, 1024, 4, 0.0, 0.0).unwrap();
        assert_eq!(imp.len(), 1024);
        for (i, &v) in imp.iter().enumerate() {
            let expected = if i == 512 { 1.0 } else { 0.0 };
            assert!((v - expected).abs() < 1e-9, "sample {}: {}", i, v);
        }
    }

    #[test]
    fn linear_phase_keeps_magnitude() {
        let imp = cross_butterworth_linear_phase(FS, 4096, 4, 1000.0, 0.0).unwrap();
        assert_eq!(peak_index(&imp), 2048);
        let at_fc = mag_db_at(&imp, 1000.0);
        assert!((at_fc + 3.0103).abs() < 0.2, "-3 dB at cutoff, got {at_fc}");
        for k in 1..200 {
            let (l, r) = (imp[2048 - k], imp[2048 + k]);
            assert!((l - r).abs() < 1e-3 * imp[2048].abs(), "asymmetric at ±{}", k);
        }
    }

    #[test]
    fn linkwitz_riley_minus_6db_at_cutoff() {
        let imp = cross_linkwitz_riley(FS, 4096, 4, 1000.0, 0.0).unwrap();
        let at_fc = mag_db_at(&imp, 1000.0);
        assert!((at_fc + 6.0206).abs() < 0.05, "LR4 should be -6 dB at cutoff, got {at_fc}");
    }

    #[test]
    fn linkwitz_riley_odd_order_is_delta() {
        let imp = cross_linkwitz_riley(FS, 64, 3, 1000.0, 0.0).unwrap();
        assert_eq!(imp.len(), 64);
        assert_eq!(imp[0], 1.0);
        assert!(imp[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn huge_order_reports_dsp_error() {
        // w0^200 overflows the analog gain
        let err = butterworth(200, Band::LowPass(20000.0), FS).unwrap_err();
        assert!(matches!(err, AppError::Dsp { .. }), "got {err}");
        assert!(cross_butterworth(FS, 256, 200, 20000.0, 0.0).is_err());
    }

    #[test]
    fn invalid_cutoffs_rejected() {
        assert!(cross_butterworth(FS, 1024, 2, 30000.0, 0.0).is_err());
        assert!(cross_butterworth(FS, 1024, 2, 100.0, 200.0).is_err());
        assert!(cross_butterworth(FS, 1024, 2, -1.0, 0.0).is_err());
        assert!(cross_butterworth(FS, 0, 2, 100.0, 0.0).is_err());
        assert!(cross_butterworth(0.0, 1024, 2, 100.0, 0.0).is_err());
        assert!(cross_linkwitz_riley(FS, 1024, 0, 100.0, 0.0).is_err());
    }

    #[test]
    fn filter_matches_fir_convolution() {
        let tf = TransferFunction {
            b: vec![0.5, 0.25, 0.25],
            a: vec![1.0],
        };
        let y = tf.filter(&[1.0, 0.0, 0.0, 2.0]);
        assert_eq!(y, vec![0.5, 0.25, 0.25, 1.0]);
    }
}
