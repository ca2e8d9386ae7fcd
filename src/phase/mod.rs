// Phase engine: analytic signal, minimum-phase and whole-spectrum reconstruction

use std::f64::consts::PI;

use num_complex::Complex64;
use rustfft::FftPlanner;
use tracing::debug;

use crate::dsp::interpolation::{interp_linear, CubicSpline};
use crate::dsp::spectrum::unwrap;
use crate::error::AppError;

/// Smallest magnitude fed to `ln`, keeps zero bins finite (≈ -6000 dB).
const MIN_MAGNITUDE: f64 = 1e-300;

// ---------------------------------------------------------------------------
// Hilbert transform
// ---------------------------------------------------------------------------

/// Analytic signal `x + j·H{x}` computed with the FFT.
///
/// Spectrum weights: DC ×1, positive bins ×2, Nyquist ×1 (even length), negative bins ×0.
pub fn hilbert(x: &[f64]) -> Vec<Complex64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let mut buf: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buf);

    let positive_end = if n % 2 == 0 { n / 2 } else { n.div_ceil(2) };
    for (i, c) in buf.iter_mut().enumerate() {
        if i == 0 || (n % 2 == 0 && i == n / 2) {
            continue;
        }
        if i < positive_end {
            *c *= 2.0;
        } else {
            *c = Complex64::new(0.0, 0.0);
        }
    }

    planner.plan_fft_inverse(n).process(&mut buf);
    let norm = 1.0 / n as f64;
    for c in buf.iter_mut() {
        *c *= norm;
    }
    buf
}

// ---------------------------------------------------------------------------
// Spectrum reconstruction
// ---------------------------------------------------------------------------

/// Minimum-phase spectrum with the same magnitude as `sp`.
///
/// `sp` is a whole spectrum (0..fs). Result: `exp(conj(hilbert(ln|sp|)))`.
pub fn min_phase_spectrum(sp: &[Complex64]) -> Result<Vec<Complex64>, AppError> {
    if sp.is_empty() {
        return Err(AppError::invalid("min_phase_spectrum: empty spectrum"));
    }
    let ln_mag: Vec<f64> = sp.iter().map(|c| c.norm().max(MIN_MAGNITUDE).ln()).collect();
    Ok(hilbert(&ln_mag).into_iter().map(|c| c.conj().exp()).collect())
}

/// Whole causal spectrum from the positive-frequency half `ssp` (DC..Nyquist inclusive).
///
/// `ssp` must have odd length `m`; the upper half is `conj(ssp[1..m-1])` reversed,
/// giving `2 * (m - 1)` bins.
pub fn whole_spectrum_causal(ssp: &[Complex64]) -> Result<Vec<Complex64>, AppError> {
    check_odd_half(ssp.len(), "whole_spectrum_causal")?;
    Ok(mirror(ssp, |c| c.conj()))
}

/// Whole spectrum mirrored without conjugation, for linear-phase (real-valued) halves.
pub fn whole_spectrum_symmetric(ssp: &[Complex64]) -> Result<Vec<Complex64>, AppError> {
    check_odd_half(ssp.len(), "whole_spectrum_symmetric")?;
    Ok(mirror(ssp, |c| c))
}

fn check_odd_half(m: usize, op: &str) -> Result<(), AppError> {
    if m % 2 == 0 {
        return Err(AppError::invalid(format!(
            "{op}: half-spectrum length must be odd, got {m}"
        )));
    }
    Ok(())
}

fn mirror(ssp: &[Complex64], f: impl Fn(Complex64) -> Complex64) -> Vec<Complex64> {
    let m = ssp.len();
    let mut whole = Vec::with_capacity(2 * m.saturating_sub(1));
    whole.extend_from_slice(ssp);
    if m > 2 {
        whole.extend(ssp[1..m - 1].iter().rev().map(|&c| f(c)));
    }
    whole
}

// ---------------------------------------------------------------------------
// Magnitude resampling
// ---------------------------------------------------------------------------

/// Spline-resample a magnitude curve onto `m / 2` bins at `k * fs / m`.
///
/// `m` is the whole-spectrum length and must be even. Values outside the
/// range of `freq` are extrapolated from the end polynomials.
pub fn spline_magnitude_grid(
    freq: &[f64],
    mag: &[f64],
    m: usize,
    sample_rate: f64,
) -> Result<Vec<f64>, AppError> {
    if m % 2 != 0 {
        return Err(AppError::invalid(format!(
            "spline_magnitude_grid: spectrum length must be even, got {m}"
        )));
    }
    let spline = CubicSpline::new(freq, mag)?;
    let df = sample_rate / m as f64;
    let grid: Vec<f64> = (0..m / 2).map(|k| k as f64 * df).collect();
    Ok(spline.eval_many(&grid))
}

/// Minimum-phase phase (degrees) at `freq` for a magnitude curve given in dB.
///
/// The curve is resampled onto an `n_fft`-point linear grid (clamped at the ends),
/// turned into a real whole spectrum, reconstructed as minimum phase and the
/// unwrapped phase is read back at the original frequencies.
pub fn min_phase_from_real_mag(
    freq: &[f64],
    mag_db: &[f64],
    sample_rate: f64,
    n_fft: usize,
) -> Result<Vec<f64>, AppError> {
    if freq.len() != mag_db.len() || freq.is_empty() {
        return Err(AppError::invalid(format!(
            "min_phase_from_real_mag: {} frequencies for {} magnitudes",
            freq.len(),
            mag_db.len()
        )));
    }
    if n_fft < 4 || n_fft % 4 != 0 {
        return Err(AppError::invalid(format!(
            "min_phase_from_real_mag: FFT length must be a multiple of 4, got {n_fft}"
        )));
    }
    if sample_rate <= 0.0 {
        return Err(AppError::invalid("min_phase_from_real_mag: sample rate must be positive"));
    }

    let n_bins = n_fft / 2 + 1;
    let grid: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();
    let half: Vec<Complex64> = interp_linear(freq, mag_db, &grid)
        .into_iter()
        .map(|db| Complex64::new(10f64.powf(db / 20.0), 0.0))
        .collect();

    let whole = whole_spectrum_symmetric(&half)?;
    let minph = min_phase_spectrum(&whole)?;
    debug!("min_phase_from_real_mag: {} points on a {} bin grid", freq.len(), n_fft);

    let wrapped: Vec<f64> = minph[..n_bins].iter().map(|c| c.arg()).collect();
    let phase_deg: Vec<f64> = unwrap(&wrapped, 2.0 * PI)
        .into_iter()
        .map(|p| p.to_degrees())
        .collect();
    Ok(interp_linear(&grid, &phase_deg, freq))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::spectrum::fft_real;

    #[test]
    fn hilbert_of_cosine_is_sine() {
        let n = 64;
        let x: Vec<f64> = (0..n).map(|i| (2.0 * PI * 4.0 * i as f64 / n as f64).cos()).collect();
        let a = hilbert(&x);
        for (i, c) in a.iter().enumerate() {
            let expected = (2.0 * PI * 4.0 * i as f64 / n as f64).sin();
            assert!((c.re - x[i]).abs() < 1e-12, "real part must be the input at {}", i);
            assert!((c.im - expected).abs() < 1e-12, "imag at {}: {} vs {}", i, c.im, expected);
        }
    }

    #[test]
    fn min_phase_of_min_phase_signal_is_identity() {
        // Zero at z = -0.5, inside the unit circle
        let x = vec![1.0, 0.5];
        let sp = fft_real(&x, 256);
        let mp = min_phase_spectrum(&sp).unwrap();
        for (a, b) in mp.iter().zip(&sp) {
            assert!((a - b).norm() < 1e-9, "min phase {} vs original {}", a, b);
        }
    }

    #[test]
    fn min_phase_flips_max_phase_zero() {
        let sp = fft_real(&[0.5, 1.0], 256);
        let expected = fft_real(&[1.0, 0.5], 256);
        let mp = min_phase_spectrum(&sp).unwrap();
        for (a, b) in mp.iter().zip(&expected) {
            assert!((a.norm() - b.norm()).abs() < 1e-9, "magnitude must be kept");
            assert!((a - b).norm() < 1e-9, "got {} expected {}", a, b);
        }
    }

    #[test]
    fn min_phase_rejects_empty() {
        assert!(min_phase_spectrum(&[]).is_err());
    }

    #[test]
    fn causal_whole_spectrum_round_trip() {
        let x = vec![0.3, -1.0, 0.25, 0.8, 0.0, -0.1, 0.6, 0.05];
        let full = fft_real(&x, 8);
        let half = &full[..5];
        let whole = whole_spectrum_causal(half).unwrap();
        assert_eq!(whole.len(), 8);
        for (a, b) in whole.iter().zip(&full) {
            assert!((a - b).norm() < 1e-12, "reconstructed {} vs {}", a, b);
        }
    }

    #[test]
    fn symmetric_whole_spectrum_mirrors_without_conjugation() {
        let half: Vec<Complex64> = (0..5).map(|k| Complex64::new(k as f64, 1.0)).collect();
        let whole = whole_spectrum_symmetric(&half).unwrap();
        assert_eq!(whole.len(), 8);
        for k in 1..4 {
            assert_eq!(whole[8 - k], half[k], "bin {} must mirror bin {}", 8 - k, k);
        }
    }

    #[test]
    fn even_half_spectrum_is_rejected() {
        let half = vec![Complex64::new(1.0, 0.0); 4];
        assert!(whole_spectrum_causal(&half).is_err());
        assert!(whole_spectrum_symmetric(&half).is_err());
    }

    #[test]
    fn spline_grid_length_and_values() {
        let freq = vec![100.0, 1000.0, 5000.0, 10000.0, 20000.0];
        let mag: Vec<f64> = freq.iter().map(|&f: &f64| 2.0 * f / 1000.0 + 1.0).collect();
        let out = spline_magnitude_grid(&freq, &mag, 64, 48000.0).unwrap();
        assert_eq!(out.len(), 32);
        // Linear data stays linear, extrapolated bins included
        for (k, &v) in out.iter().enumerate() {
            let f = k as f64 * 48000.0 / 64.0;
            assert!((v - (2.0 * f / 1000.0 + 1.0)).abs() < 1e-8, "bin {}: {}", k, v);
        }
    }

    #[test]
    fn spline_grid_rejects_odd_length() {
        assert!(spline_magnitude_grid(&[1.0, 2.0], &[0.0, 0.0], 63, 48000.0).is_err());
    }

    #[test]
    fn flat_magnitude_has_zero_phase() {
        let freq = vec![20.0, 200.0, 2000.0, 20000.0];
        let mag = vec![-3.0; 4];
        let pha = min_phase_from_real_mag(&freq, &mag, 44100.0, 4096).unwrap();
        for &p in &pha {
            assert!(p.abs() < 1e-6, "flat magnitude should give zero phase, got {}", p);
        }
    }

    #[test]
    fn bass_boost_lags_above_transition() {
        // Low shelf style boost: minimum-phase response lags above the transition
        let freq = vec![10.0, 50.0, 100.0, 200.0, 400.0, 1000.0, 20000.0];
        let mag = vec![10.0, 10.0, 8.0, 4.0, 1.0, 0.0, 0.0];
        let pha = min_phase_from_real_mag(&freq, &mag, 44100.0, 16384).unwrap();
        assert!(pha[3] < -1.0, "falling magnitude should give negative phase, got {}", pha[3]);
        assert!(
            pha[6].abs() < pha[3].abs() / 5.0,
            "phase settles at high frequency, got {} vs {}",
            pha[6],
            pha[3]
        );
    }
}
