// Frequency-domain analysis of real impulses and rational transfer functions

use std::f64::consts::PI;

use num_complex::Complex64;
use rustfft::FftPlanner;
use tracing::warn;

/// Half-spectrum sampled on uniformly spaced bins from 0 Hz (inclusive) to Nyquist (exclusive).
#[derive(Debug, Clone)]
pub struct FrequencyResponse {
    pub freqs: Vec<f64>,
    pub response: Vec<Complex64>,
}

/// Forward FFT of `x` zero-padded (or truncated) to `n` points.
pub fn fft_real(x: &[f64], n: usize) -> Vec<Complex64> {
    let mut buf: Vec<Complex64> = (0..n)
        .map(|i| Complex64::new(x.get(i).copied().unwrap_or(0.0), 0.0))
        .collect();
    if n > 0 {
        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(n).process(&mut buf);
    }
    buf
}

/// Normalized inverse FFT.
pub fn ifft(spectrum: &[Complex64]) -> Vec<Complex64> {
    let n = spectrum.len();
    let mut buf = spectrum.to_vec();
    if n > 0 {
        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_inverse(n).process(&mut buf);
        let norm = 1.0 / n as f64;
        for c in buf.iter_mut() {
            *c *= norm;
        }
    }
    buf
}

/// FFT length that samples `bins` points of the half circle and still covers every
/// coefficient of `len`. Returns (fft_len, decimation step).
fn half_circle_fft_len(len: usize, bins: usize) -> (usize, usize) {
    let base = 2 * bins;
    let step = len.div_ceil(base).max(1);
    (base * step, step)
}

/// Frequency response of an FIR on `wor_n` bins spaced `fs / (2 * wor_n)` apart.
pub fn freqz(samples: &[f64], wor_n: usize, sample_rate: f64) -> FrequencyResponse {
    if wor_n == 0 {
        return FrequencyResponse {
            freqs: Vec::new(),
            response: Vec::new(),
        };
    }
    let (n_fft, step) = half_circle_fft_len(samples.len(), wor_n);
    let spectrum = fft_real(samples, n_fft);
    let df = sample_rate / (2 * wor_n) as f64;

    FrequencyResponse {
        freqs: (0..wor_n).map(|k| k as f64 * df).collect(),
        response: (0..wor_n).map(|k| spectrum[k * step]).collect(),
    }
}

/// Group delay (in samples) of an FIR on the same bins as [`freqz`].
///
/// τ(ω) = Re{ FFT(n·x[n]) / FFT(x[n]) }. Bins where the response is numerically zero
/// are reported as 0.
pub fn group_delay_fir(samples: &[f64], wor_n: usize) -> Vec<f64> {
    if wor_n == 0 {
        return Vec::new();
    }
    let (n_fft, step) = half_circle_fft_len(samples.len(), wor_n);
    let ramp: Vec<f64> = samples
        .iter()
        .enumerate()
        .map(|(i, &v)| i as f64 * v)
        .collect();
    let num = fft_real(&ramp, n_fft);
    let den = fft_real(samples, n_fft);

    let mut singular = 0usize;
    let gd = (0..wor_n)
        .map(|k| {
            let d = den[k * step];
            if d.norm() < 10.0 * f64::EPSILON {
                singular += 1;
                0.0
            } else {
                (num[k * step] / d).re
            }
        })
        .collect();
    if singular > 0 {
        warn!("group_delay_fir: {} singular bins set to 0", singular);
    }
    gd
}

/// Evaluate B(z)/A(z) at z = e^{jω} for arbitrary frequencies in Hz.
pub fn response_at(b: &[f64], a: &[f64], freqs: &[f64], sample_rate: f64) -> Vec<Complex64> {
    freqs
        .iter()
        .map(|&f| {
            let w = 2.0 * PI * f / sample_rate;
            polyval_inverse(b, w) / polyval_inverse(a, w)
        })
        .collect()
}

/// Group delay (in samples) of an FIR at arbitrary frequencies in Hz.
pub fn group_delay_at(samples: &[f64], freqs: &[f64], sample_rate: f64) -> Vec<f64> {
    let ramp: Vec<f64> = samples
        .iter()
        .enumerate()
        .map(|(i, &v)| i as f64 * v)
        .collect();
    freqs
        .iter()
        .map(|&f| {
            let w = 2.0 * PI * f / sample_rate;
            let den = polyval_inverse(samples, w);
            if den.norm() < 10.0 * f64::EPSILON {
                0.0
            } else {
                (polyval_inverse(&ramp, w) / den).re
            }
        })
        .collect()
}

/// Σ c[k]·e^{-jωk} via Horner's rule on z⁻¹.
fn polyval_inverse(coeffs: &[f64], w: f64) -> Complex64 {
    let z_inv = Complex64::from_polar(1.0, -w);
    coeffs
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z_inv + c)
}

/// Whole-circle response of B(z)/A(z) on `m` bins `k·2π/m`, `k = 0..m`.
pub fn freqz_whole(b: &[f64], a: &[f64], m: usize) -> Vec<Complex64> {
    if m == 0 {
        return Vec::new();
    }
    let len = b.len().max(a.len());
    let step = len.div_ceil(m).max(1);
    let n_fft = m * step;
    let num = fft_real(b, n_fft);
    let den = fft_real(a, n_fft);
    (0..m).map(|k| num[k * step] / den[k * step]).collect()
}

/// Magnitude in dB, floored at -600 dB for zero bins.
pub fn magnitude_db(h: &[Complex64]) -> Vec<f64> {
    h.iter()
        .map(|c| {
            let amp = c.norm();
            if amp > 1e-30 {
                20.0 * amp.log10()
            } else {
                -600.0
            }
        })
        .collect()
}

/// Remove jumps larger than half a period between consecutive samples.
pub fn unwrap(wrapped: &[f64], period: f64) -> Vec<f64> {
    if wrapped.is_empty() {
        return vec![];
    }
    let half = period / 2.0;
    let mut unwrapped = Vec::with_capacity(wrapped.len());
    unwrapped.push(wrapped[0]);
    let mut offset = 0.0;

    for i in 1..wrapped.len() {
        let diff = wrapped[i] - wrapped[i - 1];
        if diff > half {
            offset -= period * ((diff + half) / period).floor();
        } else if diff < -half {
            offset += period * ((-diff + half) / period).floor();
        }
        unwrapped.push(wrapped[i] + offset);
    }

    unwrapped
}

/// Index of the largest absolute sample (first one on ties).
pub fn peak_index(samples: &[f64]) -> usize {
    samples
        .iter()
        .enumerate()
        .fold((0usize, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v.abs() > bv {
                (i, v.abs())
            } else {
                (bi, bv)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freqz_delta_is_flat() {
        let mut x = vec![0.0; 64];
        x[0] = 1.0;
        let fr = freqz(&x, 32, 48000.0);
        assert_eq!(fr.freqs.len(), 32);
        assert!((fr.freqs[1] - 750.0).abs() < 1e-9);
        for h in &fr.response {
            assert!((h.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_freqz_odd_length_matches_direct_evaluation() {
        let x = vec![0.2, -0.5, 1.0, 0.3, 0.1];
        let fr = freqz(&x, 2, 48000.0);
        let direct = response_at(&x, &[1.0], &fr.freqs, 48000.0);
        for (a, b) in fr.response.iter().zip(&direct) {
            assert!((a - b).norm() < 1e-12, "fft {} vs direct {}", a, b);
        }
    }

    #[test]
    fn test_group_delay_of_pure_delay() {
        let mut x = vec![0.0; 128];
        x[10] = 1.0;
        let gd = group_delay_fir(&x, 64);
        for (k, &v) in gd.iter().enumerate() {
            assert!((v - 10.0).abs() < 1e-9, "bin {}: gd={} expected 10", k, v);
        }
        let gd_at = group_delay_at(&x, &[100.0, 5000.0], 48000.0);
        assert!((gd_at[0] - 10.0).abs() < 1e-9);
        assert!((gd_at[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unwrap_radians() {
        let wrapped = vec![3.0, -3.0, -2.9];
        let u = unwrap(&wrapped, 2.0 * PI);
        assert!((u[1] - (2.0 * PI - 3.0)).abs() < 1e-12);
        assert!((u[2] - (2.0 * PI - 2.9)).abs() < 1e-12);
    }

    #[test]
    fn test_unwrap_degrees() {
        let wrapped = vec![170.0, -170.0, -10.0];
        let u = unwrap(&wrapped, 360.0);
        assert!((u[0] - 170.0).abs() < 1e-6);
        assert!((u[1] - 190.0).abs() < 1e-6);
        assert!((u[2] - 350.0).abs() < 1e-6);
    }

    #[test]
    fn test_freqz_whole_of_identity() {
        let h = freqz_whole(&[1.0], &[1.0], 8);
        assert_eq!(h.len(), 8);
        for c in &h {
            assert!((c - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_peak_index_uses_absolute_value() {
        assert_eq!(peak_index(&[0.1, -0.9, 0.5]), 1);
        assert_eq!(peak_index(&[]), 0);
    }
}
