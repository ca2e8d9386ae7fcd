use std::f64::consts::PI;

/// 4-term Blackman-Harris coefficients (symmetric form).
const BH: [f64; 4] = [0.35875, 0.48829, 0.14128, 0.01168];

/// Symmetric Blackman-Harris window of length `n`.
///
/// Endpoints reach ~6e-5, the center sample is exactly 1.0 for odd `n`.
pub fn blackman_harris(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let x = 2.0 * PI * i as f64 / denom;
                    BH[0] - BH[1] * x.cos() + BH[2] * (2.0 * x).cos() - BH[3] * (3.0 * x).cos()
                })
                .collect()
        }
    }
}

/// Right half of a Blackman-Harris window of length `2 * n`.
///
/// Starts near 1.0 and decays to ~0, used for causal (minimum-phase) impulses.
pub fn semi_blackman_harris(n: usize) -> Vec<f64> {
    let full = blackman_harris(2 * n);
    full[n..].to_vec()
}

/// Multiply `signal` by `window` sample by sample (shorter length wins).
pub fn apply_window(signal: &mut [f64], window: &[f64]) {
    for (s, w) in signal.iter_mut().zip(window) {
        *s *= w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blackman_harris_symmetry() {
        let w = blackman_harris(1025);
        for i in 0..w.len() / 2 {
            assert!(
                (w[i] - w[w.len() - 1 - i]).abs() < 1e-12,
                "window not symmetric at {}",
                i
            );
        }
        assert!((w[512] - 1.0).abs() < 1e-12, "center should be 1.0, got {}", w[512]);
        assert!(w[0] < 1e-4, "endpoint should be ~6e-5, got {}", w[0]);
    }

    #[test]
    fn test_semi_window_decays() {
        let w = semi_blackman_harris(256);
        assert_eq!(w.len(), 256);
        assert!(w[0] > 0.99, "semi window starts near 1, got {}", w[0]);
        assert!(w[255] < 1e-3, "semi window ends near 0, got {}", w[255]);
        for i in 1..w.len() {
            assert!(w[i] <= w[i - 1] + 1e-12, "semi window must not increase at {}", i);
        }
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(blackman_harris(0).is_empty());
        assert_eq!(blackman_harris(1), vec![1.0]);
        assert!(semi_blackman_harris(0).is_empty());
    }
}
