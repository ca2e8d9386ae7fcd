pub mod interpolation;
pub mod spectrum;
pub mod window;

pub use interpolation::{interp_linear, interp_linear_extrapolate, uniform_grid, CubicSpline};
pub use spectrum::{freqz, group_delay_fir, magnitude_db, peak_index, unwrap, FrequencyResponse};
pub use window::{apply_window, blackman_harris, semi_blackman_harris};

/// Generate a logarithmically-spaced frequency grid.
pub fn generate_log_freq_grid(n: usize, f_min: f64, f_max: f64) -> Vec<f64> {
    if n < 2 {
        return vec![f_min];
    }
    let log_min = f_min.ln();
    let log_max = f_max.ln();
    (0..n)
        .map(|i| (log_min + (log_max - log_min) * i as f64 / (n - 1) as f64).exp())
        .collect()
}

/// Unit impulse of length `m` with the 1.0 at `position`.
pub fn unit_impulse(m: usize, position: usize) -> Vec<f64> {
    let mut imp = vec![0.0; m];
    if position < m {
        imp[position] = 1.0;
    }
    imp
}
