use crate::error::AppError;

/// Uniform frequency grid `k * sample_rate / n_fft` for `k = 0..n_points`.
pub fn uniform_grid(n_points: usize, n_fft: usize, sample_rate: f64) -> Vec<f64> {
    let df = sample_rate / n_fft as f64;
    (0..n_points).map(|k| k as f64 * df).collect()
}

/// Linear interpolation with clamping to boundary values.
pub fn interp_linear(x_data: &[f64], y_data: &[f64], x_query: &[f64]) -> Vec<f64> {
    x_query
        .iter()
        .map(|&xq| interp_single(x_data, y_data, xq, false))
        .collect()
}

/// Linear interpolation that keeps the end segments' slope beyond the data range.
pub fn interp_linear_extrapolate(x_data: &[f64], y_data: &[f64], x_query: &[f64]) -> Vec<f64> {
    x_query
        .iter()
        .map(|&xq| interp_single(x_data, y_data, xq, true))
        .collect()
}

fn interp_single(x_data: &[f64], y_data: &[f64], xq: f64, extrapolate: bool) -> f64 {
    let n = x_data.len().min(y_data.len());
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return y_data[0];
    }
    let line = |i: usize| {
        let t = (xq - x_data[i]) / (x_data[i + 1] - x_data[i]);
        y_data[i] + t * (y_data[i + 1] - y_data[i])
    };
    if xq <= x_data[0] {
        return if extrapolate { line(0) } else { y_data[0] };
    }
    if xq >= x_data[n - 1] {
        return if extrapolate { line(n - 2) } else { y_data[n - 1] };
    }

    let idx = match x_data[..n].binary_search_by(|v| v.total_cmp(&xq)) {
        Ok(i) => return y_data[i],
        Err(i) => i,
    };
    line(idx - 1)
}

/// Cubic spline through a set of points with not-a-knot end conditions.
///
/// Queries outside the data range evaluate the first or last segment polynomial,
/// so the spline extrapolates instead of clamping.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    /// Per segment: [cubic, quadratic, linear, constant] in powers of (x - x_i)
    coeffs: Vec<[f64; 4]>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, AppError> {
        let n = x.len();
        if n != y.len() {
            return Err(AppError::invalid(format!(
                "spline: x has {} points, y has {}",
                n,
                y.len()
            )));
        }
        if n < 2 {
            return Err(AppError::invalid("spline: at least 2 points are required"));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(AppError::invalid(
                "spline: x values must be strictly increasing",
            ));
        }

        let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let slope: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / dx[i]).collect();

        let s = match n {
            2 => vec![slope[0], slope[0]],
            // Not-a-knot on 3 points collapses to the interpolating parabola
            3 => {
                let c = (slope[1] - slope[0]) / (x[2] - x[0]);
                vec![
                    slope[0] - c * dx[0],
                    slope[0] + c * dx[0],
                    slope[1] + c * dx[1],
                ]
            }
            _ => not_a_knot_slopes(x, &dx, &slope),
        };

        let coeffs = (0..n - 1)
            .map(|i| {
                let t = (s[i] + s[i + 1] - 2.0 * slope[i]) / dx[i];
                [t / dx[i], (slope[i] - s[i]) / dx[i] - t, s[i], y[i]]
            })
            .collect();

        Ok(Self {
            x: x.to_vec(),
            coeffs,
        })
    }

    pub fn eval(&self, xq: f64) -> f64 {
        let last = self.coeffs.len() - 1;
        let seg = match self.x.binary_search_by(|v| v.total_cmp(&xq)) {
            Ok(i) => i.min(last),
            Err(0) => 0,
            Err(i) => (i - 1).min(last),
        };
        let t = xq - self.x[seg];
        let c = &self.coeffs[seg];
        ((c[0] * t + c[1]) * t + c[2]) * t + c[3]
    }

    pub fn eval_many(&self, xq: &[f64]) -> Vec<f64> {
        xq.iter().map(|&v| self.eval(v)).collect()
    }
}

/// First-derivative values at the knots for a not-a-knot spline (n >= 4).
/// Tridiagonal system solved with the Thomas algorithm.
fn not_a_knot_slopes(x: &[f64], dx: &[f64], slope: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut lower = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut upper = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    for i in 1..n - 1 {
        lower[i] = dx[i];
        diag[i] = 2.0 * (dx[i - 1] + dx[i]);
        upper[i] = dx[i - 1];
        rhs[i] = 3.0 * (dx[i] * slope[i - 1] + dx[i - 1] * slope[i]);
    }

    let d0 = x[2] - x[0];
    diag[0] = dx[1];
    upper[0] = d0;
    rhs[0] = ((dx[0] + 2.0 * d0) * dx[1] * slope[0] + dx[0] * dx[0] * slope[1]) / d0;

    let dn = x[n - 1] - x[n - 3];
    diag[n - 1] = dx[n - 3];
    lower[n - 1] = dn;
    rhs[n - 1] = (dx[n - 2] * dx[n - 2] * slope[n - 3]
        + (2.0 * dn + dx[n - 2]) * dx[n - 3] * slope[n - 2])
        / dn;

    // Forward sweep
    for i in 1..n {
        let w = lower[i] / diag[i - 1];
        diag[i] -= w * upper[i - 1];
        rhs[i] -= w * rhs[i - 1];
    }

    // Back substitution
    let mut s = vec![0.0; n];
    s[n - 1] = rhs[n - 1] / diag[n - 1];
    for i in (0..n - 1).rev() {
        s[i] = (rhs[i] - upper[i] * s[i + 1]) / diag[i];
    }
    s
}
