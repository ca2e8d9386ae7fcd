//! ISO preferred-number frequency series.
//!
//! | series | spacing       | approx. octave fraction |
//! |--------|---------------|-------------------------|
//! | R10    | 1/10 decade   | 1/3 octave              |
//! | R20    | 1/20 decade   | 1/6 octave              |
//! | R40    | 1/40 decade   | 1/12 octave             |
//! | R80    | 1/80 decade   | 1/24 octave             |
//!
//! Every table runs from 1 Hz to 100 kHz.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsoSeries {
    R10,
    R20,
    R40,
    R80,
}

impl IsoSeries {
    pub fn table(self) -> &'static [f64] {
        match self {
            IsoSeries::R10 => &R10,
            IsoSeries::R20 => &R20,
            IsoSeries::R40 => &R40,
            IsoSeries::R80 => &R80,
        }
    }
}

impl FromStr for IsoSeries {
    type Err = AppError;

    /// Accepts the series name or its octave fraction (`R20` == `1/6`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R10" | "1/3" => Ok(IsoSeries::R10),
            "R20" | "1/6" => Ok(IsoSeries::R20),
            "R40" | "1/12" => Ok(IsoSeries::R40),
            "R80" | "1/24" => Ok(IsoSeries::R80),
            other => Err(AppError::invalid(format!(
                "unknown ISO series '{other}', use one of R10, R20, R40, R80, 1/3, 1/6, 1/12, 1/24"
            ))),
        }
    }
}

impl fmt::Display for IsoSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsoSeries::R10 => "R10",
            IsoSeries::R20 => "R20",
            IsoSeries::R40 => "R40",
            IsoSeries::R80 => "R80",
        };
        f.write_str(name)
    }
}

/// Slice of `series` from `f_min` (must be a member of the series) up to the last
/// frequency not above Nyquist.
pub fn get_iso_r(series: IsoSeries, sample_rate: f64, f_min: f64) -> Result<Vec<f64>, AppError> {
    if sample_rate <= 0.0 {
        return Err(AppError::invalid(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    let table = series.table();
    let nyquist = sample_rate / 2.0;

    let start = table
        .iter()
        .position(|&f| (f - f_min).abs() < 1e-9)
        .ok_or_else(|| {
            AppError::invalid(format!("{f_min} Hz is not a member of the {series} series"))
        })?;
    let stop = table
        .iter()
        .rposition(|&f| f <= nyquist)
        .ok_or_else(|| AppError::invalid(format!("no {series} frequency below {nyquist} Hz")))?;

    if stop < start {
        return Err(AppError::invalid(format!(
            "f_min {f_min} Hz is above Nyquist {nyquist} Hz"
        )));
    }
    Ok(table[start..=stop].to_vec())
}

pub static R10: [f64; 51] = [
    1.0, 1.25, 1.6, 2.0, 2.5, 3.15, 4.0, 5.0, 6.3, 8.0, 10.0, 12.5, 16.0, 20.0, 25.0, 31.5, 40.0,
    50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0, 500.0, 630.0, 800.0,
    1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0, 8000.0, 10000.0,
    12500.0, 16000.0, 20000.0, 25000.0, 31500.0, 40000.0, 50000.0, 63000.0, 80000.0, 100000.0,
];

pub static R20: [f64; 101] = [
    1.0, 1.12, 1.25, 1.4, 1.6, 1.8, 2.0, 2.24, 2.5, 2.8, 3.15, 3.55, 4.0, 4.5, 5.0, 5.6, 6.3, 7.1,
    8.0, 9.0, 10.0, 11.2, 12.5, 14.0, 16.0, 18.0, 20.0, 22.4, 25.0, 28.0, 31.5, 35.5, 40.0, 45.0,
    50.0, 56.0, 63.0, 71.0, 80.0, 90.0, 100.0, 112.0, 125.0, 140.0, 160.0, 180.0, 200.0, 224.0,
    250.0, 280.0, 315.0, 355.0, 400.0, 450.0, 500.0, 560.0, 630.0, 710.0, 800.0, 900.0, 1000.0,
    1120.0, 1250.0, 1400.0, 1600.0, 1800.0, 2000.0, 2240.0, 2500.0, 2800.0, 3150.0, 3550.0,
    4000.0, 4500.0, 5000.0, 5600.0, 6300.0, 7100.0, 8000.0, 9000.0, 10000.0, 11200.0, 12500.0,
    14000.0, 16000.0, 18000.0, 20000.0, 22400.0, 25000.0, 28000.0, 31500.0, 35500.0, 40000.0,
    45000.0, 50000.0, 56000.0, 63000.0, 71000.0, 80000.0, 90000.0, 100000.0,
];

pub static R40: [f64; 201] = [
    1.0, 1.06, 1.12, 1.18, 1.25, 1.32, 1.4, 1.5, 1.6, 1.7, 1.8, 1.9, 2.0, 2.12, 2.24, 2.36, 2.5,
    2.65, 2.8, 3.0, 3.15, 3.35, 3.55, 3.75, 4.0, 4.25, 4.5, 4.75, 5.0, 5.3, 5.6, 6.0, 6.3, 6.7, 7.1,
    7.5, 8.0, 8.5, 9.0, 9.5, 10.0, 10.6, 11.2, 11.8, 12.5, 13.2, 14.0, 15.0, 16.0, 17.0, 18.0,
    19.0, 20.0, 21.2, 22.4, 23.6, 25.0, 26.5, 28.0, 30.0, 31.5, 33.5, 35.5, 37.5, 40.0, 42.5, 45.0,
    47.5, 50.0, 53.0, 56.0, 60.0, 63.0, 67.0, 71.0, 75.0, 80.0, 85.0, 90.0, 95.0, 100.0, 106.0,
    112.0, 118.0, 125.0, 132.0, 140.0, 150.0, 160.0, 170.0, 180.0, 190.0, 200.0, 212.0, 224.0,
    236.0, 250.0, 265.0, 280.0, 300.0, 315.0, 335.0, 355.0, 375.0, 400.0, 425.0, 450.0, 475.0,
    500.0, 530.0, 560.0, 600.0, 630.0, 670.0, 710.0, 750.0, 800.0, 850.0, 900.0, 950.0, 1000.0,
    1060.0, 1120.0, 1180.0, 1250.0, 1320.0, 1400.0, 1500.0, 1600.0, 1700.0, 1800.0, 1900.0,
    2000.0, 2120.0, 2240.0, 2360.0, 2500.0, 2650.0, 2800.0, 3000.0, 3150.0, 3350.0, 3550.0,
    3750.0, 4000.0, 4250.0, 4500.0, 4750.0, 5000.0, 5300.0, 5600.0, 6000.0, 6300.0, 6700.0,
    7100.0, 7500.0, 8000.0, 8500.0, 9000.0, 9500.0, 10000.0, 10600.0, 11200.0, 11800.0, 12500.0,
    13200.0, 14000.0, 15000.0, 16000.0, 17000.0, 18000.0, 19000.0, 20000.0, 21200.0, 22400.0,
    23600.0, 25000.0, 26500.0, 28000.0, 30000.0, 31500.0, 33500.0, 35500.0, 37500.0, 40000.0,
    42500.0, 45000.0, 47500.0, 50000.0, 53000.0, 56000.0, 60000.0, 63000.0, 67000.0, 71000.0,
    75000.0, 80000.0, 85000.0, 90000.0, 95000.0, 100000.0,
];

pub static R80: [f64; 401] = [
    1.0, 1.03, 1.06, 1.09, 1.12, 1.15, 1.18, 1.22, 1.25, 1.28, 1.32, 1.36, 1.4, 1.45, 1.5, 1.55,
    1.6, 1.65, 1.7, 1.75, 1.8, 1.85, 1.9, 1.95, 2.0, 2.06, 2.12, 2.18, 2.24, 2.3, 2.36, 2.43, 2.5,
    2.58, 2.65, 2.72, 2.8, 2.9, 3.0, 3.07, 3.15, 3.25, 3.35, 3.45, 3.55, 3.65, 3.75, 3.87, 4.0,
    4.12, 4.25, 4.37, 4.5, 4.62, 4.75, 4.87, 5.0, 5.15, 5.3, 5.45, 5.6, 5.8, 6.0, 6.15, 6.3, 6.5,
    6.7, 6.9, 7.1, 7.3, 7.5, 7.75, 8.0, 8.25, 8.5, 8.75, 9.0, 9.25, 9.5, 9.75, 10.0, 10.3, 10.6,
    10.9, 11.2, 11.5, 11.8, 12.2, 12.5, 12.8, 13.2, 13.6, 14.0, 14.5, 15.0, 15.5, 16.0, 16.5, 17.0,
    17.5, 18.0, 18.5, 19.0, 19.5, 20.0, 20.6, 21.2, 21.8, 22.4, 23.0, 23.6, 24.3, 25.0, 25.8, 26.5,
    27.2, 28.0, 29.0, 30.0, 30.7, 31.5, 32.5, 33.5, 34.5, 35.5, 36.5, 37.5, 38.7, 40.0, 41.2, 42.5,
    43.7, 45.0, 46.2, 47.5, 48.7, 50.0, 51.5, 53.0, 54.5, 56.0, 58.0, 60.0, 61.5, 63.0, 65.0, 67.0,
    69.0, 71.0, 73.0, 75.0, 77.5, 80.0, 82.5, 85.0, 87.5, 90.0, 92.5, 95.0, 97.5, 100.0, 103.0,
    106.0, 109.0, 112.0, 115.0, 118.0, 122.0, 125.0, 128.0, 132.0, 136.0, 140.0, 145.0, 150.0,
    155.0, 160.0, 165.0, 170.0, 175.0, 180.0, 185.0, 190.0, 195.0, 200.0, 206.0, 212.0, 218.0,
    224.0, 230.0, 236.0, 243.0, 250.0, 258.0, 265.0, 272.0, 280.0, 290.0, 300.0, 307.0, 315.0,
    325.0, 335.0, 345.0, 355.0, 365.0, 375.0, 387.0, 400.0, 412.0, 425.0, 437.0, 450.0, 462.0,
    475.0, 487.0, 500.0, 515.0, 530.0, 545.0, 560.0, 580.0, 600.0, 615.0, 630.0, 650.0, 670.0,
    690.0, 710.0, 730.0, 750.0, 775.0, 800.0, 825.0, 850.0, 875.0, 900.0, 925.0, 950.0, 975.0,
    1000.0, 1030.0, 1060.0, 1090.0, 1120.0, 1150.0, 1180.0, 1220.0, 1250.0, 1280.0, 1320.0,
    1360.0, 1400.0, 1450.0, 1500.0, 1550.0, 1600.0, 1650.0, 1700.0, 1750.0, 1800.0, 1850.0,
    1900.0, 1950.0, 2000.0, 2060.0, 2120.0, 2180.0, 2240.0, 2300.0, 2360.0, 2430.0, 2500.0,
    2580.0, 2650.0, 2720.0, 2800.0, 2900.0, 3000.0, 3070.0, 3150.0, 3250.0, 3350.0, 3450.0,
    3550.0, 3650.0, 3750.0, 3870.0, 4000.0, 4120.0, 4250.0, 4370.0, 4500.0, 4620.0, 4750.0,
    4870.0, 5000.0, 5150.0, 5300.0, 5450.0, 5600.0, 5800.0, 6000.0, 6150.0, 6300.0, 6500.0,
    6700.0, 6900.0, 7100.0, 7300.0, 7500.0, 7750.0, 8000.0, 8250.0, 8500.0, 8750.0, 9000.0,
    9250.0, 9500.0, 9750.0, 10000.0, 10300.0, 10600.0, 10900.0, 11200.0, 11500.0, 11800.0,
    12200.0, 12500.0, 12800.0, 13200.0, 13600.0, 14000.0, 14500.0, 15000.0, 15500.0, 16000.0,
    16500.0, 17000.0, 17500.0, 18000.0, 18500.0, 19000.0, 19500.0, 20000.0, 20600.0, 21200.0,
    21800.0, 22400.0, 23000.0, 23600.0, 24300.0, 25000.0, 25800.0, 26500.0, 27200.0, 28000.0,
    29000.0, 30000.0, 30700.0, 31500.0, 32500.0, 33500.0, 34500.0, 35500.0, 36500.0, 37500.0,
    38700.0, 40000.0, 41200.0, 42500.0, 43700.0, 45000.0, 46200.0, 47500.0, 48700.0, 50000.0,
    51500.0, 53000.0, 54500.0, 56000.0, 58000.0, 60000.0, 61500.0, 63000.0, 65000.0, 67000.0,
    69000.0, 71000.0, 73000.0, 75000.0, 77500.0, 80000.0, 82500.0, 85000.0, 87500.0, 90000.0,
    92500.0, 95000.0, 97500.0, 100000.0,
];
