mod parser;

pub use parser::{parse_pcm_f32, parse_pir, parse_text, read_impulse, read_wav};

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Single impulse response loaded from disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Impulse {
    /// File name as given on the command line
    pub name: String,
    /// Hz, > 0
    pub sample_rate: f64,
    pub samples: Vec<f64>,
    pub source_path: Option<PathBuf>,
}

impl Impulse {
    pub fn new(name: impl Into<String>, sample_rate: f64, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            sample_rate,
            samples,
            source_path: None,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Write samples as raw little-endian float32.
pub fn write_pcm_f32(path: &Path, samples: &[f64]) -> Result<(), AppError> {
    let mut buf: Vec<u8> = Vec::with_capacity(samples.len() * 4);
    for &sample in samples {
        buf.extend_from_slice(&(sample as f32).to_le_bytes());
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(&buf)?;
    Ok(())
}

/// C `printf("%.4e")` formatting: `1.2346e+03`, `-5.0000e-01`.
pub fn format_sci(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = format!("{value:.4e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => s,
    }
}

/// Space-separated table, one line per row, every value in `%.4e`.
pub fn write_table(path: &Path, rows: &[Vec<f64>]) -> Result<(), AppError> {
    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row.iter().map(|&v| format_sci(v)).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
