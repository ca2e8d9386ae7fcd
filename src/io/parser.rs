use std::path::Path;

use tracing::{debug, warn};

use crate::error::AppError;

use super::Impulse;

/// Size of the fixed ARTA `.pir` header.
const PIR_HEADER_LEN: usize = 80;

/// Load an impulse, picking the reader from the file extension.
///
/// WAV and ARTA PIR carry their own sample rate. Raw float32 (`.pcm`, `.bin`,
/// `.f32`) and text files need `sample_rate`.
pub fn read_impulse(path: &Path, sample_rate: Option<f64>) -> Result<Impulse, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string();

    let (fs, samples) = match ext.as_str() {
        "wav" => {
            let (fs, samples) = read_wav(path)?;
            if let Some(user_fs) = sample_rate {
                if (user_fs - fs).abs() > f64::EPSILON {
                    warn!("{}: using the WAV sample rate {} Hz, not {} Hz", name, fs, user_fs);
                }
            }
            (fs, samples)
        }
        "pir" => parse_pir(&std::fs::read(path)?)?,
        "pcm" | "bin" | "f32" => {
            let fs = require_rate(sample_rate, &name)?;
            (fs, parse_pcm_f32(&std::fs::read(path)?)?)
        }
        _ => {
            let fs = require_rate(sample_rate, &name)?;
            (fs, parse_text(&std::fs::read_to_string(path)?)?)
        }
    };

    if samples.is_empty() {
        return Err(AppError::Parse {
            message: format!("{name}: no samples found"),
        });
    }
    debug!("{}: {} samples at {} Hz", name, samples.len(), fs);

    Ok(Impulse {
        name,
        sample_rate: fs,
        samples,
        source_path: Some(path.to_path_buf()),
    })
}

fn require_rate(sample_rate: Option<f64>, name: &str) -> Result<f64, AppError> {
    match sample_rate {
        Some(fs) if fs > 0.0 => Ok(fs),
        Some(fs) => Err(AppError::invalid(format!(
            "{name}: sample rate must be positive, got {fs}"
        ))),
        None => Err(AppError::invalid(format!(
            "{name}: raw and text impulses need an explicit sample rate"
        ))),
    }
}

/// First channel of a WAV file as floats in ±1.0.
///
/// Integer PCM is scaled by `2^(bits - 1)`, float data is passed through.
pub fn read_wav(path: &Path) -> Result<(f64, Vec<f64>), AppError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 2f64.powi(spec.bits_per_sample as i32 - 1);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    if channels > 1 {
        debug!("WAV has {} channels, keeping the first", channels);
    }
    let samples = interleaved.into_iter().step_by(channels).collect();
    Ok((spec.sample_rate as f64, samples))
}

/// ARTA `.pir` impulse: 80-byte little-endian header, info block, float32 samples.
///
/// Header layout (offsets in bytes): `"PIR\0"` 0, version 4, info size 8,
/// sample rate 24, sample count 28.
pub fn parse_pir(bytes: &[u8]) -> Result<(f64, Vec<f64>), AppError> {
    if bytes.len() < PIR_HEADER_LEN {
        return Err(AppError::Parse {
            message: format!("PIR file too short: {} bytes", bytes.len()),
        });
    }
    if &bytes[0..4] != b"PIR\0" {
        return Err(AppError::Parse {
            message: "missing PIR signature".to_string(),
        });
    }
    let i32_at = |off: usize| {
        i32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
    };

    let info_size = i32_at(8);
    let sample_rate = i32_at(24);
    let length = i32_at(28);
    if info_size < 0 || length < 0 || sample_rate <= 0 {
        return Err(AppError::Parse {
            message: format!(
                "invalid PIR header: info size {info_size}, sample rate {sample_rate}, length {length}"
            ),
        });
    }

    let start = PIR_HEADER_LEN + info_size as usize;
    let end = start + 4 * length as usize;
    if bytes.len() < end {
        return Err(AppError::Parse {
            message: format!(
                "PIR data truncated: need {} bytes, file has {}",
                end,
                bytes.len()
            ),
        });
    }
    let samples = parse_pcm_f32(&bytes[start..end])?;
    Ok((sample_rate as f64, samples))
}

/// Raw little-endian float32 samples.
pub fn parse_pcm_f32(bytes: &[u8]) -> Result<Vec<f64>, AppError> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Parse {
            message: format!("raw float32 data length {} is not a multiple of 4", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
        .collect())
}

/// Whitespace-separated float samples; `#` starts a comment line.
pub fn parse_text(content: &str) -> Result<Vec<f64>, AppError> {
    let mut samples = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        for tok in trimmed.split_whitespace() {
            let v: f64 = tok.parse().map_err(|_| AppError::Parse {
                message: format!("Invalid sample value: '{tok}'"),
            })?;
            samples.push(v);
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pir_bytes(fs: i32, info: &[u8], samples: &[f32]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"PIR\0");
        buf.extend_from_slice(&0x0100u32.to_le_bytes()); // version
        buf.extend_from_slice(&(info.len() as i32).to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes()); // reserved1
        buf.extend_from_slice(&0i32.to_le_bytes()); // reserved2
        buf.extend_from_slice(&(fs as f32 / 1000.0).to_le_bytes());
        buf.extend_from_slice(&fs.to_le_bytes());
        buf.extend_from_slice(&(samples.len() as i32).to_le_bytes());
        buf.resize(PIR_HEADER_LEN, 0);
        buf.extend_from_slice(info);
        for s in samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        buf
    }

    #[test]
    fn test_parse_pir() {
        let bytes = pir_bytes(48000, b"left woofer", &[0.0, 1.0, -0.5]);
        let (fs, x) = parse_pir(&bytes).unwrap();
        assert_eq!(fs, 48000.0);
        assert_eq!(x, vec![0.0, 1.0, -0.5]);
    }

    #[test]
    fn test_parse_pir_rejects_bad_input() {
        assert!(parse_pir(b"PIR\0").is_err());
        let mut bytes = pir_bytes(44100, b"", &[1.0, 2.0]);
        bytes[0] = b'X';
        assert!(parse_pir(&bytes).is_err());
        let bytes = pir_bytes(44100, b"", &[1.0, 2.0]);
        assert!(parse_pir(&bytes[..bytes.len() - 2]).is_err());
    }

    #[test]
    fn test_parse_text() {
        let x = parse_text("# impulse\n0.0 1.0\n\n-0.25\n").unwrap();
        assert_eq!(x, vec![0.0, 1.0, -0.25]);
        assert!(parse_text("0.0 abc").is_err());
    }

    #[test]
    fn test_parse_pcm_f32() {
        let mut bytes = Vec::new();
        for v in [0.5f32, -1.0, 0.25] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(parse_pcm_f32(&bytes).unwrap(), vec![0.5, -1.0, 0.25]);
        assert!(parse_pcm_f32(&bytes[..5]).is_err());
    }

    #[test]
    fn test_read_wav_int16_first_channel() {
        let tmp = std::env::temp_dir().join("firtools_test_read_stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&tmp, spec).unwrap();
        for (l, r) in [(16384i16, 1i16), (-32768, 2), (0, 3)] {
            writer.write_sample(l).unwrap();
            writer.write_sample(r).unwrap();
        }
        writer.finalize().unwrap();

        let imp = read_impulse(&tmp, None).unwrap();
        assert_eq!(imp.sample_rate, 44100.0);
        assert_eq!(imp.samples, vec![0.5, -1.0, 0.0]);

        let _ = std::fs::remove_file(&tmp);
    }

    #[test]
    fn test_raw_needs_sample_rate() {
        let tmp = std::env::temp_dir().join("firtools_test_needs_rate.pcm");
        std::fs::write(&tmp, 1.0f32.to_le_bytes()).unwrap();
        assert!(read_impulse(&tmp, None).is_err());
        let imp = read_impulse(&tmp, Some(96000.0)).unwrap();
        assert_eq!(imp.samples, vec![1.0]);
        assert_eq!(imp.name, "firtools_test_needs_rate.pcm");
        let _ = std::fs::remove_file(&tmp);
    }
}
