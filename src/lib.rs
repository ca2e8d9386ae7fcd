pub mod biquad;
pub mod crossover;
pub mod dsp;
pub mod error;
pub mod fir;
pub mod inspect;
pub mod io;
pub mod iso;
pub mod loudness;
pub mod phase;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}
