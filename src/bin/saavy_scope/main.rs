//! saavy-scope - headless probe for the scope ring buffer
//!
//! Run with: cargo run -- [sample_rate] [buffer_length] [channels] [seconds]
//!
//! A simulated audio thread writes a test tone while this thread reads
//! snapshots and prints level meters, resizing the buffer halfway through.

mod app;
mod meter;

use app::Scope;
use color_eyre::eyre::{Result as EyreResult, WrapErr};

fn arg<T: std::str::FromStr>(args: &[String], index: usize, name: &str, default: T) -> EyreResult<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .wrap_err_with(|| format!("invalid {name} `{raw}`")),
        None => Ok(default),
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    Scope::new()
        .sample_rate(arg(&args, 0, "sample rate", 48_000.0)?)
        .buffer_length(arg(&args, 1, "buffer length", 4096)?)
        .channels(arg(&args, 2, "channel count", 2)?)
        .seconds(arg(&args, 3, "duration", 3.0)?)
        .run()
}
