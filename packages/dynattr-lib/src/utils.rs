use crate::{config::SchemaConfig, defaults};
use sha2::{Digest, Sha256};
use std::{env, str::FromStr};
use tracing_subscriber::filter::EnvFilter;

const RUST_LOG: &str = "RUST_LOG";
const HUMAN_LOGGING: &str = "HUMAN_LOGGING";

/// Install the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`, or `debug` when the config
/// is verbose). `HUMAN_LOGGING=false` switches to JSON lines. Output goes to
/// stderr so the printed schema stays clean on stdout.
pub fn init_logging(config: &SchemaConfig) -> anyhow::Result<()> {
    let filter = match env::var_os(RUST_LOG) {
        Some(_) => EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid `RUST_LOG` provided: {e}"))?,
        None if config.verbose => EnvFilter::new("debug"),
        None => EnvFilter::new(defaults::LOG_LEVEL),
    };

    let human_logging = match env::var(HUMAN_LOGGING) {
        Ok(s) => bool::from_str(&s).map_err(|_| {
            anyhow::anyhow!(
                "Expected `true` or `false` to be provided for `HUMAN_LOGGING`"
            )
        })?,
        Err(_) => true,
    };

    let sub = tracing_subscriber::fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    if human_logging {
        sub.with_ansi(true)
            .with_level(true)
            .with_line_number(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        sub.with_ansi(false)
            .with_level(true)
            .with_line_number(true)
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    tracing::debug!("Logging initialized.");
    Ok(())
}

/// Returns the lower hex representation of a [`sha2::Sha256`] digest of the provided input.
pub fn sha256_digest<T: AsRef<[u8]>>(b: &T) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_digest() {
        assert_eq!(
            sha256_digest(&"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
