//! sign_relay - forward debounced sign detections to the violation server
//!
//! Reads per-frame prediction JSON from the inference pipeline, one document
//! per line (`{"predictions":{"class_name":[..],"confidence":[..]}}`), picks
//! the dominant sign and posts it to `/detected_sign` when it changes.
//!
//! A failed post is logged and not retried: the announcement is spent.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use signwatch::{
    config::{ConfigOverrides, SignwatchConfig},
    detect::PredictionLines,
    transport::{self, HttpSignSink},
    Decision, SignDebouncer,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Relay debounced sign detections to signwatchd")]
struct Args {
    /// Prediction stream to read; '-' for stdin.
    #[arg(long, default_value = "-")]
    input: String,

    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "SIGNWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// `/detected_sign` URL (overrides config).
    #[arg(long)]
    sign_url: Option<String>,

    /// Minimum seconds between announcements (overrides config).
    #[arg(long)]
    throttle_secs: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let overrides = ConfigOverrides {
        sign_url: args.sign_url,
        throttle_secs: args.throttle_secs,
        ..ConfigOverrides::default()
    };
    let relay = SignwatchConfig::load_with(args.config.as_deref(), &overrides)?.relay;

    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = File::open(&args.input)
            .with_context(|| format!("open prediction stream {}", args.input))?;
        Box::new(BufReader::new(file))
    };

    let sink = HttpSignSink::new(relay.sign_url.clone(), relay.timeout);
    let mut debouncer = SignDebouncer::new(relay.throttle);
    log::info!(
        "sign_relay posting to {} (throttle {:?}, timeout {:?})",
        relay.sign_url,
        relay.throttle,
        relay.timeout
    );

    let mut frames = 0u64;
    let mut announced = 0u64;
    for frame in PredictionLines::new(reader) {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("skipping prediction frame: {:#}", e);
                continue;
            }
        };
        frames += 1;
        let detections = frame.detections();
        match debouncer.decide(&detections, Instant::now()) {
            Decision::Emit(update) => {
                announced += 1;
                log::info!(
                    "new sign detected: {} | confidence: {:.2}",
                    update.sign,
                    update.confidence
                );
                transport::announce(&sink, &update);
            }
            Decision::SameSign(sign) => {
                log::debug!("sign detected ({}), skipping post: same sign", sign);
            }
            Decision::Throttled {
                candidate,
                remaining,
            } => {
                log::debug!(
                    "sign detected ({}), skipping post: throttling (wait {:.2}s)",
                    candidate,
                    remaining.as_secs_f64()
                );
            }
            Decision::NoDetections => {}
        }
    }

    log::info!(
        "prediction stream ended: {} frames, {} announcements",
        frames,
        announced
    );
    Ok(())
}
