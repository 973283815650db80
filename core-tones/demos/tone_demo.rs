//! Preload and play tones from a directory with the virtual mixer.
//!
//! ```text
//! cargo run -p core-tones --features desktop-shims --example tone_demo -- /path/to/tones ring.wav beep.wav
//! ```

use anyhow::{Context, Result};
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_tones::{PlayOptions, ToneCache, ToneCacheConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))
        .context("failed to initialize logging")?;

    let mut args = std::env::args().skip(1);
    let root = args.next().context("usage: tone_demo <asset-dir> <tone>...")?;
    let tones: Vec<String> = args.collect();

    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let config = ToneCacheConfig::builder()
        .asset_root(root)
        .event_bus(bus)
        .build()?;
    let cache = ToneCache::new(config);
    cache.initialize(tones.len().max(1))?;

    for tone in &tones {
        cache
            .preload(tone)?
            .await
            .with_context(|| format!("failed to load {}", tone))?;
    }

    for tone in &tones {
        cache.play(tone, PlayOptions::once()).await?;
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }

    cache.set_playback_rate(1.5)?;
    cache.pause()?;
    cache.terminate()?;

    while let Ok(event) = events.try_recv() {
        println!("{:<24} {}", event.description(), serde_json::to_string(&event)?);
    }

    Ok(())
}
