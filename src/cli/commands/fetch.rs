//! Fetch command - refresh the repodata caches for a channel

use crate::cache::SubdirCache;
use crate::cli::args::FetchArgs;
use crate::cli::commands::{repodata_url, resolve_cache_dir, validate_channel};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{refresh_all, UreqTransport};
use console::style;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> Result<()> {
    validate_channel(&args.channel)?;

    let mut settings = config.cache.clone();
    if let Some(ttl) = args.ttl {
        settings.local_repodata_ttl = ttl;
    }
    if args.offline {
        settings.offline = true;
    }

    let cache_dir = resolve_cache_dir(args.cache_dir, &settings);

    // The architecture-independent subdir must exist on every channel;
    // platform-specific subdirs are allowed to be missing.
    let mut entries: Vec<SubdirCache> = args
        .platform
        .iter()
        .map(|platform| {
            let url = repodata_url(&args.channel, platform, args.compressed);
            SubdirCache::new(platform.clone(), url, &cache_dir, platform == "noarch")
        })
        .collect();

    let transport = UreqTransport::new(&config.network);
    refresh_all(&mut entries, &transport, &settings).await?;

    for entry in &entries {
        match entry.cache_path() {
            Ok(path) => println!(
                "{} {:<12} {}",
                style("✓").green().bold(),
                entry.name(),
                path.display()
            ),
            Err(_) => println!(
                "{} {:<12} {}",
                style("✗").red().bold(),
                entry.name(),
                style("unavailable").dim()
            ),
        }
    }

    Ok(())
}
