//! Clear command - remove the cached repodata for a channel

use crate::cache::SubdirCache;
use crate::cli::args::ClearArgs;
use crate::cli::commands::{repodata_url, resolve_cache_dir, validate_channel};
use crate::config::Config;
use crate::error::Result;
use console::style;

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> Result<()> {
    validate_channel(&args.channel)?;

    let cache_dir = resolve_cache_dir(args.cache_dir, &config.cache);

    // Compressed and uncompressed URLs cache under different stems;
    // clear both.
    for platform in &args.platform {
        for compressed in [false, true] {
            let url = repodata_url(&args.channel, platform, compressed);
            SubdirCache::new(platform.clone(), url, &cache_dir, false).clear()?;
        }
        println!("{} cleared {}", style("✓").green().bold(), platform);
    }

    Ok(())
}
