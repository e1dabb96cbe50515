use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::image_host_from_config;
use crate::config::Config;
use crate::db::Store;
use crate::services::image::UploadedImageCache;
use crate::services::import::CatalogImporter;

pub async fn cmd_import(
    config: &Config,
    data_dir: &Path,
    images: Option<PathBuf>,
) -> anyhow::Result<()> {
    if !data_dir.is_dir() {
        anyhow::bail!("Not a directory: {}", data_dir.display());
    }

    let store = Store::new(&config.general.database_path).await?;
    let cache = UploadedImageCache::new(
        image_host_from_config(config)?,
        config.images.cache_capacity,
        Duration::from_secs(config.images.cache_ttl_seconds),
    );

    let summary = CatalogImporter::new(&store, &cache, images)
        .run(data_dir)
        .await?;

    println!("Import finished");
    println!("  Series:   {}", summary.series);
    println!("  Seasons:  {}", summary.seasons);
    println!("  Episodes: {}", summary.episodes);
    if summary.skipped > 0 {
        println!("  Skipped:  {} (see log for details)", summary.skipped);
    }

    Ok(())
}
