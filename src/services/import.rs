//! Bulk catalog import from `series.csv`, `seasons.csv` and `episodes.csv`.
//!
//! Rows go through the same field schemas as the HTTP API. A row that fails
//! validation or collides with an existing row is logged and skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::StringRecord;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::db::{Store, StoreError};
use crate::resource::{self, Mode};
use crate::services::image::UploadedImageCache;

const SERIES_COLUMNS: &[&str] = &[
    "id",
    "name",
    "air_date",
    "genres",
    "in_production",
    "tagline",
    "image",
    "description",
    "language",
    "network",
    "homepage",
];

const SEASON_COLUMNS: &[&str] = &[
    "name",
    "number",
    "air_date",
    "overview",
    "poster",
    "series_name",
    "series_id",
];

const EPISODE_COLUMNS: &[&str] = &[
    "name",
    "number",
    "air_date",
    "overview",
    "season",
    "series_name",
    "series_id",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub series: usize,
    pub seasons: usize,
    pub episodes: usize,
    pub skipped: usize,
}

pub struct CatalogImporter<'a> {
    store: &'a Store,
    images: &'a UploadedImageCache,
    image_dir: Option<PathBuf>,
}

impl<'a> CatalogImporter<'a> {
    #[must_use]
    pub const fn new(
        store: &'a Store,
        images: &'a UploadedImageCache,
        image_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            images,
            image_dir,
        }
    }

    pub async fn run(&self, data_dir: &Path) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        let series_ids = self
            .import_series(&data_dir.join("series.csv"), &mut summary)
            .await?;
        self.import_seasons(&data_dir.join("seasons.csv"), &series_ids, &mut summary)
            .await?;
        self.import_episodes(&data_dir.join("episodes.csv"), &series_ids, &mut summary)
            .await?;

        info!(
            series = summary.series,
            seasons = summary.seasons,
            episodes = summary.episodes,
            skipped = summary.skipped,
            "Import finished"
        );

        Ok(summary)
    }

    /// Returns a map from the file's series ids to database ids.
    async fn import_series(
        &self,
        path: &Path,
        summary: &mut ImportSummary,
    ) -> Result<HashMap<String, i32>> {
        let mut ids = HashMap::new();

        for (line, record) in read_records(path).await? {
            let row = to_row(&record, SERIES_COLUMNS);

            let fields = match resource::SERIES.validate(&row, Mode::Create) {
                Ok(fields) => fields,
                Err(errors) => {
                    warn!(line, ?errors, "Skipping invalid series row");
                    summary.skipped += 1;
                    continue;
                }
            };

            let image = self.upload(record.get(6)).await;

            let series = match self.store.series().create(&fields, image).await {
                Ok(series) => series,
                Err(e) => {
                    warn!(line, error = %e, "Failed to insert series");
                    summary.skipped += 1;
                    continue;
                }
            };

            for genre in split_genres(record.get(3).unwrap_or_default()) {
                let mut body = Map::new();
                body.insert("name".to_string(), Value::String(genre.to_string()));
                let Ok(valid) = resource::GENRE.validate(&body, Mode::Create) else {
                    warn!(line, genre, "Skipping invalid genre");
                    continue;
                };
                if let Some(name) = valid.get_str("name") {
                    self.store.series().link_genre(series.id, name).await?;
                }
            }

            ids.insert(record.get(0).unwrap_or_default().trim().to_string(), series.id);
            summary.series += 1;
        }

        Ok(ids)
    }

    async fn import_seasons(
        &self,
        path: &Path,
        series_ids: &HashMap<String, i32>,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        for (line, record) in read_records(path).await? {
            let Some(series_id) = record.get(6).and_then(|id| series_ids.get(id.trim())) else {
                warn!(line, "Skipping season of unknown series");
                summary.skipped += 1;
                continue;
            };

            let row = to_row(&record, SEASON_COLUMNS);
            let fields = match resource::SEASON.validate(&row, Mode::Create) {
                Ok(fields) => fields,
                Err(errors) => {
                    warn!(line, ?errors, "Skipping invalid season row");
                    summary.skipped += 1;
                    continue;
                }
            };

            let poster = self.upload(record.get(4)).await;

            match self.store.seasons().create(*series_id, &fields, poster).await {
                Ok(_) => summary.seasons += 1,
                Err(StoreError::Duplicate) => {
                    warn!(line, "Season already exists");
                    summary.skipped += 1;
                }
                Err(e) => return Err(anyhow::Error::new(e).context("Failed to insert season")),
            }
        }

        Ok(())
    }

    async fn import_episodes(
        &self,
        path: &Path,
        series_ids: &HashMap<String, i32>,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        for (line, record) in read_records(path).await? {
            let series_id = record.get(6).and_then(|id| series_ids.get(id.trim()));
            let season_number = record.get(4).and_then(|n| n.trim().parse::<i32>().ok());

            let season = match (series_id, season_number) {
                (Some(series_id), Some(number)) => {
                    self.store.seasons().get(*series_id, number).await?
                }
                _ => None,
            };

            let Some(season) = season else {
                warn!(line, "Skipping episode of unknown season");
                summary.skipped += 1;
                continue;
            };

            let row = to_row(&record, EPISODE_COLUMNS);
            let fields = match resource::EPISODE.validate(&row, Mode::Create) {
                Ok(fields) => fields,
                Err(errors) => {
                    warn!(line, ?errors, "Skipping invalid episode row");
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.store.episodes().create(&season, &fields).await {
                Ok(_) => summary.episodes += 1,
                Err(StoreError::Duplicate) => {
                    warn!(line, "Episode already exists");
                    summary.skipped += 1;
                }
                Err(e) => return Err(anyhow::Error::new(e).context("Failed to insert episode")),
            }
        }

        Ok(())
    }

    /// Upload failures are logged and the row is stored without an image.
    async fn upload(&self, filename: Option<&str>) -> Option<String> {
        let dir = self.image_dir.as_ref()?;
        let filename = filename.map(str::trim).filter(|f| !f.is_empty())?;
        let path = dir.join(filename);

        if !path.is_file() {
            warn!(path = %path.display(), "Image file not found");
            return None;
        }

        match self.images.upload_if_not_uploaded(&path).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Image upload failed");
                None
            }
        }
    }
}

/// Reads every data row after the header, paired with its 1-based line.
async fn read_records(path: &Path) -> Result<Vec<(usize, StringRecord)>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Malformed CSV in {}", path.display()))?;
        records.push((index + 2, record));
    }

    Ok(records)
}

/// Maps positional CSV fields onto named keys for schema validation.
fn to_row(record: &StringRecord, columns: &[&str]) -> Map<String, Value> {
    columns
        .iter()
        .zip(record.iter())
        .map(|(column, value)| ((*column).to_string(), Value::String(value.to_string())))
        .collect()
}

fn split_genres(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|g| !g.is_empty())
}
