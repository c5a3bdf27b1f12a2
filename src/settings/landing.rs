use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cache::{PublicSettings, SettingsCache};
use crate::db::landing::{self, LandingPageInput};
use crate::db::{DbPool, LandingPageSetting, SettingKind};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::storage::{self, FileRules, Upload};
use crate::validation;

const SPEAKERS: &str = "keynote_speakers";
const SPONSORS: &str = "sponsors";
const RESOURCES: &str = "resources";
const TIMELINE: &str = "timeline";
const HERO_BACKGROUND: &str = "hero_background";
const HERO_TEXT: &str = "hero_text";
const HERO_LOGO: &str = "hero_logo";
const HERO_LOGOS_SECONDARY: &str = "hero_logos_secondary";

const TIMELINE_STATUSES: &[&str] = &["active", "upcoming", "completed"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];
const FIXED_RESOURCE_SLOTS: usize = 3;

/// Admin request to add a new landing-page key.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLandingSetting {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<SettingKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeroText {
    #[serde(default)]
    pub title_line1: String,
    #[serde(default)]
    pub title_line2: String,
    #[serde(default)]
    pub theme_label: String,
    #[serde(default)]
    pub theme_text: String,
}

/// Metadata sent along with a resource file.
#[derive(Debug, Clone, Default)]
pub struct ResourceMeta {
    pub title: String,
    pub description: Option<String>,
    pub index: Option<usize>,
}

/// A resource file ready to be streamed back to a visitor.
#[derive(Debug, Clone)]
pub struct ResourceDownload {
    pub path: PathBuf,
    pub download_name: String,
    pub content_type: String,
}

/// Landing-page content, served through an injected cache that every write
/// invalidates before returning.
#[derive(Clone)]
pub struct LandingPageSettings {
    pool: DbPool,
    cache: Arc<dyn SettingsCache>,
    storage_root: PathBuf,
}

impl LandingPageSettings {
    pub fn new(pool: DbPool, cache: Arc<dyn SettingsCache>, storage_root: PathBuf) -> Self {
        Self {
            pool,
            cache,
            storage_root,
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Every setting keyed by name. JSON-typed values are decoded, everything
    /// else is served as the stored string.
    pub async fn public_settings(&self) -> AppResult<Arc<PublicSettings>> {
        if let Some(cached) = self.cache.get() {
            return Ok(cached);
        }

        let generation = self.cache.generation();
        let rows = landing::list_settings(&self.pool).await?;
        let mut settings = Map::new();
        for row in rows {
            settings.insert(row.key.clone(), decode(&row));
        }

        let settings = Arc::new(settings);
        self.cache.put(settings.clone(), generation);
        Ok(settings)
    }

    pub async fn grouped(&self) -> AppResult<BTreeMap<String, Vec<LandingPageSetting>>> {
        let mut groups: BTreeMap<String, Vec<LandingPageSetting>> = BTreeMap::new();
        for row in landing::list_settings(&self.pool).await? {
            let section = row.section.clone().unwrap_or_default();
            groups.entry(section).or_default().push(row);
        }
        Ok(groups)
    }

    pub async fn create(&self, input: NewLandingSetting) -> AppResult<LandingPageSetting> {
        let key = input.key.trim();
        let mut errors = ValidationErrors::new();
        if key.is_empty() {
            errors.add("key", "The key field is required.");
        } else if landing::find_by_key(&self.pool, key).await?.is_some() {
            errors.add("key", "The key has already been taken.");
        }
        errors.into_result()?;

        let row = landing::insert_setting(
            &self.pool,
            &LandingPageInput {
                key: key.to_string(),
                value: Some(input.value.unwrap_or_default()),
                kind: input.kind.unwrap_or(SettingKind::Text),
                section: Some(input.group.unwrap_or_else(|| "general".to_string())),
                description: None,
            },
        )
        .await?;
        self.cache.invalidate();
        tracing::info!(key = %row.key, "landing setting created");
        Ok(row)
    }

    /// Updates the value of the setting named by key (or numeric id). Unknown
    /// keys are created as JSON settings in the landing_page section.
    pub async fn update_or_create(
        &self,
        key_or_id: &str,
        value: Option<String>,
    ) -> AppResult<LandingPageSetting> {
        let value = value.unwrap_or_default();
        let mut existing = landing::find_by_key(&self.pool, key_or_id).await?;
        if existing.is_none() {
            if let Ok(id) = key_or_id.parse::<i64>() {
                existing = landing::get_setting(&self.pool, id).await?;
            }
        }

        let row = match existing {
            Some(current) => {
                let input = LandingPageInput {
                    key: current.key.clone(),
                    value: Some(value),
                    kind: current.kind,
                    section: current.section.clone(),
                    description: current.description.clone(),
                };
                let updated = landing::update_setting(&self.pool, current.id, &input)
                    .await?
                    .ok_or_else(|| AppError::NotFound("setting".to_string()))?;
                tracing::info!(key = %updated.key, "landing setting updated");
                updated
            }
            None => {
                let created = landing::insert_setting(
                    &self.pool,
                    &LandingPageInput {
                        key: key_or_id.to_string(),
                        value: Some(value),
                        kind: SettingKind::Json,
                        section: Some("landing_page".to_string()),
                        description: None,
                    },
                )
                .await?;
                tracing::info!(key = %created.key, "landing setting created on update");
                created
            }
        };

        self.cache.invalidate();
        Ok(row)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let deleted = landing::delete_setting(&self.pool, id).await?;
        self.cache.invalidate();
        if !deleted {
            return Err(AppError::NotFound("setting".to_string()));
        }
        tracing::info!(id, "landing setting deleted");
        Ok(())
    }

    /// Stores `value` as the JSON setting `key`, creating it when missing.
    pub async fn save_json(&self, key: &str, value: &Value) -> AppResult<LandingPageSetting> {
        self.save_json_in(key, value, None).await
    }

    async fn save_json_in(
        &self,
        key: &str,
        value: &Value,
        section: Option<&str>,
    ) -> AppResult<LandingPageSetting> {
        let row = landing::upsert_by_key(
            &self.pool,
            &LandingPageInput {
                key: key.to_string(),
                value: Some(value.to_string()),
                kind: SettingKind::Json,
                section: section.map(str::to_string),
                description: None,
            },
        )
        .await?;
        self.cache.invalidate();
        Ok(row)
    }

    pub async fn save_timeline(&self, timeline: Vec<TimelineEntry>) -> AppResult<Vec<TimelineEntry>> {
        let mut errors = ValidationErrors::new();
        for (i, entry) in timeline.iter().enumerate() {
            validation::required(&mut errors, &format!("timeline.{}.title", i), &entry.title, Some(255));
            validation::required(&mut errors, &format!("timeline.{}.date", i), &entry.date, Some(100));
            if !TIMELINE_STATUSES.contains(&entry.status.as_str()) {
                errors.add(
                    &format!("timeline.{}.status", i),
                    "The selected status is invalid.",
                );
            }
        }
        errors.into_result()?;

        self.save_json(TIMELINE, &json!(timeline)).await?;
        tracing::info!(entries = timeline.len(), "conference timeline saved");
        Ok(timeline)
    }

    /// Saves resource metadata. Incoming fields override stored ones index by
    /// index, so file data from earlier uploads survives.
    pub async fn save_resources(&self, incoming: Vec<Map<String, Value>>) -> AppResult<Vec<Value>> {
        let mut errors = ValidationErrors::new();
        for (i, resource) in incoming.iter().enumerate() {
            if let Some(title) = resource.get("title").and_then(Value::as_str) {
                if title.chars().count() > 255 {
                    errors.add(
                        &format!("resources.{}.title", i),
                        "The title may not be greater than 255 characters.",
                    );
                }
            }
        }
        errors.into_result()?;

        let current = self.json_array(RESOURCES).await?.unwrap_or_default();
        let merged: Vec<Value> = incoming
            .into_iter()
            .enumerate()
            .map(|(i, resource)| match current.get(i) {
                Some(Value::Object(existing)) => {
                    let mut combined = existing.clone();
                    combined.extend(resource);
                    Value::Object(combined)
                }
                _ => Value::Object(resource),
            })
            .collect();

        self.save_json(RESOURCES, &Value::Array(merged.clone())).await?;
        tracing::info!(entries = merged.len(), "resources metadata saved");
        Ok(merged)
    }

    pub async fn save_hero_text(&self, hero: HeroText) -> AppResult<HeroText> {
        let mut errors = ValidationErrors::new();
        validation::required(&mut errors, "hero_text.title_line1", &hero.title_line1, Some(255));
        validation::required(&mut errors, "hero_text.title_line2", &hero.title_line2, Some(255));
        validation::required(&mut errors, "hero_text.theme_label", &hero.theme_label, Some(255));
        validation::required(&mut errors, "hero_text.theme_text", &hero.theme_text, Some(500));
        errors.into_result()?;

        self.save_json_in(HERO_TEXT, &json!(hero), Some("landing_page"))
            .await?;
        tracing::info!("hero text saved");
        Ok(hero)
    }

    pub async fn upload_speaker_photo(&self, index: usize, upload: &Upload) -> AppResult<String> {
        self.replace_list_image(SPEAKERS, "speaker", "photo", "speakers", index, upload, &storage::SPEAKER_PHOTO)
            .await
    }

    pub async fn upload_sponsor_logo(&self, index: usize, upload: &Upload) -> AppResult<String> {
        self.replace_list_image(SPONSORS, "sponsor", "logo", "sponsors", index, upload, &storage::SPONSOR_LOGO)
            .await
    }

    /// Stores a new image for entry `index` of a JSON list and returns its URL.
    /// The previous image is removed.
    #[allow(clippy::too_many_arguments)]
    async fn replace_list_image(
        &self,
        key: &str,
        entry: &str,
        field: &str,
        dir: &str,
        index: usize,
        upload: &Upload,
        rules: &FileRules,
    ) -> AppResult<String> {
        let mut items = self
            .json_array(key)
            .await?
            .ok_or_else(|| AppError::NotFound("setting".to_string()))?;
        let Some(Value::Object(item)) = items.get_mut(index) else {
            return Err(AppError::NotFound(format!("{} at index {}", entry, index)));
        };

        let relative = storage::store_upload(&self.storage_root, dir, upload, rules).await?;
        let url = storage::public_url(&relative);
        if let Some(old) = item.get(field).and_then(Value::as_str).filter(|v| !v.is_empty()) {
            storage::discard(&self.storage_root, old).await;
        }
        item.insert(field.to_string(), Value::from(url.clone()));

        self.save_json(key, &Value::Array(items)).await?;
        tracing::info!(key, index, url = %url, "landing image uploaded");
        Ok(url)
    }

    /// Stores a resource file and records it at `meta.index`, or appends it.
    /// The list always keeps at least the three fixed slots.
    pub async fn upload_resource_file(&self, meta: ResourceMeta, upload: &Upload) -> AppResult<Value> {
        let mut errors = ValidationErrors::new();
        validation::required(&mut errors, "title", &meta.title, Some(255));
        if let Err(upload_errors) = storage::validate_upload(upload, &storage::RESOURCE_FILE) {
            for (field, messages) in upload_errors.fields() {
                for message in messages {
                    errors.add(field, message.clone());
                }
            }
        }
        errors.into_result()?;

        let mut resources = self.json_array(RESOURCES).await?.unwrap_or_default();
        while resources.len() < FIXED_RESOURCE_SLOTS {
            resources.push(json!({}));
        }

        let relative =
            storage::store_upload(&self.storage_root, RESOURCES, upload, &storage::RESOURCE_FILE).await?;
        let resource = json!({
            "title": meta.title,
            "description": meta.description.unwrap_or_default(),
            "file_url": storage::public_url(&relative),
            "file_type": upload.extension().unwrap_or_default(),
            "file_size": format_bytes(upload.bytes.len() as u64),
        });

        match meta.index {
            Some(index) => {
                while resources.len() <= index {
                    resources.push(json!({ "title": "", "description": "" }));
                }
                resources[index] = resource.clone();
                tracing::info!(index, "resource replaced");
            }
            None => {
                resources.push(resource.clone());
                tracing::info!("resource appended");
            }
        }

        self.save_json(RESOURCES, &Value::Array(resources)).await?;
        Ok(resource)
    }

    /// Replaces the hero background. Video extensions are recorded as
    /// `video`, everything else as `image`.
    pub async fn upload_hero_background(&self, upload: &Upload) -> AppResult<Value> {
        let relative =
            storage::store_upload(&self.storage_root, "hero", upload, &storage::HERO_BACKGROUND).await?;

        if let Some(previous) = landing::find_by_key(&self.pool, HERO_BACKGROUND).await? {
            let old_url = previous
                .value
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                .and_then(|old| old.get("url").and_then(Value::as_str).map(str::to_string));
            if let Some(old_url) = old_url {
                storage::discard(&self.storage_root, &old_url).await;
            }
        }

        let extension = upload.extension().unwrap_or_default();
        let kind = if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            "video"
        } else {
            "image"
        };
        let filename = relative.rsplit('/').next().unwrap_or(&relative).to_string();
        let hero = json!({
            "url": storage::public_url(&relative),
            "type": kind,
            "filename": filename,
        });

        self.save_json_in(HERO_BACKGROUND, &hero, Some("landing_page"))
            .await?;
        tracing::info!(kind, "hero background uploaded");
        Ok(hero)
    }

    /// Replaces the centre logo of the hero section, stored as `{url, filename}`.
    pub async fn upload_hero_logo(&self, upload: &Upload) -> AppResult<Value> {
        let relative =
            storage::store_upload(&self.storage_root, "hero", upload, &storage::HERO_LOGO).await?;

        if let Some(previous) = landing::find_by_key(&self.pool, HERO_LOGO).await? {
            let old_url = previous
                .value
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                .and_then(|old| old.get("url").and_then(Value::as_str).map(str::to_string));
            if let Some(old_url) = old_url {
                storage::discard(&self.storage_root, &old_url).await;
            }
        }

        let logo = logo_entry(&relative);
        self.save_json_in(HERO_LOGO, &logo, Some("landing_page")).await?;
        tracing::info!(url = %logo["url"], "hero logo uploaded");
        Ok(logo)
    }

    /// Appends a logo to the secondary hero logo row and returns the new list.
    pub async fn add_secondary_hero_logo(&self, upload: &Upload) -> AppResult<Vec<Value>> {
        let relative =
            storage::store_upload(&self.storage_root, "hero", upload, &storage::HERO_LOGO).await?;

        let mut logos = self.json_array(HERO_LOGOS_SECONDARY).await?.unwrap_or_default();
        logos.push(logo_entry(&relative));

        self.save_json_in(HERO_LOGOS_SECONDARY, &Value::Array(logos.clone()), Some("landing_page"))
            .await?;
        tracing::info!(count = logos.len(), "secondary hero logo added");
        Ok(logos)
    }

    /// Removes secondary logo `index` and its file. Later logos shift down.
    pub async fn delete_secondary_hero_logo(&self, index: usize) -> AppResult<Vec<Value>> {
        let mut logos = self
            .json_array(HERO_LOGOS_SECONDARY)
            .await?
            .filter(|logos| !logos.is_empty())
            .ok_or_else(|| AppError::NotFound("secondary logos".to_string()))?;
        if index >= logos.len() {
            return Err(AppError::NotFound(format!("logo at index {}", index)));
        }

        let removed = logos.remove(index);
        if let Some(url) = removed.get("url").and_then(Value::as_str) {
            storage::discard(&self.storage_root, url).await;
        }

        self.save_json_in(HERO_LOGOS_SECONDARY, &Value::Array(logos.clone()), Some("landing_page"))
            .await?;
        tracing::info!(index, remaining = logos.len(), "secondary hero logo deleted");
        Ok(logos)
    }

    /// Locates resource `index` on disk. The download name is the resource
    /// title, lowercased and dashed, with the file type as extension.
    pub async fn resource_download(&self, index: usize) -> AppResult<ResourceDownload> {
        let resources = self
            .json_array(RESOURCES)
            .await?
            .ok_or_else(|| AppError::NotFound("resources".to_string()))?;
        let resource = resources
            .get(index)
            .and_then(Value::as_object)
            .ok_or_else(|| AppError::NotFound("resource".to_string()))?;

        let file = string_field(resource, &["file_url", "file"])
            .ok_or_else(|| AppError::NotFound("file".to_string()))?;
        let path = storage::resolve(&self.storage_root, file)
            .filter(|path| path.is_file())
            .ok_or_else(|| AppError::NotFound("file".to_string()))?;

        let extension = string_field(resource, &["file_type", "type"])
            .map(str::to_ascii_lowercase)
            .or_else(|| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase)
            })
            .unwrap_or_default();

        let title = string_field(resource, &["title"]).unwrap_or_default();
        let stem = if title.trim().is_empty() {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("resource")
                .to_string()
        } else {
            title.to_lowercase().replace(' ', "-")
        };

        Ok(ResourceDownload {
            download_name: format!("{}.{}", stem, extension),
            content_type: content_type_for(&extension),
            path,
        })
    }

    async fn json_array(&self, key: &str) -> AppResult<Option<Vec<Value>>> {
        let Some(row) = landing::find_by_key(&self.pool, key).await? else {
            return Ok(None);
        };
        let items = row
            .value
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .and_then(|value| match value {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default();
        Ok(Some(items))
    }
}

fn decode(row: &LandingPageSetting) -> Value {
    match (&row.kind, row.value.as_deref()) {
        (_, None) => Value::Null,
        (SettingKind::Json, Some(raw)) => serde_json::from_str(raw).unwrap_or(Value::Null),
        (_, Some(raw)) => Value::from(raw),
    }
}

fn logo_entry(relative: &str) -> Value {
    let filename = relative.rsplit('/').next().unwrap_or(relative);
    json!({
        "url": storage::public_url(relative),
        "filename": filename,
    })
}

fn string_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|value| !value.is_empty())
}

fn content_type_for(extension: &str) -> String {
    let known = match extension {
        "pdf" => Some("application/pdf"),
        "pptx" => Some("application/vnd.openxmlformats-officedocument.presentationml.presentation"),
        "ppt" => Some("application/vnd.ms-powerpoint"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "doc" => Some("application/msword"),
        "txt" => Some("text/plain"),
        _ => None,
    };
    known
        .map(str::to_string)
        .or_else(|| mime_guess::from_ext(extension).first_raw().map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Human-readable size with two decimals, e.g. `1.5 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::settings::InMemorySettingsCache;
    use std::sync::Mutex;

    async fn service() -> (LandingPageSettings, tempfile::TempDir) {
        let pool = create_memory_pool().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let settings = LandingPageSettings::new(
            pool,
            Arc::new(InMemorySettingsCache::new()),
            dir.path().to_path_buf(),
        );
        (settings, dir)
    }

    /// Lets another writer update the store between a reader's query and
    /// its `put`.
    struct WriteBeforePut {
        inner: Arc<InMemorySettingsCache>,
        writer: Mutex<Option<LandingPageSettings>>,
    }

    impl SettingsCache for WriteBeforePut {
        fn get(&self) -> Option<Arc<PublicSettings>> {
            self.inner.get()
        }

        fn generation(&self) -> u64 {
            self.inner.generation()
        }

        fn put(&self, settings: Arc<PublicSettings>, generation: u64) {
            let writer = self.writer.lock().unwrap().take();
            if let Some(writer) = writer {
                tokio::task::block_in_place(|| {
                    tokio::runtime::Handle::current().block_on(async {
                        writer
                            .update_or_create("contact_phone", Some("+62 274 486 733".into()))
                            .await
                            .unwrap();
                    })
                });
            }
            self.inner.put(settings, generation);
        }

        fn invalidate(&self) {
            self.inner.invalidate();
        }
    }

    fn image(field: &str, name: &str) -> Upload {
        Upload {
            field: field.into(),
            file_name: name.into(),
            bytes: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn public_settings_decode_json_and_keep_text() {
        let (settings, _dir) = service().await;
        let public = settings.public_settings().await.unwrap();
        assert!(public["timeline"].is_array());
        assert_eq!(public["contact_phone"], "+62 21 1234 5678");
        assert_eq!(public["keynote_speakers"][0]["name"], "Dr. John Smith");
    }

    #[tokio::test]
    async fn every_write_invalidates_the_cache() {
        let (settings, _dir) = service().await;
        let before = settings.public_settings().await.unwrap();
        assert_eq!(before["contact_email"], "info@iagi-geosea2026.org");

        settings
            .update_or_create("contact_email", Some("hello@example.org".into()))
            .await
            .unwrap();
        assert_eq!(settings.public_settings().await.unwrap()["contact_email"], "hello@example.org");

        let created = settings
            .create(NewLandingSetting {
                key: "venue".into(),
                value: Some("Yogyakarta".into()),
                group: None,
                kind: None,
            })
            .await
            .unwrap();
        assert_eq!(created.section.as_deref(), Some("general"));
        assert_eq!(settings.public_settings().await.unwrap()["venue"], "Yogyakarta");

        settings.delete(created.id).await.unwrap();
        assert!(!settings.public_settings().await.unwrap().contains_key("venue"));

        settings.save_json("sponsors", &json!([])).await.unwrap();
        assert_eq!(settings.public_settings().await.unwrap()["sponsors"], json!([]));
    }

    #[tokio::test]
    async fn update_of_unknown_key_creates_json_setting() {
        let (settings, _dir) = service().await;
        let row = settings
            .update_or_create("map_embed", Some("{\"lat\":-7.76}".into()))
            .await
            .unwrap();
        assert_eq!(row.kind, SettingKind::Json);
        assert_eq!(row.section.as_deref(), Some("landing_page"));
        assert_eq!(settings.public_settings().await.unwrap()["map_embed"]["lat"], -7.76);
    }

    #[tokio::test]
    async fn duplicate_key_is_rejected() {
        let (settings, _dir) = service().await;
        let err = settings
            .create(NewLandingSetting {
                key: "timeline".into(),
                value: None,
                group: None,
                kind: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.contains("key")));
    }

    #[tokio::test]
    async fn timeline_status_must_be_known() {
        let (settings, _dir) = service().await;
        let err = settings
            .save_timeline(vec![TimelineEntry {
                title: "Camera ready".into(),
                date: "July 1, 2026".into(),
                status: "soon".into(),
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.contains("timeline.0.status")));
    }

    #[tokio::test]
    async fn resource_metadata_merges_with_file_data() {
        let (settings, _dir) = service().await;
        let stored = settings
            .upload_resource_file(
                ResourceMeta {
                    title: "Abstract Template".into(),
                    description: None,
                    index: Some(0),
                },
                &image("file", "template.docx"),
            )
            .await
            .unwrap();
        assert_eq!(stored["file_type"], "docx");
        assert_eq!(stored["file_size"], "3 B");

        let mut renamed = Map::new();
        renamed.insert("title".into(), Value::from("Full Paper Template"));
        let merged = settings.save_resources(vec![renamed]).await.unwrap();
        assert_eq!(merged[0]["title"], "Full Paper Template");
        assert_eq!(merged[0]["file_url"], stored["file_url"]);
    }

    #[tokio::test]
    async fn resource_uploads_pad_fixed_slots_and_download() {
        let (settings, _dir) = service().await;
        settings
            .upload_resource_file(
                ResourceMeta {
                    title: "Poster Guide".into(),
                    description: Some("A1 portrait".into()),
                    index: None,
                },
                &image("file", "guide.pdf"),
            )
            .await
            .unwrap();

        let public = settings.public_settings().await.unwrap();
        let resources = public["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 4);
        assert_eq!(resources[3]["title"], "Poster Guide");

        let download = settings.resource_download(3).await.unwrap();
        assert_eq!(download.download_name, "poster-guide.pdf");
        assert_eq!(download.content_type, "application/pdf");
        assert!(download.path.is_file());

        assert!(matches!(
            settings.resource_download(0).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn speaker_photo_replaces_previous_file() {
        let (settings, dir) = service().await;
        let first = settings
            .upload_speaker_photo(1, &image("photo", "maria.png"))
            .await
            .unwrap();
        let second = settings
            .upload_speaker_photo(1, &image("photo", "maria.jpg"))
            .await
            .unwrap();

        assert!(!dir.path().join(first.trim_start_matches("/storage/")).exists());
        assert!(dir.path().join(second.trim_start_matches("/storage/")).exists());
        let public = settings.public_settings().await.unwrap();
        assert_eq!(public["keynote_speakers"][1]["photo"], second);

        let missing = settings.upload_sponsor_logo(42, &image("logo", "x.svg")).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn hero_background_records_media_type() {
        let (settings, _dir) = service().await;
        let video = settings
            .upload_hero_background(&image("hero_background", "intro.MP4"))
            .await
            .unwrap();
        assert_eq!(video["type"], "video");

        let picture = settings
            .upload_hero_background(&image("hero_background", "cover.png"))
            .await
            .unwrap();
        assert_eq!(picture["type"], "image");
        assert_eq!(settings.public_settings().await.unwrap()["hero_background"], picture);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn write_during_load_is_not_masked_by_stale_cache() {
        let pool = create_memory_pool().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let shared = Arc::new(InMemorySettingsCache::new());
        let writer = LandingPageSettings::new(pool.clone(), shared.clone(), dir.path().to_path_buf());
        let reader = LandingPageSettings::new(
            pool,
            Arc::new(WriteBeforePut {
                inner: shared,
                writer: Mutex::new(Some(writer)),
            }),
            dir.path().to_path_buf(),
        );

        let loaded = reader.public_settings().await.unwrap();
        assert_eq!(loaded["contact_phone"], "+62 21 1234 5678");

        let next = reader.public_settings().await.unwrap();
        assert_eq!(next["contact_phone"], "+62 274 486 733");
    }

    #[tokio::test]
    async fn hero_logo_replaces_previous_file() {
        let (settings, dir) = service().await;
        let first = settings.upload_hero_logo(&image("hero_logo", "logo.svg")).await.unwrap();
        let second = settings.upload_hero_logo(&image("hero_logo", "logo.png")).await.unwrap();

        let first_url = first["url"].as_str().unwrap();
        let second_url = second["url"].as_str().unwrap();
        assert!(!dir.path().join(first_url.trim_start_matches("/storage/")).exists());
        assert!(dir.path().join(second_url.trim_start_matches("/storage/")).exists());
        assert_eq!(settings.public_settings().await.unwrap()["hero_logo"], second);

        let too_big = Upload {
            field: "hero_logo".into(),
            file_name: "huge.png".into(),
            bytes: vec![0; 5 * 1024 * 1024 + 1],
        };
        let err = settings.upload_hero_logo(&too_big).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let wrong_type = settings.upload_hero_logo(&image("hero_logo", "intro.mp4")).await;
        assert!(matches!(wrong_type, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn secondary_hero_logos_append_and_delete_by_index() {
        let (settings, dir) = service().await;
        assert!(matches!(
            settings.delete_secondary_hero_logo(0).await,
            Err(AppError::NotFound(_))
        ));

        settings
            .add_secondary_hero_logo(&image("hero_logo_secondary", "iagi.png"))
            .await
            .unwrap();
        let logos = settings
            .add_secondary_hero_logo(&image("hero_logo_secondary", "geosea.svg"))
            .await
            .unwrap();
        assert_eq!(logos.len(), 2);
        assert_eq!(settings.public_settings().await.unwrap()["hero_logos_secondary"], json!(logos));

        let removed_url = logos[0]["url"].as_str().unwrap().to_string();
        let remaining = settings.delete_secondary_hero_logo(0).await.unwrap();
        assert_eq!(remaining, vec![logos[1].clone()]);
        assert!(!dir.path().join(removed_url.trim_start_matches("/storage/")).exists());
        assert_eq!(
            settings.public_settings().await.unwrap()["hero_logos_secondary"],
            json!(remaining)
        );

        assert!(matches!(
            settings.delete_secondary_hero_logo(5).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn hero_text_requires_all_lines() {
        let (settings, _dir) = service().await;
        let err = settings
            .save_hero_text(HeroText {
                title_line1: "PIT IAGI".into(),
                ..HeroText::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.contains("hero_text.theme_text")));
    }

    #[test]
    fn bytes_are_humanised() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10 MB");
    }
}
