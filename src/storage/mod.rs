use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ValidationErrors};

/// A file received in a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Accepted extensions and maximum size for one kind of upload.
#[derive(Debug, Clone, Copy)]
pub struct FileRules {
    pub extensions: &'static [&'static str],
    pub max_bytes: usize,
}

const MIB: usize = 1024 * 1024;

pub const SUBMISSION_FILE: FileRules = FileRules {
    extensions: &["pdf", "doc", "docx"],
    max_bytes: 10 * MIB,
};

pub const PAYMENT_PROOF: FileRules = FileRules {
    extensions: &["jpg", "jpeg", "png", "pdf"],
    max_bytes: 5 * MIB,
};

pub const RESOURCE_FILE: FileRules = FileRules {
    extensions: &["pdf", "doc", "docx", "ppt", "pptx", "txt", "jpg", "jpeg", "png", "gif"],
    max_bytes: 10 * MIB,
};

pub const HERO_BACKGROUND: FileRules = FileRules {
    extensions: &["mp4", "webm", "jpg", "jpeg", "png", "gif"],
    max_bytes: 50 * MIB,
};

pub const SPEAKER_PHOTO: FileRules = FileRules {
    extensions: &["jpeg", "png", "jpg", "gif"],
    max_bytes: 2 * MIB,
};

pub const SPONSOR_LOGO: FileRules = FileRules {
    extensions: &["jpeg", "png", "jpg", "gif", "svg"],
    max_bytes: 2 * MIB,
};

pub const HERO_LOGO: FileRules = FileRules {
    extensions: &["jpeg", "png", "jpg", "gif", "svg"],
    max_bytes: 5 * MIB,
};

pub fn ensure_dirs(root: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(root)
}

/// Checks an upload against `rules`, reporting problems under the upload's field name.
pub fn validate_upload(upload: &Upload, rules: &FileRules) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let extension = upload.extension().unwrap_or_default();

    if upload.bytes.is_empty() {
        errors.add(&upload.field, format!("The {} field is required.", upload.field));
    }
    if !rules.extensions.contains(&extension.as_str()) {
        errors.add(
            &upload.field,
            format!(
                "The {} must be a file of type: {}.",
                upload.field,
                rules.extensions.join(", ")
            ),
        );
    }
    if upload.bytes.len() > rules.max_bytes {
        errors.add(
            &upload.field,
            format!(
                "The {} may not be greater than {} kilobytes.",
                upload.field,
                rules.max_bytes / 1024
            ),
        );
    }

    if errors.is_empty() {
        Ok(extension)
    } else {
        Err(errors)
    }
}

/// Validates and writes an upload to `{root}/{dir}/{uuid}.{ext}`, returning
/// the path relative to `root`.
pub async fn store_upload(
    root: &Path,
    dir: &str,
    upload: &Upload,
    rules: &FileRules,
) -> AppResult<String> {
    let extension = validate_upload(upload, rules).map_err(AppError::Validation)?;
    let relative = format!("{}/{}.{}", dir.trim_matches('/'), Uuid::new_v4(), extension);
    let path = root.join(&relative);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &upload.bytes).await?;
    tracing::info!(path = %relative, bytes = upload.bytes.len(), "stored upload");

    Ok(relative)
}

/// Resolves a stored relative path under `root`, refusing anything that
/// could escape it.
pub fn resolve(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = relative.trim_start_matches('/');
    let relative = relative.strip_prefix("storage/").unwrap_or(relative);
    let candidate = Path::new(relative);
    let safe = !relative.is_empty()
        && candidate
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    safe.then(|| root.join(candidate))
}

/// Deletes a stored file. Missing files are ignored.
pub async fn delete_stored(root: &Path, relative: &str) -> std::io::Result<()> {
    let path = resolve(root, relative).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("refusing to delete '{}'", relative),
        )
    })?;

    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Best-effort cleanup used when a replaced or deleted record leaves files behind.
pub async fn discard(root: &Path, relative: &str) {
    if let Err(err) = delete_stored(root, relative).await {
        tracing::warn!(path = relative, error = %err, "could not delete stored file");
    }
}

/// Public URL under which a stored file is served.
pub fn public_url(relative: &str) -> String {
    format!("/storage/{}", relative.trim_start_matches('/'))
}
