use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::AttachedFile;

pub fn generate_upload_id() -> String {
    format!(
        "{}_{}",
        Utc::now().format("%Y%m%d"),
        Uuid::new_v4().to_string()[..8].to_string()
    )
}

pub fn ensure_dirs(upload_folder: &PathBuf) -> std::io::Result<()> {
    std::fs::create_dir_all(upload_folder)?;
    Ok(())
}

/// Keeps only the final path component and characters safe in a filename.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Writes an uploaded file under a generated id and returns its metadata.
pub async fn save_upload(
    upload_folder: &Path,
    original_name: &str,
    declared_type: Option<&str>,
    bytes: &[u8],
) -> std::io::Result<AttachedFile> {
    let safe_name = sanitize_filename(original_name);
    let stored_as = format!("{}_{}", generate_upload_id(), safe_name);
    tokio::fs::write(upload_folder.join(&stored_as), bytes).await?;

    let mime_type = declared_type
        .filter(|t| !t.is_empty() && *t != "application/octet-stream")
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(&safe_name).first_raw().map(str::to_string));

    Ok(AttachedFile {
        name: original_name.to_string(),
        mime_type,
        size: bytes.len() as u64,
        stored_as: Some(stored_as),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_lose_directories_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\work\\my box.jpg"), "my_box.jpg");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[tokio::test]
    async fn saved_upload_guesses_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = save_upload(dir.path(), "design sketch.png", None, b"png-bytes")
            .await
            .unwrap();

        assert_eq!(file.name, "design sketch.png");
        assert_eq!(file.mime_type.as_deref(), Some("image/png"));
        assert_eq!(file.size, 9);
        let stored = dir.path().join(file.stored_as.unwrap());
        assert_eq!(std::fs::read(stored).unwrap(), b"png-bytes");
    }
}
