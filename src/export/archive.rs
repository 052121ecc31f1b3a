/// Archive naming and zip assembly
use chrono::NaiveDate;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ExportError;
use crate::state::data::Photo;

const DEFAULT_EXTENSION: &str = "jpg";
const DEFAULT_LABEL: &str = "photo";

/// Lowercase, whitespace runs become a single hyphen, path separators too.
pub fn slugify(value: &str) -> String {
    value
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// `<slug>-<YYYY-MM-DD>.zip`
pub fn archive_file_name(title: &str, date: NaiveDate) -> String {
    let slug = slugify(title);
    let slug = if slug.is_empty() { "photos".to_string() } else { slug };
    format!("{}-{}.zip", slug, date.format("%Y-%m-%d"))
}

/// Name of the photo at 1-based position `sequence` inside the archive.
pub fn entry_name(photo: &Photo, sequence: usize) -> String {
    let label = [photo.photo_type.as_deref(), Some(photo.category.as_str())]
        .into_iter()
        .flatten()
        .map(slugify)
        .find(|label| !label.is_empty())
        .unwrap_or_else(|| DEFAULT_LABEL.to_string());

    format!("{}_{}.{}", label, sequence, extension_for(photo))
}

/// Extension from the URL path, then the original filename, then the
/// MIME type, falling back to jpg.
pub fn extension_for(photo: &Photo) -> String {
    let from_url = photo
        .file_url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .and_then(extension_of);

    from_url
        .or_else(|| photo.filename.as_deref().and_then(extension_of))
        .or_else(|| photo.mime_type.as_deref().and_then(extension_of_mime))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    let valid = !stem.is_empty()
        && (1..=5).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

fn extension_of_mime(mime: &str) -> Option<String> {
    let subtype = mime.strip_prefix("image/")?;
    let ext = match subtype {
        "jpeg" | "pjpeg" => "jpg",
        "svg+xml" => "svg",
        other if other.chars().all(|c| c.is_ascii_alphanumeric()) && !other.is_empty() => other,
        _ => return None,
    };
    Some(ext.to_ascii_lowercase())
}

/// Zip the given entries, in order, into one Deflate-compressed buffer.
pub fn build_archive(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}
