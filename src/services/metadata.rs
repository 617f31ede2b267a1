use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub mime_type: String,
    pub extension: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Extra facts stored in the upload's metadata column.
    pub metadata: Value,
}

impl ImageMetadata {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn dimensions(&self) -> Option<(i32, i32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w as i32, h as i32)),
            _ => None,
        }
    }
}

pub struct MetadataService;

impl MetadataService {
    /// Detects the MIME type from magic bytes (falling back to the declared
    /// type, then the extension) and reads image dimensions when possible.
    pub fn analyze(bytes: &[u8], filename: &str, declared_type: Option<&str>) -> ImageMetadata {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        let mut mime_type = infer::get(bytes)
            .map(|k| k.mime_type())
            .unwrap_or("application/octet-stream")
            .to_string();

        if mime_type == "application/octet-stream" {
            if let Some(declared) = declared_type.filter(|d| !d.is_empty()) {
                mime_type = declared.to_string();
            } else {
                mime_type = match extension.as_str() {
                    "jpg" | "jpeg" => "image/jpeg",
                    "png" => "image/png",
                    "gif" => "image/gif",
                    "webp" => "image/webp",
                    "heic" => "image/heic",
                    "pdf" => "application/pdf",
                    _ => "application/octet-stream",
                }
                .to_string();
            }
        }

        let (width, height) = if mime_type.starts_with("image/") {
            Self::image_dimensions(bytes)
                .map(|(w, h)| (Some(w), Some(h)))
                .unwrap_or((None, None))
        } else {
            (None, None)
        };

        let mut metadata = json!({
            "mime_type": mime_type,
            "extension": extension,
            "declared_type": declared_type,
        });
        if let (Some(w), Some(h)) = (width, height) {
            metadata["width"] = json!(w);
            metadata["height"] = json!(h);
            metadata["high_res"] = json!(w > 1920 || h > 1080);
        }

        ImageMetadata {
            mime_type,
            extension,
            width,
            height,
            metadata,
        }
    }

    fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
        image::io::Reader::new(std::io::Cursor::new(bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_analyze_png_reads_dimensions() {
        let meta = MetadataService::analyze(&png(4, 3), "roof.PNG", None);
        assert_eq!(meta.mime_type, "image/png");
        assert_eq!(meta.extension, "png");
        assert_eq!(meta.dimensions(), Some((4, 3)));
        assert_eq!(meta.metadata["high_res"], false);
    }

    #[test]
    fn test_unknown_bytes_fall_back_to_declared_then_extension() {
        let junk = b"not an image at all";
        let declared = MetadataService::analyze(junk, "x.bin", Some("image/jpeg"));
        assert_eq!(declared.mime_type, "image/jpeg");
        assert_eq!(declared.dimensions(), None);

        let by_ext = MetadataService::analyze(junk, "x.webp", None);
        assert_eq!(by_ext.mime_type, "image/webp");
        assert!(by_ext.is_image());

        let other = MetadataService::analyze(junk, "notes", None);
        assert_eq!(other.mime_type, "application/octet-stream");
        assert!(!other.is_image());
    }
}
