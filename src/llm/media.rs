use base64::{engine::general_purpose, Engine as _};

pub const DEFAULT_UPLOAD_MIME: &str = "image/jpeg";
pub const DEFAULT_GENERATED_MIME: &str = "image/png";

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lowered,
    }
}

/// Picks the MIME type for an uploaded file: the declared type when it is a
/// concrete image type, else whatever the bytes sniff as, else JPEG.
pub fn resolve_upload_mime_type(declared: Option<&str>, bytes: &[u8]) -> String {
    if let Some(declared) = declared {
        let normalized = normalize_image_mime_type(declared);
        if normalized.starts_with("image/") {
            return normalized;
        }
    }

    detect_mime_type(bytes)
        .map(|mime| normalize_image_mime_type(&mime))
        .unwrap_or_else(|| DEFAULT_UPLOAD_MIME.to_string())
}

pub fn encode_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

pub fn data_uri(mime_type: &str, data_base64: &str) -> String {
    format!("data:{mime_type};base64,{data_base64}")
}

/// Splits `data:<mime>;base64,<payload>` into its MIME type and payload.
pub fn parse_data_uri(value: &str) -> Option<(String, String)> {
    let rest = value.trim().strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    if payload.is_empty() {
        return None;
    }
    let mime_type = if mime_type.is_empty() {
        DEFAULT_GENERATED_MIME.to_string()
    } else {
        normalize_image_mime_type(mime_type)
    };
    Some((mime_type, payload.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn declared_image_type_wins() {
        assert_eq!(resolve_upload_mime_type(Some("image/JPG"), PNG_MAGIC), "image/jpeg");
    }

    #[test]
    fn sniffs_bytes_when_declared_type_is_generic() {
        assert_eq!(
            resolve_upload_mime_type(Some("application/octet-stream"), PNG_MAGIC),
            "image/png"
        );
    }

    #[test]
    fn unknown_bytes_default_to_jpeg() {
        assert_eq!(resolve_upload_mime_type(None, b"???"), "image/jpeg");
    }

    #[test]
    fn parses_data_uris() {
        let uri = data_uri("image/webp", "QUJD");
        assert_eq!(uri, "data:image/webp;base64,QUJD");
        assert_eq!(
            parse_data_uri(&uri),
            Some(("image/webp".to_string(), "QUJD".to_string()))
        );
        assert_eq!(parse_data_uri("https://example.com/a.png"), None);
        assert_eq!(parse_data_uri("data:image/png;base64,"), None);
    }
}
