//! Data-URI thumbnails returned by the preview endpoint.
//!
//! A terminal cannot show the image itself, so cards show what the thumbnail is
//! (format and size) or a placeholder when there is nothing worth showing.

use base64::Engine;

/// Placeholder the server sends when it cannot render a first page.
pub const SERVER_PLACEHOLDER: &str = "data:image/svg+xml;base64,PHN2ZyB3aWR0aD0iMTUwIiBoZWlnaHQ9IjE4MCIgdmlld0JveD0iMCAwIDE1MCAyNDAiIGZpbGw9Im5vbmUiIHhtbG5zPSJodHRwOi8vd3d3LnczLm9yZy8yMDAwL3N2ZyI+CjxyZWN0IHdpZHRoPSIxNTAiIGhlaWdodD0iMTgwIiBmaWxsPSIjRjVGNUY1Ii8+CjxwYXRoIGQ9Ik0zMCA0MEgxMjBWMTQwSDMwVjQwWiIgZmlsbD0iI0U1RTVFNSIvPgo8dGV4dCB4PSI3NSIgeT0iMTAwIiBmb250LWZhbWlseT0iQXJpYWwsIHNhbnMtc2VyaWYiIGZvbnQtc2l6ZT0iMTQiIGZpbGw9IiM5OTkiIHRleHQtYW5jaG9yPSJtaWRkbGUiPlBERjwvdGV4dD4KPC9zdmc+";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    Placeholder,
    Image { mime: String, bytes: usize },
}

impl Thumbnail {
    pub fn from_data_uri(uri: Option<&str>) -> Self {
        let Some(uri) = uri.map(str::trim) else {
            return Thumbnail::Placeholder;
        };
        if uri.is_empty() || uri == SERVER_PLACEHOLDER {
            return Thumbnail::Placeholder;
        }
        let Some(rest) = uri.strip_prefix("data:") else {
            return Thumbnail::Placeholder;
        };
        let Some((header, payload)) = rest.split_once(',') else {
            return Thumbnail::Placeholder;
        };
        if payload.is_empty() {
            return Thumbnail::Placeholder;
        }
        let Some(mime) = header.strip_suffix(";base64") else {
            return Thumbnail::Placeholder;
        };
        match base64::engine::general_purpose::STANDARD.decode(payload) {
            Ok(bytes) if !bytes.is_empty() => Thumbnail::Image {
                mime: mime.to_string(),
                bytes: bytes.len(),
            },
            _ => Thumbnail::Placeholder,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Thumbnail::Placeholder => "[PDF]".to_string(),
            Thumbnail::Image { mime, bytes } => {
                let kind = mime
                    .rsplit('/')
                    .next()
                    .unwrap_or(mime.as_str())
                    .to_ascii_uppercase();
                format!("[{kind} {}]", crate::format::format_size(*bytes as u64))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_sentinel_thumbnails_are_placeholders() {
        assert_eq!(Thumbnail::from_data_uri(None), Thumbnail::Placeholder);
        assert_eq!(Thumbnail::from_data_uri(Some("")), Thumbnail::Placeholder);
        assert_eq!(Thumbnail::from_data_uri(Some("data:,")), Thumbnail::Placeholder);
        assert_eq!(
            Thumbnail::from_data_uri(Some("data:image/png;base64,")),
            Thumbnail::Placeholder
        );
        assert_eq!(
            Thumbnail::from_data_uri(Some(SERVER_PLACEHOLDER)),
            Thumbnail::Placeholder
        );
        assert_eq!(
            Thumbnail::from_data_uri(Some("data:image/png;base64,@@@not-base64")),
            Thumbnail::Placeholder
        );
    }

    #[test]
    fn png_thumbnail_is_decoded() {
        let payload = base64::engine::general_purpose::STANDARD.encode([0x89u8, b'P', b'N', b'G']);
        let uri = format!("data:image/png;base64,{payload}");
        let thumb = Thumbnail::from_data_uri(Some(&uri));
        assert_eq!(
            thumb,
            Thumbnail::Image {
                mime: "image/png".into(),
                bytes: 4
            }
        );
        assert_eq!(thumb.label(), "[PNG 4 Bytes]");
    }
}
