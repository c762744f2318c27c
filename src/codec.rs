//! Composite-column codecs
//!
//! Two list-valued fields are stored in a single TEXT column each:
//! - `VideoInfo.formats` as a JSON object `{"formats":[...]}`
//! - `VideoInfo.downloadUrls` as a JSON array of requests
//!
//! Earlier app versions wrote download URLs as JSON objects each terminated by
//! [`LEGACY_URL_SEPARATOR`], with the header map nested as a JSON string. The
//! decoder still reads that layout; the encoder only writes the array form.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::CodecError;
use crate::models::{DownloadRequest, FormatList, VideoInfo};

pub const FORMATS_COLUMN: &str = "formats";
pub const DOWNLOAD_URLS_COLUMN: &str = "downloadUrls";
pub const VIDEO_INFO_COLUMN: &str = "videoInfo";

/// Terminator between entries in the legacy download-URL layout.
pub const LEGACY_URL_SEPARATOR: &str = ">^^^<";

fn json_err(column: &'static str) -> impl FnOnce(serde_json::Error) -> CodecError {
    move |source| CodecError::Json { column, source }
}

pub fn encode_formats(formats: &FormatList) -> Result<String, CodecError> {
    serde_json::to_string(formats).map_err(json_err(FORMATS_COLUMN))
}

pub fn decode_formats(raw: &str) -> Result<FormatList, CodecError> {
    if raw.trim().is_empty() {
        return Ok(FormatList::default());
    }
    serde_json::from_str(raw).map_err(json_err(FORMATS_COLUMN))
}

pub fn encode_download_urls(requests: &[DownloadRequest]) -> Result<String, CodecError> {
    serde_json::to_string(requests).map_err(json_err(DOWNLOAD_URLS_COLUMN))
}

pub fn decode_download_urls(raw: &str) -> Result<Vec<DownloadRequest>, CodecError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(json_err(DOWNLOAD_URLS_COLUMN));
    }
    decode_legacy_download_urls(trimmed)
}

fn decode_legacy_download_urls(raw: &str) -> Result<Vec<DownloadRequest>, CodecError> {
    let mut out = Vec::new();

    for entry in raw.split(LEGACY_URL_SEPARATOR).filter(|e| !e.trim().is_empty()) {
        let value: Value = serde_json::from_str(entry).map_err(json_err(DOWNLOAD_URLS_COLUMN))?;
        let obj = value.as_object().ok_or_else(|| CodecError::Legacy {
            column: DOWNLOAD_URLS_COLUMN,
            reason: "entry is not an object".to_string(),
        })?;

        let url = obj
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::Legacy {
                column: DOWNLOAD_URLS_COLUMN,
                reason: "entry has no url".to_string(),
            })?
            .to_string();

        let method = obj
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_string();

        // Old writers stringified a missing body as "null".
        let body = match obj.get("body").and_then(Value::as_str) {
            Some("null") | None => String::new(),
            Some(b) => b.to_string(),
        };

        let headers = match obj.get("headers") {
            Some(Value::String(nested)) if !nested.trim().is_empty() => {
                let parsed: Value =
                    serde_json::from_str(nested).map_err(json_err(DOWNLOAD_URLS_COLUMN))?;
                header_map(&parsed)
            }
            Some(v @ Value::Object(_)) => header_map(v),
            _ => BTreeMap::new(),
        };

        out.push(DownloadRequest {
            url,
            method,
            body,
            headers,
        });
    }

    Ok(out)
}

fn header_map(value: &Value) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if let Some(obj) = value.as_object() {
        for (name, v) in obj {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            headers.insert(name.clone(), v);
        }
    }
    headers
}

/// Encodes the `VideoInfo` snapshot embedded in a progress row.
pub fn encode_video_info(video: &VideoInfo) -> Result<String, CodecError> {
    serde_json::to_string(video).map_err(json_err(VIDEO_INFO_COLUMN))
}

pub fn decode_video_info(raw: &str) -> Result<VideoInfo, CodecError> {
    serde_json::from_str(raw).map_err(json_err(VIDEO_INFO_COLUMN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoFormat;

    fn format(id: &str, height: i32) -> VideoFormat {
        VideoFormat {
            id: id.to_string(),
            height,
            ext: Some("mp4".into()),
            url: Some(format!("https://cdn.example.com/{id}.mp4")),
            ..VideoFormat::default()
        }
    }

    #[test]
    fn formats_roundtrip_keeps_order() {
        for list in [
            FormatList::default(),
            FormatList::new(vec![format("only", 720)]),
            FormatList::new(vec![format("c", 1080), format("a", 360), format("b", 720)]),
        ] {
            let encoded = encode_formats(&list).unwrap();
            assert_eq!(decode_formats(&encoded).unwrap(), list);
        }
    }

    #[test]
    fn formats_with_headers_roundtrip() {
        let mut headers = BTreeMap::new();
        headers.insert("Referer".to_string(), "https://example.com/".to_string());
        let list = FormatList::new(vec![VideoFormat {
            http_headers: Some(headers),
            ..format("h", 480)
        }]);
        let encoded = encode_formats(&list).unwrap();
        assert_eq!(decode_formats(&encoded).unwrap(), list);
    }

    #[test]
    fn download_urls_roundtrip_keeps_order() {
        let requests = vec![
            DownloadRequest::get("https://cdn.example.com/2.ts").with_header("Cookie", "a=b"),
            DownloadRequest::get("https://cdn.example.com/1.ts"),
            DownloadRequest {
                url: "https://api.example.com/stream".into(),
                method: "POST".into(),
                body: "{\"id\":1}>^^^<".into(),
                headers: BTreeMap::new(),
            },
        ];
        for list in [Vec::new(), requests[..1].to_vec(), requests] {
            let encoded = encode_download_urls(&list).unwrap();
            assert_eq!(decode_download_urls(&encoded).unwrap(), list);
        }
    }

    #[test]
    fn empty_column_decodes_to_empty_lists() {
        assert!(decode_download_urls("").unwrap().is_empty());
        assert!(decode_formats("  ").unwrap().is_empty());
    }

    #[test]
    fn decodes_legacy_separator_layout() {
        let raw = concat!(
            r#"{"url":"https://a.example.com/v.mp4","method":"GET","body":"null","headers":"{\"User-Agent\":\"ua\"}"}"#,
            ">^^^<",
            r#"{"url":"https://b.example.com/v.mp4","method":"GET","body":"","headers":"{}"}"#,
            ">^^^<",
        );
        let decoded = decode_download_urls(raw).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].url, "https://a.example.com/v.mp4");
        assert_eq!(decoded[0].body, "");
        assert_eq!(decoded[0].headers.get("User-Agent").map(String::as_str), Some("ua"));
        assert_eq!(decoded[1].url, "https://b.example.com/v.mp4");
        assert!(decoded[1].headers.is_empty());
    }

    #[test]
    fn malformed_columns_are_errors() {
        assert!(matches!(
            decode_formats("{\"formats\": [oops"),
            Err(CodecError::Json { column: FORMATS_COLUMN, .. })
        ));
        assert!(decode_download_urls("[{\"method\":\"GET\"}]").is_err());
        assert!(matches!(
            decode_download_urls("{\"method\":\"GET\"}>^^^<"),
            Err(CodecError::Legacy { .. })
        ));
    }

    #[test]
    fn video_info_snapshot_roundtrip() {
        let mut video = VideoInfo::new("title", "originalUrl");
        video.download_urls = vec![DownloadRequest::get("https://cdn.example.com/v.mp4")];
        video.formats = FormatList::new(vec![format("f", 720)]);
        let encoded = encode_video_info(&video).unwrap();
        assert_eq!(decode_video_info(&encoded).unwrap(), video);
    }
}
