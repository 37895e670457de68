use serde::{Deserialize, Deserializer, Serialize};

/// One playable/downloadable item of a mix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    pub title: String,
    /// Source watch link.
    pub url: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RootSong {
    pub title: String,
    #[serde(default)]
    pub id: Option<String>,
}

/// Body of a successful `/api/search` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    pub root_song: RootSong,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub song_name: String,
    pub limit: u32,
}

/// Body the backend sends alongside a non-2xx status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_parses_backend_body() {
        let body = r#"{
            "root_song": {"title": "Adele - Hello", "id": "YQHsXMglC9A"},
            "tracks": [
                {"title": "Hello", "url": "https://www.youtube.com/watch?v=YQHsXMglC9A", "thumbnail": "https://i.ytimg.com/vi/YQHsXMglC9A/mqdefault.jpg"},
                {"title": "Someone Like You", "url": "https://www.youtube.com/watch?v=hLQl3WQQoQ0", "thumbnail": ""}
            ]
        }"#;
        let result: SearchResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.root_song.title, "Adele - Hello");
        assert_eq!(result.root_song.id.as_deref(), Some("YQHsXMglC9A"));
        assert_eq!(result.tracks.len(), 2);
        assert!(result.tracks[0].thumbnail.is_some());
        assert_eq!(result.tracks[1].thumbnail, None);
    }

    #[test]
    fn test_thumbnail_missing_or_null() {
        let missing: Track = serde_json::from_str(r#"{"title": "a", "url": "u"}"#).unwrap();
        let null: Track =
            serde_json::from_str(r#"{"title": "a", "url": "u", "thumbnail": null}"#).unwrap();
        assert_eq!(missing.thumbnail, None);
        assert_eq!(null.thumbnail, None);
    }

    #[test]
    fn test_search_request_body() {
        let req = SearchRequest {
            song_name: "Hello".to_string(),
            limit: 5,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"song_name": "Hello", "limit": 5}));
    }

    #[test]
    fn test_error_body_without_message() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.error.is_none());
    }
}
