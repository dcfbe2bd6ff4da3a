//! Gists and the files they contain.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::account::Account;

/// Language assigned to plain-text files GitHub did not classify.
pub const PLAIN_TEXT_LANGUAGE: &str = "Text";
/// Language assigned to any other unclassified file.
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// A single file inside a gist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawGistFile")]
pub struct GistFile {
    pub filename: String,
    /// MIME type (`type` in the API).
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Always set: defaulted from the MIME type when GitHub reports `null`.
    pub language: String,
    pub size: u64,
}

#[derive(Deserialize)]
struct RawGistFile {
    filename: String,
    #[serde(rename = "type", default)]
    mime_type: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    size: u64,
}

impl From<RawGistFile> for GistFile {
    fn from(raw: RawGistFile) -> Self {
        let mime_type = raw.mime_type.unwrap_or_default();
        let language = match raw.language {
            Some(language) if !language.is_empty() => language,
            _ if mime_type == "text/plain" => PLAIN_TEXT_LANGUAGE.to_string(),
            _ => UNKNOWN_LANGUAGE.to_string(),
        };
        Self {
            filename: raw.filename,
            mime_type,
            language,
            size: raw.size,
        }
    }
}

/// A gist owned by an [`Account`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: Account,
    /// Files in payload order. The API keys them by file name.
    #[serde(deserialize_with = "files_in_order", serialize_with = "files_as_map")]
    pub files: Vec<GistFile>,
}

fn files_in_order<'de, D>(deserializer: D) -> Result<Vec<GistFile>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FilesVisitor;

    impl<'de> Visitor<'de> for FilesVisitor {
        type Value = Vec<GistFile>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of file name to gist file")
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut files = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((_, file)) = map.next_entry::<String, GistFile>()? {
                files.push(file);
            }
            Ok(files)
        }
    }

    deserializer.deserialize_any(FilesVisitor)
}

fn files_as_map<S>(files: &[GistFile], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(files.len()))?;
    for file in files {
        map.serialize_entry(&file.filename, file)?;
    }
    map.end()
}
