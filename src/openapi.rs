//! API document model.
//!
//! Only the parts of an OpenAPI document the mock server acts on are modelled:
//! paths, their operations, and each operation's declared responses with
//! optional `application/json` examples. Everything else in the document is
//! ignored.

use crate::config::SpecSource;
use crate::error::DocumentError;
use axum::http::Method;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Declared responses of one operation, keyed by status code or `default`.
///
/// Keys are ordered with status codes ascending, then `default`.
pub type MethodResponseTable = BTreeMap<ResponseKey, ResponseSpec>;

/// Root of an API document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiDocument {
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
}

/// Operations declared for a single path template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub get: Option<Operation>,
    #[serde(default)]
    pub put: Option<Operation>,
    #[serde(default)]
    pub post: Option<Operation>,
    #[serde(default)]
    pub patch: Option<Operation>,
    #[serde(default)]
    pub delete: Option<Operation>,
}

impl PathItem {
    /// The declared operations paired with their HTTP method.
    pub fn operations(&self) -> impl Iterator<Item = (Method, &Operation)> {
        [
            (Method::GET, self.get.as_ref()),
            (Method::PUT, self.put.as_ref()),
            (Method::POST, self.post.as_ref()),
            (Method::PATCH, self.patch.as_ref()),
            (Method::DELETE, self.delete.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.map(|op| (method, op)))
    }
}

/// A single method on a path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub responses: MethodResponseTable,
}

/// One possible response of an operation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseSpec {
    /// Free text, returned in the `X-Mock-Description` header
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub content: ContentSpec,
}

impl ResponseSpec {
    /// The JSON example, if this response declares one.
    pub fn json_example(&self) -> Option<&Example> {
        self.content
            .json
            .as_ref()
            .and_then(|media| media.example.as_ref())
    }
}

/// Response payloads by media type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentSpec {
    #[serde(default, rename = "application/json")]
    pub json: Option<MediaTypeSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaTypeSpec {
    #[serde(default, deserialize_with = "example")]
    pub example: Option<Example>,
}

/// A response example as written in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Example {
    /// A string rendered as the whole response body
    Template(String),
    /// A mapping or list whose string leaves are rendered one by one
    Structured(serde_json::Value),
}

fn example<'de, D>(deserializer: D) -> Result<Option<Example>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::String(s) => Ok(Some(Example::Template(s))),
        other => serde_json::to_value(&other)
            .map(|value| Some(Example::Structured(value)))
            .map_err(de::Error::custom),
    }
}

/// Identifies a response within its operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseKey {
    Status(u16),
    Default,
}

impl ResponseKey {
    const DEFAULT: &'static str = "default";

    /// The status code, or `None` for `default`.
    pub fn status(self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(code),
            Self::Default => None,
        }
    }

    fn from_code(code: u64) -> Option<Self> {
        u16::try_from(code)
            .ok()
            .filter(|code| (100..=599).contains(code))
            .map(Self::Status)
    }
}

impl fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{code}"),
            Self::Default => f.write_str(Self::DEFAULT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("response key {0:?} is neither \"default\" nor a status code between 100 and 599")]
pub struct InvalidResponseKey(pub String);

impl FromStr for ResponseKey {
    type Err = InvalidResponseKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::DEFAULT {
            return Ok(Self::Default);
        }
        s.parse::<u64>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| InvalidResponseKey(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for ResponseKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = ResponseKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a status code or \"default\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                ResponseKey::from_code(v).ok_or_else(|| E::custom(InvalidResponseKey(v.to_string())))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .ok()
                    .and_then(ResponseKey::from_code)
                    .ok_or_else(|| E::custom(InvalidResponseKey(v.to_string())))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

impl OpenApiDocument {
    /// Parse a YAML or JSON document.
    pub fn from_yaml(content: &str) -> Result<Self, DocumentError> {
        let doc: Self = serde_yaml::from_str(content)?;
        debug!(paths = doc.paths.len(), "Parsed API document");
        Ok(doc)
    }

    /// Read and parse the document from its configured source.
    pub async fn load(source: &SpecSource) -> Result<Self, DocumentError> {
        let content = match source {
            SpecSource::Path(path) => {
                info!(path = %path.display(), "Loading API document");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| DocumentError::Read {
                        path: path.display().to_string(),
                        source,
                    })?
            }
            SpecSource::Url(url) => {
                info!(url = %url, "Fetching API document");
                fetch(url).await.map_err(|source| DocumentError::Fetch {
                    url: url.clone(),
                    source,
                })?
            }
        };
        Self::from_yaml(&content)
    }

    /// Every declared operation as `(path, method, operation)`.
    pub fn operations(&self) -> impl Iterator<Item = (&str, Method, &Operation)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.operations()
                .map(move |(method, op)| (path.as_str(), method, op))
        })
    }
}

async fn fetch(url: &str) -> Result<String, reqwest::Error> {
    reqwest::get(url).await?.error_for_status()?.text().await
}
