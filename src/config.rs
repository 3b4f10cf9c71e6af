//! Session configuration: what to read, how much per chunk, and which fields to project.

use std::collections::BTreeMap;

use crate::{
    coerce::TargetType,
    error::ConfigError,
    resolve::FieldProjection,
    schema::{SchemaNode, ValueKind},
};

/// Rows per chunk when the configuration does not say otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Field names from the schema root to a leaf.
///
/// Parsed from either a list of segments or a dotted string (`"tags.color"`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "PathRepr", into = "Vec<String>")
)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Split a dotted path into segments. An empty string yields an empty path.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::default();
        }
        Self(dotted.split('.').map(str::to_owned).collect())
    }

    /// Path segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl From<FieldPath> for Vec<String> {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum PathRepr {
    Dotted(String),
    Segments(Vec<String>),
}

#[cfg(feature = "serde")]
impl From<PathRepr> for FieldPath {
    fn from(repr: PathRepr) -> Self {
        match repr {
            PathRepr::Dotted(s) => FieldPath::parse(&s),
            PathRepr::Segments(v) => FieldPath(v),
        }
    }
}

/// Everything a projection session needs at setup.
///
/// `paths` and `types` are keyed by output name and must name the same outputs. Output
/// columns appear in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ProjectionConfig {
    /// Location of the record stream (a file path for Avro sources).
    pub locator: String,
    /// Rows per emitted chunk; must be positive.
    pub chunk_size: usize,
    /// Output name → schema path.
    pub paths: BTreeMap<String, FieldPath>,
    /// Output name → target type.
    pub types: BTreeMap<String, TargetType>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            locator: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            paths: BTreeMap::new(),
            types: BTreeMap::new(),
        }
    }
}

impl ProjectionConfig {
    /// An empty configuration reading from `locator`.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            ..Self::default()
        }
    }

    /// Set the chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Add (or replace) one output column.
    #[must_use]
    pub fn with_field(
        mut self,
        output: impl Into<String>,
        path: impl Into<FieldPath>,
        target: TargetType,
    ) -> Self {
        let output = output.into();
        self.paths.insert(output.clone(), path.into());
        self.types.insert(output, target);
        self
    }

    /// Select every top-level field of `schema`, inferring each target from its declared kind.
    ///
    /// # Errors
    /// - `ConfigError::RootNotRecord` if the schema root is not a record.
    /// - `ConfigError::Uninferable` for a field whose kind has no natural target.
    pub fn infer(locator: impl Into<String>, schema: &SchemaNode) -> Result<Self, ConfigError> {
        let fields = schema.fields().ok_or(ConfigError::RootNotRecord {
            kind: schema.kind(),
        })?;
        let mut config = Self::new(locator);
        for field in fields {
            let kind = field.schema.kind();
            let target = infer_target(kind).ok_or_else(|| ConfigError::Uninferable {
                field: field.name.clone(),
                kind,
            })?;
            let path = FieldPath(vec![field.name.clone()]);
            config = config.with_field(field.name.clone(), path, target);
        }
        Ok(config)
    }

    /// Validate the configuration and list its projections in output-name order.
    ///
    /// # Errors
    /// - `ConfigError::ZeroChunkSize` if `chunk_size` is zero.
    /// - `ConfigError::KeyMismatch` if `paths` and `types` name different outputs.
    /// - `ConfigError::NoProjections` if no output is configured.
    /// - `ConfigError::EmptyPath` if a path has no segments.
    pub fn projections(&self) -> Result<Vec<FieldProjection>, ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        let missing_paths: Vec<String> = self
            .types
            .keys()
            .filter(|k| !self.paths.contains_key(*k))
            .cloned()
            .collect();
        let missing_types: Vec<String> = self
            .paths
            .keys()
            .filter(|k| !self.types.contains_key(*k))
            .cloned()
            .collect();
        if !missing_paths.is_empty() || !missing_types.is_empty() {
            return Err(ConfigError::KeyMismatch {
                missing_paths,
                missing_types,
            });
        }
        if self.paths.is_empty() {
            return Err(ConfigError::NoProjections);
        }
        self.paths
            .iter()
            .map(|(output, path)| {
                if path.is_empty() {
                    return Err(ConfigError::EmptyPath {
                        output: output.clone(),
                    });
                }
                Ok(FieldProjection {
                    output: output.clone(),
                    path: path.segments().to_vec(),
                    target: self.types[output],
                })
            })
            .collect()
    }
}

/// Natural target type for a top-level field of kind `kind`, used by
/// [`ProjectionConfig::infer`].
pub fn infer_target(kind: ValueKind) -> Option<TargetType> {
    match kind {
        ValueKind::Boolean | ValueKind::Int | ValueKind::Long => Some(TargetType::Integer),
        ValueKind::Float | ValueKind::Double => Some(TargetType::Real),
        ValueKind::String | ValueKind::Bytes => Some(TargetType::Text),
        ValueKind::Enum => Some(TargetType::Category),
        _ => None,
    }
}
