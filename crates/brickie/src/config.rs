use serde::Deserialize;

/// Render-wide settings shared by every mount of a [`crate::Brickie`].
///
/// ```rust
/// use brickie::BrickieConfig;
///
/// let config = BrickieConfig::default()
///     .key_prefix("ui")
///     .class_attribute("class");
/// assert_eq!(config.key_prefix, "ui");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BrickieConfig {
    /// Prefix for generated brick ids (`{prefix}-{n}`).
    pub key_prefix: String,
    /// Platform name of the class-list property that `class` is renamed to.
    pub class_attribute: String,
    /// Pass unknown capitalised type names through as element tags instead of
    /// dropping the node.
    ///
    /// Off by default: the node is dropped and a warning names the type.
    /// Lower-case names are always rendered as native tags.
    pub passthrough_unknown: bool,
    /// Per-node render tracing (see [`crate::logging::set_debug`]).
    pub debug: bool,
}

impl Default for BrickieConfig {
    fn default() -> Self {
        Self {
            key_prefix: "brick".to_string(),
            class_attribute: "className".to_string(),
            passthrough_unknown: false,
            debug: false,
        }
    }
}

impl BrickieConfig {
    pub fn key_prefix(mut self, v: impl Into<String>) -> Self { self.key_prefix = v.into(); self }
    pub fn class_attribute(mut self, v: impl Into<String>) -> Self { self.class_attribute = v.into(); self }
    pub fn passthrough_unknown(mut self, v: bool) -> Self { self.passthrough_unknown = v; self }
    pub fn debug(mut self, v: bool) -> Self { self.debug = v; self }
}
