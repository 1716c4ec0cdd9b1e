use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::error::BrickieError;
use crate::vnode::Constructor;

/// Registry shared between a [`crate::Brickie`] and its interpreters.
pub type SharedRegistry = Rc<RefCell<Registry>>;

// ── Configs ───────────────────────────────────────────────────────────────

/// What the interpreter needs to know about a registered brick type.
#[derive(Debug, Clone)]
pub struct BrickConfig {
    pub constructor: Constructor,
    /// Attributes besides `children` that hold nested brick trees.
    pub child_attributes: Vec<String>,
}

/// Where a field-mutator handler finds the field's new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Position in the handler's call arguments.
    pub arg_index: usize,
    /// Dotted path inside that argument, e.g. `target.value`.
    pub arg_field: Option<String>,
}

impl HandlerConfig {
    pub fn new(arg_index: usize) -> Self {
        Self { arg_index, arg_field: None }
    }

    pub fn field(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.arg_field = (!path.trim().is_empty()).then_some(path);
        self
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Field-mutator hooks of a form-field brick type, keyed by handler prop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFieldConfig {
    pub hooks: BTreeMap<String, HandlerConfig>,
}

/// Hook props of a form-container brick type (e.g. `onSubmit`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormContainerConfig {
    pub hooks: Vec<String>,
}

// ── Registry ──────────────────────────────────────────────────────────────

/// Brick type name → constructor and metadata.
///
/// Names are trimmed on the way in and on lookup. The registry is meant to be
/// filled once at startup; the interpreter only ever reads it.
///
/// ```rust
/// use brickie::{Constructor, Registry};
///
/// let mut registry = Registry::new();
/// registry.register("Text", Constructor::element("text")).unwrap();
/// registry.register_with_children("Card", Constructor::element("card"), ["header", "footer"]).unwrap();
/// assert!(registry.resolve("Card").is_some());
/// assert!(registry.resolve("Nonexistent").is_none());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    bricks: HashMap<String, BrickConfig>,
    containers: HashMap<String, FormContainerConfig>,
    fields: HashMap<String, FormFieldConfig>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedRegistry {
        Rc::new(RefCell::new(self))
    }

    pub fn register(&mut self, name: &str, constructor: Constructor) -> Result<(), BrickieError> {
        self.register_with_children(name, constructor, std::iter::empty::<String>())
    }

    pub fn register_with_children<I, S>(
        &mut self,
        name: &str,
        constructor: Constructor,
        child_attributes: I,
    ) -> Result<(), BrickieError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = valid_name(name)?;
        if !constructor.is_valid() {
            return Err(BrickieError::InvalidRegistration(format!(
                "brick '{}' has an empty element tag; use unregister() to remove a brick",
                name
            )));
        }
        let child_attributes = child_attributes.into_iter().map(Into::into).collect();
        log::debug!("registered brick '{}'", name);
        self.bricks.insert(name.to_string(), BrickConfig { constructor, child_attributes });
        Ok(())
    }

    /// Register every `(name, constructor)` pair; stops at the first invalid one.
    pub fn register_all<I, S>(&mut self, bricks: I) -> Result<(), BrickieError>
    where
        I: IntoIterator<Item = (S, Constructor)>,
        S: AsRef<str>,
    {
        for (name, constructor) in bricks {
            self.register(name.as_ref(), constructor)?;
        }
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<BrickConfig> {
        self.bricks.remove(name.trim())
    }

    /// Drop every brick, form container and form field registration.
    pub fn unregister_all(&mut self) {
        self.bricks.clear();
        self.containers.clear();
        self.fields.clear();
    }

    pub fn resolve(&self, name: &str) -> Option<&BrickConfig> {
        self.bricks.get(name.trim())
    }

    // ── forms ─────────────────────────────────────────────────────────────

    pub fn register_form_container<I, S>(&mut self, name: &str, hooks: I) -> Result<(), BrickieError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = valid_name(name)?;
        let hooks = hooks.into_iter().map(Into::into).collect();
        self.containers.insert(name.to_string(), FormContainerConfig { hooks });
        Ok(())
    }

    pub fn register_form_field<I, S>(&mut self, name: &str, hooks: I) -> Result<(), BrickieError>
    where
        I: IntoIterator<Item = (S, HandlerConfig)>,
        S: Into<String>,
    {
        let name = valid_name(name)?;
        let hooks: BTreeMap<String, HandlerConfig> =
            hooks.into_iter().map(|(prop, config)| (prop.into(), config)).collect();
        if hooks.is_empty() || hooks.keys().any(|k| k.trim().is_empty()) {
            return Err(BrickieError::InvalidRegistration(format!(
                "form field '{}' needs at least one named handler config",
                name
            )));
        }
        self.fields.insert(name.to_string(), FormFieldConfig { hooks });
        Ok(())
    }

    pub fn is_form_container(&self, name: &str) -> bool {
        self.containers.contains_key(name.trim())
    }

    pub fn is_form_field(&self, name: &str) -> bool {
        self.fields.contains_key(name.trim())
    }

    pub fn form_container(&self, name: &str) -> Option<&FormContainerConfig> {
        self.containers.get(name.trim())
    }

    pub fn form_field(&self, name: &str) -> Option<&FormFieldConfig> {
        self.fields.get(name.trim())
    }
}

fn valid_name(name: &str) -> Result<&str, BrickieError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BrickieError::InvalidRegistration("cannot register a brick without a name".to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        let mut registry = Registry::new();
        let err = registry.register("  ", Constructor::element("div")).unwrap_err();
        assert!(matches!(err, BrickieError::InvalidRegistration(_)));
    }

    #[test]
    fn empty_tag_is_rejected() {
        let mut registry = Registry::new();
        assert!(registry.register("Text", Constructor::element("")).is_err());
        assert!(registry.resolve("Text").is_none());
    }

    #[test]
    fn names_are_trimmed() {
        let mut registry = Registry::new();
        registry.register(" Text ", Constructor::element("text")).unwrap();
        assert!(registry.resolve("Text").is_some());
        assert!(registry.resolve(" Text").is_some());
    }

    #[test]
    fn child_attributes_are_kept() {
        let mut registry = Registry::new();
        registry.register_with_children("Tabs", Constructor::element("tabs"), ["panes"]).unwrap();
        assert_eq!(registry.resolve("Tabs").unwrap().child_attributes, vec!["panes".to_string()]);
    }

    #[test]
    fn register_all_and_unregister() {
        let mut registry = Registry::new();
        registry
            .register_all([("A", Constructor::element("a")), ("B", Constructor::element("b"))])
            .unwrap();
        assert!(registry.unregister("A").is_some());
        assert!(registry.resolve("A").is_none());
        assert!(registry.resolve("B").is_some());
        registry.unregister_all();
        assert!(registry.resolve("B").is_none());
    }

    #[test]
    fn form_field_requires_hooks() {
        let mut registry = Registry::new();
        let none: [(&str, HandlerConfig); 0] = [];
        assert!(registry.register_form_field("Input", none).is_err());
        registry
            .register_form_field("Input", [("onChange", HandlerConfig::new(0).field("target.value"))])
            .unwrap();
        assert!(registry.is_form_field("Input"));
        assert!(!registry.is_form_container("Input"));
    }

    #[test]
    fn form_container_hooks_are_optional() {
        let mut registry = Registry::new();
        registry.register_form_container("Form", Vec::<String>::new()).unwrap();
        assert!(registry.is_form_container("Form"));
        assert!(registry.form_container("Form").unwrap().hooks.is_empty());
    }
}
