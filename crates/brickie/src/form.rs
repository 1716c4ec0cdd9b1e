//! Handlers that keep a named value tree in the scope in sync with form fields.

use serde_json::Value;

use crate::registry::HandlerConfig;
use crate::store::{ScopeRef, path_segments, read_path};
use crate::vnode::Handler;

/// Store path a field writes to: `form.field`, or just `field` outside a form.
pub fn field_path(form: Option<&str>, field: &str) -> String {
    match form.map(str::trim).filter(|f| !f.is_empty()) {
        Some(form) => format!("{form}.{field}"),
        None => field.to_string(),
    }
}

/// Pull a field's new value out of a handler's call arguments.
pub fn extract_value(config: &HandlerConfig, args: &[Value]) -> Option<Value> {
    let arg = args.get(config.arg_index)?;
    match &config.arg_field {
        Some(path) => read_path(arg, path).cloned(),
        None => Some(arg.clone()),
    }
}

/// The synthetic handler behind a field-mutator prop.
///
/// Each call extracts the new value, writes it to `path` (at most one write),
/// then calls `user` with the original arguments. When the value cannot be
/// extracted the write is skipped but `user` still runs.
pub(crate) fn field_handler(config: HandlerConfig, path: String, scope: ScopeRef, user: Option<Handler>) -> Handler {
    Handler::new(move |args| {
        match extract_value(&config, args) {
            Some(value) => scope.set_value(&path, value),
            None => log::debug!(
                "no value at argument {} / {:?} for '{}', skipping the write",
                config.arg_index,
                config.arg_field,
                path
            ),
        }
        if let Some(user) = &user {
            user.call(args);
        }
    })
}

/// Wrap a form container hook (e.g. `onSubmit`): `user` is called with the
/// original arguments followed by the form's current value.
pub(crate) fn container_handler(form: String, scope: ScopeRef, user: Handler) -> Handler {
    Handler::new(move |args| {
        let mut extended = args.to_vec();
        extended.push(read_scope(&scope, &form));
        user.call(&extended);
    })
}

/// Current value at a dotted path in `scope`, `null` when absent.
fn read_scope(scope: &ScopeRef, path: &str) -> Value {
    let segments = path_segments(path);
    let Some((root, rest)) = segments.split_first() else {
        return Value::Null;
    };
    let Some(value) = scope.lookup(root) else {
        return Value::Null;
    };
    read_path(&value, &rest.join(".")).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::store::{Scope, Subscriber, VarStore};

    fn recorder() -> (Handler, Rc<RefCell<Vec<Vec<Value>>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        (Handler::new(move |args| sink.borrow_mut().push(args.to_vec())), calls)
    }

    #[test]
    fn path_composition() {
        assert_eq!(field_path(Some("login"), "user"), "login.user");
        assert_eq!(field_path(Some("  "), "user"), "user");
        assert_eq!(field_path(None, "user"), "user");
    }

    #[test]
    fn writes_once_then_calls_user() {
        let store = VarStore::new();
        let writes = Rc::new(RefCell::new(0));
        let counter = writes.clone();
        store.subscribe("login", &Subscriber::new(move |_, _| *counter.borrow_mut() += 1));

        let (user, calls) = recorder();
        let handler = field_handler(
            HandlerConfig::new(0).field("target.value"),
            "login.user".to_string(),
            store.scope(),
            Some(user),
        );
        let args = [json!({ "target": { "value": "hello" } })];
        handler.call(&args);

        assert_eq!(*writes.borrow(), 1);
        assert_eq!(store.lookup("login"), Some(json!({ "user": "hello" })));
        assert_eq!(*calls.borrow(), vec![args.to_vec()]);
    }

    #[test]
    fn missing_argument_skips_write() {
        let store = VarStore::new();
        let (user, calls) = recorder();
        let handler = field_handler(HandlerConfig::new(1), "f".to_string(), store.scope(), Some(user));
        handler.call(&[json!("only one")]);

        assert_eq!(store.lookup("f"), None);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn missing_nested_field_skips_write() {
        let store = VarStore::new();
        let handler = field_handler(HandlerConfig::new(0).field("target.value"), "f".to_string(), store.scope(), None);
        handler.call(&[json!({ "target": {} })]);
        assert_eq!(store.lookup("f"), None);
    }

    #[test]
    fn whole_argument_without_field_path() {
        let store = VarStore::new();
        let handler = field_handler(HandlerConfig::new(1), "checked".to_string(), store.scope(), None);
        handler.call(&[json!("event"), json!(true)]);
        assert_eq!(store.lookup("checked"), Some(json!(true)));
    }

    #[test]
    fn container_hook_appends_form_value() {
        let store = VarStore::from_json(json!({ "login": { "user": "ada" } }));
        let (user, calls) = recorder();
        let handler = container_handler("login".to_string(), store.scope(), user);
        handler.call(&[json!("submit")]);
        assert_eq!(*calls.borrow(), vec![vec![json!("submit"), json!({ "user": "ada" })]]);
    }
}
