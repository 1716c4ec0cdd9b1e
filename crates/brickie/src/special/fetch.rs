use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Map, Value, json};

use crate::brick::expression_text;
use crate::component::{Component, Context, downcast};
use crate::store::ScopeRef;
use crate::transport::{Request, Transport, TransportError};
use crate::vnode::{Props, VNode};

use super::{render_attr, render_kids, string, value};

const HEADER_PREFIX: &str = "header-";

/// Where a fetch brick is in its one-shot request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Pending,
    Succeeded { response: Value, data: Value },
    Failed(Value),
}

/// `Fetch`: issues one request when mounted and renders `loading`, then
/// `success` or `error`.
///
/// ```json
/// { "type": "Fetch", "url": "https://api.example.com/users", "method": "POST",
///   "header-Authorization": "{token}",
///   "body": [ { "key": "name", "value": "{draft.name}" } ],
///   "as": "res", "data-as": "users",
///   "loading": { "type": "Spinner" },
///   "success": { "type": "Text", "content": "{users.length}" },
///   "error": { "type": "Text", "content": "{error.message}" } }
/// ```
///
/// On success the scope is forked with the response object
/// (`{status, statusText, config, data}`) under `as` (default `response`) and,
/// when `data-as` is set, the body data under that name. On failure the error
/// is bound under `error-as` (default `error`). The request is never retried;
/// remounting is the only way to fetch again. A response arriving after
/// unmount is dropped.
pub struct Fetch {
    props: Props,
    scope: ScopeRef,
    transport: Option<Rc<dyn Transport>>,
    state: Rc<RefCell<FetchState>>,
    alive: Rc<Cell<bool>>,
}

impl Fetch {
    pub fn new(props: Props, scope: ScopeRef, transport: Option<Rc<dyn Transport>>) -> Self {
        Self {
            props,
            scope,
            transport,
            state: Rc::new(RefCell::new(FetchState::Pending)),
            alive: Rc::new(Cell::new(false)),
        }
    }

    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    fn request(&self) -> Result<Request, String> {
        let url = string(&self.props, "url").ok_or("fetch brick has no url")?;
        let method = string(&self.props, "method").unwrap_or("GET").to_ascii_uppercase();

        let mut request = Request::get(url);
        for (key, prop) in &self.props {
            let Some(name) = key.strip_prefix(HEADER_PREFIX).filter(|n| !n.is_empty()) else {
                continue;
            };
            match prop.as_value() {
                Some(Value::String(s)) => { request.headers.insert(name.to_string(), s.clone()); }
                Some(Value::Null) | None => {}
                Some(other) => { request.headers.insert(name.to_string(), other.to_string()); }
            }
        }
        if Request::is_mutating(&method) {
            request.body = self.body();
        }
        request.method = method;
        Ok(request)
    }

    /// Assemble the JSON body from `body: [{ key, value }]` entries.
    fn body(&self) -> Option<Value> {
        let entries = value(&self.props, "body")?.as_array()?;
        let mut body = Map::new();
        for entry in entries {
            let Some(key) = entry.get("key").or_else(|| entry.get("name")).and_then(Value::as_str) else {
                log::warn!("fetch body entry without a key: {}", entry);
                continue;
            };
            let raw = entry.get("value").cloned().unwrap_or(Value::Null);
            body.insert(key.to_string(), self.resolve(raw));
        }
        Some(Value::Object(body))
    }

    fn resolve(&self, raw: Value) -> Value {
        let Some(text) = raw.as_str().and_then(expression_text) else {
            return raw;
        };
        match self.scope.evaluate(text) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("fetch body value '{}' failed: {}", text, e);
                Value::Null
            }
        }
    }

    fn fail(&self, error: Value) {
        *self.state.borrow_mut() = FetchState::Failed(error);
    }
}

impl Component for Fetch {
    fn name(&self) -> &'static str {
        "Fetch"
    }

    fn mount(&mut self, cx: &Context) {
        self.alive.set(true);
        let request = match self.request() {
            Ok(r) => r,
            Err(message) => {
                log::warn!("{}", message);
                self.fail(json!({ "message": message }));
                return;
            }
        };
        let Some(transport) = self.transport.clone() else {
            log::warn!("fetch of {} skipped: {}", request.url, TransportError::Unavailable);
            self.fail(TransportError::Unavailable.to_json());
            return;
        };

        log::debug!("fetch {} {}", request.method, request.url);
        let config = serde_json::to_value(&request).unwrap_or(Value::Null);
        let state = self.state.clone();
        let alive = self.alive.clone();
        let invalidator = cx.invalidator();
        transport.send(
            request,
            Box::new(move |result| {
                if !alive.get() {
                    log::debug!("fetch resolved after unmount, dropping the result");
                    return;
                }
                *state.borrow_mut() = match result {
                    Ok(response) => FetchState::Succeeded {
                        response: json!({
                            "status": response.status,
                            "statusText": response.status_text,
                            "config": config,
                            "data": response.data,
                        }),
                        data: response.data,
                    },
                    Err(e) => {
                        log::warn!("fetch failed: {}", e);
                        FetchState::Failed(e.to_json())
                    }
                };
                invalidator.invalidate();
            }),
        );
    }

    fn receive(&mut self, next: Box<dyn Component>) -> Result<(), Box<dyn Component>> {
        let next = downcast::<Fetch>(next)?;
        // Fresh props and scope, same request state.
        self.props = next.props;
        self.scope = next.scope;
        Ok(())
    }

    fn render(&mut self, _cx: &Context) -> Vec<VNode> {
        let state = self.state();
        let Some(kids) = render_kids(&self.props) else {
            return Vec::new();
        };
        match state {
            // `load` is the older name of `loading`.
            FetchState::Pending => match value(&self.props, "loading") {
                Some(_) => render_attr(&self.props, "loading"),
                None => render_attr(&self.props, "load"),
            },
            FetchState::Succeeded { response, data } => {
                let Some(success) = value(&self.props, "success") else {
                    return Vec::new();
                };
                let mut bindings = Map::new();
                bindings.insert(string(&self.props, "as").unwrap_or("response").to_string(), response);
                if let Some(name) = string(&self.props, "data-as") {
                    bindings.insert(name.to_string(), data);
                }
                kids.render_with(success, "Fetch", bindings)
            }
            FetchState::Failed(error) => {
                let Some(tree) = value(&self.props, "error") else {
                    return Vec::new();
                };
                let mut bindings = Map::new();
                bindings.insert(string(&self.props, "error-as").unwrap_or("error").to_string(), error);
                kids.render_with(tree, "Fetch", bindings)
            }
        }
    }

    fn unmount(&mut self) {
        self.alive.set(false);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::host::Host;
    use crate::output;
    use crate::store::VarStore;
    use crate::transport::{Completion, Response};
    use crate::vnode::{Prop, RENDER_KIDS, RenderKids};

    /// Holds completions until the test resolves them.
    #[derive(Default)]
    struct ManualTransport {
        requests: RefCell<Vec<Request>>,
        pending: RefCell<Vec<Completion>>,
    }

    impl ManualTransport {
        fn resolve(&self, result: Result<Response, TransportError>) {
            let done = self.pending.borrow_mut().remove(0);
            done(result);
        }
    }

    impl Transport for ManualTransport {
        fn send(&self, request: Request, done: Completion) {
            self.requests.borrow_mut().push(request);
            self.pending.borrow_mut().push(done);
        }
    }

    /// Renders each sub-tree as `"<tree>:<bindings>"`.
    fn describe() -> Prop {
        Prop::RenderKids(RenderKids::new(|kids, bindings| {
            let bound = bindings.map(|(_, b)| Value::Object(b).to_string()).unwrap_or_default();
            vec![VNode::Primitive(Value::String(format!("{}:{}", kids.as_str().unwrap_or("?"), bound)))]
        }))
    }

    fn fetch_props(extra: Value) -> Props {
        let mut props = Props::new();
        props.insert(RENDER_KIDS.to_string(), describe());
        props.insert("url".to_string(), json!("https://example.test/items").into());
        props.insert("loading".to_string(), json!("loading").into());
        props.insert("success".to_string(), json!("success").into());
        props.insert("error".to_string(), json!("error").into());
        if let Value::Object(map) = extra {
            for (k, v) in map {
                props.insert(k, v.into());
            }
        }
        props
    }

    fn mount(props: Props, transport: &Rc<ManualTransport>, store: &VarStore) -> Host {
        let transport: Rc<dyn Transport> = transport.clone();
        let mut host = Host::new();
        host.render(vec![VNode::component(Fetch::new(props, store.scope(), Some(transport)))]);
        host
    }

    #[test]
    fn pending_then_success() {
        let transport = Rc::new(ManualTransport::default());
        let mut host = mount(fetch_props(json!({ "data-as": "items" })), &transport, &VarStore::new());
        assert_eq!(output::text(&host.snapshot()), "loading:");

        transport.resolve(Ok(Response::ok(json!([1, 2]))));
        assert_eq!(host.flush(), 1);

        let text = output::text(&host.snapshot());
        assert!(text.starts_with("success:"));
        assert!(text.contains(r#""items":[1,2]"#));
        assert!(text.contains(r#""status":200"#));
    }

    #[test]
    fn failure_binds_error() {
        let transport = Rc::new(ManualTransport::default());
        let mut host = mount(fetch_props(json!({})), &transport, &VarStore::new());
        transport.resolve(Err(TransportError::Network("connection refused".into())));
        host.flush();

        let text = output::text(&host.snapshot());
        assert!(text.starts_with("error:"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn resolution_after_unmount_is_dropped() {
        let transport = Rc::new(ManualTransport::default());
        let mut host = mount(fetch_props(json!({})), &transport, &VarStore::new());
        host.render(vec![]);

        transport.resolve(Ok(Response::ok(json!(null))));
        assert!(!host.has_pending());
        assert_eq!(host.flush(), 0);
    }

    #[test]
    fn request_is_sent_once_per_mount() {
        let transport = Rc::new(ManualTransport::default());
        let store = VarStore::new();
        let mut host = mount(fetch_props(json!({})), &transport, &store);
        let transport_dyn: Rc<dyn Transport> = transport.clone();
        host.render(vec![VNode::component(Fetch::new(fetch_props(json!({})), store.scope(), Some(transport_dyn)))]);

        assert_eq!(transport.requests.borrow().len(), 1);
    }

    #[test]
    fn headers_and_body_for_mutating_methods() {
        let transport = Rc::new(ManualTransport::default());
        let store = VarStore::from_json(json!({ "draft": { "name": "Ada" } }));
        let props = fetch_props(json!({
            "method": "post",
            "header-Authorization": "Bearer t",
            "header-X-Retry": 3,
            "body": [ { "key": "name", "value": "{draft.name}" }, { "key": "fixed", "value": 1 } ],
        }));
        let _host = mount(props, &transport, &store);

        let requests = transport.requests.borrow();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].headers.get("Authorization").map(String::as_str), Some("Bearer t"));
        assert_eq!(requests[0].headers.get("X-Retry").map(String::as_str), Some("3"));
        assert_eq!(requests[0].body, Some(json!({ "name": "Ada", "fixed": 1 })));
    }

    #[test]
    fn get_requests_carry_no_body() {
        let transport = Rc::new(ManualTransport::default());
        let props = fetch_props(json!({ "body": [ { "key": "a", "value": 1 } ] }));
        let _host = mount(props, &transport, &VarStore::new());
        assert_eq!(transport.requests.borrow()[0].body, None);
    }

    #[test]
    fn missing_transport_fails_immediately() {
        let mut host = Host::new();
        host.render(vec![VNode::component(Fetch::new(fetch_props(json!({})), VarStore::new().scope(), None))]);
        assert!(output::text(&host.snapshot()).starts_with("error:"));
    }

    #[test]
    fn missing_url_fails_without_request() {
        let transport = Rc::new(ManualTransport::default());
        let mut props = fetch_props(json!({}));
        props.remove("url");
        let host = mount(props, &transport, &VarStore::new());
        assert!(transport.requests.borrow().is_empty());
        assert!(output::text(&host.snapshot()).contains("no url"));
    }
}
