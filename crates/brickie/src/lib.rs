//! Brickie: declarative UI from JSON.
//!
//! A layout is a tree of plain JSON objects ("bricks"), each naming a type:
//!
//! ```json
//! { "type": "Form", "name": "login", "children": [
//!     { "type": "Input", "name": "username", "value": "{login.username}", "onChange": "typed" },
//!     { "type": "If", "condition": "{login.username}",
//!       "then": { "type": "Text", "content": "{'Hello ' + login.username}" } }
//! ] }
//! ```
//!
//! Brickie walks that tree and produces renderables. String properties
//! wrapped in braces are expressions over a [`store::Scope`]; nodes carrying
//! them become reactive proxies that re-render on their own when a variable
//! they read changes. `If`, `ForEach`, `Fetch` and `Slot` are built in;
//! everything else is either registered by the host or, when lower-case, a
//! native element tag.
//!
//! # Quick start
//!
//! ```rust
//! use brickie::prelude::*;
//! use serde_json::json;
//!
//! let mut app = Brickie::new();
//! app.register("Text", Constructor::element("text")).unwrap();
//!
//! let store = VarStore::from_json(json!({ "count": 1 }));
//! app.mount(json!({ "type": "Text", "children": "{count}" }), "main", store.scope(), Handlers::new())
//!     .unwrap();
//!
//! store.set_value("count", json!(2));
//! app.flush();
//! assert_eq!(output::text(&app.tree("main").unwrap()), "2");
//! ```
//!
//! # Custom bricks
//!
//! A [`Constructor`] is either a plain element tag or a factory returning any
//! [`VNode`], including a stateful [`Component`]:
//!
//! ```rust,ignore
//! app.register("Badge", Constructor::factory(|props, children| {
//!     VNode::element("span", props, children)
//! }))?;
//! ```

pub mod annotate;
pub mod app;
pub mod brick;
pub mod component;
pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod host;
pub mod interpreter;
pub mod logging;
pub mod output;
mod proxy;
pub mod registry;
pub mod special;
pub mod store;
pub mod transport;
pub mod vnode;

// Top-level re-exports for the common entry points, e.g. `use brickie::Brickie`
pub use annotate::{AnnotateOptions, annotate};
pub use app::Brickie;
pub use component::{Component, Context, Invalidator};
pub use config::BrickieConfig;
pub use error::BrickieError;
pub use handlers::{HandlerSource, Handlers};
pub use host::Host;
pub use interpreter::Interpreter;
pub use registry::{HandlerConfig, Registry};
pub use transport::{Request, Response, Transport, TransportError};
pub use vnode::{Constructor, Handler, Prop, Props, RenderKids, VNode};

/// Everything an embedding application needs; import this where layouts are mounted.
pub mod prelude {
    pub use crate::app::Brickie;
    pub use crate::config::BrickieConfig;
    pub use crate::error::BrickieError;
    pub use crate::handlers::{HandlerSource, Handlers};
    pub use crate::logging::{LoggingConfig, init_logging};
    pub use crate::output::{self, Output};
    pub use crate::registry::HandlerConfig;
    pub use crate::store::{Scope, ScopeRef, VarStore};
    pub use crate::transport::{Completion, Request, Response, Transport, TransportError};
    pub use crate::vnode::{Constructor, Handler, Prop, Props, VNode};
}
