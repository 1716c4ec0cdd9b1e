//! brickie-studio: render a JSON layout from the command line.
//!
//! ```text
//! brickie-studio layouts/greeting.json --scope layouts/greeting.scope.json \
//!     --set greeting='"bye"' --dispatch name-input:onChange='[{"target":{"value":"Ada"}}]'
//! ```

mod bricks;
mod print;
mod transport;

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, bail};
use brickie::logging::{LoggingConfig, init_logging};
use brickie::store::{Scope, VarStore};
use brickie::{Brickie, BrickieConfig, Handler, Transport};
use clap::Parser;
use serde_json::Value;

use crate::transport::HttpTransport;

#[derive(Debug, Parser)]
#[command(name = "brickie-studio", version, about = "Render a brickie layout and print the resulting tree")]
struct Cli {
    /// Layout file (a JSON brick or array of bricks).
    layout: PathBuf,

    /// JSON object with the initial variables.
    #[arg(long)]
    scope: Option<PathBuf>,

    /// JSON file with renderer settings (key_prefix, class_attribute, ...).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Set a variable after mounting; VALUE is JSON, or a plain string.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Call a handler prop on a rendered element; ARGS is a JSON array.
    #[arg(long = "dispatch", value_name = "KEY:PROP[=ARGS]")]
    dispatch: Vec<String>,

    /// Print the tree as JSON instead of an outline.
    #[arg(long)]
    json: bool,

    /// Per-node render tracing.
    #[arg(long)]
    debug: bool,

    /// How long to wait for fetch bricks, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
}

const TARGET: &str = "main";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig {
        env_filter: cli.debug.then(|| "debug".to_string()),
        ..LoggingConfig::default()
    });

    let mut config: BrickieConfig = match &cli.config {
        Some(path) => serde_json::from_value(read_json(path)?)
            .with_context(|| format!("invalid config in {}", path.display()))?,
        None => BrickieConfig::default(),
    };
    config.debug |= cli.debug;

    let layout = read_json(&cli.layout)?;
    let store = match &cli.scope {
        Some(path) => VarStore::from_json(read_json(path)?),
        None => VarStore::new(),
    };

    let timeout = Duration::from_millis(cli.timeout_ms);
    let http = Rc::new(HttpTransport::new(timeout)?);
    let shared: Rc<dyn Transport> = http.clone();
    let mut app = Brickie::with_config(config);
    app.set_transport(Some(shared));
    bricks::register_defaults(&mut app)?;

    app.mount(layout, TARGET, store.scope(), log_handler)?;

    for assignment in &cli.set {
        let (name, value) = parse_assignment(assignment)?;
        store.set_value(&name, value);
    }
    settle(&mut app, &http, timeout);

    for event in &cli.dispatch {
        let (key, prop, args) = parse_dispatch(event)?;
        app.dispatch(TARGET, &key, &prop, &args)?;
        settle(&mut app, &http, timeout);
    }

    let tree = app.tree(TARGET)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&print::json(&tree))?);
    } else {
        print!("{}", print::outline(&tree));
    }
    Ok(())
}

/// Every handler id resolves to one that just logs its call.
fn log_handler(id: &str) -> Option<Handler> {
    let id = id.to_string();
    Some(Handler::new(move |args| log::info!("handler '{}' called with {:?}", id, args)))
}

/// Flush re-renders and deliver HTTP responses until nothing is left to do.
fn settle(app: &mut Brickie, http: &HttpTransport, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        http.pump();
        app.flush();
        if http.in_flight() == 0 {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || http.wait(remaining) == 0 {
            log::warn!("{} request(s) still in flight after {:?}", http.in_flight(), timeout);
            return;
        }
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// `name=value`, where value is JSON if it parses and a string otherwise.
fn parse_assignment(raw: &str) -> anyhow::Result<(String, Value)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("expected NAME=VALUE, got '{}'", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("missing variable name in '{}'", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

/// `key:prop` or `key:prop=[args...]`.
fn parse_dispatch(raw: &str) -> anyhow::Result<(String, String, Vec<Value>)> {
    let (target, args) = match raw.split_once('=') {
        Some((target, args)) => (target, Some(args)),
        None => (raw, None),
    };
    let Some((key, prop)) = target.split_once(':') else {
        bail!("expected KEY:PROP[=ARGS], got '{}'", raw);
    };
    let args = match args {
        Some(text) => match serde_json::from_str(text).with_context(|| format!("bad arguments in '{}'", raw))? {
            Value::Array(items) => items,
            single => vec![single],
        },
        None => Vec::new(),
    };
    Ok((key.trim().to_string(), prop.trim().to_string(), args))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn assignment_values_are_json_or_text() {
        assert_eq!(parse_assignment("n=3").unwrap(), ("n".to_string(), json!(3)));
        assert_eq!(parse_assignment("user.name=Ada").unwrap(), ("user.name".to_string(), json!("Ada")));
        assert_eq!(parse_assignment("s=\"x=y\"").unwrap(), ("s".to_string(), json!("x=y")));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn dispatch_arguments() {
        assert_eq!(
            parse_dispatch("btn:onClick").unwrap(),
            ("btn".to_string(), "onClick".to_string(), vec![])
        );
        assert_eq!(
            parse_dispatch(r#"in:onChange=[{"target":{"value":"a"}}]"#).unwrap(),
            ("in".to_string(), "onChange".to_string(), vec![json!({ "target": { "value": "a" } })])
        );
        assert_eq!(parse_dispatch("in:onChange=5").unwrap().2, vec![json!(5)]);
        assert!(parse_dispatch("nocolon").is_err());
        assert!(parse_dispatch("a:b=[").is_err());
    }

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from(["brickie-studio", "layout.json", "--set", "a=1", "--json"]).unwrap();
        assert_eq!(cli.set, vec!["a=1"]);
        assert!(cli.json);
        assert_eq!(cli.timeout_ms, 10_000);
    }
}
