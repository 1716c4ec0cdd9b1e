use std::fmt::Write as _;

use brickie::output::{Element, Output};
use serde_json::Value;

/// Indented outline of a rendered tree:
///
/// ```text
/// <box key="main">
///   <text key="greeting" content="hi"/>
///   "plain text"
/// </box>
/// ```
pub fn outline(roots: &[Output]) -> String {
    let mut out = String::new();
    for root in roots {
        node(root, 0, &mut out);
    }
    out
}

/// The tree as a JSON array, handlers shown as placeholders.
pub fn json(roots: &[Output]) -> Value {
    Value::Array(roots.iter().map(Output::to_json).collect())
}

fn node(output: &Output, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match output {
        Output::Primitive(value) => {
            let _ = writeln!(out, "{indent}{value}");
        }
        Output::Element(element) => {
            let open = open_tag(element);
            if element.children.is_empty() {
                let _ = writeln!(out, "{indent}<{open}/>");
                return;
            }
            let _ = writeln!(out, "{indent}<{open}>");
            for child in &element.children {
                node(child, depth + 1, out);
            }
            let _ = writeln!(out, "{indent}</{}>", element.tag);
        }
    }
}

fn open_tag(element: &Element) -> String {
    let mut tag = element.tag.clone();
    if let Some(key) = &element.key {
        let _ = write!(tag, " key=\"{key}\"");
    }
    for (name, prop) in &element.props {
        match prop.to_json() {
            Value::String(s) => { let _ = write!(tag, " {name}=\"{s}\""); }
            other => { let _ = write!(tag, " {name}={other}"); }
        }
    }
    tag
}

#[cfg(test)]
mod tests {
    use brickie::{Handler, Props};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn element(tag: &str, key: Option<&str>, props: Props, children: Vec<Output>) -> Output {
        Output::Element(Element { tag: tag.to_string(), key: key.map(str::to_string), props, children })
    }

    #[test]
    fn outline_nests_children() {
        let mut props = Props::new();
        props.insert("content".to_string(), json!("hi").into());
        props.insert("size".to_string(), json!(3).into());
        props.insert("onClick".to_string(), Handler::new(|_| {}).into());
        let tree = vec![element(
            "box",
            Some("main"),
            Props::new(),
            vec![element("text", Some("t"), props, vec![]), Output::Primitive(json!("plain"))],
        )];

        let expected = "\
<box key=\"main\">
  <text key=\"t\" content=\"hi\" onClick=\"<handler>\" size=3/>
  \"plain\"
</box>
";
        assert_eq!(outline(&tree), expected);
    }

    #[test]
    fn json_rendering() {
        let tree = vec![Output::Primitive(json!(1)), element("p", None, Props::new(), vec![])];
        assert_eq!(json(&tree), json!([1, { "tag": "p" }]));
    }
}
