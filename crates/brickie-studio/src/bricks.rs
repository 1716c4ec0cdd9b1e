use brickie::vnode::RENDER_KIDS;
use brickie::{Brickie, BrickieError, Constructor, HandlerConfig, Props, RenderKids, VNode};

/// Brick types the studio understands out of the box, rendered as plain tags.
const ELEMENTS: &[(&str, &str)] = &[
    ("Box", "box"),
    ("Row", "row"),
    ("Column", "column"),
    ("Text", "text"),
    ("Heading", "heading"),
    ("Image", "image"),
    ("Button", "button"),
    ("Link", "link"),
    ("List", "list"),
    ("Spinner", "spinner"),
    ("Form", "form"),
    ("Input", "input"),
    ("Checkbox", "checkbox"),
    ("Select", "select"),
];

/// Register the default bricks plus their form roles.
pub fn register_defaults(app: &mut Brickie) -> Result<(), BrickieError> {
    app.register_all(ELEMENTS.iter().map(|(name, tag)| (*name, Constructor::element(*tag))))?;
    app.register_with_children("Card", Constructor::factory(card), ["header", "footer"])?;

    app.register_form_container("Form", ["onSubmit"])?;
    app.register_form_field("Input", [("onChange", HandlerConfig::new(0).field("target.value"))])?;
    app.register_form_field("Select", [("onChange", HandlerConfig::new(0).field("target.value"))])?;
    app.register_form_field("Checkbox", [("onChange", HandlerConfig::new(0).field("target.checked"))])?;
    Ok(())
}

/// `Card`: optional `header` and `footer` sub-trees around its children.
fn card(mut props: Props, children: Vec<VNode>) -> VNode {
    let kids = props.remove(RENDER_KIDS).and_then(|p| p.as_render_kids().cloned());
    let mut sections = section(&mut props, "header", kids.as_ref());
    sections.push(VNode::element("body", Props::new(), children));
    sections.extend(section(&mut props, "footer", kids.as_ref()));
    VNode::element("card", props, sections)
}

fn section(props: &mut Props, name: &str, kids: Option<&RenderKids>) -> Vec<VNode> {
    let tree = props.remove(name);
    match (tree.as_ref().and_then(|p| p.as_value()), kids) {
        (Some(tree), Some(kids)) => vec![VNode::element(name, Props::new(), kids.render(tree))],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use brickie::Handlers;
    use brickie::output::{self, Output};
    use brickie::store::VarStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_register_cleanly() {
        let mut app = Brickie::new();
        register_defaults(&mut app).unwrap();
        let registry = app.registry();
        let registry = registry.borrow();
        assert!(registry.resolve("Text").is_some());
        assert_eq!(registry.resolve("Card").unwrap().child_attributes, vec!["header", "footer"]);
        assert!(registry.is_form_container("Form"));
        assert!(registry.is_form_field("Checkbox"));
    }

    #[test]
    fn card_renders_its_sections() {
        let mut app = Brickie::new();
        register_defaults(&mut app).unwrap();
        let store = VarStore::from_json(json!({ "who": "Ada" }));
        app.mount(
            json!({ "type": "Card", "id": "c",
                    "header": { "type": "Text", "children": "{who}" },
                    "children": [ "body text" ] }),
            "main",
            store.scope(),
            Handlers::new(),
        )
        .unwrap();

        let tree = app.tree("main").unwrap();
        let card = tree[0].as_element().unwrap();
        let tags: Vec<_> = card.children.iter().filter_map(Output::as_element).map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["header", "body"]);
        assert!(card.prop("header").is_none());
        assert_eq!(output::text(&tree), "Adabody text");
    }
}
