use brickie_expr::truthy;

use crate::component::{Component, Context, downcast};
use crate::vnode::{Props, VNode};

use super::{render_attr, value};

/// `If`: renders `then` when `condition` is truthy, `else` otherwise.
///
/// ```json
/// { "type": "If", "condition": "{user != null}",
///   "then": { "type": "Text", "content": "{user.name}" },
///   "else": { "type": "Text", "content": "Sign in" } }
/// ```
///
/// No scope fork happens; both branches see the surrounding scope.
pub struct Conditional {
    props: Props,
}

impl Conditional {
    pub fn new(props: Props) -> Self {
        Self { props }
    }

    fn branch(&self) -> &'static str {
        let condition = value(&self.props, "condition").is_some_and(truthy);
        if condition { "then" } else if value(&self.props, "else").is_some() { "else" } else { "elseif" }
    }
}

impl Component for Conditional {
    fn name(&self) -> &'static str {
        "If"
    }

    fn receive(&mut self, next: Box<dyn Component>) -> Result<(), Box<dyn Component>> {
        self.props = downcast::<Conditional>(next)?.props;
        Ok(())
    }

    fn render(&mut self, _cx: &Context) -> Vec<VNode> {
        render_attr(&self.props, self.branch())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::host::Host;
    use crate::output;
    use crate::vnode::{Prop, RENDER_KIDS, RenderKids};

    /// Render kids that are plain strings as primitives.
    fn echo() -> Prop {
        Prop::RenderKids(RenderKids::new(|kids, _| vec![VNode::Primitive(kids.clone())]))
    }

    fn render(condition: Option<Value>, with_else: bool) -> String {
        let mut props = Props::new();
        props.insert(RENDER_KIDS.to_string(), echo());
        props.insert("then".to_string(), json!("then").into());
        if with_else {
            props.insert("else".to_string(), json!("else").into());
        }
        if let Some(c) = condition {
            props.insert("condition".to_string(), c.into());
        }
        let mut host = Host::new();
        host.render(vec![VNode::component(Conditional::new(props))]);
        output::text(&host.snapshot())
    }

    #[test]
    fn true_renders_then_only() {
        assert_eq!(render(Some(json!(true)), true), "then");
    }

    #[test]
    fn false_renders_else_only() {
        assert_eq!(render(Some(json!(false)), true), "else");
    }

    #[test]
    fn absent_condition_is_false() {
        assert_eq!(render(None, true), "else");
    }

    #[test]
    fn false_without_else_renders_nothing() {
        assert_eq!(render(Some(json!(0)), false), "");
    }

    #[test]
    fn truthiness_follows_expression_rules() {
        assert_eq!(render(Some(json!("yes")), true), "then");
        assert_eq!(render(Some(json!("")), true), "else");
    }
}
