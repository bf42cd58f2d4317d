#![forbid(unsafe_code)]

//! Component events.
//!
//! `emit(instance, "add-foo-bar", args)` calls the `onAddFooBar` prop the
//! parent passed to `instance`, if there is one.

use sprout_reactivity::Value;
use tracing::{trace, warn};

use crate::component::ComponentInstance;

/// Convert a kebab-case name to camelCase.
#[must_use]
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        let next_is_word = chars
            .peek()
            .is_some_and(|n| n.is_alphanumeric() || *n == '_');
        if c == '-' && next_is_word {
            if let Some(n) = chars.next() {
                out.extend(n.to_uppercase());
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Uppercase the first character.
#[must_use]
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Prop name of the handler for `event`: `on` + capitalize(camelize(event)).
#[must_use]
pub fn handler_name(event: &str) -> String {
    format!("on{}", capitalize(&camelize(event)))
}

/// Call the handler prop for `event` on `instance` with `args`.
///
/// Returns the handler's result, or `None` when there is no handler. An
/// empty event name is a misuse: it warns and calls nothing.
pub fn emit(instance: &ComponentInstance, event: &str, args: &[Value]) -> Option<Value> {
    if event.is_empty() {
        warn!(
            component = instance.name(),
            "emit() requires a non-empty event name"
        );
        return None;
    }
    let name = handler_name(event);
    let handler = instance.props().get_raw(&name);
    let Some(handler) = handler.as_func() else {
        trace!(component = instance.name(), handler = %name, "no handler for event");
        return None;
    };
    Some(handler.call(args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use sprout_reactivity::{Func, Object};
    use tracing::Subscriber;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use crate::component::Component;
    use crate::vnode::h;

    struct WarnCapture {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl<S: Subscriber> Layer<S> for WarnCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            struct Msg(Option<String>);
            impl tracing::field::Visit for Msg {
                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.0 = Some(format!("{value:?}"));
                    }
                }
            }
            let mut msg = Msg(None);
            event.record(&mut msg);
            if let Some(message) = msg.0 {
                self.messages.lock().expect("warn capture lock").push(message);
            }
        }
    }

    fn instance_with(props: Object) -> Rc<ComponentInstance> {
        let comp = Component::new("Emitter").build();
        let vnode = h(&comp, props, ());
        let instance = ComponentInstance::new(&vnode, comp, None);
        instance.update_pre_render(vnode);
        instance
    }

    #[test]
    fn emit_calls_handler_with_args() {
        let sum = Rc::new(Cell::new(0));
        let s = Rc::clone(&sum);
        let handler = Func::new(move |args| {
            let total: i64 = args.iter().filter_map(Value::as_i64).sum();
            s.set(total);
            Value::Bool(true)
        });
        let instance = instance_with(Object::new().with("onAddFooBar", handler));
        let result = emit(&instance, "add-foo-bar", &[Value::Int(2), Value::Int(3)]);
        assert_eq!(result, Some(Value::Bool(true)));
        assert_eq!(sum.get(), 5);
        assert_eq!(emit(&instance, "missing", &[]), None);
    }

    #[test]
    fn empty_event_name_warns() {
        let instance = instance_with(Object::new());
        let messages = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(WarnCapture {
            messages: Arc::clone(&messages),
        });
        let result = tracing::subscriber::with_default(subscriber, || emit(&instance, "", &[]));
        assert_eq!(result, None);
        let messages = messages.lock().expect("warn capture lock");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("non-empty event name"));
    }

    #[test]
    fn kebab_names_map_to_handler_props() {
        assert_eq!(handler_name("add"), "onAdd");
        assert_eq!(handler_name("add-foo-bar"), "onAddFooBar");
        assert_eq!(handler_name("addFoo"), "onAddFoo");
        assert_eq!(camelize("trailing-"), "trailing-");
        assert_eq!(camelize("a--b"), "a-B");
        assert_eq!(capitalize(""), "");
    }
}
