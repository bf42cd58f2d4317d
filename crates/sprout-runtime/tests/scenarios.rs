//! End-to-end scenarios: components, scheduler and keyed diff driven through
//! the in-memory host.

#![cfg(feature = "memory-host")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::executor::block_on;
use sprout_reactivity::{Func, Object, Ref, Value, reactive};
use sprout_runtime::{
    Component, HostNode, HostOp, MemoryHost, Renderer, SetupResult, Slots, VNodeRef, VNodeType,
    fragment, h, inject_or, next_tick, next_tick_then, provide, render_slot, run_microtasks, text,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn item(key: &str) -> VNodeRef {
    h("li", Object::new().with("key", key), key)
}

fn list(keys: &[&str]) -> VNodeRef {
    h("ul", Object::new(), keys.iter().map(|k| item(k)).collect::<Vec<_>>())
}

fn child_els(vnode: &VNodeRef) -> Vec<HostNode> {
    vnode
        .children()
        .as_nodes()
        .unwrap()
        .iter()
        .map(|child| child.el().unwrap())
        .collect()
}

fn mounted(tree: &VNodeRef) -> (Rc<Renderer<MemoryHost>>, HostNode) {
    let renderer = Renderer::new(MemoryHost::new());
    let root = renderer.host().create_root();
    renderer.render(Some(tree), root).unwrap();
    renderer.host().take_ops();
    (renderer, root)
}

fn bump(cell: &Cell<u32>) {
    cell.set(cell.get() + 1);
}

// ═════════════════════════════════════════════════════════════════════════
// Diff minimality
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn append_mounts_only_new_tail() {
    let before = list(&["A", "B"]);
    let (renderer, root) = mounted(&before);
    let old = child_els(&before);

    let after = list(&["A", "B", "C", "D"]);
    renderer.render(Some(&after), root).unwrap();
    let new = child_els(&after);
    assert_eq!(&new[..2], &old[..]);

    let ops = renderer.host().ops();
    assert!(ops.iter().all(|op| op.node() == new[2] || op.node() == new[3]));
    let inserts: Vec<_> = ops
        .iter()
        .filter(|op| matches!(op, HostOp::Insert { .. }))
        .cloned()
        .collect();
    let ul = after.el().unwrap();
    assert_eq!(
        inserts,
        vec![
            HostOp::Insert { node: new[2], parent: ul, anchor: None },
            HostOp::Insert { node: new[3], parent: ul, anchor: None },
        ]
    );
    assert_eq!(renderer.host().text_content(ul), "ABCD");
}

#[test]
fn removal_removes_exactly_the_dropped_child() {
    let before = list(&["A", "B", "C"]);
    let (renderer, root) = mounted(&before);
    let c = child_els(&before)[2];

    renderer.render(Some(&list(&["A", "B"])), root).unwrap();
    assert_eq!(renderer.host().ops(), vec![HostOp::Remove { node: c }]);
}

#[test]
fn swap_moves_at_most_one_of_the_pair() {
    let before = list(&["A", "B", "C", "D", "E", "F", "G"]);
    let (renderer, root) = mounted(&before);
    let old = child_els(&before);

    let after = list(&["A", "B", "D", "C", "E", "F", "G"]);
    renderer.render(Some(&after), root).unwrap();
    let new = child_els(&after);

    for (slot, old_slot) in [(0, 0), (1, 1), (4, 4), (5, 5), (6, 6)] {
        assert_eq!(new[slot], old[old_slot]);
    }
    assert_eq!(new[2], old[3]);
    assert_eq!(new[3], old[2]);

    let ops = renderer.host().ops();
    assert!(ops.iter().all(|op| matches!(op, HostOp::Insert { .. })));
    assert!(ops.len() <= 1);
    assert!(ops.iter().all(|op| op.node() == old[2] || op.node() == old[3]));
    assert_eq!(renderer.host().text_content(after.el().unwrap()), "ABDCEFG");
}

// ═════════════════════════════════════════════════════════════════════════
// Scheduler
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn synchronous_triggers_coalesce_into_one_render() {
    let state = reactive(Object::new().with("n", 0)).unwrap();
    let renders = Rc::new(Cell::new(0u32));

    let (st, r) = (state.clone(), Rc::clone(&renders));
    let view = Component::new("View")
        .render(move |_| {
            bump(&r);
            h("p", Object::new(), st.get("n").to_text())
        })
        .build();

    let (renderer, root) = mounted(&h(&view, Object::new(), ()));
    assert_eq!(renders.get(), 1);

    state.set("n", 1).unwrap();
    state.set("n", 2).unwrap();
    state.set("n", 3).unwrap();
    assert_eq!(renders.get(), 1);

    block_on(next_tick());
    assert_eq!(renders.get(), 2);
    assert_eq!(renderer.host().serialize(root), "<p>3</p>");
}

#[test]
fn next_tick_then_observes_flushed_tree() {
    let count = Ref::new(0);
    let c = count.clone();
    let view = Component::new("View")
        .render(move |_| h("p", Object::new(), c.value().to_text()))
        .build();
    let (renderer, root) = mounted(&h(&view, Object::new(), ()));

    count.set(7);
    let seen = Rc::new(RefCell::new(String::new()));
    let (s, host) = (Rc::clone(&seen), Rc::clone(&renderer));
    let tick = next_tick_then(move || *s.borrow_mut() = host.host().serialize(root));
    block_on(tick);
    assert_eq!(*seen.borrow(), "<p>7</p>");
}

#[test]
fn listener_updates_state_and_rerenders() {
    let count = Ref::new(0);
    let c = count.clone();
    let button = Component::new("Button")
        .render(move |_| {
            let inc = c.clone();
            let on_click = Func::handler(move |_| {
                let next = inc.peek().as_i64().unwrap_or(0) + 1;
                inc.set(next);
            });
            h(
                "button",
                Object::new().with("onClick", on_click),
                c.value().to_text(),
            )
        })
        .build();
    let vnode = h(&button, Object::new(), ());
    let (renderer, root) = mounted(&vnode);

    let el = vnode.el().unwrap();
    assert!(renderer.host().dispatch(el, "click", &[]));
    assert!(renderer.host().dispatch(el, "click", &[]));
    run_microtasks();
    assert_eq!(renderer.host().serialize(root), "<button>2</button>");
    assert_eq!(vnode.el(), Some(el));
}

// ═════════════════════════════════════════════════════════════════════════
// Components
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn emit_routes_kebab_event_to_camel_handler() {
    let received = Rc::new(RefCell::new(Vec::new()));

    let child = Component::new("Child")
        .setup(|_, ctx| {
            ctx.emit("add-foo-bar", &[Value::Int(1), Value::Int(2)]);
            SetupResult::None
        })
        .render(|_| h("i", Object::new(), ()))
        .build();

    let r = Rc::clone(&received);
    let handler = Func::handler(move |args| r.borrow_mut().extend(args.iter().cloned()));
    let tree = h(&child, Object::new().with("onAddFooBar", handler), ());
    let _ = mounted(&tree);

    assert_eq!(*received.borrow(), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn inject_sees_nearest_provider_and_default_elsewhere() {
    let consumer = Component::new("Consumer")
        .setup(|_, _| {
            let foo = inject_or("foo", "default");
            SetupResult::render(move |_| text(foo.to_text()))
        })
        .build();

    let c = Rc::clone(&consumer);
    let inner = Component::new("Inner")
        .setup(move |_, ctx| {
            ctx.provide("foo", "inner");
            let c = Rc::clone(&c);
            SetupResult::render(move |_| h(&c, Object::new(), ()))
        })
        .build();

    let i = Rc::clone(&inner);
    let outer = Component::new("Outer")
        .setup(move |_, _| {
            provide("foo", "outer");
            let i = Rc::clone(&i);
            SetupResult::render(move |_| h(&i, Object::new(), ()))
        })
        .build();

    let (o, c) = (Rc::clone(&outer), Rc::clone(&consumer));
    let app = Component::new("App")
        .render(move |_| {
            h(
                "div",
                Object::new(),
                vec![
                    h(&o, Object::new(), ()),
                    text("|"),
                    h(&c, Object::new(), ()),
                ],
            )
        })
        .build();

    let (renderer, root) = mounted(&h(&app, Object::new(), ()));
    assert_eq!(renderer.host().serialize(root), "<div>inner|default</div>");
}

#[test]
fn slots_render_with_props() {
    let card = Component::new("Card")
        .render(|this| {
            h(
                "section",
                Object::new(),
                vec![
                    render_slot(&this.slots(), "header", 18),
                    h("p", Object::new(), "body"),
                    render_slot(&this.slots(), "footer", ()),
                ],
            )
        })
        .build();
    let slots = Slots::new().with_node("header", |age| {
        h("h1", Object::new(), format!("age {}", age.to_text()))
    });
    let (renderer, root) = mounted(&h(&card, Object::new(), slots));
    assert_eq!(
        renderer.host().serialize(root),
        "<section><h1>age 18</h1><p>body</p></section>"
    );
}

#[test]
fn parent_prop_change_updates_child_immediately() {
    let child_renders = Rc::new(Cell::new(0u32));
    let r = Rc::clone(&child_renders);
    let child = Component::new("Label")
        .render(move |this| {
            bump(&r);
            h("b", Object::new(), this.get("text").to_text())
        })
        .build();

    let label = Ref::new("one");
    let (l, ch) = (label.clone(), Rc::clone(&child));
    let parent = Component::new("Parent")
        .render(move |_| {
            h(
                "div",
                Object::new(),
                vec![h(&ch, Object::new().with("text", l.value()), ())],
            )
        })
        .build();

    let (renderer, root) = mounted(&h(&parent, Object::new(), ()));
    assert_eq!(child_renders.get(), 1);

    label.set("two");
    run_microtasks();
    assert_eq!(child_renders.get(), 2);
    assert_eq!(renderer.host().serialize(root), "<div><b>two</b></div>");
}

#[test]
fn root_tag_change_replaces_in_place() {
    let fancy = Ref::new(false);
    let f = fancy.clone();
    let toggle = Component::new("Toggle")
        .render(move |_| {
            if f.value().as_bool().unwrap_or(false) {
                h("em", Object::new(), "x")
            } else {
                h("span", Object::new(), "x")
            }
        })
        .build();

    let tree = h(
        "div",
        Object::new(),
        vec![text("<"), h(&toggle, Object::new(), ()), text(">")],
    );
    let (renderer, root) = mounted(&tree);
    fancy.set(true);
    run_microtasks();
    assert_eq!(renderer.host().serialize(root), "<div><<em>x</em>></div>");
    let component = &tree.children().as_nodes().unwrap()[1];
    assert_eq!(renderer.host().tag(component.el().unwrap()).as_deref(), Some("em"));
}

#[test]
fn nested_root_swap_keeps_outer_anchor_current() {
    let spanned = Ref::new(false);
    let sp = spanned.clone();
    let inner = Component::new("Inner")
        .render(move |_| {
            let tag = if sp.value().as_bool().unwrap_or(false) { "span" } else { "div" };
            h(tag, Object::new(), "w")
        })
        .build();
    let wrapper = Component::new("Wrapper")
        .render(move |_| h(&inner, Object::new(), ()))
        .build();

    let rows = |before: &[&str]| {
        let mut children: Vec<VNodeRef> = before.iter().map(|k| item(k)).collect();
        children.push(h(&wrapper, Object::new().with("key", "w"), ()));
        children.push(item("c"));
        h("ul", Object::new(), children)
    };
    let first = rows(&[]);
    let (renderer, root) = mounted(&first);

    spanned.set(true);
    block_on(next_tick());
    let outer = &first.children().as_nodes().unwrap()[0];
    assert_eq!(renderer.host().tag(outer.el().unwrap()).as_deref(), Some("span"));

    renderer.render(Some(&rows(&["b"])), root).unwrap();
    assert_eq!(
        renderer.host().serialize(root),
        "<ul><li>b</li><span>w</span><li>c</li></ul>"
    );
}

#[test]
fn keyed_components_move_without_remount() {
    let mounts = Rc::new(Cell::new(0u32));
    let m = Rc::clone(&mounts);
    let row = Component::new("Row")
        .setup(move |_, _| {
            bump(&m);
            SetupResult::None
        })
        .render(|this| h("li", Object::new(), this.get("id").to_text()))
        .build();

    let rows = |ids: &[i64]| {
        h(
            "ul",
            Object::new(),
            ids.iter()
                .map(|id| h(&row, Object::new().with("key", *id).with("id", *id), ()))
                .collect::<Vec<_>>(),
        )
    };
    let (renderer, root) = mounted(&rows(&[1, 2, 3]));
    renderer.render(Some(&rows(&[3, 1, 2])), root).unwrap();
    assert_eq!(mounts.get(), 3);
    assert_eq!(renderer.host().serialize(root), "<ul><li>3</li><li>1</li><li>2</li></ul>");
}

#[test]
fn fragment_component_root_patches_between_markers() {
    let items = Ref::new(1);
    let it = items.clone();
    let many = Component::new("Many")
        .render(move |_| {
            let n = it.value().as_i64().unwrap_or(0);
            fragment((0..n).map(|i| h("i", Object::new().with("key", i), i.to_string())).collect())
        })
        .build();
    let tree = h("div", Object::new(), vec![h(&many, Object::new(), ()), text("end")]);
    let (renderer, root) = mounted(&tree);

    items.set(3);
    block_on(next_tick());
    assert_eq!(
        renderer.host().serialize(root),
        "<div><i>0</i><i>1</i><i>2</i>end</div>"
    );
}

#[test]
fn fragment_text_patches_without_touching_siblings() {
    let wrap = |label: &str| {
        h(
            "div",
            Object::new(),
            vec![text("<"), h(VNodeType::Fragment, Object::new(), label), text(">")],
        )
    };
    let (renderer, root) = mounted(&wrap("x"));
    assert_eq!(renderer.host().serialize(root), "<div><x></div>");

    renderer.render(Some(&wrap("y")), root).unwrap();
    assert_eq!(renderer.host().serialize(root), "<div><y></div>");
}
