//! Routed input through a laid-out tree.

use std::cell::RefCell;
use std::rc::Rc;

use spark_retained::{
    Config, ControlId, ControlTree, EventContext, EventData, EventManager, Fill, InputRecord,
    KeyRecord, LayoutProps, MemoryPainter, MouseButtons, MouseRecord, PhysicalCanvas, Point, Rect,
    Renderer, RoutedEvent, RoutedEventArgs, RoutingStrategy, Size, VirtualKey,
};

struct Scene {
    tree: ControlTree,
    renderer: Renderer,
    events: EventManager,
    root: ControlId,
    mid: ControlId,
    leaf: ControlId,
    sibling: ControlId,
}

/// root (12x6) > mid at (2,1,6,4) > leaf at (1,1,2,1); sibling at (9,0,3,6).
fn scene() -> Scene {
    let mut tree = ControlTree::new();
    let root = tree.insert(Fill::new('.'));
    tree.set_root(root);
    let mid = tree.insert(Fill::new('m'));
    tree.set_props(mid, LayoutProps::placed(Rect::new(2, 1, 6, 4)));
    tree.add_child(root, mid);
    let leaf = tree.insert(Fill::new('l').focusable());
    tree.set_props(leaf, LayoutProps::placed(Rect::new(1, 1, 2, 1)));
    tree.add_child(mid, leaf);
    let sibling = tree.insert(Fill::new('s').focusable());
    tree.set_props(sibling, LayoutProps::placed(Rect::new(9, 0, 3, 6)));
    tree.add_child(root, sibling);

    let canvas = PhysicalCanvas::new(Size::new(12, 6), Box::new(MemoryPainter::new()));
    let mut renderer = Renderer::new(canvas);
    renderer.update_layout(&mut tree);
    Scene {
        tree,
        renderer,
        events: EventManager::new(&Config::default()),
        root,
        mid,
        leaf,
        sibling,
    }
}

type Log = Rc<RefCell<Vec<(&'static str, ControlId)>>>;

fn record(
    s: &mut Scene,
    event: RoutedEvent,
    name: &'static str,
    log: &Log,
    targets: &[ControlId],
) {
    for &t in targets {
        let log = log.clone();
        s.events.add_handler(
            &s.tree,
            t,
            event,
            move |ctx: &mut EventContext<'_>, _: &mut RoutedEventArgs| {
                log.borrow_mut().push((name, ctx.target))
            },
            false,
        );
    }
}

fn feed(s: &mut Scene, record: InputRecord) {
    s.events.parse_input_event(&record, &mut s.tree, &mut s.renderer);
    s.events.process_events(&mut s.tree);
}

fn press(s: &mut Scene, x: i32, y: i32) {
    feed(s, InputRecord::Mouse(MouseRecord::at(Point::new(x, y), MouseButtons::LEFT)));
}

fn release(s: &mut Scene, x: i32, y: i32) {
    feed(s, InputRecord::Mouse(MouseRecord::at(Point::new(x, y), MouseButtons::empty())));
}

fn move_to(s: &mut Scene, x: i32, y: i32, buttons: MouseButtons) {
    feed(s, InputRecord::Mouse(MouseRecord::moved(Point::new(x, y), buttons)));
}

#[test]
fn test_bubble_and_tunnel_routes() {
    let mut s = scene();
    let ev = *s.events.events();
    let log: Log = Rc::default();
    let path = [s.root, s.mid, s.leaf];
    record(&mut s, ev.preview_mouse_up, "tunnel", &log, &path);
    record(&mut s, ev.mouse_up, "bubble", &log, &path);

    press(&mut s, 4, 2);
    release(&mut s, 4, 2);
    assert_eq!(
        log.borrow().clone(),
        vec![
            ("tunnel", s.root),
            ("tunnel", s.mid),
            ("tunnel", s.leaf),
            ("bubble", s.leaf),
            ("bubble", s.mid),
            ("bubble", s.root),
        ]
    );
}

#[test]
fn test_handled_at_mid_stops_the_climb() {
    let mut s = scene();
    let ev = *s.events.events();
    let log: Log = Rc::default();
    s.events.add_handler(
        &s.tree,
        s.mid,
        ev.mouse_down,
        |_: &mut EventContext<'_>, args: &mut RoutedEventArgs| args.handled = true,
        false,
    );
    let ids = [s.leaf, s.root];
    record(&mut s, ev.mouse_down, "down", &log, &ids);
    let too = log.clone();
    s.events.add_handler(
        &s.tree,
        s.root,
        ev.mouse_down,
        move |ctx: &mut EventContext<'_>, args: &mut RoutedEventArgs| {
            assert!(args.handled);
            too.borrow_mut().push(("too", ctx.target));
        },
        true,
    );

    press(&mut s, 4, 2);
    release(&mut s, 4, 2);
    assert_eq!(log.borrow().clone(), vec![("down", s.leaf), ("too", s.root)]);
}

#[test]
fn test_position_is_relative_to_each_target() {
    let mut s = scene();
    let ev = *s.events.events();
    let seen: Rc<RefCell<Vec<Point>>> = Rc::default();
    for target in [s.leaf, s.mid, s.root] {
        let seen = seen.clone();
        s.events.add_handler(
            &s.tree,
            target,
            ev.mouse_down,
            move |ctx: &mut EventContext<'_>, args: &mut RoutedEventArgs| {
                if let Some(mouse) = args.mouse() {
                    seen.borrow_mut().push(mouse.position_in(ctx.tree, ctx.target));
                }
            },
            false,
        );
    }

    press(&mut s, 4, 2);
    release(&mut s, 4, 2);
    assert_eq!(seen.borrow().clone(), vec![Point::new(1, 0), Point::new(2, 1), Point::new(4, 2)]);
}

#[test]
fn test_drag_capture_keeps_source_until_release() {
    let mut s = scene();
    let ev = *s.events.events();
    s.events.add_handler(
        &s.tree,
        s.leaf,
        ev.mouse_down,
        |ctx: &mut EventContext<'_>, _: &mut RoutedEventArgs| {
            ctx.manager.capture_input(ctx.tree, ctx.target)
        },
        false,
    );
    s.events.add_handler(
        &s.tree,
        s.leaf,
        ev.mouse_up,
        |ctx: &mut EventContext<'_>, _: &mut RoutedEventArgs| {
            ctx.manager.end_capture_input(ctx.target)
        },
        false,
    );
    let log: Log = Rc::default();
    let ids = [s.leaf, s.mid, s.root, s.sibling];
    record(&mut s, ev.mouse_move, "move", &log, &ids);

    press(&mut s, 4, 2);
    assert_eq!(s.events.capture_top(), Some(s.leaf));

    // Over the sibling, but the leaf holds the capture: only the leaf hears it.
    move_to(&mut s, 10, 2, MouseButtons::LEFT);
    assert_eq!(log.borrow().clone(), vec![("move", s.leaf)]);
    assert_eq!(s.events.mouse_over(), &[s.root, s.mid, s.leaf]);

    release(&mut s, 10, 2);
    assert_eq!(s.events.capture_top(), None);
    log.borrow_mut().clear();

    move_to(&mut s, 10, 3, MouseButtons::empty());
    assert_eq!(log.borrow().clone(), vec![("move", s.sibling), ("move", s.root)]);
    assert_eq!(s.events.mouse_over(), &[s.root, s.sibling]);
}

#[test]
fn test_keys_follow_focus_and_tab_cycles() {
    let mut s = scene();
    let ev = *s.events.events();
    let log: Log = Rc::default();
    let ids = [s.root, s.leaf, s.sibling];
    record(&mut s, ev.key_down, "key", &log, &ids);

    // Nothing focused: keys go to the root.
    feed(&mut s, InputRecord::Key(KeyRecord::press(VirtualKey::Enter)));
    assert_eq!(log.borrow().clone(), vec![("key", s.root)]);
    log.borrow_mut().clear();

    assert!(s.events.focus_next(&s.tree));
    feed(&mut s, InputRecord::Key(KeyRecord::char('x')));
    assert_eq!(log.borrow().clone(), vec![("key", s.leaf), ("key", s.root)]);
    log.borrow_mut().clear();

    assert!(s.events.focus_previous(&s.tree));
    assert_eq!(s.events.focused(), Some(s.sibling));
    feed(&mut s, InputRecord::Key(KeyRecord::char('y')));
    assert_eq!(log.borrow().clone(), vec![("key", s.sibling), ("key", s.root)]);
}

#[test]
fn test_key_data_reaches_handlers() {
    let mut s = scene();
    let ev = *s.events.events();
    let seen = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    s.events.add_handler(
        &s.tree,
        s.root,
        ev.key_down,
        move |_: &mut EventContext<'_>, args: &mut RoutedEventArgs| {
            *sink.borrow_mut() = args.key().and_then(|k| k.unicode_char);
        },
        false,
    );
    feed(&mut s, InputRecord::Key(KeyRecord::char('q')));
    assert_eq!(*seen.borrow(), Some('q'));
}

#[test]
fn test_custom_tunnel_event_with_payload() {
    struct Toolbar;
    let mut s = scene();
    let ev = s.events.register_event::<Toolbar>("PreviewActivate", RoutingStrategy::Tunnel);
    let log: Rc<RefCell<Vec<(ControlId, Option<String>)>>> = Rc::default();
    for target in [s.root, s.mid, s.leaf] {
        let log = log.clone();
        s.events.add_handler(
            &s.tree,
            target,
            ev,
            move |ctx: &mut EventContext<'_>, args: &mut RoutedEventArgs| {
                log.borrow_mut().push((ctx.target, args.custom::<String>().cloned()));
            },
            false,
        );
    }

    let payload = EventData::Custom(Rc::new(String::from("go")));
    s.events.raise_event(RoutedEventArgs::new(ev, s.leaf).with_data(payload));
    assert_eq!(s.events.process_events(&mut s.tree), 1);
    let got = log.borrow().clone();
    assert_eq!(got.len(), 3);
    assert_eq!(got[0], (s.root, Some(String::from("go"))));
    assert_eq!(got[2].0, s.leaf);
}

#[test]
fn test_events_for_removed_source_are_dropped() {
    let mut s = scene();
    let ev = *s.events.events();
    let log: Log = Rc::default();
    let ids = [s.root];
    record(&mut s, ev.mouse_down, "down", &log, &ids);

    s.events.parse_input_event(
        &InputRecord::Mouse(MouseRecord::at(Point::new(10, 1), MouseButtons::LEFT)),
        &mut s.tree,
        &mut s.renderer,
    );
    s.tree.remove_child(s.root, s.sibling);
    s.events.process_events(&mut s.tree);
    assert!(log.borrow().is_empty());
    assert_eq!(s.events.current_press(), None);
}
