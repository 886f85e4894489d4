//! The event manager: input records in, routed events out.
//!
//! [`EventManager::parse_input_event`] turns one [`InputRecord`] into queued
//! [`RoutedEventArgs`]; [`EventManager::process_events`] drains the queue,
//! running handlers along each event's route. Nothing is dispatched while a
//! record is being parsed.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, trace};

use super::focus::FocusManager;
use super::input::{InputRecord, KeyRecord, MouseButtons, MouseEventFlags, MouseRecord};
use super::registry::{EventRegistry, HandlerId};
use super::repeat::AutoRepeat;
use super::{
    EventContext, EventData, KeyEventData, MouseEventData, RoutedEvent, RoutedEventArgs,
    RoutingStrategy,
};
use crate::config::Config;
use crate::control::{ControlId, ControlTree};
use crate::error::{UsageError, fatal};
use crate::geometry::Point;
use crate::render::Renderer;

// =============================================================================
// Built-in events
// =============================================================================

/// Events every manager registers under its own type.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinEvents {
    pub preview_mouse_down: RoutedEvent,
    pub mouse_down: RoutedEvent,
    pub preview_mouse_up: RoutedEvent,
    pub mouse_up: RoutedEvent,
    pub preview_mouse_move: RoutedEvent,
    pub mouse_move: RoutedEvent,
    pub preview_mouse_wheel: RoutedEvent,
    pub mouse_wheel: RoutedEvent,
    pub mouse_enter: RoutedEvent,
    pub mouse_leave: RoutedEvent,
    pub preview_key_down: RoutedEvent,
    pub key_down: RoutedEvent,
    pub preview_key_up: RoutedEvent,
    pub key_up: RoutedEvent,
    pub got_keyboard_focus: RoutedEvent,
    pub lost_keyboard_focus: RoutedEvent,
}

impl BuiltinEvents {
    fn register(registry: &mut EventRegistry) -> Self {
        use RoutingStrategy::{Bubble, Direct, Tunnel};
        let mut reg = |name: &str, strategy| registry.register::<EventManager>(name, strategy);
        Self {
            preview_mouse_down: reg("PreviewMouseDown", Tunnel),
            mouse_down: reg("MouseDown", Bubble),
            preview_mouse_up: reg("PreviewMouseUp", Tunnel),
            mouse_up: reg("MouseUp", Bubble),
            preview_mouse_move: reg("PreviewMouseMove", Tunnel),
            mouse_move: reg("MouseMove", Bubble),
            preview_mouse_wheel: reg("PreviewMouseWheel", Tunnel),
            mouse_wheel: reg("MouseWheel", Bubble),
            mouse_enter: reg("MouseEnter", Direct),
            mouse_leave: reg("MouseLeave", Direct),
            preview_key_down: reg("PreviewKeyDown", Tunnel),
            key_down: reg("KeyDown", Bubble),
            preview_key_up: reg("PreviewKeyUp", Tunnel),
            key_up: reg("KeyUp", Bubble),
            got_keyboard_focus: reg("GotKeyboardFocus", Direct),
            lost_keyboard_focus: reg("LostKeyboardFocus", Direct),
        }
    }

    /// The bubble event queued after a built-in tunnel event.
    pub fn bubble_pair(&self, event: RoutedEvent) -> Option<RoutedEvent> {
        let pairs = [
            (self.preview_mouse_down, self.mouse_down),
            (self.preview_mouse_up, self.mouse_up),
            (self.preview_mouse_move, self.mouse_move),
            (self.preview_mouse_wheel, self.mouse_wheel),
            (self.preview_key_down, self.key_down),
            (self.preview_key_up, self.key_up),
        ];
        pairs.iter().find(|(tunnel, _)| *tunnel == event).map(|&(_, bubble)| bubble)
    }
}

// =============================================================================
// EventManager
// =============================================================================

type RepeatSink = Arc<dyn Fn(u64) + Send + Sync>;

pub struct EventManager {
    registry: EventRegistry,
    builtins: BuiltinEvents,
    queue: VecDeque<RoutedEventArgs>,
    capture_stack: Vec<ControlId>,
    /// Root-to-leaf path under the pointer at the last mouse record.
    mouse_over: Vec<ControlId>,
    last_buttons: MouseButtons,
    last_mouse: Option<MouseRecord>,
    focus: FocusManager,
    repeat: AutoRepeat,
    repeat_sink: Option<RepeatSink>,
    /// Source of the current left press and its press number.
    pressed: Option<(ControlId, u64)>,
    press_counter: u64,
    force_repaint_on_resize: bool,
}

impl EventManager {
    pub fn new(config: &Config) -> Self {
        let mut registry = EventRegistry::new();
        let builtins = BuiltinEvents::register(&mut registry);
        Self {
            registry,
            builtins,
            queue: VecDeque::new(),
            capture_stack: Vec::new(),
            mouse_over: Vec::new(),
            last_buttons: MouseButtons::empty(),
            last_mouse: None,
            focus: FocusManager::new(),
            repeat: AutoRepeat::new(config.auto_repeat_delay, config.auto_repeat_interval),
            repeat_sink: None,
            pressed: None,
            press_counter: 0,
            force_repaint_on_resize: config.force_repaint_on_resize,
        }
    }

    pub fn events(&self) -> &BuiltinEvents {
        &self.builtins
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------------
    // Registration and handlers
    // -------------------------------------------------------------------------

    /// Register a user event. Registering the same `(name, Owner)` twice is fatal.
    pub fn register_event<Owner: 'static>(
        &mut self,
        name: &str,
        strategy: RoutingStrategy,
    ) -> RoutedEvent {
        self.registry.register::<Owner>(name, strategy)
    }

    pub fn lookup_event<Owner: 'static>(&self, name: &str) -> Option<RoutedEvent> {
        self.registry.lookup::<Owner>(name)
    }

    /// Attach `handler` to `target` for `event`.
    ///
    /// With `handled_events_too` the handler also runs for args already marked handled.
    #[track_caller]
    pub fn add_handler<F>(
        &mut self,
        tree: &ControlTree,
        target: ControlId,
        event: RoutedEvent,
        handler: F,
        handled_events_too: bool,
    ) -> HandlerId
    where
        F: Fn(&mut EventContext<'_>, &mut RoutedEventArgs) + 'static,
    {
        if !tree.contains(target) {
            fatal(UsageError::AbsentTarget(target, self.registry.name(event).to_string()));
        }
        self.registry
            .add_handler(event, target, super::handler(handler), handled_events_too)
    }

    #[track_caller]
    pub fn remove_handler(&mut self, event: RoutedEvent, target: ControlId, id: HandlerId) {
        self.registry.remove_handler(event, target, id);
    }

    /// Queue `args` for the next [`EventManager::process_events`].
    pub fn raise_event(&mut self, args: RoutedEventArgs) {
        self.queue.push_back(args);
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    // -------------------------------------------------------------------------
    // Capture
    // -------------------------------------------------------------------------

    /// Route all input to `id` and its descendants until released.
    pub fn capture_input(&mut self, tree: &ControlTree, id: ControlId) {
        if !tree.contains(id) {
            fatal(UsageError::StaleControl(id));
        }
        debug!("capture input: {id}");
        self.capture_stack.push(id);
    }

    /// Release the capture taken by `id`. Fatal unless `id` is the capture top.
    #[track_caller]
    pub fn end_capture_input(&mut self, id: ControlId) {
        let top = self.capture_stack.last().copied();
        if top != Some(id) {
            fatal(UsageError::CaptureMismatch { requested: id, top });
        }
        self.capture_stack.pop();
        debug!("end capture input: {id}");
    }

    pub fn capture_top(&self) -> Option<ControlId> {
        self.capture_stack.last().copied()
    }

    fn is_allowed(&self, tree: &ControlTree, target: ControlId) -> bool {
        match self.capture_top() {
            Some(top) => tree.contains(top) && tree.is_descendant_of(target, top),
            None => true,
        }
    }

    // -------------------------------------------------------------------------
    // Focus
    // -------------------------------------------------------------------------

    pub fn focused(&self) -> Option<ControlId> {
        self.focus.focused()
    }

    /// Move keyboard focus. Returns false if `id` cannot take focus.
    ///
    /// Queues `LostKeyboardFocus` on the old control, then `GotKeyboardFocus`
    /// on the new one.
    pub fn set_focus(&mut self, tree: &ControlTree, id: Option<ControlId>) -> bool {
        if let Some(id) = id {
            if !FocusManager::can_focus(tree, id) {
                return false;
            }
        }
        let old = self.focus.focused();
        if old == id {
            return true;
        }
        self.focus.set(tree, id);
        debug!("focus {old:?} -> {id:?}");
        let data = EventData::Focus { old, new: id };
        if let Some(old) = old.filter(|&o| tree.contains(o)) {
            let args = RoutedEventArgs::new(self.builtins.lost_keyboard_focus, old);
            self.queue.push_back(args.with_data(data.clone()));
        }
        if let Some(new) = id {
            let args = RoutedEventArgs::new(self.builtins.got_keyboard_focus, new).with_data(data);
            self.queue.push_back(args);
        }
        true
    }

    pub fn focus_next(&mut self, tree: &ControlTree) -> bool {
        let next = self.focus.step(tree, true);
        next.is_some() && self.set_focus(tree, next)
    }

    pub fn focus_previous(&mut self, tree: &ControlTree) -> bool {
        let prev = self.focus.step(tree, false);
        prev.is_some() && self.set_focus(tree, prev)
    }

    /// Refocus the control last focused inside `scope`.
    pub fn restore_scope_focus(&mut self, tree: &ControlTree, scope: ControlId) -> bool {
        match self.focus.remembered(tree, scope) {
            Some(id) => self.set_focus(tree, Some(id)),
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Mouse state
    // -------------------------------------------------------------------------

    /// Controls under the pointer, outermost first.
    pub fn mouse_over(&self) -> &[ControlId] {
        &self.mouse_over
    }

    /// Where auto-repeat ticks go. Called on the timer thread with the press number.
    pub fn set_auto_repeat_sink(&mut self, sink: impl Fn(u64) + Send + Sync + 'static) {
        self.repeat_sink = Some(Arc::new(sink));
    }

    pub fn is_auto_repeat_running(&self) -> bool {
        self.repeat.is_running()
    }

    /// Number of the current left press, if the button is held over a control.
    pub fn current_press(&self) -> Option<u64> {
        self.pressed.map(|(_, n)| n)
    }

    /// Synthesize a `MouseDown` for the held press. Ticks from an older press are ignored.
    pub fn on_auto_repeat_tick(&mut self, tree: &ControlTree, press: u64) {
        let Some((source, current)) = self.pressed else {
            return;
        };
        if current != press || !tree.is_attached(source) {
            return;
        }
        let position = self.last_mouse.map_or(Point::ORIGIN, |m| m.position);
        let data = MouseEventData {
            position,
            buttons: self.last_buttons,
            changed_button: MouseButtons::LEFT,
            wheel_delta: 0,
            modifiers: self.last_mouse.map(|m| m.modifiers).unwrap_or_default(),
        };
        trace!("auto-repeat tick for {source}");
        let args = RoutedEventArgs::new(self.builtins.mouse_down, source);
        self.queue.push_back(args.with_data(EventData::Mouse(data)));
    }

    fn start_auto_repeat(&mut self, source: ControlId) {
        if self.repeat.is_running() {
            self.repeat.stop();
        }
        self.press_counter += 1;
        let press = self.press_counter;
        self.pressed = Some((source, press));
        let Some(sink) = self.repeat_sink.clone() else {
            return;
        };
        self.repeat.start(move |_| sink(press));
    }

    fn stop_auto_repeat(&mut self) {
        self.pressed = None;
        if self.repeat.is_running() {
            self.repeat.stop();
        }
    }

    // -------------------------------------------------------------------------
    // Input parsing
    // -------------------------------------------------------------------------

    /// Convert one input record into queued routed events.
    pub fn parse_input_event(
        &mut self,
        record: &InputRecord,
        tree: &mut ControlTree,
        renderer: &mut Renderer,
    ) {
        match record {
            InputRecord::Key(key) => self.parse_key(key, tree),
            InputRecord::Mouse(mouse) => self.parse_mouse(mouse, tree, renderer),
            InputRecord::Resize(size) => {
                renderer.resize(tree, *size);
                if self.force_repaint_on_resize {
                    renderer.request_full_repaint();
                }
            }
        }
    }

    /// Focused control, unless it lies outside the capture; then the capture top; then the root.
    fn key_source(&self, tree: &ControlTree) -> Option<ControlId> {
        let focused = self.focus.focused().filter(|&f| tree.is_attached(f));
        match (focused, self.capture_top()) {
            (Some(f), Some(top)) if !tree.is_descendant_of(f, top) => Some(top),
            (Some(f), _) => Some(f),
            (None, Some(top)) => Some(top),
            (None, None) => tree.root(),
        }
    }

    fn parse_key(&mut self, key: &KeyRecord, tree: &ControlTree) {
        let Some(source) = self.key_source(tree) else {
            return;
        };
        let event = if key.key_down {
            self.builtins.preview_key_down
        } else {
            self.builtins.preview_key_up
        };
        let data = EventData::Key(KeyEventData {
            key: key.virtual_key,
            unicode_char: key.unicode_char,
            modifiers: key.modifiers,
            key_down: key.key_down,
        });
        for _ in 0..key.repeat_count.max(1) {
            self.queue
                .push_back(RoutedEventArgs::new(event, source).with_data(data.clone()));
        }
    }

    fn parse_mouse(&mut self, mouse: &MouseRecord, tree: &ControlTree, renderer: &Renderer) {
        let hit = renderer.hit_test(tree, mouse.position);
        let source = match self.capture_top().filter(|&top| tree.is_attached(top)) {
            Some(top) => match hit {
                Some(h) if tree.is_descendant_of(h, top) => Some(h),
                _ => Some(top),
            },
            None => hit,
        };

        let pressed = mouse.buttons - self.last_buttons;
        let released = self.last_buttons - mouse.buttons;
        self.last_buttons = mouse.buttons;
        self.last_mouse = Some(*mouse);

        self.update_mouse_over(tree, source, mouse);

        if released.contains(MouseButtons::LEFT) {
            self.stop_auto_repeat();
        }

        let Some(source) = source else {
            return;
        };
        let data = |changed_button| {
            EventData::Mouse(MouseEventData {
                position: mouse.position,
                buttons: mouse.buttons,
                changed_button,
                wheel_delta: mouse.wheel_delta,
                modifiers: mouse.modifiers,
            })
        };

        if mouse.flags.contains(MouseEventFlags::MOVED) {
            let args = RoutedEventArgs::new(self.builtins.preview_mouse_move, source);
            self.queue.push_back(args.with_data(data(MouseButtons::empty())));
        }
        if mouse.flags.contains(MouseEventFlags::WHEELED) {
            let args = RoutedEventArgs::new(self.builtins.preview_mouse_wheel, source);
            self.queue.push_back(args.with_data(data(MouseButtons::empty())));
        }
        for button in pressed.iter() {
            let args = RoutedEventArgs::new(self.builtins.preview_mouse_down, source);
            self.queue.push_back(args.with_data(data(button)));
        }
        for button in released.iter() {
            let args = RoutedEventArgs::new(self.builtins.preview_mouse_up, source);
            self.queue.push_back(args.with_data(data(button)));
        }

        if pressed.contains(MouseButtons::LEFT) {
            self.start_auto_repeat(source);
        }
    }

    /// Queue leave events for controls the pointer left (innermost first) and
    /// enter events for those it entered (outermost first).
    fn update_mouse_over(
        &mut self,
        tree: &ControlTree,
        source: Option<ControlId>,
        mouse: &MouseRecord,
    ) {
        let path = source.map(|s| tree.ancestors(s)).unwrap_or_default();
        let common = self
            .mouse_over
            .iter()
            .zip(&path)
            .take_while(|(a, b)| a == b)
            .count();
        if common == self.mouse_over.len() && common == path.len() {
            return;
        }
        let data = EventData::Mouse(MouseEventData {
            position: mouse.position,
            buttons: mouse.buttons,
            changed_button: MouseButtons::empty(),
            wheel_delta: 0,
            modifiers: mouse.modifiers,
        });
        for &left in self.mouse_over[common..].iter().rev() {
            if tree.contains(left) {
                let args = RoutedEventArgs::new(self.builtins.mouse_leave, left);
                self.queue.push_back(args.with_data(data.clone()));
            }
        }
        for &entered in &path[common..] {
            let args = RoutedEventArgs::new(self.builtins.mouse_enter, entered);
            self.queue.push_back(args.with_data(data.clone()));
        }
        self.mouse_over = path;
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Drop references to controls that left the tree.
    fn prune(&mut self, tree: &ControlTree) {
        self.mouse_over.retain(|&c| tree.is_attached(c));
        self.capture_stack.retain(|&c| tree.is_attached(c));
        self.focus.prune(tree);
        if self.pressed.is_some_and(|(source, _)| !tree.is_attached(source)) {
            self.stop_auto_repeat();
        }
        self.registry.retain_targets(|target| tree.contains(target));
    }

    /// Drain the queue, dispatching every event along its route. Returns how
    /// many events were dispatched.
    pub fn process_events(&mut self, tree: &mut ControlTree) -> usize {
        self.prune(tree);
        let mut dispatched = 0;
        while let Some(mut args) = self.queue.pop_front() {
            if !tree.is_attached(args.source) {
                trace!("dropping {} for detached {}", self.registry.name(args.event), args.source);
                continue;
            }
            self.dispatch(tree, &mut args);
            dispatched += 1;
            if let Some(bubble) = self.builtins.bubble_pair(args.event) {
                args.event = bubble;
                self.queue.push_front(args);
            }
        }
        dispatched
    }

    fn route(tree: &ControlTree, args: &RoutedEventArgs) -> Vec<ControlId> {
        match args.event.strategy() {
            RoutingStrategy::Direct => vec![args.source],
            RoutingStrategy::Tunnel => tree.ancestors(args.source),
            RoutingStrategy::Bubble => {
                let mut path = tree.ancestors(args.source);
                path.reverse();
                path
            }
        }
    }

    fn dispatch(&mut self, tree: &mut ControlTree, args: &mut RoutedEventArgs) {
        trace!("dispatch {} from {}", self.registry.name(args.event), args.source);
        for target in Self::route(tree, args) {
            if !tree.contains(target) || !self.is_allowed(tree, target) {
                continue;
            }
            for (handler, handled_events_too) in self.registry.handlers(args.event, target) {
                if args.handled && !handled_events_too {
                    continue;
                }
                let mut ctx = EventContext {
                    tree: &mut *tree,
                    manager: &mut *self,
                    target,
                };
                handler(&mut ctx, args);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::controls::Fill;
    use crate::control::LayoutProps;
    use crate::geometry::{Rect, Size};
    use crate::render::{MemoryPainter, PhysicalCanvas};

    struct Scene {
        tree: ControlTree,
        renderer: Renderer,
        events: EventManager,
        root: ControlId,
        mid: ControlId,
        leaf: ControlId,
        sibling: ControlId,
    }

    /// root (10x5) > mid at (0,0,5,5) > leaf at (0,0,2,2); sibling at (6,0,4,5).
    fn scene() -> Scene {
        let mut tree = ControlTree::new();
        let root = tree.insert(Fill::new('.'));
        tree.set_root(root);
        let mid = tree.insert(Fill::new('m'));
        tree.set_props(mid, LayoutProps::placed(Rect::new(0, 0, 5, 5)));
        tree.add_child(root, mid);
        let leaf = tree.insert(Fill::new('l').focusable());
        tree.set_props(leaf, LayoutProps::placed(Rect::new(0, 0, 2, 2)));
        tree.add_child(mid, leaf);
        let sibling = tree.insert(Fill::new('s').focusable());
        tree.set_props(sibling, LayoutProps::placed(Rect::new(6, 0, 4, 5)));
        tree.add_child(root, sibling);

        let canvas = PhysicalCanvas::new(Size::new(10, 5), Box::new(MemoryPainter::new()));
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
                true,
            );
        }
    }

    fn click(s: &mut Scene, at: Point) {
        let rec = InputRecord::Mouse(MouseRecord::at(at, MouseButtons::LEFT));
        s.events.parse_input_event(&rec, &mut s.tree, &mut s.renderer);
    }

    #[test]
    fn test_tunnel_then_bubble_order() {
        let mut s = scene();
        let log: Log = Rc::default();
        let ev = *s.events.events();
        let all = [s.root, s.mid, s.leaf];
        record(&mut s, ev.preview_mouse_down, "preview", &log, &all);
        record(&mut s, ev.mouse_down, "down", &log, &all);

        click(&mut s, Point::new(1, 1));
        s.events.process_events(&mut s.tree);
        s.events.stop_auto_repeat();

        let got: Vec<_> = log.borrow().clone();
        assert_eq!(
            got,
            vec![
                ("preview", s.root),
                ("preview", s.mid),
                ("preview", s.leaf),
                ("down", s.leaf),
                ("down", s.mid),
                ("down", s.root),
            ]
        );
    }

    #[test]
    fn test_handled_in_tunnel_skips_plain_bubble_handlers() {
        let mut s = scene();
        let ev = *s.events.events();
        let log: Log = Rc::default();
        s.events.add_handler(
            &s.tree,
            s.mid,
            ev.preview_mouse_down,
            |_: &mut EventContext<'_>, args: &mut RoutedEventArgs| args.handled = true,
            false,
        );
        let plain = log.clone();
        s.events.add_handler(
            &s.tree,
            s.root,
            ev.mouse_down,
            move |ctx: &mut EventContext<'_>, _: &mut RoutedEventArgs| {
                plain.borrow_mut().push(("plain", ctx.target))
            },
            false,
        );
        let too = log.clone();
        s.events.add_handler(
            &s.tree,
            s.root,
            ev.mouse_down,
            move |ctx: &mut EventContext<'_>, _: &mut RoutedEventArgs| {
                too.borrow_mut().push(("too", ctx.target))
            },
            true,
        );

        click(&mut s, Point::new(1, 1));
        s.events.process_events(&mut s.tree);
        s.events.stop_auto_repeat();
        assert_eq!(log.borrow().clone(), vec![("too", s.root)]);
    }

    #[test]
    fn test_capture_overrides_hit_source() {
        let mut s = scene();
        let ev = *s.events.events();
        let log: Log = Rc::default();
        let ids = [s.root, s.mid, s.leaf, s.sibling];
        record(&mut s, ev.mouse_down, "down", &log, &ids);

        s.events.capture_input(&s.tree, s.leaf);
        click(&mut s, Point::new(7, 1));
        s.events.process_events(&mut s.tree);
        s.events.stop_auto_repeat();

        // Source is the capturing leaf; ancestors outside the capture get nothing.
        assert_eq!(log.borrow().clone(), vec![("down", s.leaf)]);
    }

    #[test]
    #[should_panic(expected = "does not match capture top")]
    fn test_unbalanced_end_capture_is_fatal() {
        let mut s = scene();
        s.events.capture_input(&s.tree, s.leaf);
        s.events.end_capture_input(s.mid);
    }

    #[test]
    fn test_enter_and_leave_order() {
        let mut s = scene();
        let ev = *s.events.events();
        let log: Log = Rc::default();
        let all = [s.root, s.mid, s.leaf, s.sibling];
        record(&mut s, ev.mouse_enter, "enter", &log, &all);
        record(&mut s, ev.mouse_leave, "leave", &log, &all);

        let move_to = |s: &mut Scene, x: i32, y: i32| {
            let moved = MouseRecord::moved(Point::new(x, y), MouseButtons::empty());
            let rec = InputRecord::Mouse(moved);
            s.events.parse_input_event(&rec, &mut s.tree, &mut s.renderer);
            s.events.process_events(&mut s.tree);
        };

        move_to(&mut s, 1, 1);
        assert_eq!(
            log.borrow().clone(),
            vec![("enter", s.root), ("enter", s.mid), ("enter", s.leaf)]
        );
        log.borrow_mut().clear();

        move_to(&mut s, 7, 1);
        assert_eq!(
            log.borrow().clone(),
            vec![("leave", s.leaf), ("leave", s.mid), ("enter", s.sibling)]
        );
        assert_eq!(s.events.mouse_over(), &[s.root, s.sibling]);
    }

    #[test]
    fn test_key_repeat_count_and_focus_source() {
        let mut s = scene();
        let ev = *s.events.events();
        let log: Log = Rc::default();
        let ids = [s.leaf, s.sibling];
        record(&mut s, ev.key_down, "key", &log, &ids);

        assert!(s.events.set_focus(&s.tree, Some(s.sibling)));
        let rec = InputRecord::Key(KeyRecord::char('a').repeated(2));
        s.events.parse_input_event(&rec, &mut s.tree, &mut s.renderer);
        s.events.process_events(&mut s.tree);
        assert_eq!(log.borrow().clone(), vec![("key", s.sibling), ("key", s.sibling)]);
    }

    #[test]
    fn test_focus_events_and_cycling() {
        let mut s = scene();
        let ev = *s.events.events();
        let log: Log = Rc::default();
        let all = [s.leaf, s.sibling];
        record(&mut s, ev.got_keyboard_focus, "got", &log, &all);
        record(&mut s, ev.lost_keyboard_focus, "lost", &log, &all);

        assert!(s.events.focus_next(&s.tree));
        assert_eq!(s.events.focused(), Some(s.leaf));
        assert!(s.events.focus_next(&s.tree));
        assert_eq!(s.events.focused(), Some(s.sibling));
        s.events.process_events(&mut s.tree);
        assert_eq!(
            log.borrow().clone(),
            vec![("got", s.leaf), ("lost", s.leaf), ("got", s.sibling)]
        );
        // Not focusable.
        assert!(!s.events.set_focus(&s.tree, Some(s.mid)));
    }

    #[test]
    fn test_handlers_of_destroyed_targets_are_dropped() {
        let mut s = scene();
        let ev = *s.events.events();
        let log: Log = Rc::default();
        let ids = [s.sibling];
        record(&mut s, ev.mouse_down, "down", &log, &ids);
        s.tree.remove_child(s.root, s.sibling);
        s.tree.destroy(s.sibling);
        s.events.process_events(&mut s.tree);
        assert_eq!(s.events.registry().handler_count(ev.mouse_down, s.sibling), 0);
    }

    #[test]
    fn test_auto_repeat_ticks_for_current_press_only() {
        let mut s = scene();
        let ev = *s.events.events();
        let log: Log = Rc::default();
        let ids = [s.leaf];
        record(&mut s, ev.mouse_down, "down", &log, &ids);

        click(&mut s, Point::new(1, 1));
        s.events.process_events(&mut s.tree);
        log.borrow_mut().clear();

        let press = s.events.current_press().unwrap_or_default();
        s.events.on_auto_repeat_tick(&s.tree, press);
        s.events.on_auto_repeat_tick(&s.tree, press + 1);
        s.events.process_events(&mut s.tree);
        assert_eq!(log.borrow().clone(), vec![("down", s.leaf)]);

        let up = InputRecord::Mouse(MouseRecord::at(Point::new(1, 1), MouseButtons::empty()));
        s.events.parse_input_event(&up, &mut s.tree, &mut s.renderer);
        assert_eq!(s.events.current_press(), None);
    }

    #[test]
    fn test_user_event_registration() {
        struct MyWidget;
        let mut s = scene();
        let ev = s.events.register_event::<MyWidget>("Clicked", RoutingStrategy::Bubble);
        assert_eq!(s.events.lookup_event::<MyWidget>("Clicked"), Some(ev));
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        s.events.add_handler(
            &s.tree,
            s.root,
            ev,
            move |_: &mut EventContext<'_>, args: &mut RoutedEventArgs| {
                *sink.borrow_mut() = args.custom::<u32>().copied();
            },
            false,
        );
        let payload = EventData::Custom(Rc::new(7u32));
        s.events.raise_event(RoutedEventArgs::new(ev, s.leaf).with_data(payload));
        s.events.process_events(&mut s.tree);
        assert_eq!(*seen.borrow(), Some(7));
    }
}
