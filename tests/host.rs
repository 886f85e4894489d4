//! The host loop end to end, painting into memory.

use std::thread;
use std::time::Duration;

use spark_retained::{
    Config, EventContext, Fill, Host, InputRecord, LayoutProps, MemoryPainter, MouseButtons,
    MouseRecord, Point, Rect, RoutedEventArgs, Size, Ui,
};

fn quiet_config() -> Config {
    Config {
        auto_repeat_delay: Duration::from_secs(60),
        ..Config::default()
    }
}

#[test]
fn test_click_handler_repaints_only_the_button() {
    let painter = MemoryPainter::new();
    let mut host = Host::new(quiet_config(), Size::new(8, 3), Box::new(painter.clone()));
    let ui = host.ui_mut();
    let root = ui.tree.insert(Fill::new(' '));
    ui.tree.set_root(root);
    let button = ui.tree.insert(Fill::new('o'));
    ui.tree.set_props(button, LayoutProps::placed(Rect::new(2, 1, 3, 1)));
    ui.tree.add_child(root, button);
    let ev = *ui.events.events();
    ui.events.add_handler(
        &ui.tree,
        button,
        ev.mouse_down,
        |ctx: &mut EventContext<'_>, args: &mut RoutedEventArgs| {
            ctx.tree.update::<Fill, _>(ctx.target, |f| f.cell.char = 'x' as u32);
            args.handled = true;
        },
        false,
    );

    assert_eq!(host.run_iteration().ok().flatten(), Some(Rect::new(0, 0, 8, 3)));
    assert_eq!(painter.screen_row(1), "  ooo   ");
    painter.clear();

    let handle = host.handle();
    let click = InputRecord::Mouse(MouseRecord::at(Point::new(3, 1), MouseButtons::LEFT));
    let release = InputRecord::Mouse(MouseRecord::at(Point::new(3, 1), MouseButtons::empty()));
    thread::spawn(move || {
        handle.post(move |ui: &mut Ui| ui.handle_input(click));
        handle.post(move |ui: &mut Ui| ui.handle_input(release));
    })
    .join()
    .ok();

    assert_eq!(host.run_iteration().ok().flatten(), Some(Rect::new(2, 1, 3, 1)));
    assert_eq!(painter.screen_row(1), "  xxx   ");
    assert!(!host.ui().events.is_auto_repeat_running());
}

#[test]
fn test_held_button_starts_and_release_stops_auto_repeat() {
    let mut host = Host::new(quiet_config(), Size::new(4, 2), Box::new(MemoryPainter::new()));
    let ui = host.ui_mut();
    let root = ui.tree.insert(Fill::new('.'));
    ui.tree.set_root(root);
    host.run_iteration().ok();

    let ui = host.ui_mut();
    ui.handle_input(InputRecord::Mouse(MouseRecord::at(Point::new(1, 1), MouseButtons::LEFT)));
    assert!(ui.events.is_auto_repeat_running());
    assert!(ui.events.current_press().is_some());

    ui.handle_input(InputRecord::Mouse(MouseRecord::at(Point::new(1, 1), MouseButtons::empty())));
    assert!(!ui.events.is_auto_repeat_running());
    assert_eq!(ui.events.current_press(), None);
}

#[test]
fn test_quit_request_from_worker() {
    let mut host = Host::new(Config::default(), Size::new(2, 1), Box::new(MemoryPainter::new()));
    let handle = host.handle();
    thread::spawn(move || handle.post(|ui: &mut Ui| ui.request_quit()))
        .join()
        .ok();
    assert!(!host.ui().quit_requested());
    host.run_iteration().ok();
    assert!(host.ui().quit_requested());
}
