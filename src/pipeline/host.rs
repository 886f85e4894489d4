//! The host loop.
//!
//! [`Host::run_iteration`] is one turn of the loop:
//!
//! 1. run actions posted to the dispatcher (input records, auto-repeat ticks),
//! 2. dispatch the queued routed events,
//! 3. re-validate layout,
//! 4. flush the damage.
//!
//! [`Host::run`] wraps that in terminal setup and an input reader.

use std::io::{self, Stdout};
use std::time::Duration;

use log::debug;

use super::dispatcher::{Dispatcher, DispatcherHandle};
use super::reader::InputReader;
use super::terminal::{TerminalSetup, terminal_size};
use crate::config::Config;
use crate::control::ControlTree;
use crate::error::{Error, Result};
use crate::events::{EventManager, InputRecord};
use crate::geometry::{Rect, Size};
use crate::render::{CrosstermPainter, Painter, PhysicalCanvas, Renderer};

const IDLE_WAIT: Duration = Duration::from_millis(250);

/// All state owned by the UI thread.
pub struct Ui {
    pub tree: ControlTree,
    pub renderer: Renderer,
    pub events: EventManager,
    quit: bool,
    failure: Option<Error>,
}

impl Ui {
    pub fn new(config: &Config, canvas: PhysicalCanvas) -> Self {
        Self {
            tree: ControlTree::new(),
            renderer: Renderer::new(canvas),
            events: EventManager::new(config),
            quit: false,
            failure: None,
        }
    }

    /// Feed one input record to the event manager.
    pub fn handle_input(&mut self, record: InputRecord) {
        self.events
            .parse_input_event(&record, &mut self.tree, &mut self.renderer);
    }

    pub fn on_auto_repeat_tick(&mut self, press: u64) {
        self.events.on_auto_repeat_tick(&self.tree, press);
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub(crate) fn input_failed(&mut self, message: String) {
        self.failure = Some(Error::InputClosed(message));
        self.quit = true;
    }
}

pub struct Host {
    ui: Ui,
    dispatcher: Dispatcher<Ui>,
    config: Config,
}

impl Host {
    /// A host painting through `painter` onto a canvas of `size`.
    pub fn new(config: Config, size: Size, painter: Box<dyn Painter>) -> Self {
        let dispatcher = Dispatcher::new();
        let mut ui = Ui::new(&config, PhysicalCanvas::new(size, painter));
        let handle = dispatcher.handle();
        ui.events.set_auto_repeat_sink(move |press| {
            handle.post(move |ui: &mut Ui| ui.on_auto_repeat_tick(press));
        });
        Self { ui, dispatcher, config }
    }

    /// A host painting to stdout at the current terminal size.
    pub fn terminal(config: Config) -> Result<Self> {
        let size = terminal_size()?;
        let painter: CrosstermPainter<Stdout> = CrosstermPainter::new(io::stdout());
        Ok(Self::new(config, size, Box::new(painter)))
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut Ui {
        &mut self.ui
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for other threads.
    pub fn handle(&self) -> DispatcherHandle<Ui> {
        self.dispatcher.handle()
    }

    /// One loop turn. Returns the flushed rect, if anything was painted.
    pub fn run_iteration(&mut self) -> Result<Option<Rect>> {
        self.dispatcher.drain(&mut self.ui);
        let ui = &mut self.ui;
        ui.events.process_events(&mut ui.tree);
        ui.renderer.update_layout(&mut ui.tree);
        ui.renderer.finally_apply_changes_to_canvas(&mut ui.tree)
    }

    /// Run until [`Ui::request_quit`] is called or input fails.
    pub fn run(&mut self) -> Result<()> {
        let _terminal = TerminalSetup::enter(&self.config)?;
        let mut reader = InputReader::spawn(self.dispatcher.handle());
        let size = terminal_size()?;
        self.ui.renderer.resize(&mut self.ui.tree, size);
        self.ui.renderer.request_full_repaint();

        while !self.ui.quit {
            self.run_iteration()?;
            if self.ui.quit {
                break;
            }
            self.dispatcher.wait(IDLE_WAIT);
        }
        reader.stop();
        debug!("host loop finished");

        match self.ui.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Fill;
    use crate::render::MemoryPainter;

    #[test]
    fn test_iteration_paints_then_idles() {
        let painter = MemoryPainter::new();
        let mut host = Host::new(Config::default(), Size::new(4, 2), Box::new(painter.clone()));
        let root = host.ui_mut().tree.insert(Fill::new('#'));
        host.ui_mut().tree.set_root(root);

        assert_eq!(host.run_iteration().ok().flatten(), Some(Rect::new(0, 0, 4, 2)));
        assert_eq!(painter.screen_row(1), "####");
        assert_eq!(host.run_iteration().ok().flatten(), None);
        assert_eq!(painter.flushes().len(), 1);
    }

    #[test]
    fn test_posted_actions_run_before_layout() {
        let painter = MemoryPainter::new();
        let mut host = Host::new(Config::default(), Size::new(3, 1), Box::new(painter.clone()));
        let root = host.ui_mut().tree.insert(Fill::new('a'));
        host.ui_mut().tree.set_root(root);
        host.run_iteration().ok();

        host.handle().post(move |ui: &mut Ui| {
            ui.tree.update::<Fill, _>(root, |f| f.cell.char = 'b' as u32);
        });
        host.run_iteration().ok();
        assert_eq!(painter.screen_row(0), "bbb");
    }

    #[test]
    fn test_resize_record_repaints_everything() {
        let painter = MemoryPainter::new();
        let mut host = Host::new(Config::default(), Size::new(3, 1), Box::new(painter.clone()));
        let root = host.ui_mut().tree.insert(Fill::new('x'));
        host.ui_mut().tree.set_root(root);
        host.run_iteration().ok();

        host.ui_mut().handle_input(InputRecord::Resize(Size::new(5, 2)));
        assert_eq!(host.run_iteration().ok().flatten(), Some(Rect::new(0, 0, 5, 2)));
        assert_eq!(painter.screen_row(1), "xxxxx");
    }

    #[test]
    fn test_same_size_resize_still_repaints() {
        let painter = MemoryPainter::new();
        let mut host = Host::new(Config::default(), Size::new(3, 1), Box::new(painter.clone()));
        let root = host.ui_mut().tree.insert(Fill::new('x'));
        host.ui_mut().tree.set_root(root);
        host.run_iteration().ok();
        painter.clear();

        host.ui_mut().handle_input(InputRecord::Resize(Size::new(3, 1)));
        assert_eq!(host.run_iteration().ok().flatten(), Some(Rect::new(0, 0, 3, 1)));
        assert_eq!(painter.cells_painted(), 3);
        assert_eq!(painter.screen_row(0), "xxx");
    }
}
