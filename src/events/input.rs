//! Platform-neutral input records and the crossterm translation.
//!
//! The event manager only ever sees [`InputRecord`]s. [`CrosstermTranslator`]
//! turns crossterm events into records, keeping the pressed-button mask
//! across calls since crossterm reports transitions rather than state.

use bitflags::bitflags;
use crossterm::event::{
    Event as CrosstermEvent, KeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind, KeyModifiers,
    MouseButton as CrosstermMouseButton, MouseEvent as CrosstermMouseEvent, MouseEventKind,
};

use crate::geometry::{Point, Size};

// =============================================================================
// Flags
// =============================================================================

bitflags! {
    /// Modifier keys held during an input record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
    }
}

bitflags! {
    /// Mouse buttons currently held.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT = 1 << 2;
    }
}

bitflags! {
    /// What kind of mouse record this is, beyond button state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct MouseEventFlags: u8 {
        const MOVED = 1 << 0;
        const DOUBLE_CLICK = 1 << 1;
        const WHEELED = 1 << 2;
    }
}

// =============================================================================
// Records
// =============================================================================

/// Keys the core knows by name. Printable keys arrive as `Character` with the
/// glyph in [`KeyRecord::unicode_char`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualKey {
    Character,
    Enter,
    Tab,
    BackTab,
    Backspace,
    Delete,
    Insert,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRecord {
    pub key_down: bool,
    /// Number of key events folded into this record (at least 1).
    pub repeat_count: u16,
    pub virtual_key: VirtualKey,
    pub unicode_char: Option<char>,
    pub modifiers: Modifiers,
}

impl KeyRecord {
    /// A single press of `key`.
    pub fn press(virtual_key: VirtualKey) -> Self {
        Self {
            key_down: true,
            repeat_count: 1,
            virtual_key,
            unicode_char: None,
            modifiers: Modifiers::empty(),
        }
    }

    /// A single press of a printable key.
    pub fn char(ch: char) -> Self {
        Self {
            unicode_char: Some(ch),
            ..Self::press(VirtualKey::Character)
        }
    }

    pub fn released(mut self) -> Self {
        self.key_down = false;
        self
    }

    pub fn repeated(mut self, count: u16) -> Self {
        self.repeat_count = count;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseRecord {
    /// Canvas cell under the pointer.
    pub position: Point,
    /// Buttons held after this record.
    pub buttons: MouseButtons,
    pub flags: MouseEventFlags,
    /// Positive scrolls up.
    pub wheel_delta: i32,
    pub modifiers: Modifiers,
}

impl MouseRecord {
    /// Pointer at `position` with `buttons` held and no other flags.
    pub fn at(position: Point, buttons: MouseButtons) -> Self {
        Self {
            position,
            buttons,
            flags: MouseEventFlags::empty(),
            wheel_delta: 0,
            modifiers: Modifiers::empty(),
        }
    }

    /// Pointer motion.
    pub fn moved(position: Point, buttons: MouseButtons) -> Self {
        Self {
            flags: MouseEventFlags::MOVED,
            ..Self::at(position, buttons)
        }
    }

    pub fn wheel(position: Point, delta: i32) -> Self {
        Self {
            flags: MouseEventFlags::WHEELED,
            wheel_delta: delta,
            ..Self::at(position, MouseButtons::empty())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRecord {
    Key(KeyRecord),
    Mouse(MouseRecord),
    Resize(Size),
}

// =============================================================================
// Crossterm translation
// =============================================================================

/// Converts crossterm events into [`InputRecord`]s.
#[derive(Debug, Default)]
pub struct CrosstermTranslator {
    buttons: MouseButtons,
}

impl CrosstermTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buttons believed to be held right now.
    pub fn buttons(&self) -> MouseButtons {
        self.buttons
    }

    /// Translate one event. Events the core has no use for yield `None`.
    pub fn translate(&mut self, event: CrosstermEvent) -> Option<InputRecord> {
        match event {
            CrosstermEvent::Key(key) => Some(InputRecord::Key(convert_key(key))),
            CrosstermEvent::Mouse(mouse) => self.convert_mouse(mouse).map(InputRecord::Mouse),
            CrosstermEvent::Resize(w, h) => {
                Some(InputRecord::Resize(Size::new(w as i32, h as i32)))
            }
            _ => None,
        }
    }

    fn convert_mouse(&mut self, event: CrosstermMouseEvent) -> Option<MouseRecord> {
        let position = Point::new(event.column as i32, event.row as i32);
        let mut flags = MouseEventFlags::empty();
        let mut wheel_delta = 0;
        match event.kind {
            MouseEventKind::Down(b) => self.buttons.insert(convert_button(b)),
            MouseEventKind::Up(b) => self.buttons.remove(convert_button(b)),
            MouseEventKind::Drag(b) => {
                self.buttons.insert(convert_button(b));
                flags = MouseEventFlags::MOVED;
            }
            MouseEventKind::Moved => flags = MouseEventFlags::MOVED,
            MouseEventKind::ScrollUp => {
                flags = MouseEventFlags::WHEELED;
                wheel_delta = 1;
            }
            MouseEventKind::ScrollDown => {
                flags = MouseEventFlags::WHEELED;
                wheel_delta = -1;
            }
            MouseEventKind::ScrollLeft | MouseEventKind::ScrollRight => return None,
        }
        Some(MouseRecord {
            position,
            buttons: self.buttons,
            flags,
            wheel_delta,
            modifiers: convert_modifiers(event.modifiers),
        })
    }
}

fn convert_button(button: CrosstermMouseButton) -> MouseButtons {
    match button {
        CrosstermMouseButton::Left => MouseButtons::LEFT,
        CrosstermMouseButton::Middle => MouseButtons::MIDDLE,
        CrosstermMouseButton::Right => MouseButtons::RIGHT,
    }
}

fn convert_modifiers(modifiers: KeyModifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    out.set(Modifiers::SHIFT, modifiers.contains(KeyModifiers::SHIFT));
    out.set(Modifiers::CONTROL, modifiers.contains(KeyModifiers::CONTROL));
    out.set(Modifiers::ALT, modifiers.contains(KeyModifiers::ALT));
    out.set(
        Modifiers::META,
        modifiers.intersects(KeyModifiers::META | KeyModifiers::SUPER),
    );
    out
}

fn convert_key(event: CrosstermKeyEvent) -> KeyRecord {
    let (virtual_key, unicode_char) = match event.code {
        KeyCode::Char(c) => (VirtualKey::Character, Some(c)),
        KeyCode::Enter => (VirtualKey::Enter, None),
        KeyCode::Tab => (VirtualKey::Tab, None),
        KeyCode::BackTab => (VirtualKey::BackTab, None),
        KeyCode::Backspace => (VirtualKey::Backspace, None),
        KeyCode::Delete => (VirtualKey::Delete, None),
        KeyCode::Insert => (VirtualKey::Insert, None),
        KeyCode::Esc => (VirtualKey::Escape, None),
        KeyCode::Up => (VirtualKey::Up, None),
        KeyCode::Down => (VirtualKey::Down, None),
        KeyCode::Left => (VirtualKey::Left, None),
        KeyCode::Right => (VirtualKey::Right, None),
        KeyCode::Home => (VirtualKey::Home, None),
        KeyCode::End => (VirtualKey::End, None),
        KeyCode::PageUp => (VirtualKey::PageUp, None),
        KeyCode::PageDown => (VirtualKey::PageDown, None),
        KeyCode::F(n) => (VirtualKey::F(n), None),
        _ => (VirtualKey::Unknown, None),
    };
    KeyRecord {
        key_down: event.kind != KeyEventKind::Release,
        repeat_count: 1,
        virtual_key,
        unicode_char,
        modifiers: convert_modifiers(event.modifiers),
    }
}
