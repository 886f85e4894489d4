//! Routed events.
//!
//! Input records become [`RoutedEventArgs`] that travel through the control
//! tree along one of three routes:
//!
//! - `Direct`: the source only.
//! - `Tunnel`: root down to the source (the `Preview*` events).
//! - `Bubble`: source up to the root.
//!
//! Every built-in tunnel event is paired with a bubble event that is queued
//! right after it, carrying its `handled` flag.

pub mod focus;
pub mod input;
pub mod manager;
pub mod registry;
pub mod repeat;

pub use focus::FocusManager;
pub use input::{
    CrosstermTranslator, InputRecord, KeyRecord, Modifiers, MouseButtons, MouseEventFlags,
    MouseRecord, VirtualKey,
};
pub use manager::{BuiltinEvents, EventManager};
pub use registry::{EventRegistry, HandlerId};
pub use repeat::AutoRepeat;

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::control::{ControlId, ControlTree};
use crate::geometry::Point;

// =============================================================================
// Routed event identity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingStrategy {
    Direct,
    Tunnel,
    Bubble,
}

/// Handle to a registered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutedEvent {
    id: usize,
    strategy: RoutingStrategy,
}

impl RoutedEvent {
    pub(crate) fn new(id: usize, strategy: RoutingStrategy) -> Self {
        Self { id, strategy }
    }

    #[inline]
    pub fn id(self) -> usize {
        self.id
    }

    #[inline]
    pub fn strategy(self) -> RoutingStrategy {
        self.strategy
    }
}

// =============================================================================
// Event data
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEventData {
    /// Canvas position of the pointer.
    pub position: Point,
    pub buttons: MouseButtons,
    /// The button whose transition raised this event; empty for moves.
    pub changed_button: MouseButtons,
    pub wheel_delta: i32,
    pub modifiers: Modifiers,
}

impl MouseEventData {
    /// Pointer position relative to `id`'s own buffer.
    pub fn position_in(&self, tree: &ControlTree, id: ControlId) -> Point {
        tree.screen_to_local(id, self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEventData {
    pub key: VirtualKey,
    pub unicode_char: Option<char>,
    pub modifiers: Modifiers,
    pub key_down: bool,
}

#[derive(Clone, Default)]
pub enum EventData {
    #[default]
    None,
    Mouse(MouseEventData),
    Key(KeyEventData),
    Focus {
        old: Option<ControlId>,
        new: Option<ControlId>,
    },
    /// Payload for user-registered events.
    Custom(Rc<dyn Any>),
}

impl fmt::Debug for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Mouse(m) => f.debug_tuple("Mouse").field(m).finish(),
            Self::Key(k) => f.debug_tuple("Key").field(k).finish(),
            Self::Focus { old, new } => f
                .debug_struct("Focus")
                .field("old", old)
                .field("new", new)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One event in flight.
#[derive(Debug, Clone)]
pub struct RoutedEventArgs {
    pub event: RoutedEvent,
    pub source: ControlId,
    pub handled: bool,
    pub data: EventData,
}

impl RoutedEventArgs {
    pub fn new(event: RoutedEvent, source: ControlId) -> Self {
        Self {
            event,
            source,
            handled: false,
            data: EventData::None,
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    pub fn mouse(&self) -> Option<&MouseEventData> {
        match &self.data {
            EventData::Mouse(m) => Some(m),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&KeyEventData> {
        match &self.data {
            EventData::Key(k) => Some(k),
            _ => None,
        }
    }

    /// Custom payload downcast to `T`.
    pub fn custom<T: Any>(&self) -> Option<&T> {
        match &self.data {
            EventData::Custom(c) => c.downcast_ref::<T>(),
            _ => None,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// What a handler may touch while it runs.
pub struct EventContext<'a> {
    pub tree: &'a mut ControlTree,
    pub manager: &'a mut EventManager,
    /// The control whose handler is running.
    pub target: ControlId,
}

pub type Handler = Rc<dyn Fn(&mut EventContext<'_>, &mut RoutedEventArgs)>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut EventContext<'_>, &mut RoutedEventArgs) + 'static,
{
    Rc::new(f)
}
