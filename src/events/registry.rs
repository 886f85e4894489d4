//! Routed-event registrations and per-target handler lists.

use std::any::TypeId;
use std::collections::HashMap;

use log::trace;

use super::{Handler, RoutedEvent, RoutingStrategy};
use crate::control::ControlId;
use crate::error::{UsageError, fatal};

/// Identifies one added handler so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Debug)]
struct EventInfo {
    name: String,
    owner_name: &'static str,
    strategy: RoutingStrategy,
}

struct HandlerEntry {
    id: HandlerId,
    handler: Handler,
    handled_events_too: bool,
}

/// Registered events keyed by `(name, owner type)`, plus handler lists keyed
/// by `(event, target)`.
#[derive(Default)]
pub struct EventRegistry {
    events: Vec<EventInfo>,
    by_key: HashMap<(String, TypeId), RoutedEvent>,
    handlers: HashMap<(usize, ControlId), Vec<HandlerEntry>>,
    next_handler: u64,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` for `Owner`. Registering the same pair twice is fatal.
    pub fn register<Owner: 'static>(
        &mut self,
        name: &str,
        strategy: RoutingStrategy,
    ) -> RoutedEvent {
        let key = (name.to_string(), TypeId::of::<Owner>());
        let owner_name = std::any::type_name::<Owner>();
        if self.by_key.contains_key(&key) {
            fatal(UsageError::DuplicateEvent {
                name: name.to_string(),
                owner: owner_name,
            });
        }
        let event = RoutedEvent::new(self.events.len(), strategy);
        self.events.push(EventInfo {
            name: name.to_string(),
            owner_name,
            strategy,
        });
        self.by_key.insert(key, event);
        trace!("registered {owner_name}::{name} as #{}", event.id());
        event
    }

    pub fn lookup<Owner: 'static>(&self, name: &str) -> Option<RoutedEvent> {
        self.by_key.get(&(name.to_string(), TypeId::of::<Owner>())).copied()
    }

    pub fn is_registered(&self, event: RoutedEvent) -> bool {
        self.events
            .get(event.id())
            .is_some_and(|info| info.strategy == event.strategy())
    }

    /// Event name, for diagnostics.
    pub fn name(&self, event: RoutedEvent) -> &str {
        self.events.get(event.id()).map_or("<unregistered>", |info| info.name.as_str())
    }

    pub fn owner_name(&self, event: RoutedEvent) -> &'static str {
        self.events.get(event.id()).map_or("<unregistered>", |info| info.owner_name)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn check(&self, event: RoutedEvent) {
        if !self.is_registered(event) {
            fatal(UsageError::UnregisteredEvent(event.id()));
        }
    }

    /// Attach a handler. The target is not checked here; see
    /// [`EventManager::add_handler`](super::EventManager::add_handler).
    pub fn add_handler(
        &mut self,
        event: RoutedEvent,
        target: ControlId,
        handler: Handler,
        handled_events_too: bool,
    ) -> HandlerId {
        self.check(event);
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.handlers.entry((event.id(), target)).or_default().push(HandlerEntry {
            id,
            handler,
            handled_events_too,
        });
        id
    }

    /// Detach a handler. Fatal if the event is unknown or the target has no such handler.
    pub fn remove_handler(&mut self, event: RoutedEvent, target: ControlId, id: HandlerId) {
        self.check(event);
        let key = (event.id(), target);
        let removed = match self.handlers.get_mut(&key) {
            Some(list) => {
                let before = list.len();
                list.retain(|e| e.id != id);
                before != list.len()
            }
            None => false,
        };
        if !removed {
            fatal(UsageError::AbsentTarget(target, self.name(event).to_string()));
        }
        if self.handlers.get(&key).is_some_and(Vec::is_empty) {
            self.handlers.remove(&key);
        }
    }

    /// Handlers of `target` for `event` in the order they were added.
    pub fn handlers(&self, event: RoutedEvent, target: ControlId) -> Vec<(Handler, bool)> {
        self.handlers
            .get(&(event.id(), target))
            .map(|list| {
                list.iter()
                    .map(|e| (e.handler.clone(), e.handled_events_too))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn handler_count(&self, event: RoutedEvent, target: ControlId) -> usize {
        self.handlers.get(&(event.id(), target)).map_or(0, Vec::len)
    }

    /// Drop every handler list whose target fails `keep`.
    pub fn retain_targets(&mut self, mut keep: impl FnMut(ControlId) -> bool) {
        self.handlers.retain(|&(_, target), _| keep(target));
    }
}
