//! Headless document and event loop.
//!
//! The page runs on a virtual millisecond clock. Handlers are closures captured
//! at registration; deferred work goes through [`Scope::set_timeout`]. Every
//! change to the document is recorded as a [`Mutation`].

use crate::config::PageSettings;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    rc::Rc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Handle(usize);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Element {
    pub id: Option<String>,
    pub tag: String,
    pub classes: BTreeSet<String>,
    pub text: String,
    pub disabled: bool,
    pub href: Option<String>,
    pub button_type: Option<String>,
    pub parent: Option<Handle>,
    /// Vertical extent in document coordinates.
    pub top: f64,
    pub height: f64,
    pub style: BTreeMap<String, String>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Add one or more whitespace-separated classes.
    pub fn with_class(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(str::to_string));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_parent(mut self, parent: Handle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_extent(mut self, top: f64, height: f64) -> Self {
        self.top = top;
        self.height = height;
        self
    }

    pub fn with_href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }

    pub fn with_button_type(mut self, button_type: &str) -> Self {
        self.button_type = Some(button_type.to_string());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    ClassAdded { element: Handle, class: String },
    ClassRemoved { element: Handle, class: String },
    TextSet { element: Handle, text: String },
    DisabledSet { element: Handle, disabled: bool },
    StyleSet { element: Handle, property: String, value: String },
    Appended { element: Handle, tag: String, text: String },
    Removed { element: Handle },
    ScrollRequested { top: f64, smooth: bool },
    ChartMounted { element: Handle, chart: String },
    BackgroundMounted { element: Handle },
    Alert { message: String },
    WindowOpened { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation {
    pub at_ms: u64,
    #[serde(flatten)]
    pub change: Change,
}

/// Elements plus the window state they are laid out in.
#[derive(Debug)]
pub struct Document {
    elements: Vec<Option<Element>>,
    location: String,
    scroll_y: f64,
    viewport_height: f64,
    now_ms: u64,
    trace: Vec<Mutation>,
}

impl Document {
    pub fn new(location: &str, viewport_height: f64) -> Self {
        Self {
            elements: Vec::new(),
            location: location.to_string(),
            scroll_y: 0.0,
            viewport_height,
            now_ms: 0,
            trace: Vec::new(),
        }
    }

    /// Add an element as part of the initial layout, without recording it.
    pub fn push(&mut self, element: Element) -> Handle {
        self.elements.push(Some(element));
        Handle(self.elements.len() - 1)
    }

    /// Add an element at runtime.
    pub fn append(&mut self, element: Element) -> Handle {
        let change = Change::Appended {
            element: Handle(self.elements.len()),
            tag: element.tag.clone(),
            text: element.text.clone(),
        };
        let handle = self.push(element);
        self.record(change);
        handle
    }

    pub fn remove(&mut self, handle: Handle) {
        if let Some(slot) = self.elements.get_mut(handle.0) {
            if slot.take().is_some() {
                self.record(Change::Removed { element: handle });
            }
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&Element> {
        self.elements.get(handle.0)?.as_ref()
    }

    fn get_mut(&mut self, handle: Handle) -> Option<&mut Element> {
        self.elements.get_mut(handle.0)?.as_mut()
    }

    /// Attached elements in document order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|el| (Handle(idx), el)))
    }

    pub fn by_id(&self, id: &str) -> Option<Handle> {
        self.iter()
            .find(|(_, el)| el.id.as_deref() == Some(id))
            .map(|(handle, _)| handle)
    }

    pub fn by_class(&self, class: &str) -> Vec<Handle> {
        self.iter()
            .filter(|(_, el)| el.has_class(class))
            .map(|(handle, _)| handle)
            .collect()
    }

    pub fn by_tag(&self, tag: &str) -> Vec<Handle> {
        self.iter()
            .filter(|(_, el)| el.tag == tag)
            .map(|(handle, _)| handle)
            .collect()
    }

    pub fn children(&self, parent: Option<Handle>) -> Vec<Handle> {
        self.iter()
            .filter(|(_, el)| el.parent == parent)
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Whether `handle` lies strictly inside `ancestor`.
    pub fn is_inside(&self, handle: Handle, ancestor: Handle) -> bool {
        let mut current = self.get(handle).and_then(|el| el.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.get(parent).and_then(|el| el.parent);
        }
        false
    }

    pub fn has_class(&self, handle: Handle, class: &str) -> bool {
        self.get(handle).is_some_and(|el| el.has_class(class))
    }

    pub fn add_class(&mut self, handle: Handle, class: &str) {
        let Some(el) = self.get_mut(handle) else {
            return;
        };
        if el.classes.insert(class.to_string()) {
            self.record(Change::ClassAdded {
                element: handle,
                class: class.to_string(),
            });
        }
    }

    pub fn remove_class(&mut self, handle: Handle, class: &str) {
        let Some(el) = self.get_mut(handle) else {
            return;
        };
        if el.classes.remove(class) {
            self.record(Change::ClassRemoved {
                element: handle,
                class: class.to_string(),
            });
        }
    }

    pub fn toggle_class(&mut self, handle: Handle, class: &str) {
        if self.has_class(handle, class) {
            self.remove_class(handle, class);
        } else {
            self.add_class(handle, class);
        }
    }

    pub fn set_text(&mut self, handle: Handle, text: &str) {
        let Some(el) = self.get_mut(handle) else {
            return;
        };
        el.text = text.to_string();
        self.record(Change::TextSet {
            element: handle,
            text: text.to_string(),
        });
    }

    pub fn set_disabled(&mut self, handle: Handle, disabled: bool) {
        let Some(el) = self.get_mut(handle) else {
            return;
        };
        el.disabled = disabled;
        self.record(Change::DisabledSet {
            element: handle,
            disabled,
        });
    }

    pub fn set_style(&mut self, handle: Handle, property: &str, value: &str) {
        let Some(el) = self.get_mut(handle) else {
            return;
        };
        el.style.insert(property.to_string(), value.to_string());
        self.record(Change::StyleSet {
            element: handle,
            property: property.to_string(),
            value: value.to_string(),
        });
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Scroll the window on behalf of the page.
    pub fn request_scroll(&mut self, top: f64, smooth: bool) {
        let top = top.max(0.0);
        self.scroll_y = top;
        self.record(Change::ScrollRequested { top, smooth });
    }

    /// Fraction of an element inside the viewport shrunk by `bottom_margin`.
    ///
    /// `None` when the element does not intersect it at all.
    pub fn visible_ratio(&self, handle: Handle, bottom_margin: f64) -> Option<f64> {
        let el = self.get(handle)?;
        let view_top = self.scroll_y;
        let view_bottom = self.scroll_y + self.viewport_height - bottom_margin;
        let el_bottom = el.top + el.height;

        if el.top > view_bottom || el_bottom < view_top {
            return None;
        }
        if el.height <= 0.0 {
            return Some(1.0);
        }
        let overlap = el_bottom.min(view_bottom) - el.top.max(view_top);
        Some((overlap / el.height).clamp(0.0, 1.0))
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn trace(&self) -> &[Mutation] {
        &self.trace
    }

    /// Record something the page did outside the element tree.
    pub fn record(&mut self, change: Change) {
        self.trace.push(Mutation {
            at_ms: self.now_ms,
            change,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Submit,
    Scroll,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Click(Handle),
    Submit(Handle),
    Scroll,
    Resize,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Click(_) => EventKind::Click,
            Event::Submit(_) => EventKind::Submit,
            Event::Scroll => EventKind::Scroll,
            Event::Resize => EventKind::Resize,
        }
    }

    /// Target element, or `None` for window events.
    pub fn target(&self) -> Option<Handle> {
        match self {
            Event::Click(handle) | Event::Submit(handle) => Some(*handle),
            Event::Scroll | Event::Resize => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    PreventDefault,
}

type Handler = Rc<dyn Fn(&mut Scope, &Event) -> Flow>;
type Task = Box<dyn FnOnce(&mut Scope)>;

/// What handlers and timer tasks get to work with.
pub struct Scope {
    pub doc: Document,
    pub settings: PageSettings,
    timers: BTreeMap<(u64, u64), Task>,
    next_seq: u64,
    pending: VecDeque<Event>,
}

impl Scope {
    /// Run `task` after `delay_ms`. Tasks due at the same time run in scheduling order.
    pub fn set_timeout<F>(&mut self, delay_ms: u64, task: F)
    where
        F: FnOnce(&mut Scope) + 'static,
    {
        let due = self.doc.now_ms + delay_ms;
        self.timers.insert((due, self.next_seq), Box::new(task));
        self.next_seq += 1;
    }

    /// Dispatch `event` once the current handler returns.
    pub fn queue_event(&mut self, event: Event) {
        self.pending.push_back(event);
    }
}

struct Listener {
    target: Option<Handle>,
    kind: EventKind,
    handler: Handler,
}

pub struct Page {
    scope: Scope,
    listeners: Vec<Listener>,
}

impl Page {
    pub fn new(doc: Document, settings: PageSettings) -> Self {
        Self {
            scope: Scope {
                doc,
                settings,
                timers: BTreeMap::new(),
                next_seq: 0,
                pending: VecDeque::new(),
            },
            listeners: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.scope.doc
    }

    pub fn scope(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// Listen for `kind` events on `target`, or on the window when `target` is `None`.
    pub fn add_listener<F>(&mut self, target: Option<Handle>, kind: EventKind, handler: F)
    where
        F: Fn(&mut Scope, &Event) -> Flow + 'static,
    {
        self.listeners.push(Listener {
            target,
            kind,
            handler: Rc::new(handler),
        });
    }

    /// Dispatch an event and everything handlers queue in response.
    pub fn dispatch(&mut self, event: Event) -> Flow {
        let flow = self.dispatch_one(event);
        self.drain_pending();
        flow
    }

    pub fn click(&mut self, handle: Handle) -> Flow {
        self.dispatch(Event::Click(handle))
    }

    pub fn submit(&mut self, handle: Handle) -> Flow {
        self.dispatch(Event::Submit(handle))
    }

    /// Scroll the window as the user would.
    pub fn scroll_to(&mut self, top: f64) {
        self.scope.doc.scroll_y = top.max(0.0);
        self.dispatch(Event::Scroll);
    }

    pub fn resize(&mut self, viewport_height: f64) {
        self.scope.doc.viewport_height = viewport_height.max(0.0);
        self.dispatch(Event::Resize);
    }

    /// Let `ms` milliseconds pass, running the timers that fall due.
    #[cfg(test)]
    pub fn advance(&mut self, ms: u64) {
        let until = self.scope.doc.now_ms + ms;
        self.advance_to(until);
    }

    /// Run timers up to virtual time `until_ms`. Time never goes backwards.
    pub fn advance_to(&mut self, until_ms: u64) {
        while let Some((&(due, _), _)) = self.scope.timers.first_key_value() {
            if due > until_ms {
                break;
            }
            let Some((_, task)) = self.scope.timers.pop_first() else {
                break;
            };
            self.scope.doc.now_ms = self.scope.doc.now_ms.max(due);
            task(&mut self.scope);
            self.drain_pending();
        }
        self.scope.doc.now_ms = self.scope.doc.now_ms.max(until_ms);
    }

    /// Run timers until none are left.
    pub fn run_until_idle(&mut self) {
        while let Some((&(due, _), _)) = self.scope.timers.first_key_value() {
            self.advance_to(due);
        }
    }

    fn dispatch_one(&mut self, event: Event) -> Flow {
        let handlers: Vec<Handler> = self
            .listeners
            .iter()
            .filter(|l| l.kind == event.kind() && l.target == event.target())
            .map(|l| Rc::clone(&l.handler))
            .collect();

        let mut flow = Flow::Continue;
        for handler in handlers {
            if handler(&mut self.scope, &event) == Flow::PreventDefault {
                flow = Flow::PreventDefault;
            }
        }

        if flow == Flow::Continue {
            self.default_action(event);
        }
        flow
    }

    fn default_action(&mut self, event: Event) {
        // Only in-page anchor jumps are modelled; navigation away is not.
        let Event::Click(handle) = event else {
            return;
        };
        let doc = &mut self.scope.doc;
        let Some(target) = doc
            .get(handle)
            .filter(|el| el.tag == "a")
            .and_then(|el| el.href.as_deref())
            .and_then(|href| href.strip_prefix('#'))
            .and_then(|id| doc.by_id(id))
        else {
            return;
        };
        let top = doc.get(target).map_or(0.0, |el| el.top);
        doc.request_scroll(top, false);
        self.scope.queue_event(Event::Scroll);
    }

    fn drain_pending(&mut self) {
        while let Some(event) = self.scope.pending.pop_front() {
            self.dispatch_one(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn page() -> Page {
        Page::new(Document::new("about:blank", 800.0), PageSettings::default())
    }

    #[test]
    fn class_changes_are_traced_once() {
        let mut page = page();
        let doc = &mut page.scope().doc;
        let el = doc.push(Element::new("div").with_class("a b"));
        doc.add_class(el, "a");
        doc.add_class(el, "c");
        doc.toggle_class(el, "b");
        assert_eq!(doc.trace().len(), 2);
        assert!(doc.has_class(el, "c"));
        assert!(!doc.has_class(el, "b"));
    }

    #[test]
    fn removed_elements_ignore_changes() {
        let mut page = page();
        let doc = &mut page.scope().doc;
        let el = doc.append(Element::new("div"));
        doc.remove(el);
        doc.remove(el);
        doc.add_class(el, "x");
        assert!(doc.get(el).is_none());
        assert_eq!(doc.trace().len(), 2);
    }

    #[test]
    fn timers_run_in_due_then_scheduling_order() {
        let mut page = page();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, name) in [(200, "late"), (100, "first"), (100, "second")] {
            let log = Rc::clone(&log);
            page.scope()
                .set_timeout(delay, move |scope| log.borrow_mut().push((scope.doc.now_ms(), name)));
        }
        page.advance(150);
        assert_eq!(*log.borrow(), [(100, "first"), (100, "second")]);
        assert_eq!(page.document().now_ms(), 150);
        page.run_until_idle();
        assert_eq!(log.borrow().last(), Some(&(200, "late")));
        assert_eq!(page.document().now_ms(), 200);
    }

    #[test]
    fn nested_timers_are_relative_to_their_start() {
        let mut page = page();
        let seen = Rc::new(RefCell::new(None));
        let inner = Rc::clone(&seen);
        page.scope().set_timeout(100, move |scope| {
            scope.set_timeout(50, move |scope| *inner.borrow_mut() = Some(scope.doc.now_ms()));
        });
        page.run_until_idle();
        assert_eq!(*seen.borrow(), Some(150));
    }

    #[test]
    fn anchor_default_jumps_instantly() {
        let mut page = page();
        let doc = &mut page.scope().doc;
        let anchor = doc.push(Element::new("a").with_href("#end"));
        doc.push(Element::new("section").with_id("end").with_extent(900.0, 100.0));
        assert_eq!(page.click(anchor), Flow::Continue);
        assert_eq!(page.document().scroll_y(), 900.0);
        assert_eq!(
            page.document().trace()[0].change,
            Change::ScrollRequested {
                top: 900.0,
                smooth: false
            }
        );
    }

    #[test]
    fn listeners_match_kind_and_target() {
        let mut page = page();
        let a = page.scope().doc.push(Element::new("button"));
        let b = page.scope().doc.push(Element::new("button"));
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        page.add_listener(Some(a), EventKind::Click, move |_, _| {
            *counter.borrow_mut() += 1;
            Flow::Continue
        });
        page.click(a);
        page.click(b);
        page.submit(a);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn visible_ratio_uses_bottom_margin() {
        let mut page = page();
        let doc = &mut page.scope().doc;
        let el = doc.push(Element::new("div").with_extent(700.0, 100.0));
        assert_eq!(doc.visible_ratio(el, 0.0), Some(1.0));
        assert_eq!(doc.visible_ratio(el, 50.0), Some(0.5));
        assert_eq!(doc.visible_ratio(el, 200.0), None);
    }

    #[test]
    fn nesting_is_tracked() {
        let mut page = page();
        let doc = &mut page.scope().doc;
        let form = doc.push(Element::new("form"));
        let group = doc.push(Element::new("div").with_parent(form));
        let button = doc.push(Element::new("button").with_parent(group));
        assert!(doc.is_inside(button, form));
        assert!(!doc.is_inside(form, button));
        assert_eq!(doc.children(Some(form)), [group]);
    }
}
