//! Page layouts and event scripts for headless runs.

use crate::config::PageSettings;
use crate::glue::{self, Level, SiteContent};
use crate::page::{Document, Element, Handle, Mutation, Page};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

/// A page layout followed by timed user actions.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageScript {
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
    #[serde(default)]
    pub element: Vec<ElementSpec>,
    #[serde(default)]
    pub event: Vec<ScriptEvent>,
}

fn default_location() -> String {
    "about:blank".to_string()
}

fn default_viewport_height() -> f64 {
    800.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    pub tag: String,
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub text: String,
    pub href: Option<String>,
    #[serde(rename = "type")]
    pub button_type: Option<String>,
    /// Id of an element declared earlier.
    pub parent: Option<String>,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub height: f64,
}

#[derive(Debug, Deserialize)]
pub struct ScriptEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Click { target: String },
    Submit { target: String },
    Scroll { y: f64 },
    Resize { height: f64 },
    Notify { message: String, level: Level },
}

/// Final state of one element.
#[derive(Debug, Serialize)]
pub struct ElementState {
    pub handle: Handle,
    pub id: Option<String>,
    pub tag: String,
    pub classes: BTreeSet<String>,
    pub text: String,
    pub disabled: bool,
    pub style: BTreeMap<String, String>,
}

/// Everything that happened during a run.
#[derive(Debug, Serialize)]
pub struct PageTrace {
    pub end_ms: u64,
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub mutations: Vec<Mutation>,
    pub elements: Vec<ElementState>,
}

impl PageScript {
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents).with_context(|| format!("failed to load {file:?}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let script: PageScript =
            toml::from_str(contents).context("failed to deserialize page script")?;
        if let Some(pair) = script.event.windows(2).find(|p| p[0].at_ms > p[1].at_ms) {
            bail!(
                "events must be in time order, but {} ms comes after {} ms",
                pair[1].at_ms,
                pair[0].at_ms
            );
        }
        Ok(script)
    }

    pub fn build_document(&self) -> Result<Document> {
        let mut doc = Document::new(&self.location, self.viewport_height);
        for spec in &self.element {
            let mut element = Element::new(&spec.tag)
                .with_text(&spec.text)
                .with_extent(spec.top, spec.height);
            for class in &spec.classes {
                element = element.with_class(class);
            }
            if let Some(id) = &spec.id {
                if doc.by_id(id).is_some() {
                    bail!("element id {id:?} is used more than once");
                }
                element = element.with_id(id);
            }
            if let Some(href) = &spec.href {
                element = element.with_href(href);
            }
            if let Some(button_type) = &spec.button_type {
                element = element.with_button_type(button_type);
            }
            if let Some(parent) = &spec.parent {
                let parent = doc
                    .by_id(parent)
                    .with_context(|| format!("parent {parent:?} is not declared before use"))?;
                element = element.with_parent(parent);
            }
            doc.push(element);
        }
        Ok(doc)
    }

    /// Load the layout, wire up the site, replay the events and let all timers run out.
    pub fn run(&self, settings: PageSettings, content: &SiteContent) -> Result<PageTrace> {
        let doc = self.build_document().context("failed to build document")?;
        let mut page = Page::new(doc, settings);
        glue::init_site(&mut page, content);

        for event in &self.event {
            page.advance_to(event.at_ms);
            log::debug!("{} ms: {:?}", event.at_ms, event.action);
            match &event.action {
                Action::Click { target } => {
                    let handle = find(&page, target)?;
                    page.click(handle);
                }
                Action::Submit { target } => {
                    let handle = find(&page, target)?;
                    page.submit(handle);
                }
                Action::Scroll { y } => page.scroll_to(*y),
                Action::Resize { height } => page.resize(*height),
                Action::Notify { message, level } => {
                    glue::show_notification(page.scope(), message, *level)
                }
            }
        }
        page.run_until_idle();

        let doc = page.document();
        let elements = doc
            .iter()
            .map(|(handle, el)| ElementState {
                handle,
                id: el.id.clone(),
                tag: el.tag.clone(),
                classes: el.classes.clone(),
                text: el.text.clone(),
                disabled: el.disabled,
                style: el.style.clone(),
            })
            .collect();

        Ok(PageTrace {
            end_ms: doc.now_ms(),
            scroll_y: doc.scroll_y(),
            viewport_height: doc.viewport_height(),
            mutations: doc.trace().to_vec(),
            elements,
        })
    }
}

fn find(page: &Page, id: &str) -> Result<Handle> {
    page.document()
        .by_id(id)
        .with_context(|| format!("no element with id {id:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Change;

    const SCRIPT: &str = r##"
viewport_height = 600.0

[[element]]
tag = "nav"

[[element]]
tag = "button"
id = "mobile-menu-btn"

[[element]]
tag = "div"
id = "mobile-menu"
classes = ["hidden"]

[[element]]
tag = "a"
id = "jump"
href = "#data"

[[element]]
tag = "section"
id = "data"
classes = ["animate-fade-in"]
top = 1500.0
height = 300.0

[[element]]
tag = "form"
id = "contact"

[[element]]
tag = "button"
type = "submit"
parent = "contact"
text = "Send"

[[event]]
at_ms = 0
action = "click"
target = "mobile-menu-btn"

[[event]]
at_ms = 200
action = "click"
target = "jump"

[[event]]
at_ms = 400
action = "submit"
target = "contact"

[[event]]
at_ms = 450
action = "resize"
height = 700.0

[[event]]
at_ms = 500
action = "notify"
message = "Heat warning"
level = "error"
"##;

    #[test]
    fn script_replays_against_the_site() {
        let script = PageScript::from_toml(SCRIPT).unwrap();
        let trace = script
            .run(PageSettings::default(), &SiteContent::default())
            .unwrap();

        assert_eq!(trace.scroll_y, 1500.0);
        assert_eq!(trace.viewport_height, 700.0);
        // Submit finishes at 2400 ms, its toast is gone 3300 ms later.
        assert_eq!(trace.end_ms, 5700);

        let state = |id: &str| trace.elements.iter().find(|e| e.id.as_deref() == Some(id));
        assert!(!state("mobile-menu").unwrap().classes.contains("hidden"));
        assert!(state("data").unwrap().classes.contains("visible"));
        assert!(trace.elements.iter().all(|e| !e.classes.contains("text-white")));

        let nav_shadow = trace.mutations.iter().find(|m| {
            matches!(&m.change, Change::ClassAdded { class, .. } if class == "shadow-lg")
        });
        assert_eq!(nav_shadow.map(|m| m.at_ms), Some(200));
        assert!(trace.mutations.iter().any(|m| m.at_ms == 2400
            && matches!(&m.change, Change::TextSet { text, .. } if text == "Send")));
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let script = r#"
[[event]]
at_ms = 10
action = "scroll"
y = 5.0

[[event]]
at_ms = 5
action = "scroll"
y = 0.0
"#;
        assert!(PageScript::from_toml(script).is_err());
    }

    #[test]
    fn unknown_targets_are_errors() {
        let script = PageScript::from_toml(
            r#"
[[event]]
at_ms = 0
action = "click"
target = "nope"
"#,
        )
        .unwrap();
        assert!(
            script
                .run(PageSettings::default(), &SiteContent::default())
                .is_err()
        );
    }

    #[test]
    fn parents_must_be_declared_first() {
        let script = PageScript::from_toml(
            r#"
[[element]]
tag = "button"
parent = "later"

[[element]]
tag = "form"
id = "later"
"#,
        )
        .unwrap();
        assert!(script.build_document().is_err());
    }
}
