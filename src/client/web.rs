use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    Document, Element, Event, HtmlFormElement, HtmlInputElement, Response, ScrollBehavior,
    ScrollIntoViewOptions, Window,
};

use super::export::{ExportForm, ExportTrigger, PasswordPrompt};
use super::ids;
use super::nav::{ElementLookup, ScrollTarget, scroll_to_target};
use super::search::{ClientError, ResultEntry, ResultsList, SearchBackend, SearchController};

const ERROR_CLASS: &str = "search-error";
const ERROR_ATTR: &str = "data-search-error";

/// Entry point run by the generated JS glue once the module is loaded
#[wasm_bindgen(start)]
pub fn start() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    bind_search(&window, &document);
    bind_export(&window, &document);
    bind_nav(&document);
}

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|err| String::from(err.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

fn listen(target: &Element, event: &str, handler: impl FnMut(Event) + 'static) {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    if target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .is_ok()
    {
        // The listener lives as long as the page.
        closure.forget();
    }
}

// Search

struct DomList {
    document: Document,
    element: Element,
}

impl DomList {
    fn clear(&self) {
        self.element.set_text_content(None);
        let _ = self.element.class_list().remove_1(ERROR_CLASS);
        let _ = self.element.remove_attribute(ERROR_ATTR);
    }

    fn text_element(&self, tag: &str, class: &str, text: &str) -> Result<Element, JsValue> {
        let element = self.document.create_element(tag)?;
        element.set_class_name(class);
        element.set_text_content(Some(text));
        Ok(element)
    }

    fn entry_element(&self, entry: &ResultEntry) -> Result<Element, JsValue> {
        let item = self.document.create_element("li")?;
        item.set_class_name("note-item");

        let link = self.document.create_element("a")?;
        link.set_attribute("href", &entry.href)?;
        link.append_child(&self.text_element("span", "note-title", &entry.title)?)?;
        link.append_child(&self.text_element("span", "note-date", &entry.modified_label)?)?;

        item.append_child(&link)?;
        Ok(item)
    }
}

impl ResultsList for DomList {
    fn show_placeholder(&mut self, text: &str) {
        self.clear();
        if let Ok(item) = self.text_element("li", "no-results", text) {
            let _ = self.element.append_child(&item);
        }
    }

    fn show_entries(&mut self, entries: &[ResultEntry]) {
        self.clear();
        for entry in entries {
            match self.entry_element(entry) {
                Ok(item) => {
                    let _ = self.element.append_child(&item);
                }
                Err(err) => web_sys::console::warn_1(&err),
            }
        }
    }

    fn show_error(&mut self, message: &str) {
        let _ = self.element.class_list().add_1(ERROR_CLASS);
        let _ = self.element.set_attribute(ERROR_ATTR, message);
        web_sys::console::warn_1(&JsValue::from_str(message));
    }
}

struct FetchBackend {
    window: Window,
}

impl SearchBackend for FetchBackend {
    async fn fetch(&self, url: &str) -> Result<String, ClientError> {
        let value = JsFuture::from(self.window.fetch_with_str(url))
            .await
            .map_err(|e| ClientError::Network(describe(&e)))?;
        let response: Response = value
            .dyn_into()
            .map_err(|_| ClientError::InvalidResponse("fetch did not yield a Response".into()))?;

        if !response.ok() {
            return Err(ClientError::Status(response.status()));
        }

        let text = response
            .text()
            .map_err(|e| ClientError::InvalidResponse(describe(&e)))?;
        let body = JsFuture::from(text)
            .await
            .map_err(|e| ClientError::Network(describe(&e)))?;
        body.as_string()
            .ok_or_else(|| ClientError::InvalidResponse("response body is not text".into()))
    }
}

fn bind_search(window: &Window, document: &Document) {
    let Some(input) = document
        .get_element_by_id(ids::SEARCH_INPUT)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
    else {
        return;
    };

    let list = document
        .get_element_by_id(ids::RESULTS_LIST)
        .map(|element| DomList {
            document: document.clone(),
            element,
        });
    let controller = Rc::new(SearchController::new(
        list,
        FetchBackend {
            window: window.clone(),
        },
    ));

    let field = input.clone();
    listen(&input, "input", move |_| {
        let pending = controller.issue(&field.value());
        let controller = Rc::clone(&controller);
        spawn_local(async move {
            controller.complete(pending).await;
        });
    });
}

// Export

struct WindowPrompt {
    window: Window,
}

impl PasswordPrompt for WindowPrompt {
    fn ask(&self, message: &str) -> Option<String> {
        self.window.prompt_with_message(message).ok().flatten()
    }
}

struct DomExportForm {
    form: HtmlFormElement,
    password: HtmlInputElement,
}

impl ExportForm for DomExportForm {
    fn set_password(&mut self, password: &str) {
        self.password.set_value(password);
    }

    fn submit(&mut self) {
        if let Err(err) = self.form.submit() {
            web_sys::console::warn_1(&err);
        }
    }
}

fn bind_export(window: &Window, document: &Document) {
    let Some(button) = document.get_element_by_id(ids::EXPORT_BUTTON) else {
        return;
    };
    let form = document
        .get_element_by_id(ids::EXPORT_FORM)
        .and_then(|el| el.dyn_into::<HtmlFormElement>().ok());
    let password = document
        .get_element_by_id(ids::EXPORT_PASSWORD)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
    let form = match (form, password) {
        (Some(form), Some(password)) => Some(DomExportForm { form, password }),
        _ => None,
    };

    let prompt = WindowPrompt {
        window: window.clone(),
    };
    let Some(mut trigger) = ExportTrigger::bind(prompt, form) else {
        return;
    };

    listen(&button, "click", move |event| {
        event.prevent_default();
        trigger.on_click();
    });
}

// Navigation

struct SmoothElement(Element);

impl ScrollTarget for SmoothElement {
    fn scroll_into_view_smooth(&self) {
        let options = ScrollIntoViewOptions::new();
        options.set_behavior(ScrollBehavior::Smooth);
        self.0
            .scroll_into_view_with_scroll_into_view_options(&options);
    }
}

#[derive(Clone)]
struct DomLookup(Document);

impl ElementLookup for DomLookup {
    type Target = SmoothElement;

    fn find(&self, id: &str) -> Option<SmoothElement> {
        self.0.get_element_by_id(id).map(SmoothElement)
    }
}

fn bind_nav(document: &Document) {
    let selector = format!(".{}", ids::NAV_BUTTON_CLASS);
    let Ok(buttons) = document.query_selector_all(&selector) else {
        return;
    };

    for index in 0..buttons.length() {
        let Some(button) = buttons
            .get(index)
            .and_then(|node| node.dyn_into::<Element>().ok())
        else {
            continue;
        };

        let lookup = DomLookup(document.clone());
        let target = button.get_attribute(ids::NAV_TARGET_ATTR);
        listen(&button, "click", move |_| {
            scroll_to_target(&lookup, target.as_deref());
        });
    }
}
