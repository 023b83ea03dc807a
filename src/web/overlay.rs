//! The page-global modal and export dialog, rendered once with leptos.
//!
//! Both live under their own root appended to `<body>`; the coordinator
//! drives them through [`Overlay`] and never touches their markup.

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use super::{close_modal, describe, save_modal};
use crate::error::{Error, Result};
use crate::resolver::ListingId;

pub const OVERLAY_ROOT_ID: &str = "znt-overlay-root";

#[derive(Clone, Copy)]
pub struct Overlay {
    modal_open: RwSignal<bool>,
    modal_title: RwSignal<String>,
    pub modal_draft: RwSignal<String>,
    export_open: RwSignal<bool>,
    export_text: RwSignal<String>,
}

impl Overlay {
    fn new() -> Self {
        Self {
            modal_open: RwSignal::new(false),
            modal_title: RwSignal::new(String::new()),
            modal_draft: RwSignal::new(String::new()),
            export_open: RwSignal::new(false),
            export_text: RwSignal::new(String::new()),
        }
    }

    /// Mounts the overlay root, replacing one left by an earlier injection.
    pub fn mount(document: &Document) -> Result<Self> {
        if let Some(stale) = document.get_element_by_id(OVERLAY_ROOT_ID) {
            stale.remove();
        }
        let body = document
            .body()
            .ok_or_else(|| Error::Page("no body to mount the overlay".to_string()))?;
        let host: HtmlElement = document
            .create_element("div")
            .map_err(|err| Error::Page(describe(&err)))?
            .unchecked_into();
        host.set_id(OVERLAY_ROOT_ID);
        body.append_child(&host)
            .map_err(|err| Error::Page(describe(&err)))?;

        let overlay = Self::new();
        leptos::mount::mount_to(host, move || {
            view! {
                <NoteModal overlay=overlay />
                <ExportDialog overlay=overlay />
            }
        })
        .forget();
        Ok(overlay)
    }

    pub fn show_modal(&self, id: &ListingId, draft: String) {
        self.modal_title.set(format!("Note for listing {id}"));
        self.modal_draft.set(draft);
        self.modal_open.set(true);
    }

    pub fn hide_modal(&self) {
        self.modal_open.set(false);
    }

    pub fn show_export(&self, text: String) {
        self.export_text.set(text);
        self.export_open.set(true);
    }
}

fn backdrop_class(open: bool) -> &'static str {
    if open {
        "znt-modal-backdrop znt-visible"
    } else {
        "znt-modal-backdrop"
    }
}

fn is_backdrop_click(ev: &leptos::ev::MouseEvent) -> bool {
    ev.target().is_some() && ev.target() == ev.current_target()
}

#[component]
fn NoteModal(overlay: Overlay) -> impl IntoView {
    let textarea = NodeRef::<leptos::html::Textarea>::new();

    Effect::new(move |_| {
        if overlay.modal_open.get() {
            if let Some(area) = textarea.get() {
                let _ = area.focus();
            }
        }
    });

    view! {
        <div
            class=move || backdrop_class(overlay.modal_open.get())
            on:click=move |ev| {
                if is_backdrop_click(&ev) {
                    close_modal();
                }
            }
        >
            <div class="znt-modal">
                <div class="znt-modal-header">
                    <span class="znt-title">{move || overlay.modal_title.get()}</span>
                    <button class="znt-modal-close" type="button" title="Close" on:click=move |_| close_modal()>
                        "×"
                    </button>
                </div>
                <textarea
                    class="znt-textarea"
                    node_ref=textarea
                    placeholder="Enter your thoughts about this property..."
                    prop:value=move || overlay.modal_draft.get()
                    on:input=move |ev| overlay.modal_draft.set(event_target_value(&ev))
                ></textarea>
                <button class="znt-save-btn" type="button" on:click=move |_| save_modal()>
                    "Save Note"
                </button>
            </div>
        </div>
    }
}

#[component]
fn ExportDialog(overlay: Overlay) -> impl IntoView {
    let output = NodeRef::<leptos::html::Textarea>::new();

    // Selected on open so a single copy takes everything.
    Effect::new(move |_| {
        if overlay.export_open.get() {
            if let Some(area) = output.get() {
                area.select();
            }
        }
    });

    view! {
        <div
            class=move || backdrop_class(overlay.export_open.get())
            on:click=move |ev| {
                if is_backdrop_click(&ev) {
                    overlay.export_open.set(false);
                }
            }
        >
            <div class="znt-modal znt-export">
                <div class="znt-modal-header">
                    <span class="znt-title">"Visible Listings"</span>
                    <button class="znt-modal-close" type="button" title="Close" on:click=move |_| overlay.export_open.set(false)>
                        "×"
                    </button>
                </div>
                <textarea
                    class="znt-textarea znt-export-text"
                    node_ref=output
                    readonly=true
                    prop:value=move || overlay.export_text.get()
                ></textarea>
                <button
                    class="znt-save-btn"
                    type="button"
                    on:click=move |_| {
                        if let Some(area) = output.get() {
                            area.select();
                        }
                    }
                >
                    "Select All"
                </button>
            </div>
        </div>
    }
}
