//! Browser bindings: the content-script entry point, DOM listeners, timers,
//! and the async store round trips.
//!
//! All engine state sits in one thread-local [`Runtime`]. JS callbacks only
//! borrow it for the duration of a synchronous call; store futures release it
//! across every `await`.

mod logging;
mod overlay;
mod page;
mod storage;

use std::cell::RefCell;

use leptos::prelude::GetUntracked;
use leptos::task::spawn_local;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, MutationObserver, MutationObserverInit};

use crate::action::{Action, ACTION_ATTR};
use crate::config::Config;
use crate::coordinator::{Coordinator, Effect, Pass, Ticket};
use crate::error::{Error, Result};
use crate::mirror::{PendingWrite, SaveStatus};
use crate::store::{NoteStore, StoreSnapshot};

use self::overlay::Overlay;
use self::page::WebPage;
use self::storage::ChromeStore;

struct Runtime {
    coordinator: Coordinator<WebPage>,
    overlay: Overlay,
    timer: Option<i32>,
    /// Hides the "saved" message of the last confirmed write.
    flash_timer: Option<i32>,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

fn with_runtime<R>(f: impl FnOnce(&mut Runtime) -> R) -> Option<R> {
    RUNTIME.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            tracing::warn!("runtime busy, dropping re-entrant callback");
            return None;
        };
        slot.as_mut().map(f)
    })
}

pub(crate) fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::init(&Config::default().log_level);
    if let Err(err) = boot() {
        tracing::error!("listing notes failed to start: {err}");
    }
}

fn boot() -> Result<()> {
    let page = WebPage::new()?;
    let overlay = Overlay::mount(page.document())?;
    let window = page.window().clone();
    let root = page.document().document_element();
    RUNTIME.with(|cell| {
        *cell.borrow_mut() = Some(Runtime {
            coordinator: Coordinator::new(page, Config::default()),
            overlay,
            timer: None,
            flash_timer: None,
        });
    });

    // Capture phase, so controls inside host links are seen before the host.
    let click_listener = Closure::<dyn FnMut(Event)>::new(on_click);
    window
        .add_event_listener_with_callback_and_bool("click", click_listener.as_ref().unchecked_ref(), true)
        .map_err(|err| Error::Page(describe(&err)))?;
    click_listener.forget();

    let popstate_listener = Closure::<dyn FnMut()>::new(schedule_pass);
    window
        .add_event_listener_with_callback("popstate", popstate_listener.as_ref().unchecked_ref())
        .map_err(|err| Error::Page(describe(&err)))?;
    popstate_listener.forget();

    let focus_listener = Closure::<dyn FnMut(Event)>::new(on_focus_out);
    window
        .add_event_listener_with_callback("focusout", focus_listener.as_ref().unchecked_ref())
        .map_err(|err| Error::Page(describe(&err)))?;
    focus_listener.forget();

    if let Some(root) = root {
        let mutation_listener = Closure::<dyn FnMut()>::new(schedule_pass);
        let observer = MutationObserver::new(mutation_listener.as_ref().unchecked_ref())
            .map_err(|err| Error::Page(describe(&err)))?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(&root, &init)
            .map_err(|err| Error::Page(describe(&err)))?;
        mutation_listener.forget();
    }

    let change_listener = Closure::<dyn FnMut(JsValue, JsValue)>::new(on_store_changed);
    match storage::subscribe(&change_listener) {
        Ok(()) => change_listener.forget(),
        Err(err) => tracing::warn!("no live store updates: {err}"),
    }

    run_now();
    Ok(())
}

fn run_now() {
    if let Some(pass) = with_runtime(|rt| rt.coordinator.run_pass()) {
        after_pass(pass);
    }
}

fn after_pass(pass: Pass) {
    match pass {
        Pass::AwaitingLoad => spawn_local(load()),
        Pass::Full(report) | Pass::Incremental(report) => {
            tracing::debug!(?report, "pass complete");
        }
        Pass::Deferred => {}
    }
}

async fn load() {
    let entries = ChromeStore.get_all().await;
    let level = with_runtime(|rt| match entries {
        Ok(entries) => {
            let report = rt.coordinator.complete_load(StoreSnapshot::from_entries(entries));
            tracing::info!(notes = rt.coordinator.mirror().len(), ?report, "notes loaded");
            Some(rt.coordinator.config().log_level.clone())
        }
        Err(err) => {
            rt.coordinator.fail_load(&err);
            None
        }
    });
    if let Some(Some(level)) = level {
        logging::set_level(&level);
    }
}

fn clear_timeout(handle: Option<i32>) {
    if let (Some(handle), Some(window)) = (handle, web_sys::window()) {
        window.clear_timeout_with_handle(handle);
    }
}

fn set_timeout(ms: u32, callback: impl FnOnce() + 'static) -> Option<i32> {
    let callback = Closure::once_into_js(callback);
    web_sys::window()?
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref::<js_sys::Function>(),
            i32::try_from(ms).unwrap_or(i32::MAX),
        )
        .ok()
}

/// Mutation and navigation signals land here. Each one supersedes the
/// pending timer.
fn schedule_pass() {
    with_runtime(|rt| {
        let ticket = rt.coordinator.signal();
        rt.arm(ticket);
    });
}

fn on_focus_out(event: Event) {
    let id = event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .map(|element| element.id());
    with_runtime(|rt| {
        if let Some(ticket) = rt.coordinator.on_focus_left(id.as_deref()) {
            rt.arm(ticket);
        }
    });
}

impl Runtime {
    fn arm(&mut self, ticket: Ticket) {
        clear_timeout(self.timer.take());
        self.timer = set_timeout(self.coordinator.config().debounce_ms, move || fire(ticket));
    }
}

fn fire(ticket: Ticket) {
    let pass = with_runtime(|rt| {
        rt.timer = None;
        rt.coordinator.fire(ticket)
    });
    if let Some(Some(pass)) = pass {
        after_pass(pass);
    }
}

fn on_click(event: Event) {
    let Some(target) = event.target().and_then(|target| target.dyn_into::<Element>().ok()) else {
        return;
    };
    let Ok(Some(control)) = target.closest(&format!("[{ACTION_ATTR}]")) else {
        return;
    };
    let effect = with_runtime(|rt| {
        let action = Action::read(rt.coordinator.page(), &control)?;
        Some(rt.coordinator.handle_action(action))
    });
    let Some(Some(effect)) = effect else {
        return;
    };
    // Controls sit inside the host's own links and click handlers.
    event.prevent_default();
    event.stop_propagation();
    apply_effect(effect);
}

fn apply_effect(effect: Effect) {
    match effect {
        Effect::None => {}
        Effect::Persist(write) => {
            // The new save owns the message now.
            with_runtime(|rt| clear_timeout(rt.flash_timer.take()));
            spawn_local(persist(write));
        }
        Effect::ShowModal { id, draft } => {
            with_runtime(|rt| rt.overlay.show_modal(&id, draft));
        }
        Effect::ShowExport(text) => {
            with_runtime(|rt| rt.overlay.show_export(text));
        }
    }
}

async fn persist(write: PendingWrite) {
    let outcome = ChromeStore.set_note(write.id(), write.text()).await;
    let status = with_runtime(|rt| {
        let status = rt.coordinator.write_settled(&write, outcome);
        if status == SaveStatus::Saved {
            clear_timeout(rt.flash_timer.take());
            let flash_ms = rt.coordinator.config().saved_flash_ms;
            let confirmed = write.clone();
            rt.flash_timer = set_timeout(flash_ms, move || {
                with_runtime(|rt| {
                    rt.flash_timer = None;
                    rt.coordinator.clear_feedback(&confirmed);
                });
            });
        }
        status
    });
    if let Some(SaveStatus::Failed(reason)) = status {
        tracing::warn!(id = %write.id(), "note not saved: {reason}");
    }
}

fn on_store_changed(changes: JsValue, area: JsValue) {
    if area.as_string().as_deref() != Some("local") {
        return;
    }
    let deliveries = storage::parse_changes(changes);
    if deliveries.is_empty() {
        return;
    }
    let level = with_runtime(|rt| {
        rt.coordinator.on_external_change(deliveries);
        rt.coordinator.config().log_level.clone()
    });
    if let Some(level) = level {
        logging::set_level(&level);
    }
}

pub(crate) fn save_modal() {
    let effect = with_runtime(|rt| {
        let draft = rt.overlay.modal_draft.get_untracked();
        rt.overlay.hide_modal();
        rt.coordinator.save_modal(draft)
    });
    if let Some(effect) = effect {
        apply_effect(effect);
    }
}

pub(crate) fn close_modal() {
    with_runtime(|rt| {
        rt.coordinator.close_modal();
        rt.overlay.hide_modal();
    });
}
