//! `tracing` output routed to the devtools console.

use std::io::{self, Write};
use std::sync::OnceLock;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};
use wasm_bindgen::JsValue;
use web_sys::console;

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("listing_notes={level}"))
        .unwrap_or_else(|_| EnvFilter::new("listing_notes=info"))
}

/// Installs the global subscriber. The page has no clock the formatter can
/// use, so timestamps are off; the console adds its own.
pub fn init(level: &str) {
    let (filter, handle) = reload::Layer::new(filter_for(level));
    let output = fmt::layer()
        .with_writer(Console)
        .with_ansi(false)
        .without_time()
        .with_target(false);
    if tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .is_ok()
    {
        let _ = FILTER.set(handle);
    }
}

/// Applies a level from freshly loaded settings.
pub fn set_level(level: &str) {
    if let Some(handle) = FILTER.get() {
        if let Err(err) = handle.reload(filter_for(level)) {
            tracing::warn!("log level not applied: {err}");
        }
    }
}

struct Console;

/// One formatted event, flushed to the console method matching its level.
pub struct ConsoleLine {
    level: Level,
    buf: Vec<u8>,
}

impl ConsoleLine {
    fn new(level: Level) -> Self {
        Self { level, buf: Vec::new() }
    }
}

impl Write for ConsoleLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        let message = JsValue::from_str(line.trim_end());
        if self.level == Level::ERROR {
            console::error_1(&message);
        } else if self.level == Level::WARN {
            console::warn_1(&message);
        } else if self.level == Level::INFO {
            console::info_1(&message);
        } else {
            console::debug_1(&message);
        }
    }
}

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLine::new(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleLine::new(*meta.level())
    }
}
