//! `log` output for the browser console

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsError;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = debug)]
    fn console_debug(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = info)]
    fn console_info(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = warn)]
    fn console_warn(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    fn console_error(s: &str);
}

/// Level used until `setLogLevel` is called
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Forwards every record to the `console` method of the same level
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}", record.target(), record.args());
        match record.level() {
            Level::Error => console_error(&line),
            Level::Warn => console_warn(&line),
            Level::Info => console_info(&line),
            Level::Debug | Level::Trace => console_debug(&line),
        }
    }

    fn flush(&self) {}
}

/// Install [`ConsoleLogger`] as the global logger
///
/// Later calls leave the installed logger and level alone.
pub fn init_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(DEFAULT_LEVEL);
    }
}

/// Change the console log level: `off`, `error`, `warn`, `info`, `debug` or
/// `trace`
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let level: LevelFilter = level
        .parse()
        .map_err(|_| JsValue::from(JsError::new(&format!("unknown log level `{}`", level))))?;
    init_logger();
    log::set_max_level(level);
    Ok(())
}
