//! The op table: every host capability reachable from a sandbox.
//!
//! Each op is a named, value-copying crossing — arguments and results
//! are strings or JSON text, never object handles. Fallible ops return
//! a `{ok}` / `{error}` envelope so the JS shim can rethrow in-sandbox
//! without the host error type ever crossing.

use crate::fetch::{FetchBackend, FetchRequest};
use crate::query::SearchParams;
use crate::uri;
use belfry_core::{LogEntry, LogLevel};
use deno_core::{extension, op2, Extension, OpState};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

/// Per-invocation settings consulted by the console op
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeSettings {
    /// Append entries to the invocation log list
    pub debug: bool,
    /// Mirror console output to host tracing (development mode)
    pub dev_mirror: bool,
}

/// Emission-ordered log sink shared between the console op and the
/// invoker. Single-threaded by construction: it lives and dies on the
/// sandbox thread.
#[derive(Clone, Default)]
pub struct LogSink {
    entries: Rc<RefCell<Vec<LogEntry>>>,
}

impl LogSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn push(&self, entry: LogEntry) {
        self.entries.borrow_mut().push(entry);
    }

    /// Number of captured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the sink is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drain the captured entries, leaving the sink empty.
    #[must_use]
    pub fn take(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

/// Wall-clock deadline for the whole invocation; the fetch op bounds
/// its backend call by the time remaining.
#[derive(Debug, Clone, Copy)]
pub struct InvocationDeadline(pub Instant);

impl InvocationDeadline {
    /// Time remaining until the deadline (zero once passed).
    #[must_use]
    pub fn remaining(&self) -> std::time::Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}

/// Cell the call wrapper writes its serialized result into
#[derive(Debug, Default)]
pub struct ResultCell {
    value: Option<String>,
}

impl ResultCell {
    /// Store the serialized result envelope.
    pub fn set(&mut self, value: String) {
        self.value = Some(value);
    }

    /// Take the stored envelope, if any.
    pub fn take(&mut self) -> Option<String> {
        self.value.take()
    }
}

/// Shared handle to the fetch backend, stored in `OpState`
#[derive(Clone)]
pub struct FetchHandle(pub Arc<dyn FetchBackend>);

fn ok_envelope(value: Value) -> String {
    json!({ "ok": value }).to_string()
}

fn error_envelope(message: &str) -> String {
    json!({ "error": message }).to_string()
}

#[op2]
#[string]
fn op_belfry_uri_encode(#[string] input: String, component: bool) -> String {
    let encoded = if component {
        uri::encode_uri_component(&input)
    } else {
        uri::encode_uri(&input)
    };
    ok_envelope(Value::String(encoded))
}

#[op2]
#[string]
fn op_belfry_uri_decode(#[string] input: String, component: bool) -> String {
    let decoded = if component {
        uri::decode_uri_component(&input)
    } else {
        uri::decode_uri(&input)
    };
    match decoded {
        Ok(s) => ok_envelope(Value::String(s)),
        Err(e) => error_envelope(&e.to_string()),
    }
}

#[op2]
#[string]
fn op_belfry_query_parse(#[string] query: String) -> String {
    match SearchParams::parse(&query) {
        Ok(params) => match serde_json::to_value(params.into_pairs()) {
            Ok(pairs) => ok_envelope(pairs),
            Err(e) => error_envelope(&e.to_string()),
        },
        Err(e) => error_envelope(&e.to_string()),
    }
}

#[op2]
#[string]
fn op_belfry_query_serialize(#[string] pairs_json: String) -> String {
    match serde_json::from_str::<Vec<(String, String)>>(&pairs_json) {
        Ok(pairs) => {
            let params = SearchParams::from_pairs(pairs);
            ok_envelope(Value::String(params.to_query_string()))
        }
        Err(e) => error_envelope(&e.to_string()),
    }
}

#[op2]
#[string]
fn op_belfry_query_sort(#[string] pairs_json: String) -> String {
    match serde_json::from_str::<Vec<(String, String)>>(&pairs_json) {
        Ok(pairs) => {
            let mut params = SearchParams::from_pairs(pairs);
            params.sort();
            match serde_json::to_value(params.into_pairs()) {
                Ok(sorted) => ok_envelope(sorted),
                Err(e) => error_envelope(&e.to_string()),
            }
        }
        Err(e) => error_envelope(&e.to_string()),
    }
}

#[op2(fast)]
fn op_belfry_console(state: &mut OpState, #[string] level: String, #[string] args_json: String) {
    let Some(level) = LogLevel::from_name(&level) else {
        return;
    };
    let args: Vec<Value> = serde_json::from_str(&args_json).unwrap_or_default();

    let settings = state
        .try_borrow::<BridgeSettings>()
        .copied()
        .unwrap_or_default();

    if settings.dev_mirror {
        match level {
            LogLevel::Log => tracing::info!(target: "belfry::sandbox", args = %args_json),
            LogLevel::Warn => tracing::warn!(target: "belfry::sandbox", args = %args_json),
            LogLevel::Error => tracing::error!(target: "belfry::sandbox", args = %args_json),
        }
    }

    if settings.debug {
        if let Some(sink) = state.try_borrow::<LogSink>() {
            sink.push(LogEntry::new(level, args));
        }
    }
}

#[op2(async)]
#[string]
async fn op_belfry_fetch(
    state: Rc<RefCell<OpState>>,
    #[string] request_json: String,
) -> String {
    let (backend, remaining) = {
        let state = state.borrow();
        let Some(handle) = state.try_borrow::<FetchHandle>() else {
            return error_envelope("fetch capability not installed");
        };
        let remaining = state
            .try_borrow::<InvocationDeadline>()
            .map(InvocationDeadline::remaining);
        (handle.0.clone(), remaining)
    };

    let request: FetchRequest = match serde_json::from_str(&request_json) {
        Ok(req) => req,
        Err(e) => return json!({ "ok": false, "error": format!("invalid fetch request: {}", e) }).to_string(),
    };

    // The fetch budget nests inside the remaining invocation budget, so
    // network waits can never extend an invocation past its deadline.
    let budget = match remaining {
        Some(left) if left.is_zero() => {
            return json!({ "ok": false, "error": "fetch aborted: execution deadline exceeded" })
                .to_string()
        }
        Some(left) => left,
        None => std::time::Duration::from_secs(30),
    };

    match tokio::time::timeout(budget, backend.fetch(request, budget)).await {
        Ok(Ok(response)) => match serde_json::to_string(&response) {
            Ok(s) => s,
            Err(e) => json!({ "ok": false, "error": e.to_string() }).to_string(),
        },
        Ok(Err(e)) => json!({ "ok": false, "error": e.to_string() }).to_string(),
        Err(_) => {
            json!({ "ok": false, "error": "fetch aborted: execution deadline exceeded" }).to_string()
        }
    }
}

#[op2(fast)]
fn op_belfry_set_result(state: &mut OpState, #[string] result_json: String) {
    if let Some(cell) = state.try_borrow_mut::<ResultCell>() {
        cell.set(result_json);
    }
}

extension!(
    belfry_ext,
    ops = [
        op_belfry_uri_encode,
        op_belfry_uri_decode,
        op_belfry_query_parse,
        op_belfry_query_serialize,
        op_belfry_query_sort,
        op_belfry_console,
        op_belfry_fetch,
        op_belfry_set_result,
    ],
);

/// The extension wiring every bridge op into a fresh runtime.
#[must_use]
pub fn bridge_extension() -> Extension {
    belfry_ext::init_ops()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_sink_orders_entries() {
        let sink = LogSink::new();
        sink.push(LogEntry::new(LogLevel::Log, vec![json!(1)]));
        sink.push(LogEntry::new(LogLevel::Error, vec![json!(2)]));
        let entries = sink.take();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].args[0], 1);
        assert_eq!(entries[1].args[0], 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_result_cell_take_clears() {
        let mut cell = ResultCell::default();
        cell.set("{\"ok\":5}".to_string());
        assert_eq!(cell.take().as_deref(), Some("{\"ok\":5}"));
        assert!(cell.take().is_none());
    }

    #[test]
    fn test_deadline_remaining_saturates() {
        let deadline = InvocationDeadline(Instant::now() - std::time::Duration::from_secs(1));
        assert!(deadline.remaining().is_zero());
    }

    #[test]
    fn test_envelopes() {
        assert_eq!(ok_envelope(json!("x")), "{\"ok\":\"x\"}");
        let err: Value = serde_json::from_str(&error_envelope("bad")).unwrap();
        assert_eq!(err["error"], "bad");
    }
}
