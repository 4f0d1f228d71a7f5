//! Bridge installation: shims executed inside a fresh sandbox.
//!
//! Each capability installs independently (any order) as an IIFE that
//! captures the op table in closures. `install_all` finishes by sealing
//! the global scope: after sealing, sandboxed code can reach the host
//! only through the installed capabilities.

use crate::fetch::FetchBackend;
use crate::ops::{BridgeSettings, FetchHandle, InvocationDeadline, LogSink, ResultCell};
use deno_core::JsRuntime;
use std::fmt;
use std::sync::Arc;

/// The four installable capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `encodeURI[Component]` / `decodeURI[Component]`
    UriCodec,
    /// `URLSearchParams`
    SearchParams,
    /// `console.log` / `warn` / `error`
    Console,
    /// `fetch`
    Fetch,
}

impl Capability {
    /// All capabilities, in install order (the order is not load-bearing).
    pub const ALL: [Self; 4] = [
        Self::UriCodec,
        Self::SearchParams,
        Self::Console,
        Self::Fetch,
    ];

    /// Stable capability name used in errors and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UriCodec => "uri-codec",
            Self::SearchParams => "search-params",
            Self::Console => "console",
            Self::Fetch => "fetch",
        }
    }

    fn shim(&self) -> &'static str {
        match self {
            Self::UriCodec => URI_SHIM,
            Self::SearchParams => SEARCH_PARAMS_SHIM,
            Self::Console => CONSOLE_SHIM,
            Self::Fetch => FETCH_SHIM,
        }
    }

    fn script_name(&self) -> &'static str {
        match self {
            Self::UriCodec => "[belfry:uri]",
            Self::SearchParams => "[belfry:search-params]",
            Self::Console => "[belfry:console]",
            Self::Fetch => "[belfry:fetch]",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A capability module failed to install
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to install {capability} capability: {reason}")]
pub struct InstallError {
    /// Capability that failed
    pub capability: String,
    /// Underlying engine error
    pub reason: String,
}

/// Per-invocation host state bound into the sandbox's op state
pub struct BridgeContext {
    /// Log sink shared with the invoker
    pub sink: LogSink,
    /// Console behavior flags
    pub settings: BridgeSettings,
    /// Network seam for the fetch capability
    pub fetch: Arc<dyn FetchBackend>,
    /// Invocation deadline the fetch op nests inside
    pub deadline: InvocationDeadline,
}

impl BridgeContext {
    /// Bind this context into the runtime's op state. Must run before
    /// any capability shim executes.
    pub fn bind(&self, runtime: &mut JsRuntime) {
        let state = runtime.op_state();
        let mut state = state.borrow_mut();
        state.put(self.sink.clone());
        state.put(self.settings);
        state.put(FetchHandle(self.fetch.clone()));
        state.put(self.deadline);
        state.put(ResultCell::default());
    }
}

fn run_shim(
    runtime: &mut JsRuntime,
    capability: &str,
    name: &'static str,
    source: &'static str,
) -> Result<(), InstallError> {
    runtime
        .execute_script(name, source)
        .map(|_| ())
        .map_err(|e| InstallError {
            capability: capability.to_string(),
            reason: e.to_string(),
        })
}

/// Install one capability's shim.
///
/// The shared pending-value guard is installed first (idempotently) so
/// the capabilities stay order-independent.
///
/// # Errors
///
/// Returns [`InstallError`] if the shim fails to execute.
pub fn install(runtime: &mut JsRuntime, capability: Capability) -> Result<(), InstallError> {
    run_shim(runtime, capability.name(), "[belfry:guard]", GUARD_SHIM)?;
    run_shim(
        runtime,
        capability.name(),
        capability.script_name(),
        capability.shim(),
    )
}

/// Bind the context, install all four capabilities, and seal the
/// global scope.
///
/// # Errors
///
/// Returns [`InstallError`] on the first failing step; the caller must
/// discard the sandbox (a partially-bridged scope is never executed).
pub fn install_all(runtime: &mut JsRuntime, ctx: &BridgeContext) -> Result<(), InstallError> {
    ctx.bind(runtime);
    for capability in Capability::ALL {
        install(runtime, capability)?;
    }
    run_shim(runtime, "seal", "[belfry:seal]", SEAL_SHIM)
}

const GUARD_SHIM: &str = r#"
(() => {
  if (globalThis.__belfryAssertSettled !== undefined) return;
  const isThenable = (v) =>
    v !== null &&
    (typeof v === 'object' || typeof v === 'function') &&
    typeof v.then === 'function';
  const assertSettled = (value, where) => {
    if (isThenable(value)) {
      throw new TypeError(where + ' does not accept a pending value; await it first');
    }
    return value;
  };
  Object.defineProperty(globalThis, '__belfryAssertSettled', {
    value: assertSettled,
    writable: false,
    configurable: false,
    enumerable: false,
  });
})();
"#;

const URI_SHIM: &str = r#"
((ops) => {
  const call = (op, value, component) => {
    const input = value === null || value === undefined ? '' : String(value);
    const out = JSON.parse(op(input, component));
    if (out.error !== undefined) throw new URIError(out.error);
    return out.ok;
  };
  globalThis.encodeURIComponent = (s) => call(ops.op_belfry_uri_encode, s, true);
  globalThis.encodeURI = (s) => call(ops.op_belfry_uri_encode, s, false);
  globalThis.decodeURIComponent = (s) => call(ops.op_belfry_uri_decode, s, true);
  globalThis.decodeURI = (s) => call(ops.op_belfry_uri_decode, s, false);
})(Deno.core.ops);
"#;

const SEARCH_PARAMS_SHIM: &str = r#"
((ops) => {
  const guard = (v, where) => globalThis.__belfryAssertSettled(v, where);
  const unwrap = (raw) => {
    const out = JSON.parse(raw);
    if (out.error !== undefined) throw new TypeError(out.error);
    return out.ok;
  };
  class URLSearchParams {
    constructor(init) {
      this._pairs = [];
      if (init === null || init === undefined) return;
      guard(init, 'URLSearchParams');
      if (typeof init === 'string') {
        this._pairs = unwrap(ops.op_belfry_query_parse(init));
        return;
      }
      if (Array.isArray(init) || typeof init[Symbol.iterator] === 'function') {
        for (const pair of init) {
          guard(pair, 'URLSearchParams');
          this.append(pair[0], pair[1]);
        }
        return;
      }
      if (typeof init === 'object') {
        for (const key of Object.keys(init)) {
          this.append(key, init[key]);
        }
        return;
      }
      throw new TypeError('Unsupported URLSearchParams initializer');
    }
    append(name, value) {
      guard(name, 'URLSearchParams.append');
      guard(value, 'URLSearchParams.append');
      this._pairs.push([String(name), String(value)]);
    }
    set(name, value) {
      guard(name, 'URLSearchParams.set');
      guard(value, 'URLSearchParams.set');
      const key = String(name);
      const idx = this._pairs.findIndex(([k]) => k === key);
      if (idx === -1) {
        this._pairs.push([key, String(value)]);
        return;
      }
      this._pairs[idx][1] = String(value);
      this._pairs = this._pairs.filter(([k], i) => k !== key || i === idx);
    }
    get(name) {
      const key = String(name);
      const hit = this._pairs.find(([k]) => k === key);
      return hit === undefined ? null : hit[1];
    }
    getAll(name) {
      const key = String(name);
      return this._pairs.filter(([k]) => k === key).map(([, v]) => v);
    }
    has(name) {
      const key = String(name);
      return this._pairs.some(([k]) => k === key);
    }
    delete(name) {
      const key = String(name);
      this._pairs = this._pairs.filter(([k]) => k !== key);
    }
    sort() {
      this._pairs = unwrap(ops.op_belfry_query_sort(JSON.stringify(this._pairs)));
    }
    toString() {
      return unwrap(ops.op_belfry_query_serialize(JSON.stringify(this._pairs)));
    }
    *entries() {
      for (const [k, v] of this._pairs) yield [k, v];
    }
    *keys() {
      for (const [k] of this._pairs) yield k;
    }
    *values() {
      for (const [, v] of this._pairs) yield v;
    }
    [Symbol.iterator]() {
      return this.entries();
    }
    forEach(callback, thisArg) {
      for (const [k, v] of this._pairs) callback.call(thisArg, v, k, this);
    }
  }
  globalThis.URLSearchParams = URLSearchParams;
})(Deno.core.ops);
"#;

const CONSOLE_SHIM: &str = r#"
((ops) => {
  const snapshot = (value) => {
    globalThis.__belfryAssertSettled(value, 'console');
    if (value === undefined) return null;
    const text = JSON.stringify(value);
    if (text === undefined) return String(value);
    return JSON.parse(text);
  };
  const forward = (level) => (...args) => {
    ops.op_belfry_console(level, JSON.stringify(args.map(snapshot)));
  };
  globalThis.console = {
    log: forward('log'),
    warn: forward('warn'),
    error: forward('error'),
  };
})(Deno.core.ops);
"#;

const FETCH_SHIM: &str = r#"
((ops) => {
  globalThis.fetch = async function fetch(url, opt) {
    globalThis.__belfryAssertSettled(url, 'fetch');
    const o = opt || {};
    globalThis.__belfryAssertSettled(o, 'fetch');
    const request = {
      url: String(url),
      method: o.method === undefined ? 'GET' : String(o.method),
      headers: {},
      body: o.body === undefined || o.body === null ? null : String(o.body),
    };
    if (o.headers) {
      for (const key of Object.keys(o.headers)) {
        globalThis.__belfryAssertSettled(o.headers[key], 'fetch');
        request.headers[String(key)] = String(o.headers[key]);
      }
    }
    const record = JSON.parse(await ops.op_belfry_fetch(JSON.stringify(request)));
    if (record.error !== undefined) {
      return { ok: false, error: record.error };
    }
    return {
      ok: record.ok,
      status: record.status,
      statusText: record.statusText,
      headers: new Map(Object.entries(record.headers || {})),
      text: async () => record.bodyText,
      json: async () => {
        try {
          return JSON.parse(record.bodyText);
        } catch (e) {
          throw new Error('Invalid JSON response: ' + e.message);
        }
      },
    };
  };
})(Deno.core.ops);
"#;

const SEAL_SHIM: &str = r#"
((ops) => {
  globalThis.global = globalThis;
  Object.defineProperty(globalThis, '__belfrySetResult', {
    value: (json) => ops.op_belfry_set_result(String(json)),
    writable: false,
    configurable: false,
    enumerable: false,
  });
  delete globalThis.Deno;
  delete globalThis.eval;
  const AsyncFunction = (async function () {}).constructor;
  const GeneratorFunction = (function* () {}).constructor;
  for (const proto of [Function.prototype, AsyncFunction.prototype, GeneratorFunction.prototype]) {
    Object.defineProperty(proto, 'constructor', {
      value: undefined,
      configurable: false,
      writable: false,
    });
  }
})(Deno.core.ops);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::UriCodec.name(), "uri-codec");
        assert_eq!(Capability::Fetch.name(), "fetch");
        assert_eq!(Capability::ALL.len(), 4);
    }

    #[test]
    fn test_install_error_display() {
        let err = InstallError {
            capability: "fetch".to_string(),
            reason: "engine said no".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to install fetch capability: engine said no"
        );
    }

    #[test]
    fn test_shims_reference_their_ops() {
        assert!(URI_SHIM.contains("op_belfry_uri_encode"));
        assert!(SEARCH_PARAMS_SHIM.contains("op_belfry_query_parse"));
        assert!(CONSOLE_SHIM.contains("op_belfry_console"));
        assert!(FETCH_SHIM.contains("op_belfry_fetch"));
        assert!(SEAL_SHIM.contains("op_belfry_set_result"));
    }

    #[test]
    fn test_seal_removes_engine_surface() {
        assert!(SEAL_SHIM.contains("delete globalThis.Deno"));
        assert!(SEAL_SHIM.contains("delete globalThis.eval"));
    }
}
