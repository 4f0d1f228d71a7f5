//! Builds the invocation wrapper script.
//!
//! Caller data never appears as code: the function name, params, and
//! customer context travel as one JSON document embedded as a string
//! literal, parsed inside the sandbox, and the export is reached by
//! property lookup. The validated identifier grammar is a second
//! fence, not the mechanism.

use belfry_core::{InvocationRequest, InvokeError};
use serde_json::json;

/// Render the wrapper that calls the named export and records the
/// outcome through `__belfrySetResult`.
///
/// # Errors
///
/// Returns `Internal` if the call envelope cannot be serialized.
pub fn build_call_script(namespace: &str, request: &InvocationRequest) -> Result<String, InvokeError> {
    let call = json!({
        "name": request.function_name,
        "params": request.params,
        "customer": request.customer,
    });
    let call_json = serde_json::to_string(&call).map_err(|e| InvokeError::Internal {
        message: format!("call envelope serialization failed: {}", e),
    })?;
    // Second encoding turns the document into a JS string literal.
    let call_literal = serde_json::to_string(&call_json).map_err(|e| InvokeError::Internal {
        message: format!("call envelope serialization failed: {}", e),
    })?;
    let ns_literal = serde_json::to_string(namespace).map_err(|e| InvokeError::Internal {
        message: format!("namespace serialization failed: {}", e),
    })?;

    Ok(format!(
        r#"(async () => {{
  const call = JSON.parse({call_literal});
  const ns = globalThis[{ns_literal}];
  const fail = (kind, message) =>
    __belfrySetResult(JSON.stringify({{ error: {{ kind: kind, message: message }} }}));
  try {{
    if (ns === undefined || ns === null) {{
      fail('function_not_found', call.name);
      return;
    }}
    const fn = ns[call.name];
    if (typeof fn !== 'function') {{
      fail('function_not_found', call.name);
      return;
    }}
    const value = await fn({{ params: call.params, customer: call.customer }});
    __belfrySetResult(JSON.stringify({{ ok: value === undefined ? null : value }}));
  }} catch (e) {{
    const message =
      e === null || e === undefined
        ? 'unknown error'
        : e.message === undefined
          ? String(e)
          : String(e.message);
    fail('runtime', message);
  }}
}})();"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use belfry_core::{FileId, TenantId};
    use serde_json::json;

    fn make_request(name: &str, params: serde_json::Value) -> InvocationRequest {
        InvocationRequest::new(
            TenantId::parse("acme").unwrap(),
            FileId::parse("checkout").unwrap(),
            name,
            params,
        )
    }

    #[test]
    fn test_call_travels_as_data() {
        let script =
            build_call_script("MyModule", &make_request("add", json!({"a": 2}))).unwrap();
        assert!(script.contains("JSON.parse("));
        assert!(script.contains("ns[call.name]"));
        // The name appears only inside the JSON string literal.
        assert!(!script.contains("MyModule.add"));
    }

    #[test]
    fn test_export_receives_one_envelope_argument() {
        let script =
            build_call_script("MyModule", &make_request("add", json!({"a": 2}))).unwrap();
        assert!(script.contains("await fn({ params: call.params, customer: call.customer })"));
    }

    #[test]
    fn test_hostile_params_stay_inert() {
        let params = json!({"payload": "\"; process.exit(); //"});
        let script = build_call_script("MyModule", &make_request("add", params.clone())).unwrap();
        // The whole payload appears only as one escaped string literal.
        let call = json!({"name": "add", "params": params, "customer": null});
        let literal =
            serde_json::to_string(&serde_json::to_string(&call).unwrap()).unwrap();
        assert!(script.contains(&literal));
    }

    #[test]
    fn test_namespace_rendered_as_literal() {
        let script = build_call_script("Functions", &make_request("go", json!({}))).unwrap();
        assert!(script.contains(r#"globalThis["Functions"]"#));
    }
}
