//! The invocation pipeline.
//!
//! Isolates are not `Send`, so each invocation runs on a dedicated
//! thread with its own current-thread async runtime; the caller awaits
//! the outcome over a oneshot channel. The sandbox never leaves that
//! thread and is dropped there, success or failure.

use crate::config::InvokerConfig;
use crate::phase::InvokePhase;
use crate::script::build_call_script;
use belfry_bridge::{
    install_all, BridgeContext, BridgeSettings, FetchBackend, InvocationDeadline, LogSink,
};
use belfry_core::{
    ErrorDescriptor, InvocationRequest, InvocationResponse, InvokeError, LogEntry,
};
use belfry_sandbox::{Sandbox, SandboxError, SandboxFactory, SandboxLimits};
use belfry_store::{ArtifactKey, ArtifactStore, StoreError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Executes invocation requests end to end.
pub struct Invoker {
    factory: Arc<dyn SandboxFactory>,
    store: Arc<dyn ArtifactStore>,
    fetch: Arc<dyn FetchBackend>,
    config: InvokerConfig,
}

impl Invoker {
    /// Assemble the pipeline from its seams.
    #[must_use]
    pub fn new(
        factory: Arc<dyn SandboxFactory>,
        store: Arc<dyn ArtifactStore>,
        fetch: Arc<dyn FetchBackend>,
        config: InvokerConfig,
    ) -> Self {
        Self {
            factory,
            store,
            fetch,
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Run one invocation to completion.
    ///
    /// Debug-mode guest failures come back as `Ok` soft responses with
    /// the captured logs; everything else that goes wrong after
    /// validation maps to the normalized error taxonomy.
    ///
    /// # Errors
    ///
    /// Validation failures are returned before any sandbox exists.
    pub async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationResponse, InvokeError> {
        tracing::debug!(phase = %InvokePhase::Validating, function = %request.function_name, "invocation started");
        request.validate()?;

        let factory = self.factory.clone();
        let store = self.store.clone();
        let fetch = self.fetch.clone();
        let config = self.config.clone();
        let debug = request.debug;

        let (tx, rx) = tokio::sync::oneshot::channel();
        std::thread::Builder::new()
            .name("belfry-invoke".to_string())
            .spawn(move || {
                let outcome = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt.block_on(run_pipeline(factory, store, fetch, config, request)),
                    Err(e) => (
                        Err(InvokeError::Internal {
                            message: format!("invocation runtime: {}", e),
                        }),
                        Vec::new(),
                    ),
                };
                let _ = tx.send(outcome);
            })
            .map_err(|e| InvokeError::Internal {
                message: format!("invocation thread: {}", e),
            })?;

        let (result, logs) = rx.await.map_err(|_| InvokeError::Internal {
            message: "invocation thread dropped its result".to_string(),
        })?;

        match result {
            Ok(value) => {
                tracing::debug!(phase = %InvokePhase::Succeeded, "invocation finished");
                Ok(InvocationResponse::success(value, logs))
            }
            Err(err) => {
                let terminal = if matches!(err, InvokeError::TimedOut { .. }) {
                    InvokePhase::TimedOut
                } else {
                    InvokePhase::Failed
                };
                tracing::debug!(phase = %terminal, error = %err.detail(), "invocation finished");
                if debug && !err.is_validation() {
                    Ok(InvocationResponse::soft_failure(
                        logs,
                        ErrorDescriptor::from_error(&err),
                    ))
                } else {
                    Err(err)
                }
            }
        }
    }
}

async fn run_pipeline(
    factory: Arc<dyn SandboxFactory>,
    store: Arc<dyn ArtifactStore>,
    fetch: Arc<dyn FetchBackend>,
    config: InvokerConfig,
    request: InvocationRequest,
) -> (Result<Value, InvokeError>, Vec<LogEntry>) {
    let sink = LogSink::new();
    let deadline = InvocationDeadline(Instant::now() + config.timeout);

    let limits = SandboxLimits::new()
        .with_memory_ceiling_bytes(config.memory_ceiling_bytes)
        .with_debugging_enabled(request.debug);
    let mut sandbox = match factory.create(&limits) {
        Ok(sandbox) => sandbox,
        Err(e) => {
            // The engine could not allocate an arena under the ceiling.
            tracing::warn!(error = %e, "sandbox acquisition failed");
            return (
                Err(InvokeError::ResourceExhausted {
                    ceiling_bytes: config.memory_ceiling_bytes,
                }),
                sink.take(),
            );
        }
    };
    tracing::trace!(phase = %InvokePhase::SandboxAcquired, "phase");

    let ctx = BridgeContext {
        sink: sink.clone(),
        settings: BridgeSettings {
            debug: request.debug,
            dev_mirror: config.dev_mirror_logs,
        },
        fetch,
        deadline,
    };

    let result = drive(&mut sandbox, &store, &ctx, &config, &request, deadline).await;
    drop(sandbox);
    tracing::trace!(phase = %InvokePhase::Released, "phase");

    (result, sink.take())
}

async fn drive(
    sandbox: &mut Sandbox,
    store: &Arc<dyn ArtifactStore>,
    ctx: &BridgeContext,
    config: &InvokerConfig,
    request: &InvocationRequest,
    deadline: InvocationDeadline,
) -> Result<Value, InvokeError> {
    install_all(sandbox.runtime_mut(), ctx).map_err(|e| InvokeError::BridgeInstallFailed {
        capability: e.capability,
        reason: e.reason,
    })?;
    tracing::trace!(phase = %InvokePhase::BridgeInstalled, "phase");

    let key = ArtifactKey::new(request.tenant_id.clone(), request.file_id.clone());
    let artifact = store.read(&key).await.map_err(|e| match e {
        StoreError::NotFound { .. } => InvokeError::BundleNotFound {
            tenant: request.tenant_id.to_string(),
            file: request.file_id.to_string(),
        },
        other => InvokeError::Internal {
            message: other.to_string(),
        },
    })?;
    tracing::trace!(phase = %InvokePhase::BundleLoaded, bytes = artifact.len(), "phase");

    sandbox
        .eval("[belfry:bundle]", artifact.source, deadline.remaining())
        .await
        .map_err(|e| map_sandbox_error(e, config))?;
    tracing::trace!(phase = %InvokePhase::BundleExecuted, "phase");

    let script = build_call_script(&config.namespace, request)?;
    sandbox
        .eval("[belfry:invoke]", script, deadline.remaining())
        .await
        .map_err(|e| map_sandbox_error(e, config))?;
    tracing::trace!(phase = %InvokePhase::FunctionInvoked, "phase");

    let raw = sandbox.take_result().ok_or_else(|| InvokeError::Internal {
        message: "no result recorded".to_string(),
    })?;
    if raw.len() > config.max_result_bytes {
        return Err(InvokeError::RuntimeError {
            message: format!(
                "Result too large: {} bytes (limit: {})",
                raw.len(),
                config.max_result_bytes
            ),
        });
    }
    parse_result_envelope(&raw)
}

fn map_sandbox_error(err: SandboxError, config: &InvokerConfig) -> InvokeError {
    match err {
        SandboxError::TimedOut { .. } => InvokeError::TimedOut {
            timeout_ms: config.timeout.as_millis() as u64,
        },
        SandboxError::MemoryExceeded { ceiling_bytes } => {
            InvokeError::ResourceExhausted { ceiling_bytes }
        }
        SandboxError::Js(message) => InvokeError::RuntimeError { message },
        SandboxError::Create(message) => InvokeError::Internal { message },
    }
}

fn parse_result_envelope(raw: &str) -> Result<Value, InvokeError> {
    let envelope: Value = serde_json::from_str(raw).map_err(|e| InvokeError::Internal {
        message: format!("malformed result envelope: {}", e),
    })?;
    if let Some(err) = envelope.get("error") {
        let kind = err.get("kind").and_then(Value::as_str).unwrap_or("runtime");
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(match kind {
            "function_not_found" => InvokeError::FunctionNotFound { name: message },
            _ => InvokeError::RuntimeError { message },
        });
    }
    Ok(envelope.get("ok").cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_envelope() {
        assert_eq!(
            parse_result_envelope(r#"{"ok": 5}"#).unwrap(),
            serde_json::json!(5)
        );
    }

    #[test]
    fn test_parse_runtime_error_envelope() {
        let err =
            parse_result_envelope(r#"{"error":{"kind":"runtime","message":"boom"}}"#).unwrap_err();
        assert_eq!(
            err,
            InvokeError::RuntimeError {
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_parse_missing_function_envelope() {
        let err = parse_result_envelope(
            r#"{"error":{"kind":"function_not_found","message":"frobnicate"}}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            InvokeError::FunctionNotFound {
                name: "frobnicate".to_string()
            }
        );
    }

    #[test]
    fn test_sandbox_error_mapping() {
        let config = InvokerConfig::default();
        assert!(matches!(
            map_sandbox_error(SandboxError::TimedOut { timeout_ms: 10 }, &config),
            InvokeError::TimedOut { timeout_ms: 30_000 }
        ));
        assert!(matches!(
            map_sandbox_error(
                SandboxError::MemoryExceeded {
                    ceiling_bytes: 1024
                },
                &config
            ),
            InvokeError::ResourceExhausted {
                ceiling_bytes: 1024
            }
        ));
    }
}
