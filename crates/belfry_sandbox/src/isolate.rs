//! One sandbox = one V8 isolate with the capability bridge installed
//! by the caller and two hard bounds enforced here.
//!
//! Memory: the isolate is created with a heap ceiling; a near-heap-limit
//! callback terminates execution and grants a small grace allocation so
//! the engine can unwind instead of aborting the process.
//!
//! Time: synchronous guest code blocks the thread, so an async timeout
//! alone cannot interrupt it. Every evaluation arms a watchdog thread
//! that terminates execution from outside once the budget elapses; the
//! async event-loop pump is additionally raced against the same budget.

use crate::limits::SandboxLimits;
use belfry_bridge::{bridge_extension, ResultCell};
use deno_core::{v8, JsRuntime, PollEventLoopOptions, RuntimeOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// Extra heap granted after the ceiling trips, so termination can
/// unwind without the process aborting on a failed allocation.
const HEAP_GRACE_BYTES: usize = 1024 * 1024;

/// Sandbox-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    /// The isolate could not be created.
    #[error("sandbox creation failed: {0}")]
    Create(String),
    /// Guest execution exceeded the heap ceiling.
    #[error("memory ceiling exceeded ({ceiling_bytes} bytes)")]
    MemoryExceeded {
        /// The configured ceiling.
        ceiling_bytes: u64,
    },
    /// Guest execution exceeded its wall-clock budget.
    #[error("execution timed out after {timeout_ms}ms")]
    TimedOut {
        /// The budget that elapsed.
        timeout_ms: u64,
    },
    /// The guest threw or the script failed to evaluate.
    #[error("{0}")]
    Js(String),
}

/// A single-use JavaScript sandbox. Dropping it releases the isolate
/// and everything inside it.
pub struct Sandbox {
    runtime: JsRuntime,
    handle: v8::IsolateHandle,
    heap_tripped: Arc<AtomicBool>,
    limits: SandboxLimits,
}

impl Sandbox {
    /// Create an isolate with the bridge ops registered and the heap
    /// ceiling armed.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Create`] if the limits are unusable.
    pub fn new(limits: &SandboxLimits) -> Result<Self, SandboxError> {
        if limits.memory_ceiling_bytes == 0 {
            return Err(SandboxError::Create(
                "memory ceiling must be non-zero".to_string(),
            ));
        }
        let ceiling = usize::try_from(limits.memory_ceiling_bytes)
            .map_err(|_| SandboxError::Create("memory ceiling exceeds usize".to_string()))?;

        let mut runtime = JsRuntime::new(RuntimeOptions {
            extensions: vec![bridge_extension()],
            create_params: Some(v8::CreateParams::default().heap_limits(0, ceiling)),
            ..Default::default()
        });

        let handle = runtime.v8_isolate().thread_safe_handle();
        let heap_tripped = Arc::new(AtomicBool::new(false));
        let tripped = heap_tripped.clone();
        let heap_handle = handle.clone();
        runtime.add_near_heap_limit_callback(move |current, _initial| {
            tripped.store(true, Ordering::SeqCst);
            heap_handle.terminate_execution();
            current + HEAP_GRACE_BYTES
        });

        tracing::trace!(ceiling_bytes = limits.memory_ceiling_bytes, "sandbox created");
        Ok(Self {
            runtime,
            handle,
            heap_tripped,
            limits: *limits,
        })
    }

    /// The limits this sandbox was created with.
    #[must_use]
    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Direct access to the underlying runtime, for bridge installation.
    pub fn runtime_mut(&mut self) -> &mut JsRuntime {
        &mut self.runtime
    }

    /// Evaluate a script and pump its event loop, both under `budget`.
    ///
    /// # Errors
    ///
    /// [`SandboxError::MemoryExceeded`] if the heap ceiling tripped,
    /// [`SandboxError::TimedOut`] if the budget elapsed, and
    /// [`SandboxError::Js`] for guest throws or evaluation failures.
    pub async fn eval(
        &mut self,
        name: &'static str,
        code: String,
        budget: Duration,
    ) -> Result<(), SandboxError> {
        let wall_tripped = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let watchdog_handle = self.handle.clone();
        let watchdog_tripped = wall_tripped.clone();
        let watchdog = std::thread::spawn(move || {
            if done_rx.recv_timeout(budget).is_err() {
                watchdog_tripped.store(true, Ordering::SeqCst);
                watchdog_handle.terminate_execution();
            }
        });

        let outcome = match self.runtime.execute_script(name, code) {
            Err(e) => Err(Some(e.to_string())),
            Ok(_) => {
                let pump = self
                    .runtime
                    .run_event_loop(PollEventLoopOptions::default());
                match tokio::time::timeout(budget, pump).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(Some(e.to_string())),
                    Err(_) => {
                        self.handle.terminate_execution();
                        Err(None)
                    }
                }
            }
        };

        // Stop the watchdog before interpreting the outcome; if it is
        // mid-fire we must see its flag.
        let _ = done_tx.send(());
        let _ = watchdog.join();

        match outcome {
            Ok(()) => {
                if self.heap_tripped.load(Ordering::SeqCst) {
                    return Err(SandboxError::MemoryExceeded {
                        ceiling_bytes: self.limits.memory_ceiling_bytes,
                    });
                }
                Ok(())
            }
            Err(detail) => {
                if self.heap_tripped.load(Ordering::SeqCst) {
                    Err(SandboxError::MemoryExceeded {
                        ceiling_bytes: self.limits.memory_ceiling_bytes,
                    })
                } else if wall_tripped.load(Ordering::SeqCst) || detail.is_none() {
                    Err(SandboxError::TimedOut {
                        timeout_ms: budget.as_millis() as u64,
                    })
                } else {
                    Err(SandboxError::Js(detail.unwrap_or_default()))
                }
            }
        }
    }

    /// Take the serialized result stored by the guest, if any.
    pub fn take_result(&mut self) -> Option<String> {
        let state = self.runtime.op_state();
        let mut state = state.borrow_mut();
        state.borrow_mut::<ResultCell>().take()
    }
}
