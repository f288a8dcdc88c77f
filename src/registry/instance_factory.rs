//! Per-definition instance holders.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

use crate::definition::Definition;
use crate::error::{ConcurrentCreationFailed, DiError, DiResult};
use crate::internal::circular::{circular_error, ResolutionFrame};
use crate::internal::panic_message;
use crate::key::TypeKey;
use crate::kind::Kind;
use crate::registry::AnyArc;
use crate::scope::ResolutionContext;

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

enum SlotState {
    Empty,
    Creating { owner: ThreadId, attempt: u64 },
    Ready(AnyArc),
    Disposed,
}

struct Slot {
    state: SlotState,
    attempts: u64,
    last_failure: Option<(u64, String)>,
}

/// Construction slot of a Single: at most one builder runs at a time.
struct SingleCell {
    slot: Mutex<Slot>,
    ready: Condvar,
}

/// Materialises instances for one definition inside one scope.
///
/// A Factory definition gets a stateless holder. A Single definition gets a
/// slot moving through `empty -> creating -> ready -> disposed`; a failed
/// construction returns the slot to `empty` so a later request retries.
///
/// # Deadlocks
///
/// Other threads asking for a Single under construction block until the
/// builder finishes. Re-entry from the building thread is reported as
/// `CircularDependency`, but a cycle spread over threads is not detected:
/// if thread 1 builds Single `X` (which needs `Y`) while thread 2 builds
/// Single `Y` (which needs `X`), each waits on the other forever. Keep
/// Single dependency graphs acyclic, or warm such Singles up from a single
/// thread with `create_at_start`.
pub struct InstanceFactory {
    id: u64,
    definition: Arc<Definition>,
    key: TypeKey,
    scope_id: Arc<str>,
    single: Option<SingleCell>,
}

impl InstanceFactory {
    pub(crate) fn new(definition: Arc<Definition>, scope_id: Arc<str>) -> Self {
        let single = match definition.kind() {
            Kind::Single => Some(SingleCell {
                slot: Mutex::new(Slot {
                    state: SlotState::Empty,
                    attempts: 0,
                    last_failure: None,
                }),
                ready: Condvar::new(),
            }),
            Kind::Factory => None,
        };
        Self {
            id: NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed),
            key: definition.primary_key(),
            definition,
            scope_id,
            single,
        }
    }

    /// Single factory whose value is already present.
    pub(crate) fn with_value(definition: Arc<Definition>, scope_id: Arc<str>, value: AnyArc) -> Self {
        let factory = Self::new(definition, scope_id);
        if let Some(cell) = &factory.single {
            cell.slot.lock().state = SlotState::Ready(value);
        }
        factory
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// True once a Single holds a value.
    pub fn is_created(&self) -> bool {
        self.cached().is_some()
    }

    pub(crate) fn cached(&self) -> Option<AnyArc> {
        let cell = self.single.as_ref()?;
        match &cell.slot.lock().state {
            SlotState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the cached value, or runs the builder.
    pub(crate) fn get(&self, ctx: &ResolutionContext<'_>) -> DiResult<AnyArc> {
        match &self.single {
            None => {
                let _frame = ResolutionFrame::enter(&self.key)?;
                self.build(ctx)
            }
            Some(cell) => self.get_single(cell, ctx),
        }
    }

    fn build(&self, ctx: &ResolutionContext<'_>) -> DiResult<AnyArc> {
        (self.definition.builder())(ctx).map_err(|e| DiError::from_build_error(&self.key, e))
    }

    fn get_single(&self, cell: &SingleCell, ctx: &ResolutionContext<'_>) -> DiResult<AnyArc> {
        let me = thread::current().id();
        let attempt = {
            let mut slot = cell.slot.lock();
            loop {
                let creating = match &slot.state {
                    SlotState::Ready(value) => return Ok(value.clone()),
                    SlotState::Disposed => return Err(self.closed()),
                    SlotState::Creating { owner, attempt } => Some((*owner, *attempt)),
                    SlotState::Empty => None,
                };
                match creating {
                    Some((owner, _)) if owner == me => return Err(circular_error(&self.key)),
                    Some((_, attempt)) => {
                        cell.ready.wait(&mut slot);
                        if let Some((failed, message)) = &slot.last_failure {
                            if *failed == attempt {
                                return Err(DiError::InstanceCreation {
                                    key: self.key.clone(),
                                    cause: Box::new(ConcurrentCreationFailed {
                                        attempt,
                                        message: message.clone(),
                                    }),
                                });
                            }
                        }
                    }
                    None => {
                        slot.attempts += 1;
                        let attempt = slot.attempts;
                        slot.state = SlotState::Creating { owner: me, attempt };
                        break attempt;
                    }
                }
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _frame = ResolutionFrame::enter(&self.key)?;
            self.build(ctx)
        }));

        let mut slot = cell.slot.lock();
        let disposed = matches!(slot.state, SlotState::Disposed);
        match outcome {
            Ok(Ok(value)) if disposed => {
                drop(slot);
                cell.ready.notify_all();
                debug!(key = %self.key, scope = %self.scope_id, "instance finished after its scope closed");
                self.run_on_close(&value);
                Err(self.closed())
            }
            Ok(Ok(value)) => {
                slot.state = SlotState::Ready(value.clone());
                drop(slot);
                cell.ready.notify_all();
                Ok(value)
            }
            Ok(Err(err)) => {
                if !disposed {
                    slot.state = SlotState::Empty;
                }
                slot.last_failure = Some((attempt, failure_message(&err)));
                drop(slot);
                cell.ready.notify_all();
                Err(err)
            }
            Err(payload) => {
                if !disposed {
                    slot.state = SlotState::Empty;
                }
                slot.last_failure = Some((attempt, format!("builder panicked: {}", panic_message(&*payload))));
                drop(slot);
                cell.ready.notify_all();
                panic::resume_unwind(payload)
            }
        }
    }

    /// Disposes a cached Single and runs its close hook. Idempotent.
    ///
    /// A Single still under construction is marked disposed; its builder's
    /// result is closed as soon as it arrives.
    pub(crate) fn drop_instance(&self) {
        let Some(cell) = &self.single else {
            return;
        };
        let previous = {
            let mut slot = cell.slot.lock();
            std::mem::replace(&mut slot.state, SlotState::Disposed)
        };
        cell.ready.notify_all();
        if let SlotState::Ready(value) = previous {
            self.run_on_close(&value);
        }
    }

    fn run_on_close(&self, value: &AnyArc) {
        let Some(hook) = self.definition.on_close() else {
            return;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(value))) {
            error!(
                key = %self.key,
                scope = %self.scope_id,
                "close hook panicked: {}",
                panic_message(&*payload)
            );
        }
    }

    fn closed(&self) -> DiError {
        DiError::ClosedScope {
            scope_id: self.scope_id.to_string(),
        }
    }
}

/// Display of `err` followed by every underlying cause.
fn failure_message(err: &DiError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl std::fmt::Debug for InstanceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceFactory")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("scope", &self.scope_id)
            .field("kind", &self.definition.kind())
            .field("created", &self.is_created())
            .finish()
    }
}
