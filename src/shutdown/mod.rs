//! Shutdown coordination
//!
//! A single-consumer state machine that tracks live connection handlers
//! and decides when the process may exit:
//!
//! ```text
//! Running ──Graceful──▶ Draining ──count reaches 0──▶ Terminated
//!    │                     │
//!    │                     └──Immediate / 2nd Graceful──▶ Terminated
//!    └──Immediate─────────────────────────────────────▶ Terminated
//! ```
//!
//! Handler start/stop events and termination requests all funnel through
//! one channel, and the consuming loop is the only owner of the active
//! count and the state, so neither needs a lock. The first graceful
//! request closes the listeners but lets in-flight relays finish; a
//! second request of either kind terminates regardless, so a stuck
//! handler can never wedge shutdown. Listeners are closed synchronously
//! with the transition out of `Running`, so no accept can land afterwards.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::ListenerHandle;

/// Termination request flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownKind {
    /// Stop intake, let in-flight handlers finish.
    Graceful,
    /// Stop now, abandoning in-flight handlers.
    Immediate,
}

/// Coordinator lifecycle state. There is no transition out of
/// `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Terminated,
}

/// Events consumed by the coordinator loop.
#[derive(Debug)]
pub enum Event {
    HandlerStarted,
    HandlerStopped,
    Shutdown(ShutdownKind),
}

/// Cloneable producer handle for coordinator events.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    /// Emit handler-started now and return a guard that emits the
    /// matching handler-stopped exactly once when dropped. The started
    /// event therefore always precedes its stopped event in the
    /// coordinator's observed order.
    pub fn handler_started(&self) -> HandlerGuard {
        let _ = self.tx.send(Event::HandlerStarted);
        HandlerGuard {
            tx: self.tx.clone(),
        }
    }

    /// Request shutdown.
    pub fn request_shutdown(&self, kind: ShutdownKind) {
        let _ = self.tx.send(Event::Shutdown(kind));
    }
}

/// RAII pairing of handler start/stop events.
#[derive(Debug)]
pub struct HandlerGuard {
    tx: mpsc::UnboundedSender<Event>,
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Event::HandlerStopped);
    }
}

/// Terminal report from a coordinator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// Handlers still mid-flight when the coordinator terminated.
    pub abandoned_handlers: usize,
}

impl ShutdownSummary {
    /// Whether the coordinator terminated with no handler mid-flight.
    pub fn drained(&self) -> bool {
        self.abandoned_handlers == 0
    }
}

/// Aggregates handler events and termination requests into the shutdown
/// decision. Single consumer: see the module docs.
pub struct Coordinator {
    events: mpsc::UnboundedReceiver<Event>,
    listeners: Vec<ListenerHandle>,
    state: ShutdownState,
    active_handlers: usize,
}

impl Coordinator {
    /// Create a coordinator and the producer handle feeding it.
    pub fn new() -> (Self, EventSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                events: rx,
                listeners: Vec::new(),
                state: ShutdownState::Running,
                active_handlers: 0,
            },
            EventSender { tx },
        )
    }

    /// Take ownership of a listener, to be closed when the coordinator
    /// leaves `Running`.
    pub fn register_listener(&mut self, listener: ListenerHandle) {
        self.listeners.push(listener);
    }

    /// Current state. Only observable between construction and
    /// [`Coordinator::run`], which consumes the coordinator.
    pub fn state(&self) -> ShutdownState {
        self.state
    }

    async fn close_listeners(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.close().await;
        }
    }

    /// Consume events until terminated.
    ///
    /// Returns once the process may exit: immediately on an immediate
    /// request, after the active count reaches zero on a graceful one,
    /// or on a second request of either kind while draining.
    pub async fn run(mut self) -> ShutdownSummary {
        // Running: track handler deltas until the first termination
        // request arrives.
        let kind = loop {
            match self.events.recv().await {
                Some(Event::HandlerStarted) => self.active_handlers += 1,
                Some(Event::HandlerStopped) => self.active_handlers -= 1,
                Some(Event::Shutdown(kind)) => break kind,
                // Every producer is gone; nothing can start a handler or
                // request shutdown anymore.
                None => break ShutdownKind::Immediate,
            }
        };

        // Intake stops with the transition out of Running.
        self.close_listeners().await;

        if kind == ShutdownKind::Immediate {
            self.state = ShutdownState::Terminated;
            info!(
                abandoned = self.active_handlers,
                "immediate shutdown"
            );
            return ShutdownSummary {
                abandoned_handlers: self.active_handlers,
            };
        }

        self.state = ShutdownState::Draining;
        info!(active = self.active_handlers, "draining");

        while self.active_handlers > 0 {
            match self.events.recv().await {
                Some(Event::HandlerStarted) => self.active_handlers += 1,
                Some(Event::HandlerStopped) => {
                    self.active_handlers -= 1;
                    debug!(active = self.active_handlers, "handler drained");
                }
                Some(Event::Shutdown(_)) => {
                    // The operator is done waiting; terminate regardless
                    // of what is still in flight.
                    warn!(abandoned = self.active_handlers, "drain cut short");
                    self.state = ShutdownState::Terminated;
                    return ShutdownSummary {
                        abandoned_handlers: self.active_handlers,
                    };
                }
                None => break,
            }
        }

        self.state = ShutdownState::Terminated;
        info!("drain complete");
        ShutdownSummary {
            abandoned_handlers: 0,
        }
    }
}
