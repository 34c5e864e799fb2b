//! Asynchronous front-end for the matching engine.
//!
//! Decouples event ingestion from matching with a bounded SPSC ring: the
//! caller is the single producer, one background worker owns the engine
//! and applies events strictly FIFO. Symbols are resolved to ids on the
//! producer side, so only fixed-layout [`InternalEvent`] records cross the
//! queue and the worker never touches string storage for dispatch.
//!
//! Shutdown is cooperative: [`stop`](AsyncMatchingEngine::stop) flips the
//! running flag, enqueues a distinguished Stop sentinel behind all
//! accepted events, and joins the worker. The sentinel is the only thing
//! that terminates the loop, so everything accepted before it is applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error};

use flint_core::{
    Event, EventType, InternalEvent, MatchingEngine, SymbolIndex, Trade,
};
use flint_ring::{ring, Producer, DEFAULT_CAPACITY};

pub struct AsyncMatchingEngine {
    producer: Producer<InternalEvent>,
    symbols: Arc<SymbolIndex>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<MatchingEngine>>,
    /// The engine comes back here once the worker has been joined.
    engine: Option<MatchingEngine>,
}

impl AsyncMatchingEngine {
    /// Spawn a worker around a fresh engine with the default queue size.
    pub fn new(callback: impl FnMut(&Trade) + Send + 'static) -> Self {
        Self::with_engine(MatchingEngine::new(callback), DEFAULT_CAPACITY)
    }

    /// Spawn a worker around an existing engine (position limits and the
    /// like are configured on the engine first).
    pub fn with_engine(engine: MatchingEngine, queue_capacity: usize) -> Self {
        let symbols = engine.symbols();
        let (producer, mut consumer) = ring::<InternalEvent>(queue_capacity);
        let running = Arc::new(AtomicBool::new(true));

        let worker = thread::Builder::new()
            .name("flint-matcher".into())
            .spawn(move || {
                debug!("matcher worker started");
                let mut engine = engine;
                loop {
                    match consumer.try_consume() {
                        Some(event) => {
                            if event.kind == EventType::Stop {
                                break;
                            }
                            engine.process_internal(event);
                        }
                        None => thread::yield_now(),
                    }
                }
                debug!("matcher worker stopped");
                engine
            })
            .expect("failed to spawn matcher worker");

        Self {
            producer,
            symbols,
            running,
            worker: Some(worker),
            engine: None,
        }
    }

    /// Submit an external event. The symbol is resolved here, on the
    /// producer side; the call spins with cooperative yielding while the
    /// queue is full, so no event is ever dropped.
    pub fn submit(&mut self, event: &Event) {
        let symbol = self.symbols.get_or_create(&event.symbol);
        self.submit_internal(InternalEvent::resolve(event, symbol));
    }

    /// Submit a pre-resolved event. Zero allocation.
    pub fn submit_internal(&mut self, event: InternalEvent) {
        if self.worker.is_none() {
            // Stopped: nobody will ever drain the queue again.
            return;
        }
        while !self.producer.try_publish(event) {
            thread::yield_now();
        }
    }

    /// Stop the worker. Idempotent. On return every previously accepted
    /// event has been applied and the engine is available through
    /// [`engine`](Self::engine) / [`into_engine`](Self::into_engine).
    pub fn stop(&mut self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        while !self.producer.try_publish(InternalEvent::stop()) {
            thread::yield_now();
        }
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(engine) => self.engine = Some(engine),
                Err(_) => error!("matcher worker panicked"),
            }
        }
    }

    /// Shared symbol index (producer-side resolution).
    pub fn symbols(&self) -> &Arc<SymbolIndex> {
        &self.symbols
    }

    /// Whether `stop` has not been called yet.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The engine, once the worker has been stopped and joined.
    pub fn engine(&self) -> Option<&MatchingEngine> {
        self.engine.as_ref()
    }

    /// Stop and take the engine back for synchronous use or inspection.
    /// `None` only if the worker panicked.
    pub fn into_engine(mut self) -> Option<MatchingEngine> {
        self.stop();
        self.engine.take()
    }
}

impl Drop for AsyncMatchingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
