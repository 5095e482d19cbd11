//! Owned engine resources

use super::{Engine, RawHandle};
use std::fmt;
use std::sync::{Arc, Weak};

/// An engine resource freed exactly once, when the handle is dropped
///
/// The handle holds only a weak reference to its engine. If the engine is
/// gone or shut down by the time the handle drops, the free is skipped with
/// a warning instead of failing.
pub struct EngineHandle {
    raw: RawHandle,
    engine: Weak<dyn Engine>,
}

impl EngineHandle {
    /// Take ownership of `raw`, created by `engine`
    pub fn new(raw: RawHandle, engine: &Arc<dyn Engine>) -> Self {
        Self {
            raw,
            engine: Arc::downgrade(engine),
        }
    }

    /// The raw handle
    #[inline]
    pub fn raw(&self) -> RawHandle {
        self.raw
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        match self.engine.upgrade() {
            Some(engine) if !engine.is_shut_down() => engine.free(self.raw),
            Some(engine) => log::warn!(
                "skipping free of handle {}: {} engine is shut down",
                self.raw,
                engine.name()
            ),
            None => log::warn!("skipping free of handle {}: engine was dropped", self.raw),
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("raw", &self.raw)
            .field("engine_alive", &(self.engine.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::CpuEngine;

    #[test]
    fn test_handle_frees_once_on_drop() {
        let cpu = Arc::new(CpuEngine::new());
        let engine: Arc<dyn Engine> = cpu.clone();
        let raw = engine
            .new_descriptor(Default::default(), &[("nthreads".into(), 2i64.into())])
            .unwrap();
        assert_eq!(cpu.live_handles(), 1);
        let handle = EngineHandle::new(raw, &engine);
        assert_eq!(handle.raw(), raw);
        drop(handle);
        assert_eq!(cpu.live_handles(), 0);
        assert_eq!(cpu.frees(), 1);
    }

    #[test]
    fn test_free_skipped_after_shutdown() {
        let cpu = Arc::new(CpuEngine::new());
        let engine: Arc<dyn Engine> = cpu.clone();
        let raw = engine.new_descriptor(Default::default(), &[]).unwrap();
        let handle = EngineHandle::new(raw, &engine);
        cpu.shutdown();
        drop(handle);
        assert_eq!(cpu.frees(), 0);
    }

    #[test]
    fn test_free_skipped_after_engine_dropped() {
        let engine: Arc<dyn Engine> = Arc::new(CpuEngine::new());
        let raw = engine.new_descriptor(Default::default(), &[]).unwrap();
        let handle = EngineHandle::new(raw, &engine);
        drop(engine);
        drop(handle);
    }
}
