//! CPU engine

use super::compute;
use crate::container::Sparse;
use crate::descriptor::{DescriptorFlags, OptionValue};
use crate::error::EngineErrorKind;
use crate::runtime::{Engine, EngineFailure, Invocation, RawHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

const AXB_METHODS: [&str; 5] = ["default", "gustavson", "hash", "saxpy", "dot"];

/// In-process reference engine
///
/// # Example
///
/// ```
/// use graphalg::runtime::{CpuEngine, Engine};
///
/// let engine = CpuEngine::new();
/// assert_eq!(engine.name(), "cpu");
/// assert!(engine.supports_descriptor_options());
/// ```
#[derive(Debug)]
pub struct CpuEngine {
    extensions: bool,
    max_entries: usize,
    shut_down: AtomicBool,
    next_handle: AtomicU64,
    frees: AtomicUsize,
    live: Mutex<HashMap<RawHandle, (DescriptorFlags, Vec<(String, OptionValue)>)>>,
}

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuEngine {
    /// Engine supporting extension descriptor options, without a size limit
    pub fn new() -> Self {
        Self {
            extensions: true,
            max_entries: usize::MAX,
            shut_down: AtomicBool::new(false),
            next_handle: AtomicU64::new(1),
            frees: AtomicUsize::new(0),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Engine rejecting every extension descriptor option
    pub fn without_extensions() -> Self {
        Self {
            extensions: false,
            ..Self::new()
        }
    }

    /// Fail with out-of-memory when a result would hold more than `limit` entries
    pub fn with_max_entries(mut self, limit: usize) -> Self {
        self.max_entries = limit;
        self
    }

    /// Stop accepting work; pending handle frees are skipped afterwards
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }

    /// Number of descriptor handles currently alive
    pub fn live_handles(&self) -> usize {
        self.live.lock().len()
    }

    /// Number of handles freed so far
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::Acquire)
    }

    /// Extension options recorded for a live handle
    pub fn handle_options(&self, handle: RawHandle) -> Option<Vec<(String, OptionValue)>> {
        self.live.lock().get(&handle).map(|(_, opts)| opts.clone())
    }

    fn check_option(name: &str, value: &OptionValue) -> Result<(), EngineFailure> {
        let ok = match (name, value) {
            ("nthreads", OptionValue::Int(n)) => *n >= 1,
            ("chunk", OptionValue::Int(n)) => *n > 0,
            ("axb_method", OptionValue::Str(s)) => AXB_METHODS.contains(&s.as_str()),
            ("sort", OptionValue::Bool(_)) => true,
            ("nthreads" | "chunk" | "axb_method" | "sort", _) => false,
            _ => {
                return Err(EngineFailure::new(
                    EngineErrorKind::InvalidValue,
                    format!("unknown descriptor option: {name}"),
                ))
            }
        };
        if ok {
            Ok(())
        } else {
            Err(EngineFailure::new(
                EngineErrorKind::InvalidValue,
                format!("invalid value for descriptor option {name}: {value}"),
            ))
        }
    }
}

impl Engine for CpuEngine {
    fn name(&self) -> &str {
        "cpu"
    }

    fn supports_descriptor_options(&self) -> bool {
        self.extensions
    }

    fn new_descriptor(
        &self,
        flags: DescriptorFlags,
        options: &[(String, OptionValue)],
    ) -> Result<RawHandle, EngineFailure> {
        if !self.extensions && !options.is_empty() {
            return Err(EngineFailure::new(
                EngineErrorKind::InvalidValue,
                "descriptor options are not supported",
            ));
        }
        for (name, value) in options {
            Self::check_option(name, value)?;
        }
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.live.lock().insert(raw, (flags, options.to_vec()));
        Ok(raw)
    }

    fn invoke(&self, call: &Invocation<'_>) -> Result<Sparse, EngineFailure> {
        if self.is_shut_down() {
            return Err(EngineFailure::new(EngineErrorKind::Other, "engine is shut down"));
        }
        let limit = self.max_entries;
        match panic::catch_unwind(AssertUnwindSafe(|| compute::execute(call, limit))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "kernel panicked".to_string());
                Err(EngineFailure::new(EngineErrorKind::Panic, message))
            }
        }
    }

    fn free(&self, handle: RawHandle) {
        if self.live.lock().remove(&handle).is_some() {
            self.frees.fetch_add(1, Ordering::AcqRel);
        } else {
            log::warn!("cpu engine asked to free unknown handle {handle}");
        }
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_validation() {
        let e = CpuEngine::new();
        let flags = DescriptorFlags::default();
        assert!(e.new_descriptor(flags, &[("nthreads".into(), 4i64.into())]).is_ok());
        assert!(e.new_descriptor(flags, &[("axb_method".into(), "hash".into())]).is_ok());
        let err = e
            .new_descriptor(flags, &[("nthreads".into(), 0i64.into())])
            .unwrap_err();
        assert_eq!(err.kind, EngineErrorKind::InvalidValue);
        assert!(e.new_descriptor(flags, &[("bogus".into(), true.into())]).is_err());
        assert!(e.new_descriptor(flags, &[("sort".into(), 1i64.into())]).is_err());
        assert_eq!(e.live_handles(), 2);
    }

    #[test]
    fn test_without_extensions_rejects_options() {
        let e = CpuEngine::without_extensions();
        assert!(!e.supports_descriptor_options());
        assert!(e
            .new_descriptor(DescriptorFlags::default(), &[("sort".into(), true.into())])
            .is_err());
    }

    #[test]
    fn test_free_unknown_handle_is_ignored() {
        let e = CpuEngine::new();
        let raw = e.new_descriptor(DescriptorFlags::default(), &[]).unwrap();
        e.free(raw);
        e.free(raw);
        assert_eq!(e.frees(), 1);
    }
}
