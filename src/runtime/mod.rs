//! Compute engines
//!
//! The operator layer never computes anything itself. Every operation is
//! resolved to typed kernels, paired with a canonical descriptor, and handed
//! to an [`Engine`] as one [`Invocation`].
//!
//! # Architecture
//!
//! ```text
//! Engine (backend identity)
//! ├── invoke       executes one resolved operation
//! ├── new_descriptor / free
//! │                 engine-owned resources, released through EngineHandle
//! └── CpuEngine    in-process reference implementation
//! ```

pub mod cpu;
mod engine;
mod handle;

pub use cpu::CpuEngine;
pub use engine::{Engine, EngineFailure, Invocation, Method, RawHandle};
pub use handle::EngineHandle;
