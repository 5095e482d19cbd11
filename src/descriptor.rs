//! Canonical execution descriptors
//!
//! A descriptor encodes five execution flags. Every combination except
//! "all off" maps to one shared [`Descriptor`] created once per cache; the
//! all-off combination maps to `None`. Descriptors carrying backend extension
//! options are created on demand, memoized, and own an engine handle.

use crate::error::{Error, Result};
use crate::runtime::{Engine, EngineHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The five execution flags
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorFlags {
    /// Clear output positions the mask does not allow
    pub output_replace: bool,
    /// Use the complement of the mask
    pub mask_complement: bool,
    /// Only the mask's pattern matters, not its values
    pub mask_structure: bool,
    /// Transpose the first input
    pub transpose_first: bool,
    /// Transpose the second input
    pub transpose_second: bool,
}

impl DescriptorFlags {
    /// Number of distinct flag combinations
    pub const COUNT: usize = 32;

    /// Pack into five bits
    pub const fn bits(self) -> u8 {
        (self.output_replace as u8)
            | (self.mask_complement as u8) << 1
            | (self.mask_structure as u8) << 2
            | (self.transpose_first as u8) << 3
            | (self.transpose_second as u8) << 4
    }

    /// Unpack from five bits; higher bits are ignored
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            output_replace: bits & 1 != 0,
            mask_complement: bits & 2 != 0,
            mask_structure: bits & 4 != 0,
            transpose_first: bits & 8 != 0,
            transpose_second: bits & 16 != 0,
        }
    }

    /// Whether every flag is off
    pub const fn is_none(self) -> bool {
        self.bits() == 0
    }

    /// Every combination, in bit order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self::from_bits)
    }

    /// Canonical name, e.g. `GrB_DESC_RSCT0T1`; `NULL` when every flag is off
    pub fn name(self) -> String {
        if self.is_none() {
            return "NULL".to_string();
        }
        let mut name = String::from("GrB_DESC_");
        for (on, tag) in [
            (self.output_replace, "R"),
            (self.mask_structure, "S"),
            (self.mask_complement, "C"),
            (self.transpose_first, "T0"),
            (self.transpose_second, "T1"),
        ] {
            if on {
                name.push_str(tag);
            }
        }
        name
    }
}

/// Value of a backend extension option
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionValue {
    /// Boolean option
    Bool(bool),
    /// Integer option
    Int(i64),
    /// String option
    Str(String),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// An immutable, shared descriptor
#[derive(Debug)]
pub struct Descriptor {
    name: String,
    flags: DescriptorFlags,
    options: Vec<(String, OptionValue)>,
    handle: Option<EngineHandle>,
}

impl Descriptor {
    /// Canonical name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution flags
    pub fn flags(&self) -> DescriptorFlags {
        self.flags
    }

    /// Extension options, lowercased and sorted by name
    pub fn options(&self) -> &[(String, OptionValue)] {
        &self.options
    }

    /// Raw engine handle, for descriptors carrying extension options
    pub fn raw_handle(&self) -> Option<crate::runtime::RawHandle> {
        self.handle.as_ref().map(|h| h.raw())
    }
}

type ExtendedKey = (DescriptorFlags, Vec<(String, OptionValue)>);

/// Canonicalizing descriptor cache
pub struct DescriptorCache {
    builtin: Vec<Option<Arc<Descriptor>>>,
    extended: Mutex<HashMap<ExtendedKey, Arc<Descriptor>>>,
    engine: Arc<dyn Engine>,
}

impl DescriptorCache {
    /// Create the 31 builtin descriptors for `engine`
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        let builtin = DescriptorFlags::all()
            .map(|flags| {
                (!flags.is_none()).then(|| {
                    Arc::new(Descriptor {
                        name: flags.name(),
                        flags,
                        options: Vec::new(),
                        handle: None,
                    })
                })
            })
            .collect();
        Self {
            builtin,
            extended: Mutex::new(HashMap::new()),
            engine,
        }
    }

    /// Canonical descriptor for `flags`; `None` when every flag is off
    #[inline]
    pub fn lookup(&self, flags: DescriptorFlags) -> Option<Arc<Descriptor>> {
        self.builtin[flags.bits() as usize].clone()
    }

    /// Descriptor for `flags` plus backend extension options
    ///
    /// Without options this is [`DescriptorCache::lookup`]. Option names are
    /// case-insensitive; the same flags and options always return the same
    /// descriptor.
    pub fn lookup_with(
        &self,
        flags: DescriptorFlags,
        options: &[(String, OptionValue)],
    ) -> Result<Option<Arc<Descriptor>>> {
        if options.is_empty() {
            return Ok(self.lookup(flags));
        }
        let backend = self.engine.name();
        let mut groups: HashMap<String, Vec<&str>> = HashMap::new();
        for (k, _) in options {
            groups.entry(k.to_lowercase()).or_default().push(k);
        }
        let mut dups: Vec<String> = groups
            .values()
            .filter(|names| names.len() > 1)
            .flatten()
            .map(|s| s.to_string())
            .collect();
        if !dups.is_empty() {
            dups.sort_by(|a, b| (a.to_lowercase(), a).cmp(&(b.to_lowercase(), b)));
            return Err(Error::UnsupportedOption {
                reason: format!(
                    "Duplicate descriptor options given (descriptor options are case-insensitive): {}",
                    dups.join(", ")
                ),
                options: dups,
                backend: backend.to_string(),
            });
        }

        if !self.engine.supports_descriptor_options() {
            let mut names: Vec<String> = options.iter().map(|(k, _)| k.clone()).collect();
            names.sort();
            return Err(Error::UnsupportedOption {
                reason: format!(
                    "Extra descriptor options not possible with '{backend}' backend; got {}",
                    names.join(", ")
                ),
                options: names,
                backend: backend.to_string(),
            });
        }

        let mut normalized: Vec<(String, OptionValue)> = options
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        normalized.sort();
        let key = (flags, normalized);

        let mut extended = self.extended.lock();
        if let Some(d) = extended.get(&key) {
            return Ok(Some(d.clone()));
        }
        let raw = self
            .engine
            .new_descriptor(flags, &key.1)
            .map_err(|f| Error::Engine {
                kind: f.kind,
                backend: backend.to_string(),
                container: None,
                message: f.message,
            })?;
        let rendered: Vec<String> = key.1.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let descriptor = Arc::new(Descriptor {
            name: format!("{}[{}]", flags.name(), rendered.join(", ")),
            flags,
            options: key.1.clone(),
            handle: Some(EngineHandle::new(raw, &self.engine)),
        });
        log::debug!("created descriptor {}", descriptor.name);
        extended.insert(key, descriptor.clone());
        Ok(Some(descriptor))
    }

    /// Name of the active backend
    pub fn backend(&self) -> &str {
        self.engine.name()
    }
}

impl fmt::Debug for DescriptorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorCache")
            .field("backend", &self.engine.name())
            .field("extended", &self.extended.lock().len())
            .finish()
    }
}
