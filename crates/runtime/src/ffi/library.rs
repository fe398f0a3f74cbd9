//! Shared-object loading and `extern fn` symbol resolution (§4.9).

use hemlock_core::ast::Param;
use hemlock_core::{EvalResult, FfiFunctionData, FfiType, HFfiFunction, HemlockException, TypeDescriptor};
use libloading::Library;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process-wide FFI state: the library cache (so `import "libfoo.so"` is
/// idempotent), the currently-targeted library for subsequent `extern
/// fn` declarations, and the callback-trampoline's serialization lock
/// (§4.9: "the trampoline acquires a process-wide interpreter mutex").
pub struct FfiState {
    libraries: Mutex<HashMap<String, Arc<Library>>>,
    current: Mutex<Option<Arc<Library>>>,
    pub callback_lock: Mutex<()>,
}

impl Default for FfiState {
    fn default() -> Self {
        Self::new()
    }
}

impl FfiState {
    pub fn new() -> Self {
        Self {
            libraries: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            callback_lock: Mutex::new(()),
        }
    }

    /// Load (or reuse) the shared object at `path`, rewriting the
    /// platform suffix the way the host dynamic loader would, and make
    /// it the current import target (§4.9).
    pub fn load_library(&self, path: &str) -> EvalResult<Arc<Library>> {
        let candidates = candidate_paths(path);
        let mut cache = self.libraries.lock().expect("ffi library cache poisoned");
        for candidate in &candidates {
            if let Some(existing) = cache.get(candidate) {
                *self.current.lock().expect("ffi current poisoned") = Some(existing.clone());
                return Ok(existing.clone());
            }
        }
        let mut last_err = None;
        for candidate in &candidates {
            match unsafe { Library::new(candidate) } {
                Ok(lib) => {
                    let lib = Arc::new(lib);
                    cache.insert(candidate.clone(), lib.clone());
                    *self.current.lock().expect("ffi current poisoned") = Some(lib.clone());
                    return Ok(lib);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(HemlockException::msg(format!(
            "failed to load library '{path}': {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    fn current_library(&self) -> EvalResult<Arc<Library>> {
        self.current
            .lock()
            .expect("ffi current poisoned")
            .clone()
            .ok_or_else(|| HemlockException::msg("extern fn declared with no library imported"))
    }

    /// Resolve `name` in the current library and build an `ffi-function`
    /// Value (§4.9: "resolves `name` in the current library, builds a
    /// libffi-style call-interface descriptor from the declared types").
    pub fn declare_extern_fn(
        &self,
        name: &str,
        params: &[Param],
        return_type: Option<TypeDescriptor>,
    ) -> EvalResult<HFfiFunction> {
        let lib = self.current_library()?;
        let symbol = unsafe {
            lib.get::<*const ()>(name.as_bytes())
                .map_err(|e| HemlockException::msg(format!("unresolved symbol '{name}': {e}")))?
        };
        let address = *symbol as usize;
        let param_types = params
            .iter()
            .map(|p| {
                p.type_desc
                    .as_ref()
                    .and_then(FfiType::from_type_descriptor)
                    .ok_or_else(|| {
                        HemlockException::msg(format!(
                            "extern fn '{name}' parameter '{}' has an unsupported FFI type",
                            p.name
                        ))
                    })
            })
            .collect::<EvalResult<Vec<_>>>()?;
        let return_ffi = match &return_type {
            None => FfiType::Void,
            Some(desc) => FfiType::from_type_descriptor(desc).ok_or_else(|| {
                HemlockException::msg(format!("extern fn '{name}' has an unsupported return type"))
            })?,
        };
        Ok(Arc::new(FfiFunctionData {
            name: name.to_string(),
            library_path: String::new(),
            symbol: address,
            params: param_types,
            return_type: return_ffi,
            library: lib as Arc<dyn std::any::Any + Send + Sync>,
        }))
    }
}

/// The platforms this is built for rewrite `.so` to the host's native
/// shared-object suffix when the requested name doesn't already carry
/// one, then fall back to the literal path (§4.9: "on certain platforms
/// the loader transparently rewrites the suffix").
fn candidate_paths(path: &str) -> Vec<String> {
    let native_suffix = if cfg!(target_os = "macos") {
        "dylib"
    } else if cfg!(target_os = "windows") {
        "dll"
    } else {
        "so"
    };
    let mut candidates = vec![path.to_string()];
    if let Some(stem) = path.strip_suffix(".so") {
        let rewritten = format!("{stem}.{native_suffix}");
        if rewritten != path {
            candidates.push(rewritten);
        }
    }
    candidates
}
