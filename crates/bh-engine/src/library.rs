//! Binding function descriptors to native objective entry points.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::ffi::{c_int, c_void};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use bh_types::{BindingError, FunctionDescriptor, Objective};
use libloading::Library;
use tracing::{debug, info};

/// Stem of the objective library inside the library directory.
pub const LIBRARY_STEM: &str = "gofuncs";

/// `double name(int n, const double* x, void* unused1, void* unused2)`
pub type RawObjectiveFn =
    unsafe extern "C" fn(c_int, *const f64, *mut c_void, *mut c_void) -> f64;

/// Platform file name of the objective library, e.g. `libgofuncs.so`.
pub fn library_file_name() -> String {
    format!("{DLL_PREFIX}{LIBRARY_STEM}{DLL_SUFFIX}")
}

/// A native objective bound to its descriptor.
pub struct NativeObjective {
    name: String,
    dim: usize,
    native_dim: c_int,
    func: RawObjectiveFn,
    // keeps the code behind `func` mapped for as long as any handle lives
    _library: Option<Arc<Library>>,
}

impl NativeObjective {
    /// Bind `func` to `descriptor` without an owning library.
    ///
    /// # Safety
    ///
    /// `func` must follow the [`RawObjectiveFn`] contract: read exactly `n`
    /// doubles from `x`, ignore the trailing pointers, and be safe to call
    /// from any thread.
    pub unsafe fn from_raw(
        descriptor: &FunctionDescriptor,
        func: RawObjectiveFn,
    ) -> Result<Self, BindingError> {
        Self::bind(descriptor, func, None)
    }

    fn bind(
        descriptor: &FunctionDescriptor,
        func: RawObjectiveFn,
        library: Option<Arc<Library>>,
    ) -> Result<Self, BindingError> {
        let native_dim =
            c_int::try_from(descriptor.dim()).map_err(|_| BindingError::DimensionOverflow {
                symbol: descriptor.name().to_string(),
                dim: descriptor.dim(),
            })?;
        Ok(Self {
            name: descriptor.name().to_string(),
            dim: descriptor.dim(),
            native_dim,
            func,
            _library: library,
        })
    }
}

impl Objective for NativeObjective {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        if x.len() != self.dim {
            return f64::NAN;
        }
        // SAFETY: the buffer holds exactly `native_dim` doubles and the
        // entry point contract was accepted at bind time.
        unsafe { (self.func)(self.native_dim, x.as_ptr(), ptr::null_mut(), ptr::null_mut()) }
    }
}

impl fmt::Debug for NativeObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObjective")
            .field("name", &self.name)
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

/// Anything that can turn a descriptor into a callable objective.
pub trait ObjectiveSource {
    fn bind(&self, descriptor: &FunctionDescriptor) -> Result<Arc<dyn Objective>, BindingError>;
}

/// The shared objective library loaded at startup.
#[derive(Debug, Clone)]
pub struct NativeLibrary {
    path: PathBuf,
    library: Arc<Library>,
}

impl NativeLibrary {
    /// Load the library at `path`.
    ///
    /// Loading runs the library's initializers; the file is trusted to export
    /// entry points with the [`RawObjectiveFn`] signature.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BindingError> {
        let path = path.as_ref().to_path_buf();
        // SAFETY: see above; the objective library is a trusted input.
        let library = unsafe { Library::new(&path) }.map_err(|e| BindingError::LibraryLoad {
            path: path.clone(),
            message: e.to_string(),
        })?;
        info!("Loaded objective library {}", path.display());
        Ok(Self {
            path,
            library: Arc::new(library),
        })
    }

    /// Load [`library_file_name`] from `dir`.
    pub fn open_in<P: AsRef<Path>>(dir: P) -> Result<Self, BindingError> {
        Self::open(dir.as_ref().join(library_file_name()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ObjectiveSource for NativeLibrary {
    fn bind(&self, descriptor: &FunctionDescriptor) -> Result<Arc<dyn Objective>, BindingError> {
        // SAFETY: exported objectives share the RawObjectiveFn signature.
        let func: RawObjectiveFn = unsafe {
            *self
                .library
                .get::<RawObjectiveFn>(descriptor.name().as_bytes())
                .map_err(|_| BindingError::MissingSymbol {
                    symbol: descriptor.name().to_string(),
                })?
        };
        let objective = NativeObjective::bind(descriptor, func, Some(Arc::clone(&self.library)))?;
        debug!("Bound {} (dim {})", descriptor.name(), descriptor.dim());
        Ok(Arc::new(objective))
    }
}

/// Objectives resolved once at startup, in descriptor order.
#[derive(Clone, Default)]
pub struct ObjectiveRegistry {
    objectives: Vec<Arc<dyn Objective>>,
}

impl ObjectiveRegistry {
    /// Bind every descriptor. The first failure aborts resolution.
    pub fn resolve<S: ObjectiveSource + ?Sized>(
        source: &S,
        descriptors: &[FunctionDescriptor],
    ) -> Result<Self, BindingError> {
        let objectives = descriptors
            .iter()
            .map(|descriptor| source.bind(descriptor))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Resolved {} objective functions", objectives.len());
        Ok(Self { objectives })
    }

    pub fn from_objectives(objectives: Vec<Arc<dyn Objective>>) -> Self {
        Self { objectives }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Objective>> {
        self.objectives.iter().find(|o| o.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Objective>> {
        self.objectives.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.objectives.iter().map(|o| o.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }
}

impl fmt::Debug for ObjectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectiveRegistry")
            .field("objectives", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    unsafe extern "C" fn zero_fn(_n: c_int, _x: *const f64, _a: *mut c_void, _b: *mut c_void) -> f64 {
        0.0
    }

    unsafe extern "C" fn sum_fn(n: c_int, x: *const f64, a: *mut c_void, b: *mut c_void) -> f64 {
        assert!(a.is_null() && b.is_null());
        std::slice::from_raw_parts(x, n as usize).iter().sum()
    }

    struct TableSource(HashMap<&'static str, RawObjectiveFn>);

    impl ObjectiveSource for TableSource {
        fn bind(&self, descriptor: &FunctionDescriptor) -> Result<Arc<dyn Objective>, BindingError> {
            let func = self
                .0
                .get(descriptor.name())
                .copied()
                .ok_or_else(|| BindingError::MissingSymbol {
                    symbol: descriptor.name().to_string(),
                })?;
            Ok(Arc::new(unsafe { NativeObjective::from_raw(descriptor, func)? }))
        }
    }

    fn table() -> TableSource {
        let mut funcs: HashMap<&'static str, RawObjectiveFn> = HashMap::new();
        funcs.insert("zero_fn", zero_fn);
        funcs.insert("sum_fn", sum_fn);
        TableSource(funcs)
    }

    fn descriptor(name: &str, dim: usize) -> FunctionDescriptor {
        FunctionDescriptor::new(name, dim).unwrap()
    }

    #[test]
    fn test_native_objective_passes_buffer_and_dimension() {
        let objective = unsafe { NativeObjective::from_raw(&descriptor("sum_fn", 3), sum_fn) }.unwrap();
        assert_eq!(objective.name(), "sum_fn");
        assert_eq!(objective.dim(), 3);
        assert_eq!(objective.evaluate(&[1.0, 2.0, 3.5]), 6.5);
        assert_eq!(objective.initial_point(), vec![0.0; 3]);
    }

    #[test]
    fn test_wrong_length_is_refused() {
        let objective = unsafe { NativeObjective::from_raw(&descriptor("sum_fn", 2), sum_fn) }.unwrap();
        assert!(objective.evaluate(&[1.0, 2.0, 3.0]).is_nan());
        assert!(objective.evaluate(&[]).is_nan());
    }

    #[test]
    fn test_dimension_must_fit_c_int() {
        let big = descriptor("zero_fn", c_int::MAX as usize + 1);
        let err = unsafe { NativeObjective::from_raw(&big, zero_fn) }.unwrap_err();
        assert!(matches!(err, BindingError::DimensionOverflow { .. }));
    }

    #[test]
    fn test_registry_preserves_descriptor_order() {
        let descriptors = vec![descriptor("sum_fn", 2), descriptor("zero_fn", 1)];
        let registry = ObjectiveRegistry::resolve(&table(), &descriptors).unwrap();
        assert_eq!(registry.names(), vec!["sum_fn", "zero_fn"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("zero_fn").unwrap().evaluate(&[4.0]), 0.0);
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn test_missing_symbol_aborts_resolution() {
        let descriptors = vec![descriptor("zero_fn", 2), descriptor("missing_fn", 2)];
        let err = ObjectiveRegistry::resolve(&table(), &descriptors).unwrap_err();
        match err {
            BindingError::MissingSymbol { symbol } => assert_eq!(symbol, "missing_fn"),
            other => panic!("Expected MissingSymbol, got {other:?}"),
        }
    }

    #[test]
    fn test_library_file_name_uses_platform_affixes() {
        let name = library_file_name();
        assert!(name.contains(LIBRARY_STEM));
        assert!(name.ends_with(DLL_SUFFIX));
    }

    #[test]
    fn test_missing_library_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NativeLibrary::open_in(dir.path()).unwrap_err();
        match err {
            BindingError::LibraryLoad { path, .. } => {
                assert_eq!(path, dir.path().join(library_file_name()))
            }
            other => panic!("Expected LibraryLoad, got {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_real_library_reports_missing_symbol() {
        let library = NativeLibrary::open("libm.so.6").unwrap();
        assert_eq!(library.path(), Path::new("libm.so.6"));

        match library.bind(&descriptor("missing_fn", 2)) {
            Err(BindingError::MissingSymbol { symbol }) => assert_eq!(symbol, "missing_fn"),
            Err(other) => panic!("Expected MissingSymbol, got {other:?}"),
            Ok(_) => panic!("missing_fn should not resolve"),
        }

        // resolution only; the libm signature does not match RawObjectiveFn
        let bound = library.bind(&descriptor("cos", 1)).map(|o| (o.name().to_string(), o.dim()));
        assert_eq!(bound.ok(), Some(("cos".to_string(), 1)));

        let descriptors = vec![descriptor("cos", 1), descriptor("missing_fn", 2)];
        assert!(matches!(
            ObjectiveRegistry::resolve(&library, &descriptors),
            Err(BindingError::MissingSymbol { .. })
        ));
    }
}
