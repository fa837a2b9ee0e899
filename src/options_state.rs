//! Default options registry and its mapping providers.
//!
//! [`OptionsRegistry`] caches the one default [`AppOptions`] instance built
//! from a [`DefaultMappingProvider`]. [`JsonFileProvider`] reads the mapping
//! from a JSON file and [`StaticProvider`] serves one from memory. The
//! process-wide registry behind [`default_options`] starts out reading the file
//! named by `APP_OPTIONS_PATH`, or `GoogleService-Info.json`.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::app_response::OptionsError;
use crate::options_model::{AppOptions, OptionsMapping};

/// Environment variable naming the JSON file the process-wide default is read from.
pub const DEFAULT_OPTIONS_PATH_ENV: &str = "APP_OPTIONS_PATH";

/// File name used when [`DEFAULT_OPTIONS_PATH_ENV`] is not set.
pub const DEFAULT_OPTIONS_FILE: &str = "GoogleService-Info.json";

/// Supplies the raw mapping the default options are built from.
pub trait DefaultMappingProvider: Send + Sync + Debug {
    /// Loads the mapping, or fails with
    /// [`OptionsError::MissingDefaultConfiguration`] when there is none.
    fn load(&self) -> Result<OptionsMapping, OptionsError>;

    /// Human-readable description of where the mapping comes from.
    fn source_name(&self) -> String;
}

/// Reads the mapping from a JSON file holding a single object.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from `APP_OPTIONS_PATH`, falling back to `GoogleService-Info.json`.
    pub fn from_env() -> Self {
        let path = std::env::var_os(DEFAULT_OPTIONS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OPTIONS_FILE));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn missing(&self, reason: impl Into<String>) -> OptionsError {
        OptionsError::MissingDefaultConfiguration {
            source_name: self.source_name(),
            reason: reason.into(),
        }
    }
}

impl DefaultMappingProvider for JsonFileProvider {
    fn load(&self) -> Result<OptionsMapping, OptionsError> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| self.missing(format!("unable to read file: {e}")))?;

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(self.missing("file does not hold a JSON object")),
            Err(e) => Err(self.missing(format!("invalid JSON: {e}"))),
        }
    }

    fn source_name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves a fixed in-memory mapping, or reports it as missing when `None`.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    mapping: Option<OptionsMapping>,
}

impl StaticProvider {
    pub fn new(mapping: OptionsMapping) -> Self {
        Self { mapping: Some(mapping) }
    }

    pub fn empty() -> Self {
        Self { mapping: None }
    }
}

impl DefaultMappingProvider for StaticProvider {
    fn load(&self) -> Result<OptionsMapping, OptionsError> {
        self.mapping
            .clone()
            .ok_or_else(|| OptionsError::MissingDefaultConfiguration {
                source_name: self.source_name(),
                reason: "no mapping configured".to_string(),
            })
    }

    fn source_name(&self) -> String {
        "static mapping".to_string()
    }
}

/// Holds at most one cached default [`AppOptions`] built from a provider.
///
/// The first [`get_default`](Self::get_default) loads the provider and
/// memoizes the result; later calls hand out the same `Arc` until
/// [`reset_default`](Self::reset_default). Check, build and store all happen
/// under one mutex, so concurrent first callers share one instance and nobody
/// observes a half-built one. Failures are never cached.
#[derive(Debug)]
pub struct OptionsRegistry {
    provider: RwLock<Arc<dyn DefaultMappingProvider>>,
    cached: Mutex<Option<Arc<AppOptions>>>,
}

impl OptionsRegistry {
    pub fn new(provider: impl DefaultMappingProvider + 'static) -> Self {
        Self {
            provider: RwLock::new(Arc::new(provider)),
            cached: Mutex::new(None),
        }
    }

    /// Returns the default options, building them on first use.
    ///
    /// # Errors
    ///
    /// * [`OptionsError::MissingDefaultConfiguration`] when the provider has no data
    /// * [`OptionsError::MalformedOptions`] when the provider's mapping is ill-typed
    pub fn get_default(&self) -> Result<Arc<AppOptions>, OptionsError> {
        let mut cached = self.cached.lock();
        if let Some(options) = cached.as_ref() {
            return Ok(Arc::clone(options));
        }

        let provider = self.provider.read().clone();
        let mapping = provider.load().inspect_err(|e| {
            warn!("Default options unavailable: {e}");
        })?;
        let options = Arc::new(AppOptions::from_mapping(&mapping)?.mark_default_source());

        info!("Default options loaded from {}", provider.source_name());
        *cached = Some(Arc::clone(&options));
        Ok(options)
    }

    /// Drops the cached default; the next `get_default` reloads the provider.
    ///
    /// Meant for tests simulating a cold start. Holders of the old `Arc`
    /// keep their (possibly locked) instance.
    pub fn reset_default(&self) {
        if self.cached.lock().take().is_some() {
            info!("Default options reset");
        }
    }

    /// Whether a default instance is currently cached.
    pub fn is_cached(&self) -> bool {
        self.cached.lock().is_some()
    }

    /// Raw mapping from the provider, read fresh on every call.
    pub fn default_mapping(&self) -> Result<OptionsMapping, OptionsError> {
        let provider = self.provider.read().clone();
        provider.load()
    }

    /// Swaps the provider and drops the cached default built from the old one.
    pub fn set_provider(&self, provider: impl DefaultMappingProvider + 'static) {
        let provider: Arc<dyn DefaultMappingProvider> = Arc::new(provider);
        debug!("Default options source set to {}", provider.source_name());
        let mut cached = self.cached.lock();
        *self.provider.write() = provider;
        *cached = None;
    }

    pub fn source_name(&self) -> String {
        self.provider.read().source_name()
    }
}

static DEFAULT_REGISTRY: OnceLock<OptionsRegistry> = OnceLock::new();

/// The process-wide registry, reading from [`JsonFileProvider::from_env`] until
/// another provider is installed.
pub fn default_registry() -> &'static OptionsRegistry {
    DEFAULT_REGISTRY.get_or_init(|| OptionsRegistry::new(JsonFileProvider::from_env()))
}

/// Process-wide default options.
pub fn default_options() -> Result<Arc<AppOptions>, OptionsError> {
    default_registry().get_default()
}

/// Clears the process-wide default. Test-only by convention.
pub fn reset_default_options() {
    default_registry().reset_default();
}

/// Points the process-wide registry at a new provider.
pub fn set_default_provider(provider: impl DefaultMappingProvider + 'static) {
    default_registry().set_provider(provider);
}

impl AppOptions {
    /// Process-wide default options; see [`OptionsRegistry::get_default`].
    pub fn default_options() -> Result<Arc<AppOptions>, OptionsError> {
        default_options()
    }

    /// Clears the process-wide default. Test-only by convention.
    pub fn reset_default_options() {
        reset_default_options();
    }

    /// Raw mapping behind the process-wide default.
    pub fn default_mapping() -> Result<OptionsMapping, OptionsError> {
        default_registry().default_mapping()
    }
}
