//! Options model definitions.
//!
//! This module defines [`AppOptions`], the set of named service options an
//! application is configured with, together with the plain-data
//! [`OptionsSnapshot`] used to hand those values around once they are final.
//!
//! Options are assembled from a string-keyed mapping (a JSON object whose keys
//! follow the service-info resource layout, e.g. `API_KEY`, `PROJECT_ID`),
//! may be customized by their owner, and are then locked. After
//! [`AppOptions::lock`] every setter returns [`OptionsError::OptionsLocked`]
//! and leaves the values untouched.
//!
//! # Examples
//!
//! ```rust
//! use app_options_core::options_model::AppOptions;
//! use serde_json::json;
//!
//! let mapping = json!({"API_KEY": "abc", "PROJECT_ID": "demo-project"});
//! let options = AppOptions::from_mapping(mapping.as_object().unwrap())?;
//!
//! options.set_storage_bucket("demo-project.appspot.com".to_string())?;
//! options.lock();
//!
//! assert!(options.set_api_key("other".to_string()).is_err());
//! assert_eq!(options.api_key().as_deref(), Some("abc"));
//! # Ok::<(), app_options_core::OptionsError>(())
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::app_response::OptionsError;

/// Raw string-keyed mapping options are built from.
pub type OptionsMapping = Map<String, Value>;

/// Analytics collection state used when neither the explicit flag nor the
/// deactivation switch is present.
pub const ANALYTICS_COLLECTION_ENABLED_BY_DEFAULT: bool = true;

/// Recognized mapping keys.
pub mod keys {
    pub const API_KEY: &str = "API_KEY";
    pub const BUNDLE_ID: &str = "BUNDLE_ID";
    pub const CLIENT_ID: &str = "CLIENT_ID";
    pub const TRACKING_ID: &str = "TRACKING_ID";
    pub const GCM_SENDER_ID: &str = "GCM_SENDER_ID";
    pub const ANDROID_CLIENT_ID: &str = "ANDROID_CLIENT_ID";
    pub const GOOGLE_APP_ID: &str = "GOOGLE_APP_ID";
    pub const PROJECT_ID: &str = "PROJECT_ID";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const STORAGE_BUCKET: &str = "STORAGE_BUCKET";
    pub const DEEP_LINK_URL_SCHEME: &str = "DEEP_LINK_URL_SCHEME";
    pub const APP_GROUP_ID: &str = "APP_GROUP_ID";
    pub const IS_ANALYTICS_COLLECTION_ENABLED: &str = "IS_ANALYTICS_COLLECTION_ENABLED";
    pub const IS_ANALYTICS_COLLECTION_DEACTIVATED: &str = "IS_ANALYTICS_COLLECTION_DEACTIVATED";

    /// App-level overrides; these win over the service mapping's analytics keys.
    pub const FIREBASE_ANALYTICS_COLLECTION_ENABLED: &str = "FIREBASE_ANALYTICS_COLLECTION_ENABLED";
    pub const FIREBASE_ANALYTICS_COLLECTION_DEACTIVATED: &str =
        "FIREBASE_ANALYTICS_COLLECTION_DEACTIVATED";
}

/// The optional string-valued options, one per recognized key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOption {
    ApiKey,
    BundleId,
    ClientId,
    TrackingId,
    GcmSenderId,
    AndroidClientId,
    GoogleAppId,
    ProjectId,
    DatabaseUrl,
    StorageBucket,
    DeepLinkUrlScheme,
    AppGroupId,
}

impl StringOption {
    pub const ALL: [StringOption; 12] = [
        StringOption::ApiKey,
        StringOption::BundleId,
        StringOption::ClientId,
        StringOption::TrackingId,
        StringOption::GcmSenderId,
        StringOption::AndroidClientId,
        StringOption::GoogleAppId,
        StringOption::ProjectId,
        StringOption::DatabaseUrl,
        StringOption::StorageBucket,
        StringOption::DeepLinkUrlScheme,
        StringOption::AppGroupId,
    ];

    /// Mapping key this option is read from.
    pub fn key(self) -> &'static str {
        match self {
            StringOption::ApiKey => keys::API_KEY,
            StringOption::BundleId => keys::BUNDLE_ID,
            StringOption::ClientId => keys::CLIENT_ID,
            StringOption::TrackingId => keys::TRACKING_ID,
            StringOption::GcmSenderId => keys::GCM_SENDER_ID,
            StringOption::AndroidClientId => keys::ANDROID_CLIENT_ID,
            StringOption::GoogleAppId => keys::GOOGLE_APP_ID,
            StringOption::ProjectId => keys::PROJECT_ID,
            StringOption::DatabaseUrl => keys::DATABASE_URL,
            StringOption::StorageBucket => keys::STORAGE_BUCKET,
            StringOption::DeepLinkUrlScheme => keys::DEEP_LINK_URL_SCHEME,
            StringOption::AppGroupId => keys::APP_GROUP_ID,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.key() == key)
    }

    fn get(self, fields: &OptionsSnapshot) -> &Option<String> {
        match self {
            StringOption::ApiKey => &fields.api_key,
            StringOption::BundleId => &fields.bundle_id,
            StringOption::ClientId => &fields.client_id,
            StringOption::TrackingId => &fields.tracking_id,
            StringOption::GcmSenderId => &fields.gcm_sender_id,
            StringOption::AndroidClientId => &fields.android_client_id,
            StringOption::GoogleAppId => &fields.google_app_id,
            StringOption::ProjectId => &fields.project_id,
            StringOption::DatabaseUrl => &fields.database_url,
            StringOption::StorageBucket => &fields.storage_bucket,
            StringOption::DeepLinkUrlScheme => &fields.deep_link_url_scheme,
            StringOption::AppGroupId => &fields.app_group_id,
        }
    }

    fn get_mut(self, fields: &mut OptionsSnapshot) -> &mut Option<String> {
        match self {
            StringOption::ApiKey => &mut fields.api_key,
            StringOption::BundleId => &mut fields.bundle_id,
            StringOption::ClientId => &mut fields.client_id,
            StringOption::TrackingId => &mut fields.tracking_id,
            StringOption::GcmSenderId => &mut fields.gcm_sender_id,
            StringOption::AndroidClientId => &mut fields.android_client_id,
            StringOption::GoogleAppId => &mut fields.google_app_id,
            StringOption::ProjectId => &mut fields.project_id,
            StringOption::DatabaseUrl => &mut fields.database_url,
            StringOption::StorageBucket => &mut fields.storage_bucket,
            StringOption::DeepLinkUrlScheme => &mut fields.deep_link_url_scheme,
            StringOption::AppGroupId => &mut fields.app_group_id,
        }
    }
}

/// Plain-data copy of every stored option value.
///
/// Serializes back to the same key layout [`AppOptions::from_mapping`]
/// reads, so a snapshot's mapping rebuilds equal options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionsSnapshot {
    #[serde(rename = "API_KEY", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "BUNDLE_ID", skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(rename = "CLIENT_ID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(rename = "TRACKING_ID", skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(rename = "GCM_SENDER_ID", skip_serializing_if = "Option::is_none")]
    pub gcm_sender_id: Option<String>,
    #[serde(rename = "ANDROID_CLIENT_ID", skip_serializing_if = "Option::is_none")]
    pub android_client_id: Option<String>,
    #[serde(rename = "GOOGLE_APP_ID", skip_serializing_if = "Option::is_none")]
    pub google_app_id: Option<String>,
    #[serde(rename = "PROJECT_ID", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(rename = "DATABASE_URL", skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(rename = "STORAGE_BUCKET", skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(rename = "DEEP_LINK_URL_SCHEME", skip_serializing_if = "Option::is_none")]
    pub deep_link_url_scheme: Option<String>,
    #[serde(rename = "APP_GROUP_ID", skip_serializing_if = "Option::is_none")]
    pub app_group_id: Option<String>,

    /// Tri-state: `None` means no explicit choice was made.
    #[serde(rename = "IS_ANALYTICS_COLLECTION_ENABLED", skip_serializing_if = "Option::is_none")]
    pub analytics_collection_enabled: Option<bool>,

    /// Hard kill switch for analytics collection.
    #[serde(rename = "IS_ANALYTICS_COLLECTION_DEACTIVATED")]
    pub analytics_collection_deactivated: bool,

    /// App-level choice; consulted before `analytics_collection_enabled`.
    #[serde(rename = "FIREBASE_ANALYTICS_COLLECTION_ENABLED", skip_serializing_if = "Option::is_none")]
    pub app_analytics_collection_enabled: Option<bool>,

    /// App-level kill switch; consulted before `analytics_collection_deactivated`.
    #[serde(rename = "FIREBASE_ANALYTICS_COLLECTION_DEACTIVATED", skip_serializing_if = "Option::is_none")]
    pub app_analytics_collection_deactivated: Option<bool>,
}

impl OptionsSnapshot {
    /// Explicit analytics choice, app-level first.
    pub fn effective_analytics_flag(&self) -> Option<bool> {
        self.app_analytics_collection_enabled
            .or(self.analytics_collection_enabled)
    }

    /// Kill switch, app-level first.
    pub fn effective_analytics_deactivated(&self) -> bool {
        self.app_analytics_collection_deactivated
            .unwrap_or(self.analytics_collection_deactivated)
    }

    pub fn is_analytics_collection_enabled(&self) -> bool {
        analytics_collection_enabled(
            self.effective_analytics_deactivated(),
            self.effective_analytics_flag(),
            ANALYTICS_COLLECTION_ENABLED_BY_DEFAULT,
        )
    }

    /// Exports the snapshot as a raw mapping.
    pub fn to_mapping(&self) -> Result<OptionsMapping, OptionsError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(OptionsError::Serialization(format!(
                "snapshot serialized to {} instead of an object",
                value_kind(&other)
            ))),
        }
    }
}

/// Read-only report of an options instance, including derived state.
#[derive(Debug, Clone, Serialize)]
pub struct OptionsView {
    #[serde(flatten)]
    pub options: OptionsSnapshot,
    pub library_version_id: String,
    pub is_analytics_collection_enabled: bool,
    pub is_analytics_collection_explicitly_set: bool,
    pub is_analytics_collection_deactivated: bool,
    pub is_editing_locked: bool,
    pub uses_default_source: bool,
}

/// Whether analytics collection is on.
///
/// Deactivation always wins; an explicit flag wins over the compiled default.
pub fn analytics_collection_enabled(
    deactivated: bool,
    explicit_flag: Option<bool>,
    compiled_default: bool,
) -> bool {
    if deactivated {
        return false;
    }
    explicit_flag.unwrap_or(compiled_default)
}

/// Version tag of this library build, e.g. `"1100000"` for 11.0.0.
///
/// Major version, then two digits of minor and three of patch.
pub fn library_version_id() -> String {
    let part = |raw: &str| raw.parse::<u32>().unwrap_or(0);
    format!(
        "{}{:02}{:03}",
        part(env!("CARGO_PKG_VERSION_MAJOR")),
        part(env!("CARGO_PKG_VERSION_MINOR")),
        part(env!("CARGO_PKG_VERSION_PATCH"))
    )
}

/// Service options for an application instance.
///
/// All readers are available regardless of lock state. Setters take `&self`
/// so an instance shared behind an [`Arc`](std::sync::Arc) (such as the cached
/// default) can still be customized by its owner before [`lock`](Self::lock).
///
/// # Lock policy
///
/// Once locked, every setter returns [`OptionsError::OptionsLocked`] and the
/// stored values stay exactly as they were. There is no way to unlock an
/// instance; use [`unlocked_copy`](Self::unlocked_copy) to get an editable
/// duplicate.
#[derive(Debug)]
pub struct AppOptions {
    fields: RwLock<OptionsSnapshot>,
    library_version_id: String,
    editing_locked: AtomicBool,
    uses_default_source: bool,
}

impl AppOptions {
    /// Builds options from a raw mapping.
    ///
    /// Unrecognized keys are ignored. Recognized keys that are missing or
    /// `null` leave the option unset.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::MalformedOptions`] if a recognized key holds a
    /// value of the wrong type.
    pub fn from_mapping(mapping: &OptionsMapping) -> Result<Self, OptionsError> {
        let mut fields = OptionsSnapshot::default();
        for option in StringOption::ALL {
            *option.get_mut(&mut fields) = read_string(mapping, option.key())?;
        }
        fields.analytics_collection_enabled =
            read_bool(mapping, keys::IS_ANALYTICS_COLLECTION_ENABLED)?;
        fields.analytics_collection_deactivated =
            read_bool(mapping, keys::IS_ANALYTICS_COLLECTION_DEACTIVATED)?.unwrap_or(false);
        fields.app_analytics_collection_enabled =
            read_bool(mapping, keys::FIREBASE_ANALYTICS_COLLECTION_ENABLED)?;
        fields.app_analytics_collection_deactivated =
            read_bool(mapping, keys::FIREBASE_ANALYTICS_COLLECTION_DEACTIVATED)?;

        debug!(
            "Built options from mapping with {} keys (project: {:?})",
            mapping.len(),
            fields.project_id
        );
        Ok(Self::from_snapshot(fields))
    }

    /// Builds options from JSON text holding an object.
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Self::from_mapping(&map),
            other => Err(OptionsError::MalformedOptions {
                key: "<root>".to_string(),
                expected: "object",
                found: value_kind(&other),
            }),
        }
    }

    /// Builds options from a JSON file holding an object.
    ///
    /// # Errors
    ///
    /// * [`OptionsError::MissingDefaultConfiguration`] when the file cannot be read
    /// * the errors of [`from_json_str`](Self::from_json_str) for its contents
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            OptionsError::MissingDefaultConfiguration {
                source_name: path.display().to_string(),
                reason: format!("unable to read file: {e}"),
            }
        })?;
        Self::from_json_str(&contents)
    }

    /// Builds options carrying only the two identifiers a client needs at minimum.
    pub fn new(google_app_id: impl Into<String>, gcm_sender_id: impl Into<String>) -> Self {
        Self::from_snapshot(OptionsSnapshot {
            google_app_id: Some(google_app_id.into()),
            gcm_sender_id: Some(gcm_sender_id.into()),
            ..OptionsSnapshot::default()
        })
    }

    /// Wraps an existing snapshot in a fresh, unlocked instance.
    pub fn from_snapshot(fields: OptionsSnapshot) -> Self {
        Self {
            fields: RwLock::new(fields),
            library_version_id: library_version_id(),
            editing_locked: AtomicBool::new(false),
            uses_default_source: false,
        }
    }

    pub(crate) fn mark_default_source(mut self) -> Self {
        self.uses_default_source = true;
        self
    }

    /// Records app-level analytics overrides.
    ///
    /// `FIREBASE_ANALYTICS_COLLECTION_ENABLED` and
    /// `FIREBASE_ANALYTICS_COLLECTION_DEACTIVATED` are kept apart from the
    /// service values and win over them on every read, including over later
    /// calls to [`set_analytics_collection_enabled`](Self::set_analytics_collection_enabled).
    /// Absent keys leave earlier overrides in place.
    pub fn apply_analytics_overrides(&self, overrides: &OptionsMapping) -> Result<(), OptionsError> {
        let enabled = read_bool(overrides, keys::FIREBASE_ANALYTICS_COLLECTION_ENABLED)?;
        let deactivated = read_bool(overrides, keys::FIREBASE_ANALYTICS_COLLECTION_DEACTIVATED)?;
        if enabled.is_none() && deactivated.is_none() {
            return Ok(());
        }

        self.edit(keys::IS_ANALYTICS_COLLECTION_ENABLED, |fields| {
            if enabled.is_some() {
                fields.app_analytics_collection_enabled = enabled;
            }
            if deactivated.is_some() {
                fields.app_analytics_collection_deactivated = deactivated;
            }
        })
    }

    /// Copy of the stored values.
    pub fn snapshot(&self) -> OptionsSnapshot {
        self.fields.read().clone()
    }

    /// Stored values exported in mapping form.
    pub fn to_mapping(&self) -> Result<OptionsMapping, OptionsError> {
        self.snapshot().to_mapping()
    }

    pub fn view(&self) -> OptionsView {
        let options = self.snapshot();
        OptionsView {
            is_analytics_collection_enabled: options.is_analytics_collection_enabled(),
            is_analytics_collection_explicitly_set: options.effective_analytics_flag().is_some(),
            is_analytics_collection_deactivated: options.effective_analytics_deactivated(),
            library_version_id: self.library_version_id.clone(),
            is_editing_locked: self.is_editing_locked(),
            uses_default_source: self.uses_default_source,
            options,
        }
    }

    /// Editable duplicate: same values, unlocked, not marked as the default.
    pub fn unlocked_copy(&self) -> Self {
        Self::from_snapshot(self.snapshot())
    }

    // ---- lock ----

    /// Makes the options read-only for the rest of their lifetime.
    ///
    /// Idempotent. Waits for any in-flight setter to finish, so no write can
    /// land after this returns.
    pub fn lock(&self) {
        let _fields = self.fields.write();
        if !self.editing_locked.swap(true, Ordering::AcqRel) {
            debug!("Options locked for editing");
        }
    }

    pub fn is_editing_locked(&self) -> bool {
        self.editing_locked.load(Ordering::Acquire)
    }

    /// True for the instance built by the default-options registry.
    pub fn uses_default_source(&self) -> bool {
        self.uses_default_source
    }

    pub fn library_version_id(&self) -> &str {
        &self.library_version_id
    }

    // ---- analytics ----

    pub fn is_analytics_collection_explicitly_set(&self) -> bool {
        self.fields.read().effective_analytics_flag().is_some()
    }

    pub fn is_analytics_collection_enabled(&self) -> bool {
        self.fields.read().is_analytics_collection_enabled()
    }

    pub fn is_analytics_collection_deactivated(&self) -> bool {
        self.fields.read().effective_analytics_deactivated()
    }

    /// Records an explicit analytics collection choice. An app-level
    /// override, when present, still wins on read.
    pub fn set_analytics_collection_enabled(&self, enabled: bool) -> Result<(), OptionsError> {
        self.edit(keys::IS_ANALYTICS_COLLECTION_ENABLED, |fields| {
            fields.analytics_collection_enabled = Some(enabled);
        })
    }

    // ---- string options ----

    pub fn string_option(&self, option: StringOption) -> Option<String> {
        option.get(&self.fields.read()).clone()
    }

    pub fn set_string_option(
        &self,
        option: StringOption,
        value: impl Into<Option<String>>,
    ) -> Result<(), OptionsError> {
        let value = value.into();
        self.edit(option.key(), |fields| *option.get_mut(fields) = value)
    }

    pub fn api_key(&self) -> Option<String> {
        self.string_option(StringOption::ApiKey)
    }

    pub fn set_api_key(&self, api_key: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::ApiKey, api_key)
    }

    pub fn bundle_id(&self) -> Option<String> {
        self.string_option(StringOption::BundleId)
    }

    pub fn set_bundle_id(&self, bundle_id: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::BundleId, bundle_id)
    }

    pub fn client_id(&self) -> Option<String> {
        self.string_option(StringOption::ClientId)
    }

    pub fn set_client_id(&self, client_id: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::ClientId, client_id)
    }

    pub fn tracking_id(&self) -> Option<String> {
        self.string_option(StringOption::TrackingId)
    }

    pub fn set_tracking_id(&self, tracking_id: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::TrackingId, tracking_id)
    }

    pub fn gcm_sender_id(&self) -> Option<String> {
        self.string_option(StringOption::GcmSenderId)
    }

    pub fn set_gcm_sender_id(&self, gcm_sender_id: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::GcmSenderId, gcm_sender_id)
    }

    pub fn android_client_id(&self) -> Option<String> {
        self.string_option(StringOption::AndroidClientId)
    }

    pub fn set_android_client_id(
        &self,
        android_client_id: impl Into<Option<String>>,
    ) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::AndroidClientId, android_client_id)
    }

    pub fn google_app_id(&self) -> Option<String> {
        self.string_option(StringOption::GoogleAppId)
    }

    pub fn set_google_app_id(&self, google_app_id: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::GoogleAppId, google_app_id)
    }

    pub fn project_id(&self) -> Option<String> {
        self.string_option(StringOption::ProjectId)
    }

    pub fn set_project_id(&self, project_id: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::ProjectId, project_id)
    }

    pub fn database_url(&self) -> Option<String> {
        self.string_option(StringOption::DatabaseUrl)
    }

    pub fn set_database_url(&self, database_url: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::DatabaseUrl, database_url)
    }

    pub fn storage_bucket(&self) -> Option<String> {
        self.string_option(StringOption::StorageBucket)
    }

    pub fn set_storage_bucket(&self, storage_bucket: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::StorageBucket, storage_bucket)
    }

    pub fn deep_link_url_scheme(&self) -> Option<String> {
        self.string_option(StringOption::DeepLinkUrlScheme)
    }

    pub fn set_deep_link_url_scheme(
        &self,
        deep_link_url_scheme: impl Into<Option<String>>,
    ) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::DeepLinkUrlScheme, deep_link_url_scheme)
    }

    pub fn app_group_id(&self) -> Option<String> {
        self.string_option(StringOption::AppGroupId)
    }

    pub fn set_app_group_id(&self, app_group_id: impl Into<Option<String>>) -> Result<(), OptionsError> {
        self.set_string_option(StringOption::AppGroupId, app_group_id)
    }

    /// Sets an option by its mapping key.
    ///
    /// String options accept a string or `null` (clears the value); the
    /// explicit analytics flag accepts a boolean or `null` (back to unset).
    /// Locked instances reject the call before the value is inspected.
    ///
    /// # Errors
    ///
    /// * [`OptionsError::UnknownKey`] for unrecognized or read-only keys
    /// * [`OptionsError::OptionsLocked`] after [`lock`](Self::lock)
    /// * [`OptionsError::MalformedOptions`] for a value of the wrong type
    pub fn set_value(&self, key: &str, value: &Value) -> Result<(), OptionsError> {
        // Lock is checked before the value so locked instances always answer
        // OptionsLocked; `edit` re-checks under the write guard.
        if let Some(option) = StringOption::from_key(key) {
            self.ensure_unlocked(option.key())?;
            let value = string_from_value(option.key(), value)?;
            return self.edit(option.key(), |fields| *option.get_mut(fields) = value);
        }

        if key == keys::IS_ANALYTICS_COLLECTION_ENABLED {
            self.ensure_unlocked(keys::IS_ANALYTICS_COLLECTION_ENABLED)?;
            let flag = bool_from_value(key, value)?;
            return self.edit(keys::IS_ANALYTICS_COLLECTION_ENABLED, |fields| {
                fields.analytics_collection_enabled = flag;
            });
        }

        Err(OptionsError::UnknownKey { key: key.to_string() })
    }

    fn ensure_unlocked(&self, field: &'static str) -> Result<(), OptionsError> {
        if self.is_editing_locked() {
            warn!("Rejected edit of '{field}': options are locked");
            return Err(OptionsError::OptionsLocked { field });
        }
        Ok(())
    }

    /// Runs `apply` under the write guard unless the options are locked.
    fn edit(
        &self,
        field: &'static str,
        apply: impl FnOnce(&mut OptionsSnapshot),
    ) -> Result<(), OptionsError> {
        let mut fields = self.fields.write();
        self.ensure_unlocked(field)?;
        apply(&mut *fields);
        Ok(())
    }
}

/// Clones carry the lock state along with the values.
impl Clone for AppOptions {
    fn clone(&self) -> Self {
        let fields = self.fields.read();
        Self {
            fields: RwLock::new(fields.clone()),
            library_version_id: self.library_version_id.clone(),
            editing_locked: AtomicBool::new(self.is_editing_locked()),
            uses_default_source: self.uses_default_source,
        }
    }
}

/// Equality compares option values only, not lock state.
impl PartialEq for AppOptions {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.library_version_id == other.library_version_id && self.snapshot() == other.snapshot()
    }
}

impl Eq for AppOptions {}

fn read_string(mapping: &OptionsMapping, key: &'static str) -> Result<Option<String>, OptionsError> {
    match mapping.get(key) {
        None => Ok(None),
        Some(value) => string_from_value(key, value),
    }
}

fn read_bool(mapping: &OptionsMapping, key: &'static str) -> Result<Option<bool>, OptionsError> {
    match mapping.get(key) {
        None => Ok(None),
        Some(value) => bool_from_value(key, value),
    }
}

fn string_from_value(key: &str, value: &Value) -> Result<Option<String>, OptionsError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(OptionsError::MalformedOptions {
            key: key.to_string(),
            expected: "string",
            found: value_kind(other),
        }),
    }
}

fn bool_from_value(key: &str, value: &Value) -> Result<Option<bool>, OptionsError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(OptionsError::MalformedOptions {
            key: key.to_string(),
            expected: "boolean",
            found: value_kind(other),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
