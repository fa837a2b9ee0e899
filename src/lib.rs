//! # App Options Core
//!
//! A small options library designed for FFI (Foreign Function Interface)
//! integration with Flutter and other cross-platform applications. It models
//! the service options an application is configured with: API key, project
//! and bundle identifiers, analytics collection flags and the library version
//! tag.
//!
//! ## Features
//!
//! - **Lockable options**: [`AppOptions`] can be customized by its owner and then
//!   locked; afterwards every setter fails with [`OptionsError::OptionsLocked`]
//! - **Cached default**: the process-wide default options are built once from a
//!   JSON resource and shared until explicitly reset
//! - **Tri-state analytics**: explicit opt-in/opt-out, unset, and a hard
//!   deactivation switch that always wins
//! - **FFI-optimized**: every exported function answers with a JSON
//!   [`AppResponse`] string
//! - **Safe error handling**: No `unwrap()` calls in production code
//!
//! ## Quick Start
//!
//! ```rust
//! use app_options_core::AppOptions;
//! use serde_json::json;
//!
//! let mapping = json!({
//!     "API_KEY": "abc",
//!     "GOOGLE_APP_ID": "1:123:ios:abc",
//!     "IS_ANALYTICS_COLLECTION_ENABLED": false
//! });
//! let options = AppOptions::from_mapping(mapping.as_object().unwrap())?;
//!
//! assert!(options.is_analytics_collection_explicitly_set());
//! assert!(!options.is_analytics_collection_enabled());
//!
//! options.lock();
//! assert!(options.is_editing_locked());
//! # Ok::<(), app_options_core::OptionsError>(())
//! ```
//!
//! ## FFI Functions
//!
//! - [`options_create`] - Build options from a JSON object
//! - [`options_default`] - Get the cached process-wide default options
//! - [`options_configure_default_source`] - Point the default at a JSON file
//! - [`options_reset_default`] - Drop the cached default (tests)
//! - [`options_to_json`] - Read all values and derived flags
//! - [`options_set_value`] - Set a single option by key
//! - [`options_lock`] - Lock options against further edits
//! - [`options_is_editing_locked`] - Query the lock flag
//! - [`options_release`] - Release a handle
//! - [`free_c_string`] - Free a string returned by this library

pub mod options_model;
pub mod options_state;
mod app_response;

pub use crate::app_response::{AppResponse, OptionsError};
pub use crate::options_model::{
    analytics_collection_enabled, library_version_id, AppOptions, OptionsMapping, OptionsSnapshot,
    OptionsView, StringOption, ANALYTICS_COLLECTION_ENABLED_BY_DEFAULT,
};
pub use crate::options_state::{
    default_options, default_registry, reset_default_options, set_default_provider,
    DefaultMappingProvider, JsonFileProvider, OptionsRegistry, StaticProvider,
};

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

/// Opaque handle owning one reference to an [`AppOptions`] instance.
///
/// Handles returned by [`options_default`] share the cached default, so a
/// lock applied through one is visible through every other.
pub struct OptionsHandle {
    options: Arc<AppOptions>,
}

impl OptionsHandle {
    pub fn options(&self) -> &Arc<AppOptions> {
        &self.options
    }
}

/// Creates options from a JSON object.
///
/// # Parameters
///
/// * `json_ptr` - A null-terminated C string holding a JSON object keyed like
///   the service-info resource (`API_KEY`, `PROJECT_ID`, ...)
///
/// # Returns
///
/// Returns a pointer to a new [`OptionsHandle`] on success, or a null pointer
/// on failure. Release it with [`options_release`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use app_options_core::options_create;
///
/// let json = CString::new(r#"{"API_KEY":"abc","PROJECT_ID":"demo"}"#).unwrap();
/// let handle = options_create(json.as_ptr());
///
/// if !handle.is_null() {
///     // Options created successfully
/// }
/// ```
///
/// # Errors
///
/// Returns null pointer if:
/// - Input pointer is null or not valid UTF-8
/// - The JSON is invalid or not an object
/// - A recognized key holds a value of the wrong type
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn options_create(json_ptr: *const c_char) -> *mut OptionsHandle {
    if json_ptr.is_null() {
        warn!("Null JSON pointer passed to options_create");
        return std::ptr::null_mut();
    }

    let json_str = match unsafe { CStr::from_ptr(json_ptr).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in options JSON: {e}");
            return std::ptr::null_mut();
        }
    };

    match AppOptions::from_json_str(json_str) {
        Ok(options) => into_handle(Arc::new(options)),
        Err(e) => {
            warn!("❌ Failed to create options: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Returns a handle to the process-wide default options.
///
/// The first call reads the configured default source; later calls share the
/// same cached instance until [`options_reset_default`].
///
/// # Returns
///
/// Returns a pointer to an [`OptionsHandle`], or a null pointer when no
/// default configuration is available or it is malformed.
#[no_mangle]
pub extern "C" fn options_default() -> *mut OptionsHandle {
    match default_options() {
        Ok(options) => into_handle(options),
        Err(e) => {
            warn!("❌ No default options: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Points the process-wide default at a JSON file.
///
/// Any cached default is dropped; the next [`options_default`] reads the new
/// file.
///
/// # Parameters
///
/// * `path_ptr` - Null-terminated C string containing the file path
///
/// # Returns
///
/// Returns a JSON-formatted C string indicating success or failure.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn options_configure_default_source(path_ptr: *const c_char) -> *const c_char {
    let path = match c_ptr_to_string(path_ptr, "path") {
        Ok(path) => path,
        Err(error_ptr) => return error_ptr,
    };

    info!("Default options source configured: {path}");
    set_default_provider(JsonFileProvider::new(path.clone()));
    response_to_c_string(&AppResponse::success(format!("Default options source set to '{path}'")))
}

/// Drops the cached process-wide default options.
///
/// Intended for tests that simulate a cold start. Outstanding handles keep
/// the instance they already hold.
#[no_mangle]
pub extern "C" fn options_reset_default() -> *const c_char {
    reset_default_options();
    response_to_c_string(&AppResponse::success("Default options reset"))
}

/// Serializes all option values plus derived analytics and lock state.
///
/// # Parameters
///
/// * `handle` - Pointer to an options handle
///
/// # Returns
///
/// Returns a JSON-formatted C string; on success the `Ok` payload is the
/// JSON of an [`OptionsView`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use app_options_core::{options_create, options_to_json};
///
/// let json = CString::new(r#"{"API_KEY":"abc"}"#).unwrap();
/// let handle = options_create(json.as_ptr());
/// let report = options_to_json(handle);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn options_to_json(handle: *mut OptionsHandle) -> *const c_char {
    let handle = match unsafe { handle.as_ref() } {
        Some(h) => h,
        None => {
            let error = AppResponse::BadRequest("Null handle pointer passed to options_to_json".to_string());
            return response_to_c_string(&error);
        }
    };

    match serde_json::to_string(&handle.options.view()) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Sets a single option by its mapping key.
///
/// # Parameters
///
/// * `handle` - Pointer to an options handle
/// * `key_ptr` - Null-terminated C string with the option key, e.g. `API_KEY`
/// * `value_ptr` - Null-terminated C string with the JSON value, e.g. `"abc"`,
///   `true` or `null`
///
/// # Returns
///
/// Returns a JSON-formatted C string. Locked options answer with `Locked`.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use app_options_core::{options_create, options_set_value};
///
/// let json = CString::new(r#"{"API_KEY":"abc"}"#).unwrap();
/// let handle = options_create(json.as_ptr());
///
/// let key = CString::new("STORAGE_BUCKET").unwrap();
/// let value = CString::new(r#""demo.appspot.com""#).unwrap();
/// let result = options_set_value(handle, key.as_ptr(), value.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn options_set_value(
    handle: *mut OptionsHandle,
    key_ptr: *const c_char,
    value_ptr: *const c_char,
) -> *const c_char {
    let handle = match unsafe { handle.as_ref() } {
        Some(h) => h,
        None => {
            let error = AppResponse::BadRequest("Null handle pointer passed to options_set_value".to_string());
            return response_to_c_string(&error);
        }
    };

    let key = match c_ptr_to_string(key_ptr, "key") {
        Ok(key) => key,
        Err(error_ptr) => return error_ptr,
    };

    let value_json = match c_ptr_to_string(value_ptr, "value") {
        Ok(value) => value,
        Err(error_ptr) => return error_ptr,
    };

    let value: Value = match serde_json::from_str(&value_json) {
        Ok(v) => v,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid JSON value: {e}"));
            return response_to_c_string(&error);
        }
    };

    match handle.options.set_value(&key, &value) {
        Ok(()) => response_to_c_string(&AppResponse::success(format!("Option '{key}' updated"))),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Locks the options against further edits. Calling it again is a no-op.
///
/// # Parameters
///
/// * `handle` - Pointer to an options handle
///
/// # Returns
///
/// Returns a JSON-formatted C string indicating success or failure.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn options_lock(handle: *mut OptionsHandle) -> *const c_char {
    let handle = match unsafe { handle.as_ref() } {
        Some(h) => h,
        None => {
            let error = AppResponse::BadRequest("Null handle pointer passed to options_lock".to_string());
            return response_to_c_string(&error);
        }
    };

    handle.options.lock();
    response_to_c_string(&AppResponse::success("Options locked"))
}

/// Returns whether the options are locked. A null handle reads as `false`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn options_is_editing_locked(handle: *mut OptionsHandle) -> bool {
    match unsafe { handle.as_ref() } {
        Some(h) => h.options.is_editing_locked(),
        None => {
            warn!("Null handle pointer passed to options_is_editing_locked");
            false
        }
    }
}

/// Releases a handle returned by [`options_create`] or [`options_default`].
///
/// Releasing a default-options handle does not clear the cached default.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn options_release(handle: *mut OptionsHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}

/// Frees a string returned by any function of this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_c_string(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr as *mut c_char) });
}

fn into_handle(options: Arc<AppOptions>) -> *mut OptionsHandle {
    Box::into_raw(Box::new(OptionsHandle { options }))
}

/// Converts an [`AppResponse`] to a C-compatible string.
///
/// # Returns
///
/// Returns a pointer to a null-terminated C string containing the JSON
/// response, or a null pointer if serialization or C string creation fails.
/// The caller frees it with [`free_c_string`].
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust String.
///
/// # Returns
///
/// * `Ok(String)` - If conversion was successful
/// * `Err(*const c_char)` - Pointer to a `BadRequest` response if the pointer
///   was null or the bytes were not UTF-8
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
