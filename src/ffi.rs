//! FFI bindings for Synheart Reps
//!
//! This module provides C-compatible functions for calling the rep counter from
//! other languages (typically the mobile app hosting the pose estimator).
//! All functions use C strings (null-terminated) and return allocated memory
//! that must be freed by the caller using `reps_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::exercises::ExerciseKind;
use crate::pipeline::{count_reps, RepProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Non-positive targets mean free practice
fn target_from_c(target_reps: i32) -> Option<u32> {
    u32::try_from(target_reps).ok().filter(|&t| t > 0)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Count reps in a recorded batch of pose frames.
///
/// # Safety
/// - `exercise_id` and `frames_json` must be valid null-terminated C strings.
/// - `frames_json` may be a JSON array or NDJSON.
/// - `target_reps` <= 0 disables challenge mode.
/// - Returns a newly allocated summary JSON string that must be freed with `reps_free_string`.
/// - Returns NULL on error; call `reps_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn reps_count_reps(
    exercise_id: *const c_char,
    frames_json: *const c_char,
    target_reps: i32,
) -> *mut c_char {
    clear_last_error();

    let exercise_str = match cstr_to_string(exercise_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid exercise_id string pointer");
            return ptr::null_mut();
        }
    };

    let frames_str = match cstr_to_string(frames_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frames JSON string pointer");
            return ptr::null_mut();
        }
    };

    match count_reps(exercise_str, frames_str, target_from_c(target_reps)) {
        Ok(summary) => string_to_cstr(&summary),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a RepProcessor
pub struct RepProcessorHandle {
    processor: RepProcessor,
}

/// Create a new RepProcessor for an exercise.
///
/// # Safety
/// - `exercise_id` must be a valid null-terminated C string.
/// - `target_reps` <= 0 disables challenge mode.
/// - Returns a pointer to a newly allocated RepProcessor.
/// - Must be freed with `reps_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn reps_processor_new(
    exercise_id: *const c_char,
    target_reps: i32,
) -> *mut RepProcessorHandle {
    clear_last_error();

    let exercise = match cstr_to_string(exercise_id).map(|s| s.parse::<ExerciseKind>()) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
        None => {
            set_last_error("Invalid exercise_id string pointer");
            return ptr::null_mut();
        }
    };

    let mut processor = match RepProcessor::new(exercise) {
        Ok(p) => p,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    if let Some(target) = target_from_c(target_reps) {
        processor = processor.with_target_reps(target);
    }

    let handle = Box::new(RepProcessorHandle { processor });
    Box::into_raw(handle)
}

/// Free a RepProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `reps_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn reps_processor_free(processor: *mut RepProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Feed one pose frame to a stateful processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `reps_processor_new`.
/// - `frame_json` must be a valid null-terminated C string holding one PoseFrame.
/// - Returns a newly allocated frame outcome JSON string that must be freed with `reps_free_string`.
/// - Returns NULL on error; call `reps_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn reps_processor_process_frame(
    processor: *mut RepProcessorHandle,
    frame_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let frame_str = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.processor.process_frame_json(&frame_str) {
        Ok(outcome) => string_to_cstr(&outcome),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Current session statistics as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `reps_processor_new`.
/// - Returns a newly allocated string that must be freed with `reps_free_string`.
/// - Returns NULL on error; call `reps_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn reps_processor_stats(processor: *mut RepProcessorHandle) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    match handle.processor.stats_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Switch a processor to another exercise, starting a fresh session.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `reps_processor_new`.
/// - `exercise_id` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `reps_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn reps_processor_select_exercise(
    processor: *mut RepProcessorHandle,
    exercise_id: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let exercise = match cstr_to_string(exercise_id).map(|s| s.parse::<ExerciseKind>()) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            set_last_error(&e.to_string());
            return -1;
        }
        None => {
            set_last_error("Invalid exercise_id string pointer");
            return -1;
        }
    };

    match handle.processor.select_exercise(exercise) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Discard session progress and restart the current exercise.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `reps_processor_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn reps_processor_reset(processor: *mut RepProcessorHandle) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;
    handle.processor.reset();
    0
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Reps functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Reps function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn reps_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Reps function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn reps_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Reps library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn reps_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
