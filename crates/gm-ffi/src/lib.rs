//! C FFI bindings for gm-core
//!
//! This crate provides a C-compatible API so a UI host can drive one merge
//! session: load files, adjust sheet settings, merge and export.

use gm_core::{Error, ExportFormat, FileId, LoadedFile, Session, Settings};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

/// Merge succeeded
pub const GM_OK: i32 = 0;
/// Merge ran but no rows survived filtering
pub const GM_EMPTY_RESULT: i32 = 1;
/// Merge failed unexpectedly
pub const GM_MERGE_FAILED: i32 = 2;
/// Bad arguments or any other error
pub const GM_ERROR: i32 = 3;

/// Opaque handle to a merge session
pub struct GmSession {
    inner: Session,
    last_error: Option<CString>,
}

impl GmSession {
    fn fail(&mut self, err: &Error) {
        self.last_error = CString::new(err.to_string()).ok();
    }

    unsafe fn arg_str<'a>(&mut self, s: *const c_char, what: &str) -> Option<&'a str> {
        let value = to_str(s);
        if value.is_none() {
            self.fail(&Error::InvalidArgument(format!("{} must be a UTF-8 string", what)));
        }
        value
    }

    unsafe fn arg_file_id(&mut self, s: *const c_char) -> Option<FileId> {
        let raw = self.arg_str(s, "file id")?;
        let id = FileId::parse(raw);
        if id.is_none() {
            self.fail(&Error::FileNotFound(raw.to_string()));
        }
        id
    }
}

/// Status code for a failed merge
fn merge_status(err: &Error) -> i32 {
    match err {
        Error::EmptyResult => GM_EMPTY_RESULT,
        Error::MergeFailed(_) => GM_MERGE_FAILED,
        _ => GM_ERROR,
    }
}

unsafe fn to_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        None
    } else {
        CStr::from_ptr(s).to_str().ok()
    }
}

fn into_c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// Create a session with default settings
#[no_mangle]
pub extern "C" fn gm_session_new() -> *mut GmSession {
    Box::into_raw(Box::new(GmSession {
        inner: Session::new(Settings::default()),
        last_error: None,
    }))
}

/// Free a session
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new` or null
#[no_mangle]
pub unsafe extern "C" fn gm_session_free(session: *mut GmSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Load a file into the session
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - `path` must be a valid C string
/// - Returns the new file id, or null on error (see `gm_session_last_error`)
/// - Caller must free the returned string with `gm_free_string`
#[no_mangle]
pub unsafe extern "C" fn gm_session_load_file(session: *mut GmSession, path: *const c_char) -> *mut c_char {
    let Some(session) = session.as_mut() else {
        return ptr::null_mut();
    };
    let Some(path) = session.arg_str(path, "path") else {
        return ptr::null_mut();
    };

    match gm_core::load_path(Path::new(path), session.inner.settings()) {
        Ok(loaded) => {
            let id = session.inner.add_loaded(loaded);
            into_c_string(id.to_string())
        }
        Err(e) => {
            session.fail(&e);
            ptr::null_mut()
        }
    }
}

/// Load in-memory file bytes; `name` selects the format by extension
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - `name` must be a valid C string
/// - `data` must point to `len` readable bytes
/// - Caller must free the returned string with `gm_free_string`
#[no_mangle]
pub unsafe extern "C" fn gm_session_load_bytes(
    session: *mut GmSession,
    name: *const c_char,
    data: *const u8,
    len: usize,
) -> *mut c_char {
    let Some(session) = session.as_mut() else {
        return ptr::null_mut();
    };
    let Some(name) = session.arg_str(name, "name") else {
        return ptr::null_mut();
    };
    if data.is_null() {
        session.fail(&Error::InvalidArgument("data must not be null".to_string()));
        return ptr::null_mut();
    }

    let bytes = std::slice::from_raw_parts(data, len).to_vec();
    match gm_core::decode_bytes(name, bytes) {
        Ok(grids) => {
            let mut loaded = LoadedFile::from_bundle(name, grids, session.inner.settings());
            loaded.entry.size = len as u64;
            let id = session.inner.add_loaded(loaded);
            into_c_string(id.to_string())
        }
        Err(e) => {
            session.fail(&e);
            ptr::null_mut()
        }
    }
}

/// Get the number of loaded files
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
#[no_mangle]
pub unsafe extern "C" fn gm_session_file_count(session: *const GmSession) -> usize {
    match session.as_ref() {
        Some(s) => s.inner.store().len(),
        None => 0,
    }
}

/// Flip a sheet's inclusion flag. Returns 1 if now enabled, 0 if disabled, -1 on error.
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - `file_id` and `sheet` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn gm_session_toggle_sheet(
    session: *mut GmSession,
    file_id: *const c_char,
    sheet: *const c_char,
) -> i32 {
    let Some(session) = session.as_mut() else {
        return -1;
    };
    let Some(id) = session.arg_file_id(file_id) else {
        return -1;
    };
    let Some(sheet) = session.arg_str(sheet, "sheet") else {
        return -1;
    };

    match session.inner.toggle_sheet(&id, sheet) {
        Ok(enabled) => i32::from(enabled),
        Err(e) => {
            session.fail(&e);
            -1
        }
    }
}

/// Set a sheet's header row (clamped to at least 1). Returns the stored value, or 0 on error.
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - `file_id` and `sheet` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn gm_session_set_header_row(
    session: *mut GmSession,
    file_id: *const c_char,
    sheet: *const c_char,
    row: usize,
) -> usize {
    let Some(session) = session.as_mut() else {
        return 0;
    };
    let Some(id) = session.arg_file_id(file_id) else {
        return 0;
    };
    let Some(sheet) = session.arg_str(sheet, "sheet") else {
        return 0;
    };

    session.inner.set_header_row(&id, sheet, row).unwrap_or_else(|e| {
        session.fail(&e);
        0
    })
}

/// Set a sheet's data start row (clamped to at least 1). Returns the stored value, or 0 on error.
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - `file_id` and `sheet` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn gm_session_set_data_start_row(
    session: *mut GmSession,
    file_id: *const c_char,
    sheet: *const c_char,
    row: usize,
) -> usize {
    let Some(session) = session.as_mut() else {
        return 0;
    };
    let Some(id) = session.arg_file_id(file_id) else {
        return 0;
    };
    let Some(sheet) = session.arg_str(sheet, "sheet") else {
        return 0;
    };

    session.inner.set_data_start_row(&id, sheet, row).unwrap_or_else(|e| {
        session.fail(&e);
        0
    })
}

/// Remove a file and its grids. Returns 0 on success, -1 on error.
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - `file_id` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gm_session_remove_file(session: *mut GmSession, file_id: *const c_char) -> i32 {
    let Some(session) = session.as_mut() else {
        return -1;
    };
    let Some(id) = session.arg_file_id(file_id) else {
        return -1;
    };

    match session.inner.remove_file(&id) {
        Ok(()) => 0,
        Err(e) => {
            session.fail(&e);
            -1
        }
    }
}

/// Merge all loaded files. Returns one of the `GM_*` status codes.
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
#[no_mangle]
pub unsafe extern "C" fn gm_session_merge(session: *mut GmSession) -> i32 {
    let Some(session) = session.as_mut() else {
        return GM_ERROR;
    };

    let err = match session.inner.run_merge() {
        Ok(_) => return GM_OK,
        Err(e) => e,
    };
    session.fail(&err);
    merge_status(&err)
}

/// Get the row count of the held result (0 if none)
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
#[no_mangle]
pub unsafe extern "C" fn gm_session_result_row_count(session: *const GmSession) -> usize {
    session
        .as_ref()
        .and_then(|s| s.inner.result())
        .map(|t| t.row_count())
        .unwrap_or(0)
}

/// Get the header count of the held result (0 if none)
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
#[no_mangle]
pub unsafe extern "C" fn gm_session_result_col_count(session: *const GmSession) -> usize {
    session
        .as_ref()
        .and_then(|s| s.inner.result())
        .map(|t| t.column_count())
        .unwrap_or(0)
}

/// Get a header by index
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - Returns null if there is no result or index is out of bounds
/// - Caller must free the returned string with `gm_free_string`
#[no_mangle]
pub unsafe extern "C" fn gm_session_header(session: *const GmSession, index: usize) -> *mut c_char {
    session
        .as_ref()
        .and_then(|s| s.inner.result())
        .and_then(|t| t.headers.get(index))
        .map(|h| into_c_string(h.as_str()))
        .unwrap_or(ptr::null_mut())
}

/// Get a cell of the held result as text
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - Returns null if row or col is out of bounds
/// - Caller must free the returned string with `gm_free_string`
#[no_mangle]
pub unsafe extern "C" fn gm_session_cell(session: *const GmSession, row: usize, col: usize) -> *mut c_char {
    session
        .as_ref()
        .and_then(|s| s.inner.result())
        .and_then(|t| t.cell(row, col))
        .map(|c| into_c_string(c.render()))
        .unwrap_or(ptr::null_mut())
}

/// Get the loaded files and their sheet settings as JSON
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - Caller must free the returned string with `gm_free_string`
#[no_mangle]
pub unsafe extern "C" fn gm_session_config_json(session: *const GmSession) -> *mut c_char {
    let Some(session) = session.as_ref() else {
        return ptr::null_mut();
    };

    serde_json::to_string(session.inner.store().files())
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Export the held result into `dir`; `format` is "xlsx", "csv" or "json"
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - `dir` and `format` must be valid C strings
/// - Returns the written path, or null on error
/// - Caller must free the returned string with `gm_free_string`
#[no_mangle]
pub unsafe extern "C" fn gm_session_export(
    session: *mut GmSession,
    dir: *const c_char,
    format: *const c_char,
) -> *mut c_char {
    let Some(session) = session.as_mut() else {
        return ptr::null_mut();
    };
    let Some(dir) = session.arg_str(dir, "dir") else {
        return ptr::null_mut();
    };
    let Some(format) = session.arg_str(format, "format") else {
        return ptr::null_mut();
    };

    let now = chrono::Local::now().naive_local();
    let result = format
        .parse::<ExportFormat>()
        .and_then(|f| session.inner.export(dir, f, now));

    match result {
        Ok(path) => into_c_string(path.to_string_lossy().into_owned()),
        Err(e) => {
            session.fail(&e);
            ptr::null_mut()
        }
    }
}

/// Last error message recorded on the session, or null
///
/// # Safety
/// - `session` must be a valid pointer returned by `gm_session_new`
/// - Caller must free the returned string with `gm_free_string`
#[no_mangle]
pub unsafe extern "C" fn gm_session_last_error(session: *const GmSession) -> *mut c_char {
    session
        .as_ref()
        .and_then(|s| s.last_error.clone())
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a gm_* function or null
#[no_mangle]
pub unsafe extern "C" fn gm_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let owned = CStr::from_ptr(s).to_str().unwrap().to_string();
        gm_free_string(s);
        owned
    }

    #[test]
    fn test_session_round() {
        unsafe {
            let session = gm_session_new();
            let csv = b"Name,Age\nAl,30\n,\n";
            let name = CString::new("people.csv").unwrap();
            let id = take(gm_session_load_bytes(session, name.as_ptr(), csv.as_ptr(), csv.len()));
            assert_eq!(gm_session_file_count(session), 1);

            assert_eq!(gm_session_merge(session), GM_OK);
            assert_eq!(gm_session_result_row_count(session), 1);
            assert_eq!(gm_session_result_col_count(session), 2);
            assert_eq!(take(gm_session_header(session, 1)), "Age");
            assert_eq!(take(gm_session_cell(session, 0, 1)), "30");
            assert!(gm_session_cell(session, 0, 5).is_null());

            let id = CString::new(id).unwrap();
            let sheet = CString::new("Sheet1").unwrap();
            assert_eq!(gm_session_set_data_start_row(session, id.as_ptr(), sheet.as_ptr(), 9), 9);
            assert_eq!(gm_session_merge(session), GM_EMPTY_RESULT);
            assert!(take(gm_session_last_error(session)).contains("empty"));
            // previous result survives the failed merge
            assert_eq!(gm_session_result_row_count(session), 1);

            assert_eq!(gm_session_toggle_sheet(session, id.as_ptr(), sheet.as_ptr()), 0);
            let config = take(gm_session_config_json(session));
            assert!(config.contains("\"enabled\":false"));

            assert_eq!(gm_session_remove_file(session, id.as_ptr()), 0);
            assert_eq!(gm_session_result_row_count(session), 0);
            assert_eq!(gm_session_merge(session), GM_ERROR);

            gm_session_free(session);
        }
    }

    #[test]
    fn test_null_tolerance() {
        unsafe {
            assert_eq!(gm_session_file_count(ptr::null()), 0);
            assert_eq!(gm_session_merge(ptr::null_mut()), GM_ERROR);
            assert!(gm_session_load_file(ptr::null_mut(), ptr::null()).is_null());
            assert!(gm_session_last_error(ptr::null()).is_null());
            gm_session_free(ptr::null_mut());
            gm_free_string(ptr::null_mut());
        }
    }

    #[test]
    fn test_merge_status_codes() {
        assert_eq!(merge_status(&Error::EmptyResult), GM_EMPTY_RESULT);
        let fault = Error::MergeFailed(Box::new(Error::GridUnavailable {
            file: "a.xlsx".to_string(),
            message: "gone".to_string(),
        }));
        assert_eq!(merge_status(&fault), GM_MERGE_FAILED);
        assert_eq!(merge_status(&Error::NoFiles), GM_ERROR);
    }

    #[test]
    fn test_bad_file_id() {
        unsafe {
            let session = gm_session_new();
            let bogus = CString::new("nope").unwrap();
            let sheet = CString::new("Sheet1").unwrap();
            assert_eq!(gm_session_toggle_sheet(session, bogus.as_ptr(), sheet.as_ptr()), -1);
            assert!(take(gm_session_last_error(session)).contains("nope"));
            assert_eq!(gm_session_remove_file(session, bogus.as_ptr()), -1);

            assert_eq!(gm_session_set_header_row(session, ptr::null(), sheet.as_ptr(), 2), 0);
            assert!(take(gm_session_last_error(session)).contains("file id"));
            assert!(gm_session_export(session, ptr::null(), sheet.as_ptr()).is_null());
            assert!(take(gm_session_last_error(session)).contains("dir"));
            gm_session_free(session);
        }
    }
}
