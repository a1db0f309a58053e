//! Pinning of the numeric locale around library calls
//!
//! The PDF library parses real numbers with the C runtime, which honours
//! `LC_NUMERIC`. Under a locale with a decimal comma, "0.5" parses as 0.

use std::ffi::{CStr, CString};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

static LOCALE_LOCK: Mutex<()> = Mutex::new(());

/// Sets `LC_NUMERIC` to "C" until dropped, then restores the previous value.
///
/// The locale is process state, so guards are serialized: a second guard
/// blocks until the first one has been dropped.
pub struct NumericLocaleGuard {
    previous: Option<CString>,
    _lock: MutexGuard<'static, ()>,
}

impl NumericLocaleGuard {
    #[must_use]
    pub fn pin_c() -> Self {
        let lock = LOCALE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        // SAFETY: a null locale argument only queries; the returned string is
        // copied before the next setlocale call can overwrite it.
        let previous = unsafe {
            let current = libc::setlocale(libc::LC_NUMERIC, std::ptr::null());
            (!current.is_null()).then(|| CStr::from_ptr(current).to_owned())
        };

        // SAFETY: the argument is a valid NUL-terminated string.
        let set = unsafe { libc::setlocale(libc::LC_NUMERIC, c"C".as_ptr()) };
        if set.is_null() {
            warn!("Could not switch LC_NUMERIC to \"C\"");
        }

        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for NumericLocaleGuard {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        // SAFETY: `previous` is a valid NUL-terminated string we own.
        let restored = unsafe { libc::setlocale(libc::LC_NUMERIC, previous.as_ptr()) };
        if restored.is_null() {
            warn!("Could not restore LC_NUMERIC to {previous:?}");
        } else {
            debug!("Restored LC_NUMERIC to {previous:?}");
        }
    }
}

/// Current `LC_NUMERIC` value, for diagnostics and tests
#[must_use]
pub fn current_numeric_locale() -> Option<String> {
    let _lock = LOCALE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    // SAFETY: query only, copied immediately.
    unsafe {
        let current = libc::setlocale(libc::LC_NUMERIC, std::ptr::null());
        (!current.is_null()).then(|| CStr::from_ptr(current).to_string_lossy().into_owned())
    }
}
