use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::*;

use crate::error::WasapiError;

/// RAII guard that balances a successful `CoInitializeEx` with `CoUninitialize`.
pub(crate) struct ComGuard {
    owned: bool,
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.owned {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Join the multithreaded apartment on the calling thread.
///
/// A thread already in a single-threaded apartment keeps it; WASAPI
/// interfaces are agile so calls still work, and the guard does not
/// uninitialize what it did not initialize.
pub(crate) fn initialize_mta() -> Result<ComGuard, WasapiError> {
    let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
    if hr == RPC_E_CHANGED_MODE {
        return Ok(ComGuard { owned: false });
    }
    hr.ok().map_err(|e| WasapiError::ComInit(e.to_string()))?;
    Ok(ComGuard { owned: true })
}

/// Run `f` with COM initialized on the calling thread.
pub(crate) fn with_mta<T>(f: impl FnOnce() -> Result<T, WasapiError>) -> Result<T, WasapiError> {
    let _guard = initialize_mta()?;
    f()
}
