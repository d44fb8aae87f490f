// src/exec/encoding.rs

//! Decoding raw process output into text.
//!
//! Console programs on Windows write in the OEM code page; everywhere else
//! output is taken to be UTF-8. Invalid sequences are replaced, never
//! rejected.

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    #[default]
    Utf8,
    /// A Windows code page identifier.
    CodePage(u32),
}

impl OutputEncoding {
    /// The host's console encoding, or UTF-8 when it cannot be determined.
    pub fn detect() -> Self {
        match oem_code_page() {
            Some(code_page) => {
                debug!(code_page, "decoding process output with the OEM code page");
                OutputEncoding::CodePage(code_page)
            }
            None => {
                if cfg!(windows) {
                    warn!("could not determine the OEM code page; falling back to UTF-8");
                }
                OutputEncoding::Utf8
            }
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            OutputEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            OutputEncoding::CodePage(code_page) => decode_code_page(*code_page, bytes)
                .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

#[cfg(windows)]
fn oem_code_page() -> Option<u32> {
    // SAFETY: GetOEMCP takes no arguments and only reads process state.
    let code_page = unsafe { windows_sys::Win32::Globalization::GetOEMCP() };
    (code_page != 0).then_some(code_page)
}

#[cfg(not(windows))]
fn oem_code_page() -> Option<u32> {
    None
}

#[cfg(windows)]
fn decode_code_page(code_page: u32, bytes: &[u8]) -> Option<String> {
    use windows_sys::Win32::Globalization::MultiByteToWideChar;

    if bytes.is_empty() {
        return Some(String::new());
    }
    let len = i32::try_from(bytes.len()).ok()?;

    // SAFETY: a null output buffer with length 0 asks for the required size.
    let needed =
        unsafe { MultiByteToWideChar(code_page, 0, bytes.as_ptr(), len, std::ptr::null_mut(), 0) };
    if needed <= 0 {
        return None;
    }

    let mut wide = vec![0u16; usize::try_from(needed).ok()?];
    // SAFETY: `wide` holds exactly `needed` elements.
    let written = unsafe {
        MultiByteToWideChar(code_page, 0, bytes.as_ptr(), len, wide.as_mut_ptr(), needed)
    };
    if written <= 0 {
        return None;
    }
    wide.truncate(usize::try_from(written).ok()?);
    Some(String::from_utf16_lossy(&wide))
}

#[cfg(not(windows))]
fn decode_code_page(_code_page: u32, _bytes: &[u8]) -> Option<String> {
    None
}
