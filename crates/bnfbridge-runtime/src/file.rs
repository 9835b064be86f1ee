//! C stdio file handles passed to the native parser.

use std::{
    ffi::CString,
    io,
    os::raw::{c_char, c_int},
    path::{Path, PathBuf},
    ptr::NonNull,
};

/// Opaque C `FILE` object.
#[repr(C)]
pub struct FILE {
    _private: [u8; 0],
}

extern "C" {
    fn fopen(path: *const c_char, mode: *const c_char) -> *mut FILE;
    fn fclose(stream: *mut FILE) -> c_int;
}

#[derive(Debug, thiserror::Error)]
pub enum NativeFileError {
    #[error("the path `{}' is not valid UTF-8", _0.display())]
    NonUtf8Path(PathBuf),

    #[error("the path `{}' contains an interior NUL byte", _0.display())]
    InteriorNul(PathBuf),

    #[error("failed to open `{}': {}", path.display(), source)]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A `FILE*` opened for reading.
///
/// The stream is closed when the value is dropped, so every exit path of the
/// caller releases it.
#[derive(Debug)]
pub struct NativeFile {
    stream: NonNull<FILE>,
}

impl NativeFile {
    pub fn open(path: &Path) -> Result<Self, NativeFileError> {
        let name = path
            .to_str()
            .ok_or_else(|| NativeFileError::NonUtf8Path(path.to_owned()))?;
        let name = CString::new(name).map_err(|_| NativeFileError::InteriorNul(path.to_owned()))?;

        // SAFETY: both arguments are valid NUL-terminated strings.
        let stream = unsafe { fopen(name.as_ptr(), b"r\0".as_ptr().cast()) };
        match NonNull::new(stream) {
            Some(stream) => Ok(Self { stream }),
            None => Err(NativeFileError::Open {
                path: path.to_owned(),
                source: io::Error::last_os_error(),
            }),
        }
    }

    /// Return the raw stream, to be handed to the native parse function.
    ///
    /// The pointer stays valid as long as `self` is alive.
    pub fn as_ptr(&self) -> *mut FILE {
        self.stream.as_ptr()
    }
}

impl Drop for NativeFile {
    fn drop(&mut self) {
        // SAFETY: the stream was returned by `fopen` and is closed only here.
        unsafe {
            fclose(self.stream.as_ptr());
        }
    }
}
