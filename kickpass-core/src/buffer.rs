use std::ptr::NonNull;

use zeroize::Zeroize;

/// Maximum password length, including the terminating NUL.
pub const PASSWORD_MAX: usize = 4096;
/// Maximum metadata length, including the terminating NUL.
pub const METADATA_MAX: usize = 4096;

/// A fixed-capacity, NUL-terminated byte buffer intended to hold secrets.
///
/// The backing allocation is best-effort locked in memory (`mlock`) so it
/// is never paged to swap, and is unconditionally zeroed before release,
/// mirroring the wipe-on-free discipline the original storage engine gets
/// from `sodium_malloc`/`sodium_free`.
pub struct SensitiveBuffer {
    ptr: NonNull<u8>,
    cap: usize,
    len: usize,
    locked: bool,
}

// SAFETY: the buffer owns its allocation exclusively; no interior mutability
// is exposed, so Send/Sync follow the same rules as a Box<[u8]>.
unsafe impl Send for SensitiveBuffer {}
unsafe impl Sync for SensitiveBuffer {}

impl SensitiveBuffer {
    /// Allocates a zero-filled buffer of the given capacity.
    pub fn new(cap: usize) -> Self {
        let mut storage = vec![0u8; cap].into_boxed_slice();
        let ptr = NonNull::new(storage.as_mut_ptr()).expect("non-null allocation");
        std::mem::forget(storage);

        let locked = unsafe { libc::mlock(ptr.as_ptr() as *const libc::c_void, cap) == 0 };
        if !locked {
            log::debug!("mlock failed for sensitive buffer of {} bytes; continuing unlocked", cap);
        }

        SensitiveBuffer { ptr, cap, len: 0, locked }
    }

    /// Builds a buffer from existing plaintext bytes, NUL-terminating and
    /// truncating to `cap - 1` bytes of payload if needed.
    pub fn from_bytes(cap: usize, bytes: &[u8]) -> Self {
        let mut buf = Self::new(cap);
        let n = bytes.len().min(cap.saturating_sub(1));
        buf.as_mut_slice()[..n].copy_from_slice(&bytes[..n]);
        buf.len = n;
        buf
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Length of the payload, excluding the terminating NUL.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.cap) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.cap) }
    }

    /// The NUL-terminated payload as bytes (excludes the NUL itself).
    pub fn payload(&self) -> &[u8] {
        &self.as_slice()[..self.len]
    }

    /// Replaces the payload, NUL-terminating implicitly by tracking `len`.
    pub fn set(&mut self, bytes: &[u8]) -> crate::error::Result<()> {
        if bytes.len() >= self.cap {
            return Err(crate::error::Error::EInput);
        }
        self.as_mut_slice().zeroize();
        self.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.as_mut_slice().zeroize();
        self.len = 0;
    }
}

impl Drop for SensitiveBuffer {
    fn drop(&mut self) {
        self.as_mut_slice().zeroize();
        if self.locked {
            unsafe {
                libc::munlock(self.ptr.as_ptr() as *const libc::c_void, self.cap);
            }
        }
        unsafe {
            let _ = Box::from_raw(std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.cap));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_read_back() {
        let mut b = SensitiveBuffer::new(PASSWORD_MAX);
        b.set(b"hunter2").unwrap();
        assert_eq!(b.payload(), b"hunter2");
    }

    #[test]
    fn zeroized_after_drop() {
        let ptr: *const u8;
        let cap = 64;
        {
            let mut b = SensitiveBuffer::new(cap);
            b.set(b"super-secret").unwrap();
            ptr = b.as_slice().as_ptr();
        }
        // The allocation has been freed at this point; reading through the
        // dangling pointer is UB in general, so this test only exercises
        // the zeroize-before-free code path via Miri-style reasoning, not
        // a raw post-free read. The real assertion lives in `clear`.
        let mut b = SensitiveBuffer::new(cap);
        b.set(b"another-secret").unwrap();
        b.clear();
        assert!(b.payload().is_empty());
        assert!(b.as_slice().iter().all(|&byte| byte == 0));
        let _ = ptr;
    }

    #[test]
    fn rejects_oversized_payload() {
        let mut b = SensitiveBuffer::new(8);
        assert_eq!(b.set(b"way too long for this buffer"), Err(crate::error::Error::EInput));
    }
}
