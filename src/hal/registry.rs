// Handle Registry - assignment and validation of gesture handles
//
// A module exposes at most GESTURE_HANDLE_COUNT (256) handles. Each handle
// is reserved once and stays valid for the module's lifetime.

use gesture_transport::GestureHandle;

use super::constants::GESTURE_HANDLE_COUNT;
use crate::error::HalError;

/// Tracks which of the 256 handles are taken
#[derive(Debug, Clone)]
pub struct HandleRegistry {
    taken: [bool; GESTURE_HANDLE_COUNT],
    len: usize,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            taken: [false; GESTURE_HANDLE_COUNT],
            len: 0,
        }
    }

    /// Convert a raw integer into a handle, rejecting values outside the 8-bit space
    pub fn validate(raw: i32) -> Result<GestureHandle, HalError> {
        GestureHandle::try_from(raw).map_err(|e| HalError::InvalidArgument(e.to_string()))
    }

    /// Claim a specific handle
    pub fn reserve(&mut self, handle: GestureHandle) -> Result<GestureHandle, HalError> {
        let slot = &mut self.taken[usize::from(handle.get())];
        if *slot {
            return Err(HalError::InvalidArgument(format!(
                "handle {handle} already assigned"
            )));
        }
        *slot = true;
        self.len += 1;
        Ok(handle)
    }

    /// Claim the lowest free handle
    pub fn allocate(&mut self) -> Result<GestureHandle, HalError> {
        let index = self
            .taken
            .iter()
            .position(|taken| !taken)
            .ok_or_else(|| {
                HalError::InvalidArgument(format!(
                    "all {GESTURE_HANDLE_COUNT} handles assigned"
                ))
            })?;
        // index < 256 by construction
        self.reserve(GestureHandle::new(index as u8))
    }

    pub fn contains(&self, handle: GestureHandle) -> bool {
        self.taken[usize::from(handle.get())]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        assert!(HandleRegistry::validate(0).is_ok());
        assert!(HandleRegistry::validate(255).is_ok());
        assert!(matches!(
            HandleRegistry::validate(256),
            Err(HalError::InvalidArgument(_))
        ));
        assert!(HandleRegistry::validate(-7).is_err());
    }

    #[test]
    fn test_duplicate_reserve_rejected() {
        let mut reg = HandleRegistry::new();
        reg.reserve(GestureHandle::new(2)).unwrap();
        assert!(reg.reserve(GestureHandle::new(2)).is_err());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_allocate_skips_reserved() {
        let mut reg = HandleRegistry::new();
        reg.reserve(GestureHandle::new(0)).unwrap();
        reg.reserve(GestureHandle::new(1)).unwrap();
        assert_eq!(reg.allocate().unwrap(), GestureHandle::new(2));
        assert!(reg.contains(GestureHandle::new(2)));
    }

    #[test]
    fn test_exhaustion() {
        let mut reg = HandleRegistry::new();
        for _ in 0..GESTURE_HANDLE_COUNT {
            reg.allocate().unwrap();
        }
        assert_eq!(reg.len(), 256);
        assert!(reg.allocate().is_err());
    }
}
