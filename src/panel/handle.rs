//! Button handles and page/subpage ID ranges

use serde::{Deserialize, Serialize};
use std::fmt;

/// First ID of a regular subpage (popup); lower IDs are user pages
pub const REGULAR_SUBPAGE_START: u16 = 500;
/// First ID of a system page
pub const SYSTEM_PAGE_START: u16 = 5000;
/// First ID of a system subpage
pub const SYSTEM_SUBPAGE_START: u16 = 5500;

/// Kind of surface an ID refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Page,
    SubPage,
}

impl SurfaceKind {
    /// Classify an ID by its range
    pub fn of(id: u16) -> Self {
        if id < REGULAR_SUBPAGE_START || (SYSTEM_PAGE_START..SYSTEM_SUBPAGE_START).contains(&id) {
            SurfaceKind::Page
        } else {
            SurfaceKind::SubPage
        }
    }
}

/// True for the reserved system page and subpage ranges
pub fn is_system_id(id: u16) -> bool {
    id >= SYSTEM_PAGE_START
}

/// 32-bit handle identifying a button: parent ID in the high 16 bits,
/// button index in the low 16 bits.
///
/// Index 0 is never used by a button and denotes the page or subpage itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ButtonHandle(u32);

impl ButtonHandle {
    pub fn new(parent_id: u16, index: u16) -> Self {
        Self(((parent_id as u32) << 16) | index as u32)
    }

    /// Handle of a page or subpage surface
    pub fn for_surface(id: u16) -> Self {
        Self::new(id, 0)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn parent_id(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn index(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn is_surface(self) -> bool {
        self.index() == 0
    }
}

impl fmt::Display for ButtonHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x} ({}:{})", self.0, self.parent_id(), self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_packing() {
        let handle = ButtonHandle::new(501, 17);
        assert_eq!(handle.raw(), (501 << 16) | 17);
        assert_eq!(handle.parent_id(), 501);
        assert_eq!(handle.index(), 17);
        assert!(!handle.is_surface());
        assert!(ButtonHandle::for_surface(3).is_surface());
        assert_eq!(ButtonHandle::from_raw(handle.raw()), handle);
    }

    #[test]
    fn test_surface_kind() {
        assert_eq!(SurfaceKind::of(1), SurfaceKind::Page);
        assert_eq!(SurfaceKind::of(499), SurfaceKind::Page);
        assert_eq!(SurfaceKind::of(500), SurfaceKind::SubPage);
        assert_eq!(SurfaceKind::of(5001), SurfaceKind::Page);
        assert_eq!(SurfaceKind::of(5600), SurfaceKind::SubPage);
        assert!(is_system_id(5001));
        assert!(!is_system_id(42));
    }
}
