use std::fmt;

/// Opaque handle returned when a system is enabled.
///
/// Handles are never reused within one registry, so a handle kept after
/// `disable_system` simply stops matching anything.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub(crate) fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Return the raw value backing this handle.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_numbered_handle() {
        assert_eq!(SystemHandle::new(3).to_string(), "#3");
        assert_eq!(SystemHandle::new(3).raw(), 3);
        assert_ne!(SystemHandle::new(3), SystemHandle::new(4));
    }
}
