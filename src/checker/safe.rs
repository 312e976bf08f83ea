use std::cell::Cell;

use tracing::info;

/// Caller-owned "assume safe" flag with stack discipline.
///
/// Entering a scope saves the previous value and the returned guard puts it
/// back when dropped, including while unwinding, so nested scopes compose.
#[derive(Debug, Default)]
pub struct SafeOverride {
    active: Cell<bool>,
}

impl SafeOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    #[must_use = "the override ends when the guard is dropped"]
    pub fn assume_safe(&self) -> SafeGuard<'_> {
        let previous = self.active.replace(true);
        info!(nested = previous, "entering safety-assured scope");
        SafeGuard {
            flag: &self.active,
            previous,
        }
    }

    /// Run `f` with checking disabled.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.assume_safe();
        f()
    }
}

#[derive(Debug)]
pub struct SafeGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl Drop for SafeGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}
