//! Binding scopes.
//!
//! A scope decides whether a resolved instance is cached:
//! - [`Scope::Singleton`]: built once, cached under its identifier
//! - [`Scope::Transient`]: built again on every resolve
use std::fmt;

/// Defines how long an instance built from a binding lives.
///
/// # Examples
/// ```
/// use wirebox_container::scope::Scope;
///
/// assert!(Scope::Singleton.is_singleton());
/// assert_eq!(Scope::default(), Scope::Transient);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One instance per container.
    ///
    /// Created on first resolve and kept in the singleton cache until
    /// explicitly forgotten. Removing the binding does not drop it.
    Singleton,

    /// New instance on every resolve call. Never cached.
    #[default]
    Transient,
}

impl Scope {
    /// Returns `true` if instances are cached after the first build.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }
}

impl From<bool> for Scope {
    /// `true` maps to [`Scope::Singleton`].
    fn from(singleton: bool) -> Self {
        if singleton {
            Scope::Singleton
        } else {
            Scope::Transient
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "Singleton"),
            Scope::Transient => write!(f, "Transient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_from_flag() {
        assert_eq!(Scope::from(true), Scope::Singleton);
        assert_eq!(Scope::from(false), Scope::Transient);
    }

    #[test]
    fn scope_display() {
        assert_eq!(format!("{}", Scope::Singleton), "Singleton");
        assert_eq!(format!("{}", Scope::Transient), "Transient");
    }
}
