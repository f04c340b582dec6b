use std::fmt;

/// Lifecycle state of a [`MirrorRegistry`](super::MirrorRegistry).
///
/// ```text
/// Inactive --activate--> Discovering --discovery done--> Active
///    ^                                                     |
///    +---------------------- deactivate -------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegistryState {
    #[default]
    Inactive,
    Discovering,
    Active,
}

impl RegistryState {
    /// Whether the registry holds a session and receives change events.
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Inactive)
    }
}

impl fmt::Display for RegistryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Discovering => write!(f, "discovering"),
            Self::Active => write!(f, "active"),
        }
    }
}
