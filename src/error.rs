use crate::types::Zone;

/// Result alias for profile store operations.
pub type ProfileResult<T> = std::result::Result<T, ProfileError>;

/// Failures raised by the profile store and resolver.
///
/// Reading or writing a profile that was never bootstrapped is an ordering
/// bug in the caller: every game id change and every per-game toggle must be
/// followed by a bootstrap before the next read or write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("no RGB profile for '{key}' (zone {zone:?}); bootstrap was not run")]
    NotFound { key: String, zone: Zone },
}
