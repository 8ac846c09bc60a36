//! Display-name resolution.
//!
//! A session resolves its display name once, from the first source that
//! yields a usable name: an explicit override, the stored guest nickname,
//! the persisted profile name, and finally a generated fallback. The auth
//! surface that fills these sources in is out of scope here; this module
//! only encodes the precedence.

use worldchat_core::Environment;

/// Candidate display names, in descending priority.
#[derive(Debug, Clone, Default)]
pub struct NameSources {
    /// Explicit override, e.g. from a login flow.
    pub override_name: Option<String>,
    /// Stored guest nickname.
    pub guest_nickname: Option<String>,
    /// Persisted profile name.
    pub profile_name: Option<String>,
}

/// Resolve the display name from the highest-priority usable source.
///
/// Blank candidates are skipped. When nothing usable remains, a fallback of
/// the form `guest-1a2b` is generated from the environment RNG.
pub fn resolve_display_name<E: Environment>(env: &E, sources: &NameSources) -> String {
    [&sources.override_name, &sources.guest_nickname, &sources.profile_name]
        .into_iter()
        .flatten()
        .map(|name| name.trim())
        .find(|name| !name.is_empty())
        .map_or_else(|| format!("guest-{:04x}", env.random_u64() & 0xffff), str::to_string)
}
