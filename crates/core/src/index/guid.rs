//! Identity key parsing: turns a catalog item's URI-shaped reference
//! string into a normalized (namespace, raw id) pair.

/// A recognized external identifier namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdNamespace {
    Imdb,
    Tmdb,
    Tvdb,
}

/// A (namespace, raw id) pair parsed from a reference string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub namespace: IdNamespace,
    pub id: String,
}

/// Recognized scheme markers, canonical names before their aliases so the
/// alias never shadows the longer form (`thetvdb://` contains `tvdb://`).
const SCHEMES: [(&str, IdNamespace); 5] = [
    ("imdb://", IdNamespace::Imdb),
    ("themoviedb://", IdNamespace::Tmdb),
    ("thetvdb://", IdNamespace::Tvdb),
    ("tmdb://", IdNamespace::Tmdb),
    ("tvdb://", IdNamespace::Tvdb),
];

impl IdentityKey {
    pub fn new(namespace: IdNamespace, id: impl Into<String>) -> Self {
        Self {
            namespace,
            id: id.into(),
        }
    }

    /// Parse a reference string into a normalized identity key.
    ///
    /// The scheme marker may sit anywhere in the string: legacy agent
    /// references embed it after the agent name
    /// (`com.plexapp.agents.imdb://tt0133093?lang=en`). The raw id is the
    /// suffix with any query string stripped; tvdb ids additionally drop a
    /// trailing `/season/episode` path.
    ///
    /// Returns `None` for references in any other scheme (`plex://`,
    /// `local://`, non-identity agents).
    pub fn parse(reference: &str) -> Option<Self> {
        for (marker, namespace) in SCHEMES {
            if let Some(pos) = reference.find(marker) {
                let raw = &reference[pos + marker.len()..];
                let raw = raw.split('?').next().unwrap_or(raw);
                let raw = match namespace {
                    IdNamespace::Tvdb => raw.split('/').next().unwrap_or(raw),
                    _ => raw,
                };
                if raw.is_empty() {
                    return None;
                }
                return Some(Self::new(namespace, raw));
            }
        }
        None
    }
}
