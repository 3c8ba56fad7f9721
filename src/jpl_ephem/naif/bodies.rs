//! Body keys and their NAIF integer codes.
//!
//! Keys are the stable identifiers queries use (`"mars"`, `"jupiter_barycenter"`, …).
//! Matching ignores case and treats spaces and hyphens as underscores, so
//! `"Jupiter Barycenter"` resolves like `"jupiter_barycenter"`. A bare integer is taken as
//! a NAIF code.

/// Known body keys. The first key listed for a code is its canonical name.
pub const BODY_KEYS: [(&str, i32); 25] = [
    ("solar_system_barycenter", 0),
    ("ssb", 0),
    ("mercury_barycenter", 1),
    ("venus_barycenter", 2),
    ("earth_barycenter", 3),
    ("earth_moon_barycenter", 3),
    ("mars_barycenter", 4),
    ("jupiter_barycenter", 5),
    ("saturn_barycenter", 6),
    ("uranus_barycenter", 7),
    ("neptune_barycenter", 8),
    ("pluto_barycenter", 9),
    ("sun", 10),
    ("moon", 301),
    ("mercury", 199),
    ("venus", 299),
    ("earth", 399),
    ("mars", 499),
    ("jupiter", 599),
    ("saturn", 699),
    ("uranus", 799),
    ("neptune", 899),
    ("pluto", 999),
    ("luna", 301),
    ("emb", 3),
];

fn normalize(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// NAIF code for a body key, or `None` when the key is unknown.
pub fn naif_id(key: &str) -> Option<i32> {
    let key = normalize(key);
    if let Ok(id) = key.parse::<i32>() {
        return Some(id);
    }
    BODY_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, id)| *id)
}

/// Canonical key of a NAIF code, if it is one of the known bodies.
pub fn body_name(id: i32) -> Option<&'static str> {
    BODY_KEYS
        .iter()
        .find(|(_, code)| *code == id)
        .map(|(name, _)| *name)
}
