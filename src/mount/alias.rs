//! Alias resolver: source-tagged virtual-path-to-host-path table with
//! longest-prefix-match resolution (spec §4.6).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    source: u32,
    alias_path: String,
    host_path: String,
}

/// Many-reader/one-writer alias table. `resolve` takes a read lease;
/// `set`/`new_source` take an exclusive lease — readers never observe a
/// partially installed source (spec §5).
pub struct AliasResolver {
    entries: RwLock<Vec<Entry>>,
    next_source: AtomicU32,
}

impl Default for AliasResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasResolver {
    pub fn new() -> Self {
        Self { entries: RwLock::new(Vec::new()), next_source: AtomicU32::new(1) }
    }

    pub fn new_source(&self) -> u32 {
        self.next_source.fetch_add(1, Ordering::Relaxed)
    }

    fn is_valid_alias(alias_path: &str) -> bool {
        !alias_path.is_empty()
            && alias_path.starts_with('/')
            && alias_path.chars().all(|c| (c as u32) >= 32)
    }

    /// Synthesizes an alias from a host path when the caller did not supply
    /// one: backslashes become slashes, a `\\?\` prefix is stripped, the
    /// trailing slash is dropped, and a leading slash is guaranteed.
    fn synthesize_alias(host_path: &str) -> String {
        let stripped = host_path.strip_prefix(r"\\?\").unwrap_or(host_path);
        let mut slashed = stripped.replace('\\', "/");
        if let Some(rest) = slashed.strip_suffix('/') {
            slashed = rest.to_string();
        }
        if !slashed.starts_with('/') {
            slashed = format!("/{slashed}");
        }
        slashed
    }

    /// Atomically replaces all entries tagged `source` with `entries`.
    /// Returns the accepted `(alias_path, host_path)` pairs; inputs whose
    /// synthesized or supplied alias fails validation are rejected (spec
    /// §4.6: "Illegal aliases are rejected at `set` time").
    ///
    /// `host_openable` lets the caller gate installation on whether the
    /// host path actually opens (spec: "Entries whose host path does not
    /// open successfully are skipped"); pass a closure that always returns
    /// `true` to skip that check (e.g. in tests).
    pub fn set(
        &self,
        source: u32,
        paths: Vec<(String, String)>,
        mut host_openable: impl FnMut(&str) -> bool,
    ) -> Vec<(String, String)> {
        let mut accepted = Vec::new();
        for (host_path, alias_path) in paths {
            let alias_path =
                if alias_path.is_empty() { Self::synthesize_alias(&host_path) } else { alias_path };
            if !Self::is_valid_alias(&alias_path) {
                continue;
            }
            if !host_openable(&host_path) {
                continue;
            }
            accepted.push((alias_path, host_path));
        }

        let mut guard = self.entries.write().unwrap();
        guard.retain(|e| e.source != source);
        guard.extend(accepted.iter().map(|(alias_path, host_path)| Entry {
            source,
            alias_path: alias_path.clone(),
            host_path: host_path.clone(),
        }));
        accepted
    }

    /// Resolves `query` against the longest matching alias, returning the
    /// corresponding host path with the unmatched remainder appended
    /// (`/` transliterated to `\`).
    pub fn resolve(&self, query: &str) -> Option<String> {
        let guard = self.entries.read().unwrap();
        let best = guard
            .iter()
            .filter(|e| is_prefix_on_boundary(&e.alias_path, query))
            .max_by_key(|e| e.alias_path.len())?;

        let remainder = &query[best.alias_path.len()..];
        let remainder = remainder.strip_prefix('/').unwrap_or(remainder);
        if remainder.is_empty() {
            Some(best.host_path.clone())
        } else {
            let transliterated = remainder.replace('/', "\\");
            Some(format!("{}\\{}", best.host_path.trim_end_matches('\\'), transliterated))
        }
    }
}

/// `alias_path` matches `query` exactly, or is a prefix of `query` ending
/// right before a `/` boundary.
fn is_prefix_on_boundary(alias_path: &str, query: &str) -> bool {
    if alias_path == query {
        return true;
    }
    query.starts_with(alias_path)
        && query.as_bytes().get(alias_path.len()) == Some(&b'/')
}
