//! Project-file introspection (spec.md §4.C6): locator restricted to the
//! project root, allowed extensions `{.py,.yaml,.yml,.json,.md}` or a
//! `.github` path, with a blacklist of path fragments.

use mnemos_core::prelude::Atom;
use mnemos_filelocator::FileLocator;

const ALLOWED_EXTENSIONS: [&str; 5] = ["py", "yaml", "yml", "json", "md"];
const BLACKLIST: [&str; 6] = ["backup", "logs", "__pycache__", ".env", ".bak", "copie"];

fn is_allowed(path: &str) -> bool {
    let lower = path.to_lowercase();
    if BLACKLIST.iter().any(|fragment| lower.contains(fragment)) {
        return false;
    }
    if lower.contains(".github") {
        return true;
    }
    std::path::Path::new(&lower).extension().and_then(|e| e.to_str()).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext))
}

/// Spec.md §4.C6 "Project-file introspection": survivors are read as
/// `Memory` atoms with `kind="code_file"`.
#[must_use]
pub fn project_file_introspection(locator: &FileLocator, query: &str, limit: usize) -> Vec<Atom> {
    locator
        .find(query, limit)
        .into_iter()
        .filter(|path| is_allowed(path))
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some(Atom::memory(content, path, "code_file", 1.0))
        })
        .collect()
}
