//! `lire_cartographie` / `read_cartography` (spec.md §4.C11 step 9):
//! reads the on-disk project map and wraps it as a `project_cartography`
//! atom. No existing crate owns a "project map" reader — `mnemos-code`
//! tracks the parsed dependency graph (`ProjectArchitecture`), which is
//! a different, richer artefact than the flat cartography document a
//! tool call asks for — so this lives directly in the orchestrator.

use mnemos_core::prelude::Atom;
use std::path::Path;

/// Reads the configured cartography file (spec.md §6: a
/// `connaissances/`-rooted markdown or JSON project map) and wraps it
/// as a `Memory` atom tagged `kind="project_cartography"` (spec.md
/// §4.C11 step 7 checks for this exact kind when selecting the
/// `Cartography` mode). Returns `None` if the file is missing — this is
/// a recoverable asset (spec.md §7), not a fatal one.
#[must_use]
pub fn read_cartography(root: &Path, relative_path: &str) -> Option<Atom> {
    let content = std::fs::read_to_string(root.join(relative_path)).ok()?;
    let title = Path::new(relative_path).file_name().and_then(|n| n.to_str()).unwrap_or(relative_path).to_string();
    Some(Atom::memory(content, title, "project_cartography", 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cartography_file_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_cartography(tmp.path(), "connaissances/project_map.json").is_none());
    }

    #[test]
    fn present_cartography_file_becomes_a_project_cartography_atom() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("connaissances")).unwrap();
        std::fs::write(tmp.path().join("connaissances/project_map.json"), r#"{"modules": []}"#).unwrap();
        let atom = read_cartography(tmp.path(), "connaissances/project_map.json").unwrap();
        assert_eq!(atom.fields().kind, "project_cartography");
        assert_eq!(atom.title(), "project_map.json");
    }
}
