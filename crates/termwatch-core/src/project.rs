//! Configured projects and path matching.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A project directory registered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
}

impl Project {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Finds the project a working directory belongs to.
///
/// Exact path equality is checked across all projects before any
/// subdirectory match, so a project nested inside another still wins for
/// its own root. Subdirectory matching is component-wise: `/a/proj`
/// does not match `/a/project`.
pub fn match_project<'a>(cwd: &Path, projects: &'a [Project]) -> Option<&'a Project> {
    projects
        .iter()
        .find(|p| p.path == cwd)
        .or_else(|| projects.iter().find(|p| cwd.starts_with(&p.path)))
}

/// Returns true if either path is an ancestor of (or equal to) the other.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projects() -> Vec<Project> {
        vec![
            Project::new("proj", "/Users/me/proj"),
            Project::new("web", "/Users/me/work/web"),
            Project::new("web-admin", "/Users/me/work/web/admin"),
        ]
    }

    #[test]
    fn test_exact_match() {
        let projects = projects();
        let found = match_project(Path::new("/Users/me/proj"), &projects);
        assert_eq!(found.map(|p| p.name.as_str()), Some("proj"));
    }

    #[test]
    fn test_trailing_slash_is_exact() {
        let projects = projects();
        let found = match_project(Path::new("/Users/me/proj/"), &projects);
        assert_eq!(found.map(|p| p.name.as_str()), Some("proj"));
    }

    #[test]
    fn test_subdirectory_match() {
        let projects = projects();
        let found = match_project(Path::new("/Users/me/proj/src/bin"), &projects);
        assert_eq!(found.map(|p| p.name.as_str()), Some("proj"));
    }

    #[test]
    fn test_sibling_prefix_is_not_a_match() {
        let projects = projects();
        assert!(match_project(Path::new("/Users/me/project"), &projects).is_none());
    }

    #[test]
    fn test_exact_beats_earlier_ancestor() {
        let projects = projects();
        let found = match_project(Path::new("/Users/me/work/web/admin"), &projects);
        assert_eq!(found.map(|p| p.name.as_str()), Some("web-admin"));
    }

    #[test]
    fn test_first_subdirectory_match_wins() {
        let projects = projects();
        // Both "web" and "web-admin" contain this path; "web" is listed first
        let found = match_project(Path::new("/Users/me/work/web/admin/src"), &projects);
        assert_eq!(found.map(|p| p.name.as_str()), Some("web"));
    }

    #[test]
    fn test_no_match() {
        let projects = projects();
        assert!(match_project(Path::new("/tmp"), &projects).is_none());
        assert!(match_project(Path::new("/Users/me/proj"), &[]).is_none());
    }

    #[test]
    fn test_paths_overlap() {
        assert!(paths_overlap(Path::new("/a/b"), Path::new("/a/b/c")));
        assert!(paths_overlap(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(paths_overlap(Path::new("/a/b"), Path::new("/a/b")));
        assert!(!paths_overlap(Path::new("/a/b"), Path::new("/a/bc")));
    }
}
