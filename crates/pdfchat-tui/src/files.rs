//! Directory browser used as the file picker popup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pdfchat_core::state::absolute_path;
use pdfchat_core::SelectedFile;
use ratatui::widgets::ListState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

pub struct FileBrowser {
    pub dir: PathBuf,
    pub entries: Vec<FileEntry>,
    pub state: ListState,
    /// Marked files, in the order they were marked.
    pub marked: Vec<PathBuf>,
}

impl FileBrowser {
    /// Open at `dir`, with the current selection pre-marked. Paths are made
    /// absolute so marks line up with the listing.
    pub fn open(dir: &Path, selected: &[SelectedFile]) -> Result<Self> {
        let dir = absolute_path(dir);
        let mut marked: Vec<PathBuf> = Vec::with_capacity(selected.len());
        for file in selected {
            let path = absolute_path(&file.path);
            if !marked.contains(&path) {
                marked.push(path);
            }
        }

        let mut browser = Self {
            dir: dir.clone(),
            entries: Vec::new(),
            state: ListState::default(),
            marked,
        };
        browser.load(&dir)?;
        Ok(browser)
    }

    fn load(&mut self, dir: &Path) -> Result<()> {
        self.entries = read_entries(dir)?;
        self.dir = dir.to_path_buf();
        self.state.select(if self.entries.is_empty() { None } else { Some(0) });
        Ok(())
    }

    pub fn nav_down(&mut self) {
        let len = self.entries.len();
        if len > 0 {
            let i = self.state.selected().unwrap_or(0);
            self.state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn nav_up(&mut self) {
        let i = self.state.selected().unwrap_or(0);
        self.state.select(Some(i.saturating_sub(1)));
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.state.selected().and_then(|i| self.entries.get(i))
    }

    /// Enter a directory, or toggle the mark on a file.
    pub fn activate(&mut self) -> Result<()> {
        let Some(entry) = self.selected_entry().cloned() else {
            return Ok(());
        };

        if entry.is_dir {
            self.load(&entry.path)
        } else {
            self.toggle_mark();
            Ok(())
        }
    }

    pub fn toggle_mark(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if entry.is_dir {
            return;
        }

        let path = entry.path.clone();
        if let Some(pos) = self.marked.iter().position(|p| *p == path) {
            self.marked.remove(pos);
        } else {
            self.marked.push(path);
        }
        self.nav_down();
    }

    pub fn go_parent(&mut self) -> Result<()> {
        match self.dir.parent().map(Path::to_path_buf) {
            Some(parent) => self.load(&parent),
            None => Ok(()),
        }
    }

    pub fn is_marked(&self, path: &Path) -> bool {
        self.marked.iter().any(|p| p == path)
    }

    pub fn accept(self) -> Vec<SelectedFile> {
        self.marked.into_iter().map(SelectedFile::from_path).collect()
    }
}

/// List `dir`: a `..` entry when there is a parent, then directories, then
/// files, each sorted by name. Hidden entries are skipped.
pub fn read_entries(dir: &Path) -> Result<Vec<FileEntry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    let read_dir = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    for entry in read_dir.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let is_dir = path.is_dir();
        let item = FileEntry { name, path, is_dir };
        if is_dir {
            dirs.push(item);
        } else {
            files.push(item);
        }
    }

    dirs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let mut entries = Vec::with_capacity(dirs.len() + files.len() + 1);
    if let Some(parent) = dir.parent() {
        entries.push(FileEntry {
            name: "..".to_string(),
            path: parent.to_path_buf(),
            is_dir: true,
        });
    }
    entries.extend(dirs);
    entries.extend(files);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn fixture() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.pdf"), b"b").unwrap();
        fs::write(dir.path().join("A.pdf"), b"a").unwrap();
        fs::write(dir.path().join(".hidden"), b"h").unwrap();
        fs::create_dir(dir.path().join("reports")).unwrap();
        fs::write(dir.path().join("reports").join("q3.pdf"), b"q").unwrap();
        dir
    }

    #[test]
    fn test_entries_order() {
        let dir = fixture();
        let names: Vec<String> = read_entries(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["..", "reports", "A.pdf", "b.pdf"]);
    }

    #[test]
    fn test_mark_across_directories() {
        let dir = fixture();
        let mut browser = FileBrowser::open(dir.path(), &[]).unwrap();

        // "..", "reports", "A.pdf", "b.pdf"
        browser.state.select(Some(3));
        browser.activate().unwrap();
        assert!(browser.is_marked(&dir.path().join("b.pdf")));

        browser.state.select(Some(1));
        browser.activate().unwrap();
        assert_eq!(browser.dir, dir.path().join("reports"));

        // "..", "q3.pdf"
        browser.state.select(Some(1));
        browser.toggle_mark();

        let selected = browser.accept();
        let names: Vec<&str> = selected.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "q3.pdf"]);
    }

    #[test]
    fn test_toggle_twice_unmarks() {
        let dir = fixture();
        let mut browser = FileBrowser::open(dir.path(), &[]).unwrap();
        browser.state.select(Some(2));
        browser.toggle_mark();
        browser.state.select(Some(2));
        browser.toggle_mark();
        assert!(browser.accept().is_empty());
    }

    #[test]
    fn test_preselected_files_are_marked() {
        let dir = fixture();
        let existing = vec![SelectedFile::from_path(dir.path().join("A.pdf"))];
        let browser = FileBrowser::open(dir.path(), &existing).unwrap();
        assert!(browser.is_marked(&dir.path().join("A.pdf")));
        assert_eq!(browser.accept(), existing);
    }

    #[test]
    fn test_relative_preselection_is_not_duplicated() {
        let dir = tempfile::tempdir_in(".").unwrap();
        fs::write(dir.path().join("a.pdf"), b"a").unwrap();
        let dir_name = dir.path().file_name().unwrap();
        let relative_dir = Path::new(".").join(dir_name);

        let existing = vec![SelectedFile::from_path(relative_dir.join("a.pdf"))];
        let mut browser = FileBrowser::open(&relative_dir, &existing).unwrap();

        // "..", "a.pdf"
        let listed = browser.entries[1].path.clone();
        assert!(browser.is_marked(&listed));

        // Toggling the listed file unmarks the preselected one
        browser.state.select(Some(1));
        browser.toggle_mark();
        assert!(browser.marked.is_empty());

        browser.state.select(Some(1));
        browser.toggle_mark();
        let selected = browser.accept();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "a.pdf");
        assert_eq!(selected[0].path, listed);
    }

    #[test]
    fn test_go_parent() {
        let dir = fixture();
        let mut browser = FileBrowser::open(&dir.path().join("reports"), &[]).unwrap();
        browser.go_parent().unwrap();
        assert_eq!(browser.dir, dir.path());
    }
}
