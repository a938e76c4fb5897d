//! Source file registry and locations.
//!
//! Every token and tree node carries a [`SourceLoc`]: the owning file plus a
//! 1-based line and column. Files themselves live in the [`SourceMap`], so a
//! location is three words and `Copy`.

use std::path::{Path, PathBuf};

/// Handle to a file registered in the [`SourceMap`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FileId(u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A registered source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name, e.g. `vec.mdl`.
    pub name: String,
    /// Directory the file lives in.
    pub dir: PathBuf,
    /// Full path as registered.
    pub path: PathBuf,
    /// The file contents.
    pub contents: String,
}

impl SourceFile {
    /// The file name without its extension, used to derive output names.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) => &self.name[..pos],
            None => &self.name,
        }
    }
}

/// A point in a source file. Lines and columns are 1-based.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SourceLoc {
    pub file: FileId,
    pub line: u32,
    pub col: u32,
}

impl SourceLoc {
    pub fn start_of(file: FileId) -> Self {
        Self { file, line: 1, col: 1 }
    }
}

/// Registry of all source files in a compiler invocation.
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file and returns its handle.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        contents: impl Into<String>,
    ) -> FileId {
        let path = path.into();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            name: name.into(),
            dir,
            path,
            contents: contents.into(),
        });
        id
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_fetch_file() {
        let mut map = SourceMap::new();
        let id = map.add("main.mdl", "/src/main.mdl", "main :: () {}");
        let file = map.file(id);
        assert_eq!(file.name, "main.mdl");
        assert_eq!(file.dir, PathBuf::from("/src"));
        assert_eq!(file.contents, "main :: () {}");
    }

    #[test]
    fn stem_strips_extension() {
        let mut map = SourceMap::new();
        let id = map.add("vec.mdl", "/src/vec.mdl", "");
        assert_eq!(map.file(id).stem(), "vec");
    }

    #[test]
    fn start_of_is_line_one_col_one() {
        let mut map = SourceMap::new();
        let id = map.add("a.mdl", "a.mdl", "");
        let loc = SourceLoc::start_of(id);
        assert_eq!((loc.line, loc.col), (1, 1));
    }
}
