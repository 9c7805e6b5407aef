//! File handles of the input and output collections.

use crate::cnl::{CnlError, Result};
use crate::streaming::buffers::DEFAULT_INPUT_BUFFER;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::{debug, info, warn};

/// A readable collection of clusters.
pub trait Collection {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Size of the collection in bytes, None if unknown.
    fn byte_size(&self) -> Option<u64>;

    /// Reader positioned at the start of the collection.
    fn reader(&mut self) -> io::Result<Box<dyn BufRead + '_>>;
}

/// File together with its path, closed on drop.
#[derive(Debug)]
pub struct NamedFile {
    file: File,
    path: PathBuf,
    name: String,
}

impl NamedFile {
    /// Open an existing file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        Ok(Self::wrap(File::open(path)?, path))
    }

    /// Create or truncate a file for reading and writing.
    ///
    /// Reading access allows the written header to be patched in place.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::wrap(file, path))
    }

    fn wrap(file: File, path: &Path) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
            name: path.display().to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes, None if the metadata is unavailable.
    pub fn size(&self) -> Option<u64> {
        match self.file.metadata() {
            Ok(meta) => Some(meta.len()),
            Err(e) => {
                warn!("file size evaluation failed for '{}': {}", self.name, e);
                None
            }
        }
    }
}

impl Collection for NamedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn byte_size(&self) -> Option<u64> {
        self.size()
    }

    fn reader(&mut self) -> io::Result<Box<dyn BufRead + '_>> {
        self.file.rewind()?;
        Ok(Box::new(BufReader::with_capacity(
            DEFAULT_INPUT_BUFFER,
            &mut self.file,
        )))
    }
}

impl Write for NamedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for NamedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

/// Collection held in memory.
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    data: Vec<u8>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn byte_size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn reader(&mut self) -> io::Result<Box<dyn BufRead + '_>> {
        Ok(Box::new(self.data.as_slice()))
    }
}

/// Open the files listed by `names`, expanding directories one level deep.
///
/// Directory entries are opened in lexicographic order, nested directories
/// are skipped. Missing entries and files that can not be opened are
/// reported and skipped, `skip` excludes a path (typically the output).
/// Fails only if no file could be opened.
pub fn open_inputs<P: AsRef<Path>>(names: &[P], skip: Option<&Path>) -> Result<Vec<NamedFile>> {
    let skip = skip.and_then(|path| fs::canonicalize(path).ok());
    let mut files = Vec::new();
    let mut missing = Vec::new();
    let (mut input_files, mut input_dirs) = (0usize, 0usize);

    for name in names {
        let name = name.as_ref();
        let meta = match fs::metadata(name) {
            Ok(meta) => meta,
            Err(_) => {
                missing.push(name.display().to_string());
                continue;
            }
        };

        if meta.is_dir() {
            input_dirs += 1;
            let mut entries: Vec<PathBuf> = match fs::read_dir(name) {
                Ok(dir) => dir
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| !path.is_dir())
                    .collect(),
                Err(e) => {
                    warn!("can't list directory '{}': {}", name.display(), e);
                    continue;
                }
            };
            entries.sort();
            for path in entries {
                open_into(&mut files, &path, skip.as_deref());
            }
        } else {
            input_files += 1;
            open_into(&mut files, name, skip.as_deref());
        }
    }

    if !missing.is_empty() {
        warn!(
            "{} of {} file system entries do not exist: {}",
            missing.len(),
            names.len(),
            missing.join(", ")
        );
    }
    if files.is_empty() {
        return Err(CnlError::InputUnavailable(
            "none of the input collections can be opened".to_string(),
        ));
    }
    info!(
        "opened {} files from the {} files and {} dirs",
        files.len(),
        input_files,
        input_dirs
    );
    Ok(files)
}

fn open_into(files: &mut Vec<NamedFile>, path: &Path, skip: Option<&Path>) {
    if skip.is_some() && fs::canonicalize(path).ok().as_deref() == skip {
        debug!("'{}' is the output file, skipped", path.display());
        return;
    }
    match NamedFile::open(path) {
        Ok(file) => files.push(file),
        Err(e) => warn!("can't open '{}': {}", path.display(), e),
    }
}

/// Create the output file, refusing to overwrite it unless `rewrite`.
///
/// Missing parent directories are created.
pub fn create_output(path: &Path, rewrite: bool) -> Result<NamedFile> {
    let text = path.to_string_lossy();
    if text.is_empty() || text.ends_with('/') || text.ends_with(MAIN_SEPARATOR) {
        return Err(CnlError::Config(format!(
            "a file name is expected for the output: '{}'",
            text
        )));
    }
    if path.is_dir() {
        return Err(CnlError::Config(format!(
            "the output '{}' is a directory",
            text
        )));
    }

    if path.exists() {
        warn!("the output file '{}' already exists, rewrite it: {}", text, rewrite);
        if !rewrite {
            return Err(CnlError::OutputConflict(path.to_path_buf()));
        }
    } else if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    Ok(NamedFile::create(path)?)
}

/// Default output path for the given inputs.
///
/// A single directory input `dir` yields `dir.cnl` (`dir_base.cnl` for the
/// node base extraction), otherwise a fixed name in the working directory.
pub fn default_output_path<P: AsRef<Path>>(inputs: &[P], extract_base: bool) -> PathBuf {
    if let [single] = inputs {
        let single = single.as_ref();
        let name = single.to_string_lossy();
        let name = name.trim_end_matches(['/', MAIN_SEPARATOR]);
        if single.is_dir() && !name.is_empty() && name != "." && name != ".." {
            let suffix = if extract_base { "_base.cnl" } else { ".cnl" };
            return PathBuf::from(format!("{}{}", name, suffix));
        }
    }
    PathBuf::from(if extract_base {
        "nodebase.cnl"
    } else {
        "merged.cnl"
    })
}
