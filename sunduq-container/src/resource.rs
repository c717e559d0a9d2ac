//! Resource resolution over directory and archive roots.
//!
//! A [`SearchPath`] lists the roots a namespace is looked up in. Each root is
//! either a plain directory or a tar archive (optionally gzip-compressed).
//! [`ResourceResolver::scan`] turns a dotted namespace into the resources found
//! under it in every root, with the same shape whichever kind of root they
//! came from. Only regular files count: symbolic links are skipped in
//! directories just as link entries are in archives.
//!
//! ```rust,no_run
//! use sunduq_container::resource::{ResourceResolver, Root, SearchPath};
//!
//! let search_path = SearchPath::new()
//!     .with_root(Root::directory("/srv/app/types"))
//!     .with_root(Root::parse("tar:file:///srv/app/plugins.tar.gz")?);
//!
//! let resolver = ResourceResolver::new(search_path);
//! for resource in resolver.scan("shop.order")? {
//!     println!("{} ({:?})", resource.path(), resource.origin());
//! }
//! # Ok::<(), sunduq_container::error::SunduqError>(())
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use sunduq_support::naming::namespace_to_path;
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::error::{ResourceError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ARCHIVE_SEPARATOR: &str = "!/";

// ═══════════════════════════════════════════
// Resource
// ═══════════════════════════════════════════

/// Where a resource was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    PlainFile,
    ArchiveEntry,
}

/// A file found under a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    location: PathBuf,
    path: String,
    name: String,
    origin: Origin,
}

impl Resource {
    /// The file on disk for plain files, the entry path inside the archive
    /// for archive entries.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Slash-separated path relative to the root, e.g. `shop/order/OrderService.type`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bare file name, e.g. `OrderService.type`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

// ═══════════════════════════════════════════
// Roots & search path
// ═══════════════════════════════════════════

/// A mount on the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl Root {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Root::Directory(path.into())
    }

    pub fn archive(path: impl Into<PathBuf>) -> Self {
        Root::Archive(path.into())
    }

    /// Parses `file:///dir` or `tar:file:///path/app.tar`.
    ///
    /// # Errors
    /// [`ResourceError::InvalidUri`] if the text is not a usable URI,
    /// [`ResourceError::UnsupportedRoot`] for any other scheme.
    pub fn parse(uri: &str) -> Result<Self> {
        match classify(uri)? {
            Location::Directory(path) => Ok(Root::Directory(path)),
            Location::Archive { archive, entry } if entry.is_empty() => Ok(Root::Archive(archive)),
            Location::Archive { .. } => Err(invalid_uri(uri, "archive root must not name an entry").into()),
        }
    }

    /// The URI of `relative` under this root.
    fn location_uri(&self, relative: &str) -> Result<String> {
        match self {
            Root::Directory(dir) => {
                let base = Url::from_directory_path(dir)
                    .map_err(|()| invalid_uri(&dir.display().to_string(), "not an absolute directory path"))?;
                let location = base
                    .join(relative)
                    .map_err(|e| invalid_uri(base.as_str(), e.to_string()))?;
                Ok(location.into())
            }
            Root::Archive(archive) => {
                let base = Url::from_file_path(archive)
                    .map_err(|()| invalid_uri(&archive.display().to_string(), "not an absolute file path"))?;
                Ok(format!("tar:{base}{ARCHIVE_SEPARATOR}{relative}"))
            }
        }
    }
}

/// Ordered list of roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    roots: Vec<Root>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one root per URI.
    pub fn parse<I, S>(uris: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roots = uris
            .into_iter()
            .map(|uri| Root::parse(uri.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { roots })
    }

    pub fn with_root(mut self, root: Root) -> Self {
        self.roots.push(root);
        self
    }

    pub fn push(&mut self, root: Root) {
        self.roots.push(root);
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

// ═══════════════════════════════════════════
// Location classification
// ═══════════════════════════════════════════

#[derive(Debug, PartialEq, Eq)]
enum Location {
    Directory(PathBuf),
    Archive { archive: PathBuf, entry: String },
}

fn invalid_uri(uri: &str, reason: impl Into<String>) -> ResourceError {
    ResourceError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.into(),
    }
}

fn strip_trailing_separator(uri: &str) -> &str {
    uri.strip_suffix('/')
        .or_else(|| uri.strip_suffix('\\'))
        .unwrap_or(uri)
}

/// Strips the trailing separator, decodes and classifies a location URI.
fn classify(uri: &str) -> Result<Location> {
    let trimmed = strip_trailing_separator(uri);
    let url = Url::parse(trimmed).map_err(|e| invalid_uri(uri, e.to_string()))?;

    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| invalid_uri(uri, "not a local file URI"))?;
            Ok(Location::Directory(path))
        }
        "tar" => {
            let (archive, entry) = match url.path().split_once(ARCHIVE_SEPARATOR) {
                Some((archive, entry)) => (archive, entry),
                None => (url.path().trim_end_matches('!'), ""),
            };
            let archive = Url::parse(archive)
                .map_err(|e| invalid_uri(uri, e.to_string()))?
                .to_file_path()
                .map_err(|()| invalid_uri(uri, "archive is not a local file URI"))?;
            let entry = urlencoding::decode(entry)
                .map_err(|e| invalid_uri(uri, e.to_string()))?
                .trim_matches('/')
                .to_string();
            Ok(Location::Archive { archive, entry })
        }
        _ => Err(ResourceError::UnsupportedRoot {
            uri: uri.to_string(),
        }
        .into()),
    }
}

// ═══════════════════════════════════════════
// Walking
// ═══════════════════════════════════════════

/// Kind of a walked entry, shared by both walkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Directory,
    Other,
}

impl From<std::fs::FileType> for EntryKind {
    fn from(file_type: std::fs::FileType) -> Self {
        if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        }
    }
}

impl From<tar::EntryType> for EntryKind {
    fn from(entry_type: tar::EntryType) -> Self {
        if entry_type.is_file() {
            EntryKind::File
        } else if entry_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        }
    }
}

fn is_regular_file(kind: EntryKind) -> bool {
    kind == EntryKind::File
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn join_logical(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{rest}"),
    }
}

/// Walks `dir`; `logical_base` is the namespace path `dir` was resolved from.
fn walk_directory(dir: &Path, logical_base: &str) -> io::Result<Vec<Resource>> {
    if !dir.is_dir() {
        trace!(dir = %dir.display(), "Directory root does not contain namespace");
        return Ok(Vec::new());
    }

    let mut resources = Vec::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::from)?;
        if !is_regular_file(entry.file_type().into()) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let path = join_logical(logical_base, &relative);

        resources.push(Resource {
            location: entry.path().to_path_buf(),
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            origin: Origin::PlainFile,
        });
    }
    Ok(resources)
}

struct ArchiveEntry {
    path: String,
    kind: EntryKind,
}

/// Directory-like index of an archive's entries.
///
/// Holds the archive file open only while indexing; dropping the view
/// releases everything it read.
struct ArchiveView {
    archive: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveView {
    fn open(archive: &Path) -> io::Result<Self> {
        let mut reader = BufReader::new(File::open(archive)?);
        let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        let reader: Box<dyn Read> = if compressed {
            Box::new(GzDecoder::new(reader))
        } else {
            Box::new(reader)
        };

        let mut tarball = tar::Archive::new(reader);
        let mut entries = Vec::new();
        for entry in tarball.entries()? {
            let entry = entry?;
            let path = entry.path()?.to_string_lossy().replace('\\', "/");
            let path = path.trim_start_matches("./").trim_matches('/').to_string();
            if path.is_empty() {
                continue;
            }
            entries.push(ArchiveEntry {
                path,
                kind: entry.header().entry_type().into(),
            });
        }

        debug!(archive = %archive.display(), entries = entries.len(), compressed, "Mounted archive");
        Ok(Self {
            archive: archive.to_path_buf(),
            entries,
        })
    }

    /// Entries strictly below `base`; a `base` naming a file yields nothing.
    fn walk<'a>(&'a self, base: &'a str) -> impl Iterator<Item = &'a ArchiveEntry> + 'a {
        self.entries.iter().filter(move |entry| {
            base.is_empty()
                || entry
                    .path
                    .strip_prefix(base)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl Drop for ArchiveView {
    fn drop(&mut self) {
        trace!(archive = %self.archive.display(), "Released archive");
    }
}

fn walk_archive(archive: &Path, entry: &str) -> io::Result<Vec<Resource>> {
    let view = ArchiveView::open(archive)?;
    let resources = view
        .walk(entry)
        .filter(|e| is_regular_file(e.kind))
        .map(|e| Resource {
            location: PathBuf::from(&e.path),
            name: file_name(&e.path).to_string(),
            path: e.path.clone(),
            origin: Origin::ArchiveEntry,
        })
        .collect();
    Ok(resources)
}

// ═══════════════════════════════════════════
// Resolver
// ═══════════════════════════════════════════

/// Scans namespaces across every root of a [`SearchPath`].
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    search_path: SearchPath,
}

impl ResourceResolver {
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Every regular file under `namespace`, in every root.
    ///
    /// A root that cannot be read contributes nothing and is logged.
    ///
    /// # Errors
    /// [`ResourceError`] if a root's location URI cannot be built or parsed.
    pub fn scan(&self, namespace: &str) -> Result<Vec<Resource>> {
        self.scan_with(namespace, Some)
    }

    /// Like [`scan`](Self::scan), mapping each resource and dropping `None`s.
    #[instrument(skip(self, mapper), fields(roots = self.search_path.roots.len()))]
    pub fn scan_with<T, F>(&self, namespace: &str, mut mapper: F) -> Result<Vec<T>>
    where
        F: FnMut(Resource) -> Option<T>,
    {
        let relative = namespace_to_path(namespace);
        let mut found = Vec::new();

        for root in &self.search_path.roots {
            let uri = root.location_uri(&relative)?;
            let walked = match classify(&uri)? {
                Location::Directory(dir) => walk_directory(&dir, &relative),
                Location::Archive { archive, entry } => walk_archive(&archive, &entry),
            };

            match walked {
                Ok(resources) => {
                    trace!(root = %uri, resources = resources.len(), "Scanned root");
                    found.extend(resources.into_iter().filter_map(&mut mapper));
                }
                Err(e) => {
                    warn!(root = %uri, error = %e, "Skipping unreadable resource root");
                }
            }
        }

        debug!(namespace, found = found.len(), "Namespace scanned");
        Ok(found)
    }
}
