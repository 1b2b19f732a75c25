use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Parent directory under which every judging attempt gets its own workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceHome {
    home: PathBuf,
}

/// A uniquely named directory owned by exactly one judging attempt.
///
/// The directory is removed by [`Workspace::release`], or on drop if the
/// attempt ends some other way (early return, panic, cancelled future).
/// Removal failures are logged and never reported to the caller.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
    aliases: Vec<String>,
    released: bool,
}

impl WorkspaceHome {
    pub const PLACEHOLDER: &str = "<workspace>";

    #[inline]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.home
    }

    #[must_use]
    pub fn acquire(&self) -> fsutil::Result<Workspace> {
        fsutil::mkdir_all(&self.home)?;

        let id = Uuid::new_v4();
        let given = self.home.join(id.to_string());
        fsutil::mkdir_new(&given)?;

        // From here on the directory is owned by `ws` and removed on every error path.
        let mut ws = Workspace {
            id,
            dir: given.clone(),
            aliases: vec![given.to_string_lossy().into_owned()],
            released: false,
        };
        let canonical = given
            .canonicalize()
            .map_err(|e| fsutil::Error::SingleIO("Cannot canonicalize path", given, e))?;
        ws.aliases.push(canonical.to_string_lossy().into_owned());
        ws.aliases.sort_by_key(|s| std::cmp::Reverse(s.len()));
        ws.aliases.dedup();
        ws.dir = canonical;

        log::debug!("Acquired workspace {}", ws.dir.to_string_lossy());
        Ok(ws)
    }
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Absolute, canonical path of the workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, filename: impl AsRef<Path>) -> PathBuf {
        self.dir.join(filename)
    }

    /// Replace every spelling of the workspace directory in `text` with a placeholder.
    pub fn sanitize(&self, text: &str) -> String {
        self.aliases
            .iter()
            .fold(text.to_owned(), |text, alias| {
                text.replace(alias.as_str(), WorkspaceHome::PLACEHOLDER)
            })
    }

    pub fn release(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match fsutil::remove_dir_all(&self.dir) {
            Ok(()) => log::debug!("Released workspace {}", self.id),
            Err(e) => log::warn!("Failed to clean up workspace {}: {:#}", self.id, e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}
