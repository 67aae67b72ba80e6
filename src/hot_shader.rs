use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A layer's shader file, polled for changes by modification time.
///
/// Used as the per-layer tag of the host application's pipeline.
#[derive(Debug)]
pub struct HotShader {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    source: String,
    unreadable: bool,
}

impl HotShader {
    /// Load a shader from the given file path.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let source = fs::read_to_string(&path)?;
        let last_modified = fs::metadata(&path)?.modified().ok();

        Ok(Self {
            path,
            last_modified,
            source,
            unreadable: false,
        })
    }

    /// Re-reads the file if its modification time differs from the last
    /// load. Returns `true` if new source was read.
    ///
    /// Any difference counts, so restoring an older file also reloads.
    pub fn check_reload(&mut self) -> bool {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                self.report_unreadable(&err);
                return false;
            }
        };

        if self.last_modified == Some(modified) {
            return false;
        }

        match fs::read_to_string(&self.path) {
            Ok(source) => {
                if self.unreadable {
                    log::info!("{} is readable again", self.path.display());
                    self.unreadable = false;
                }
                log::debug!("reloading {}", self.path.display());
                self.source = source;
                self.last_modified = Some(modified);
                true
            }
            Err(err) => {
                self.report_unreadable(&err);
                false
            }
        }
    }

    /// Get the current shader source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the shader file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn report_unreadable(&mut self, err: &io::Error) {
        if !self.unreadable {
            log::warn!("cannot read {}: {err}", self.path.display());
            self.unreadable = true;
        }
    }
}
