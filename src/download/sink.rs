use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::app::Result;

/// Destination for the pages of one episode.
pub trait PageSink: Send {
    fn contains(&self, name: &str) -> bool;

    /// Take over a file left by an earlier loose-directory run. Returns
    /// whether anything was adopted.
    fn adopt(&mut self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Close the sink and return where the pages ended up.
    fn finish(self: Box<Self>) -> Result<PathBuf>;
}

/// Open the sink for `{series_dir}/{episode}` or `{series_dir}/{episode}.cbz`.
pub fn open_sink(series_dir: &Path, episode: &str, archive: bool) -> Result<Box<dyn PageSink>> {
    let loose_dir = series_dir.join(episode);
    if archive {
        let path = series_dir.join(format!("{}.cbz", episode));
        Ok(Box::new(CbzArchive::open(path, loose_dir)?))
    } else {
        Ok(Box::new(LooseDir::create(loose_dir)?))
    }
}

pub struct LooseDir {
    dir: PathBuf,
}

impl LooseDir {
    pub fn create(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl PageSink for LooseDir {
    fn contains(&self, name: &str) -> bool {
        self.dir.join(name).is_file()
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.dir.join(name), bytes)?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        Ok(self.dir)
    }
}

/// Comic book archive. Every entry is appended and the central directory
/// rewritten before the next one starts.
pub struct CbzArchive {
    path: PathBuf,
    loose_dir: PathBuf,
    entries: HashSet<String>,
}

impl CbzArchive {
    pub fn open(path: PathBuf, loose_dir: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entries = if path.is_file() {
            let archive = ZipArchive::new(File::open(&path)?)?;
            archive.file_names().map(String::from).collect()
        } else {
            HashSet::new()
        };
        tracing::debug!("{} holds {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            loose_dir,
            entries,
        })
    }
}

impl PageSink for CbzArchive {
    fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    fn adopt(&mut self, name: &str) -> Result<bool> {
        let loose = self.loose_dir.join(name);
        if !loose.is_file() {
            return Ok(false);
        }
        let bytes = fs::read(&loose)?;
        self.write(name, &bytes)?;
        fs::remove_file(&loose)?;
        tracing::debug!("Moved {} into {}", loose.display(), self.path.display());
        Ok(true)
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut zip = if self.path.is_file() {
            let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
            ZipWriter::new_append(file)?
        } else {
            ZipWriter::new(File::create(&self.path)?)
        };
        // Pages are already compressed images.
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
        zip.finish()?;
        self.entries.insert(name.to_string());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        if self.loose_dir.is_dir() && fs::read_dir(&self.loose_dir)?.next().is_none() {
            fs::remove_dir(&self.loose_dir)?;
        }
        Ok(self.path)
    }
}
