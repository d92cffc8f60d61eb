//! JSONL file sink.

use crate::json_layer::JsonLayer;
use crate::LogConfig;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// `~/.plant-imager/logs/collection.jsonl`, or `None` without a home directory.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".plant-imager")
            .join("logs")
            .join("collection.jsonl")
    })
}

/// Log file opened for append. Clones share the handle.
///
/// Each `write` call lands in the file unbuffered, so readers tailing the
/// file never see half a line.
#[derive(Clone)]
pub struct JsonlFile {
    path: Arc<PathBuf>,
    file: Arc<Mutex<File>>,
}

impl JsonlFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for JsonlFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for JsonlFile {
    type Writer = JsonlFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install a registry with the JSONL layer and, if asked, a stderr mirror.
pub(crate) fn init_file_subscriber(config: &LogConfig, log_path: &Path) -> io::Result<()> {
    let file = JsonlFile::open(log_path)?;
    let jsonl = JsonLayer::new(config.service_name.clone(), file)
        .with_filter(crate::env_filter(&config.default_level));

    let stderr = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
            .with_filter(crate::env_filter(&config.default_level))
    });

    tracing_subscriber::registry()
        .with(jsonl)
        .with(stderr)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!(log_path = %log_path.display(), "Logging to file");
    Ok(())
}
