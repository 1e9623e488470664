//! Asynchronous asset loading with completion observed by polling.

use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use thiserror::Error;

use crate::obj::{load_obj_from_str, TriangleMesh};

/// Why an asset could not be produced. Never fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to download {name}: {message}")]
    Download { name: String, message: String },
    #[error("failed to parse {name}: {message}")]
    Parse { name: String, message: String },
    #[error("loader for {name} stopped before finishing")]
    Abandoned { name: String },
}

/// Handle to an asset that is loading in the background.
#[derive(Debug)]
pub struct PendingAsset<T> {
    name: String,
    receiver: Option<Receiver<Result<T, AssetError>>>,
}

impl<T: Send + 'static> PendingAsset<T> {
    /// Runs `load` on a worker thread. On wasm32 it runs before returning.
    pub fn spawn<F>(name: impl Into<String>, load: F) -> Self
    where
        F: FnOnce() -> Result<T, AssetError> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        #[cfg(not(target_arch = "wasm32"))]
        std::thread::spawn(move || {
            let _ = sender.send(load());
        });
        #[cfg(target_arch = "wasm32")]
        let _ = sender.send(load());
        Self {
            name: name.into(),
            receiver: Some(receiver),
        }
    }
}

impl<T> PendingAsset<T> {
    pub fn is_finished(&self) -> bool {
        self.receiver.is_none()
    }

    /// Non-blocking check. Yields the result exactly once.
    pub fn poll(&mut self) -> Option<Result<T, AssetError>> {
        let receiver = self.receiver.as_ref()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(AssetError::Abandoned {
                name: self.name.clone(),
            }),
        };
        self.receiver = None;
        Some(result)
    }

    /// Blocks until the loader reports back.
    pub fn wait(mut self) -> Result<T, AssetError> {
        let Some(receiver) = self.receiver.take() else {
            return Err(AssetError::Abandoned { name: self.name });
        };
        receiver.recv().unwrap_or(Err(AssetError::Abandoned { name: self.name }))
    }
}

/// Parses OBJ text into a mesh, reporting failures as [`AssetError::Parse`].
pub fn parse_mesh(name: &str, data: &str) -> Result<TriangleMesh, AssetError> {
    load_obj_from_str(data).map_err(|err| AssetError::Parse {
        name: name.to_string(),
        message: format!("{err:#}"),
    })
}

/// Reads and parses an OBJ file.
pub fn load_mesh_file(path: &Path) -> Result<TriangleMesh, AssetError> {
    let data = fs::read_to_string(path).map_err(|err| AssetError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    parse_mesh(&path.display().to_string(), &data)
}
