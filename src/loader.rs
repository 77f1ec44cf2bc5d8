//! Texture fetching and decoding off the UI thread.

use std::io::Read;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::descriptor::{DescriptorSet, MapSlot, TextureDescriptor};
use crate::resources::TextureData;

/// Upper bound on a single fetched image.
const MAX_IMAGE_BYTES: u64 = 256 * 1024 * 1024;

/// Texture loading error type
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid image URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Request failed: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Path escapes the texture directory: {0}")]
    InvalidPath(String),
}

/// Fetches the encoded bytes of a described image.
pub trait TextureFetcher: Send + Sync {
    fn fetch(&self, descriptor: &TextureDescriptor) -> Result<Vec<u8>, LoadError>;
}

/// Fetches images from the image server's `/view` endpoint.
pub struct HttpFetcher {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(30))
            .build();
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TextureFetcher for HttpFetcher {
    fn fetch(&self, descriptor: &TextureDescriptor) -> Result<Vec<u8>, LoadError> {
        let url = descriptor.view_url(&self.base_url)?;
        log::debug!("GET {url}");
        let response = self
            .agent
            .request_url("GET", &url)
            .call()
            .map_err(Box::new)?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// Reads images from the server's backing output directory.
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{root}/{subfolder}/{filename}`, refusing components that leave the root.
    pub fn resolve(&self, descriptor: &TextureDescriptor) -> Result<PathBuf, LoadError> {
        let relative = PathBuf::from(&descriptor.subfolder).join(&descriptor.filename);
        let escapes = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir)
        });
        if escapes {
            return Err(LoadError::InvalidPath(relative.display().to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl TextureFetcher for DirectoryFetcher {
    fn fetch(&self, descriptor: &TextureDescriptor) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(descriptor)?;
        log::debug!("Reading {:?}", path);
        Ok(std::fs::read(path)?)
    }
}

/// Progress of the rebuild currently in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadProgress {
    pub generation: u64,
    pub requested: usize,
    pub finished: usize,
    pub current: Option<MapSlot>,
}

impl LoadProgress {
    pub fn fraction(&self) -> f32 {
        if self.requested == 0 {
            1.0
        } else {
            self.finished as f32 / self.requested as f32
        }
    }

    pub fn is_done(&self) -> bool {
        self.finished >= self.requested
    }
}

/// Decoded maps of one rebuild request.
#[derive(Debug, Clone)]
pub struct RebuildResult {
    pub generation: u64,
    pub descriptors: DescriptorSet,
    pub maps: [Option<Arc<TextureData>>; MapSlot::COUNT],
}

impl RebuildResult {
    pub fn map(&self, slot: MapSlot) -> Option<&Arc<TextureData>> {
        self.maps[slot.index()].as_ref()
    }
}

/// Resolves descriptor sets into decoded textures on worker threads.
pub struct TextureLoader {
    fetcher: Arc<dyn TextureFetcher>,
    progress: Arc<Mutex<LoadProgress>>,
    sender: mpsc::Sender<RebuildResult>,
    receiver: mpsc::Receiver<RebuildResult>,
}

impl TextureLoader {
    pub fn new(fetcher: Arc<dyn TextureFetcher>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            fetcher,
            progress: Arc::new(Mutex::new(LoadProgress::default())),
            sender,
            receiver,
        }
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress.lock().clone()
    }

    /// Start resolving `descriptors` in the background.
    pub fn request(&self, generation: u64, descriptors: DescriptorSet) {
        let wanted: Vec<(MapSlot, TextureDescriptor)> = descriptors
            .iter()
            .filter(|(slot, descriptor)| {
                let supported = descriptor.is_supported_image();
                if !supported {
                    log::debug!(
                        "Skipping {} map {:?}: unsupported extension",
                        slot.label(),
                        descriptor.filename
                    );
                }
                supported
            })
            .map(|(slot, descriptor)| (slot, descriptor.clone()))
            .collect();

        *self.progress.lock() = LoadProgress {
            generation,
            requested: wanted.len(),
            finished: 0,
            current: None,
        };

        let fetcher = Arc::clone(&self.fetcher);
        let progress = Arc::clone(&self.progress);
        let sender = self.sender.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("texture-load-{generation}"))
            .spawn(move || {
                let mut maps: [Option<Arc<TextureData>>; MapSlot::COUNT] = Default::default();
                for (slot, descriptor) in &wanted {
                    // A newer request owns the progress record once it starts
                    let update = |f: &dyn Fn(&mut LoadProgress)| {
                        let mut state = progress.lock();
                        if state.generation == generation {
                            f(&mut state);
                        }
                    };
                    update(&|state: &mut LoadProgress| state.current = Some(*slot));
                    maps[slot.index()] = load_map(fetcher.as_ref(), *slot, descriptor);
                    update(&|state: &mut LoadProgress| {
                        state.finished += 1;
                        state.current = None;
                    });
                }
                // The session may be gone already; nothing to do then
                let _ = sender.send(RebuildResult {
                    generation,
                    descriptors,
                    maps,
                });
            });

        if let Err(e) = spawned {
            log::warn!("Failed to spawn texture loader thread: {e}");
        }
    }

    /// Non-blocking check for a finished request.
    pub fn try_recv(&self) -> Option<RebuildResult> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for a finished request.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RebuildResult> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// Fetch and decode a single map. Failures are logged and yield no texture.
fn load_map(
    fetcher: &dyn TextureFetcher,
    slot: MapSlot,
    descriptor: &TextureDescriptor,
) -> Option<Arc<TextureData>> {
    let result = fetcher.fetch(descriptor).and_then(|bytes| {
        TextureData::from_bytes(&bytes, &descriptor.filename, slot.is_srgb()).map_err(LoadError::from)
    });
    match result {
        Ok(texture) => {
            log::debug!(
                "Loaded {} map {:?} ({}x{})",
                slot.label(),
                descriptor.filename,
                texture.width,
                texture.height
            );
            Some(Arc::new(texture))
        }
        Err(e) => {
            log::warn!(
                "Failed to load {} map {:?}: {e}",
                slot.label(),
                descriptor.filename
            );
            None
        }
    }
}
