use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::app::{ComiciError, Result};
use crate::fetcher::{Fetcher, ImageRequest};

/// Canned responses keyed by full URL, falling back to the URL path.
#[derive(Default)]
pub struct MockFetcher {
    texts: HashMap<String, String>,
    sequences: Mutex<HashMap<String, VecDeque<String>>>,
    images: HashMap<String, Vec<u8>>,
    text_requests: Mutex<Vec<String>>,
    image_requests: Mutex<Vec<(String, String, String)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, key: &str, body: &str) -> Self {
        self.texts.insert(key.to_string(), body.to_string());
        self
    }

    /// Successive bodies for one key; the last one repeats.
    pub fn with_text_sequence(self, key: &str, bodies: &[String]) -> Self {
        self.sequences
            .lock()
            .unwrap()
            .insert(key.to_string(), bodies.iter().cloned().collect());
        self
    }

    fn next_in_sequence(&self, url: &Url) -> Option<String> {
        let mut sequences = self.sequences.lock().unwrap();
        let key = if sequences.contains_key(url.as_str()) {
            url.as_str()
        } else {
            url.path()
        };
        let queue = sequences.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    pub fn with_image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }

    pub fn text_requests(&self) -> Vec<String> {
        self.text_requests.lock().unwrap().clone()
    }

    /// (url, referer, origin) of every image request.
    pub fn image_requests(&self) -> Vec<(String, String, String)> {
        self.image_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String> {
        self.text_requests.lock().unwrap().push(url.to_string());
        if let Some(body) = self.next_in_sequence(url) {
            return Ok(body);
        }
        self.texts
            .get(url.as_str())
            .or_else(|| self.texts.get(url.path()))
            .cloned()
            .ok_or_else(|| ComiciError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn fetch_image(&self, request: &ImageRequest<'_>) -> Result<Vec<u8>> {
        self.image_requests.lock().unwrap().push((
            request.url.to_string(),
            request.referer.clone(),
            request.origin.clone(),
        ));
        self.images
            .get(request.url)
            .cloned()
            .ok_or_else(|| ComiciError::Status {
                url: request.url.to_string(),
                status: 404,
            })
    }
}
