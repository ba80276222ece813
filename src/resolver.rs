use crate::config::ResolverConfig;
use crate::error::LoadError;
use crate::image_source::{ImageSource, LoadedImage, load_with_timeout};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// One failed candidate, kept in probing order.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub url: String,
    pub error: LoadError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { url: String, image: LoadedImage },
    /// Every candidate failed; the caller draws a local placeholder.
    Exhausted { attempts: Vec<Attempt> },
}

impl Resolution {
    pub fn url(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { url, .. } => Some(url),
            Resolution::Exhausted { .. } => None,
        }
    }

    pub fn into_image(self) -> Option<LoadedImage> {
        match self {
            Resolution::Resolved { image, .. } => Some(image),
            Resolution::Exhausted { .. } => None,
        }
    }
}

/// Finds a real avatar for a username by probing provider templates in
/// order, one at a time.
#[derive(Clone)]
pub struct ProfileResolver {
    source: Arc<dyn ImageSource>,
    config: ResolverConfig,
}

impl ProfileResolver {
    pub fn new(source: Arc<dyn ImageSource>, config: ResolverConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Whether a username is long enough to be worth probing. Leading `@`s
    /// must already be stripped.
    pub fn is_resolvable(&self, username: &str) -> bool {
        username.chars().count() >= self.config.min_username_len
    }

    pub fn candidates(&self, username: &str) -> Vec<String> {
        self.config
            .templates
            .iter()
            .map(|template| template.replace("{username}", username))
            .collect()
    }

    pub async fn resolve(&self, username: &str) -> Resolution {
        if !self.is_resolvable(username) {
            return Resolution::Exhausted {
                attempts: Vec::new(),
            };
        }
        self.resolve_chain(self.candidates(username)).await
    }

    /// Probes `candidates` strictly in order and returns the first one that
    /// loads a real image before its timeout.
    pub async fn resolve_chain<I>(&self, candidates: I) -> Resolution
    where
        I: IntoIterator<Item = String>,
    {
        let mut attempts = Vec::new();
        for url in candidates {
            match self.probe(&url).await {
                Ok(image) => {
                    debug!(%url, width = image.width, height = image.height, "avatar resolved");
                    return Resolution::Resolved { url, image };
                }
                Err(error) => {
                    debug!(%url, %error, "avatar candidate rejected");
                    attempts.push(Attempt { url, error });
                }
            }
        }
        debug!(tried = attempts.len(), "avatar candidates exhausted");
        Resolution::Exhausted { attempts }
    }

    async fn probe(&self, url: &str) -> Result<LoadedImage, LoadError> {
        let image =
            load_with_timeout(self.source.as_ref(), url, self.config.candidate_timeout()).await?;
        if !image.is_real(self.config.min_dimension) {
            return Err(LoadError::Placeholder {
                width: image.width,
                height: image.height,
            });
        }
        Ok(image)
    }
}

/// Live-preview helper: turns a stream of username edits into at most one
/// resolution per edit burst.
///
/// A resolution only starts after `debounce` of silence; an edit arriving
/// while one is in flight abandons it and restarts the quiet period.
pub struct PreviewDebouncer {
    resolver: ProfileResolver,
}

impl PreviewDebouncer {
    pub fn new(resolver: ProfileResolver) -> Self {
        Self { resolver }
    }

    pub async fn run(
        self,
        mut edits: mpsc::Receiver<String>,
        results: mpsc::Sender<(String, Resolution)>,
    ) {
        let quiet = self.resolver.config().debounce();
        let Some(mut pending) = edits.recv().await else {
            return;
        };
        loop {
            tokio::select! {
                edit = edits.recv() => match edit {
                    Some(next) => {
                        pending = next;
                        continue;
                    }
                    None => {
                        let resolution = self.resolver.resolve(&pending).await;
                        let _ = results.send((pending, resolution)).await;
                        return;
                    }
                },
                _ = tokio::time::sleep(quiet) => {}
            }

            let settled = tokio::select! {
                resolution = self.resolver.resolve(&pending) => Some(resolution),
                edit = edits.recv() => match edit {
                    Some(next) => {
                        debug!(stale = %pending, "preview resolution abandoned");
                        pending = next;
                        None
                    }
                    None => Some(self.resolver.resolve(&pending).await),
                },
            };

            if let Some(resolution) = settled {
                if results.send((pending.clone(), resolution)).await.is_err() {
                    return;
                }
                match edits.recv().await {
                    Some(next) => pending = next,
                    None => return,
                }
            }
        }
    }
}
