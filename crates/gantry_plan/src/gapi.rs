//! Graph API driver.
//!
//! [`Gapi`] ties a resource file to a compiler. The runtime asks it for a
//! graph, and optionally subscribes to recompile signals driven by a file
//! watcher.

use crate::compiler::{CompileOptions, Compiled, GraphCompiler};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::registry::ResourceRegistry;
use crate::world::World;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Inputs the driver needs besides the file
#[derive(Clone)]
pub struct GapiData {
    /// Host the graph is compiled for
    pub hostname: String,
    /// Store receiving exported resources
    pub world: Arc<dyn World>,
    /// Compute exported resources without publishing them
    pub noop: bool,
    /// Do not produce recompile signals
    pub no_watch: bool,
}

/// Event produced by a file watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The watched file changed
    Changed,
    /// The watcher failed and will produce no further events
    Failed(String),
}

/// Driver error
#[derive(Debug, thiserror::Error)]
pub enum GapiError {
    /// Driver used after close
    #[error("graph api is not initialized")]
    NotInitialized,

    /// `close` called more than once
    #[error("graph api is already closed")]
    AlreadyClosed,

    /// Watcher failure forwarded to the subscriber
    #[error("watch failed: {0}")]
    Watch(String),

    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Result sent on the recompile channel; `Ok(())` means recompute
pub type Signal = Result<(), GapiError>;

/// Graph API bound to one resource file
pub struct Gapi {
    file: PathBuf,
    compiler: GraphCompiler,
    no_watch: bool,
    initialized: bool,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Gapi {
    /// Create a driver using the built-in resource kinds
    #[must_use]
    pub fn new(data: GapiData, file: impl Into<PathBuf>) -> Self {
        Self::with_registry(data, file, Arc::new(ResourceRegistry::builtin()))
    }

    /// Create a driver with a custom registry
    #[must_use]
    pub fn with_registry(
        data: GapiData,
        file: impl Into<PathBuf>,
        registry: Arc<ResourceRegistry>,
    ) -> Self {
        let options = CompileOptions {
            hostname: data.hostname,
            noop: data.noop,
            trace: false,
        };
        let (shutdown, _) = watch::channel(false);
        Self {
            file: file.into(),
            compiler: GraphCompiler::new(registry, data.world).with_options(options),
            no_watch: data.no_watch,
            initialized: true,
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Enable parser tracing
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        let options = CompileOptions {
            trace,
            ..self.compiler.options().clone()
        };
        self.compiler = self.compiler.with_options(options);
        self
    }

    /// File this driver compiles
    #[must_use]
    pub fn file(&self) -> &std::path::Path {
        &self.file
    }

    /// Compile the current contents of the file
    ///
    /// Syntax diagnostics are logged and returned with the graph.
    ///
    /// # Errors
    ///
    /// Returns error if the driver is closed or compilation fails
    pub fn graph(&self, previous: Option<&Graph>) -> Result<Compiled, GapiError> {
        if !self.initialized {
            return Err(GapiError::NotInitialized);
        }

        let compiled = self.compiler.compile_file(&self.file, previous)?;
        for diagnostic in &compiled.diagnostics {
            warn!(file = %self.file.display(), "{}", diagnostic);
        }
        Ok(compiled)
    }

    /// Subscribe to recompile signals driven by `events`
    ///
    /// Returns `None` when watching is disabled. Each [`WatchEvent::Changed`]
    /// becomes `Ok(())`. A [`WatchEvent::Failed`] is forwarded once as an
    /// error, after which the channel closes. The channel also closes when
    /// `events` ends or the driver is closed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, since the forwarding task
    /// is spawned onto the current one.
    pub fn next(&mut self, mut events: mpsc::Receiver<WatchEvent>) -> Option<mpsc::Receiver<Signal>> {
        if self.no_watch {
            return None;
        }

        let (tx, rx) = mpsc::channel(1);
        let mut shutdown = self.shutdown.subscribe();
        let initialized = self.initialized;
        let file = self.file.display().to_string();

        let handle = tokio::spawn(async move {
            if !initialized {
                let _ = tx.send(Err(GapiError::NotInitialized)).await;
                return;
            }
            loop {
                let event = tokio::select! {
                    biased;
                    _ = shutdown.changed() => return,
                    event = events.recv() => event,
                };
                let (signal, last) = match event {
                    Some(WatchEvent::Changed) => {
                        info!(file = %file, "generating new graph");
                        (Ok(()), false)
                    }
                    Some(WatchEvent::Failed(reason)) => {
                        warn!(file = %file, error = %reason, "watch failed");
                        (Err(GapiError::Watch(reason)), true)
                    }
                    None => {
                        debug!(file = %file, "watch stream ended");
                        return;
                    }
                };
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => return,
                    sent = tx.send(signal) => {
                        if sent.is_err() || last {
                            return;
                        }
                    }
                }
            }
        });
        self.tasks.push(handle);
        Some(rx)
    }

    /// Stop all signal tasks and wait for them to finish
    ///
    /// # Errors
    ///
    /// Returns [`GapiError::AlreadyClosed`] on a second call
    pub async fn close(&mut self) -> Result<(), GapiError> {
        if !self.initialized {
            return Err(GapiError::AlreadyClosed);
        }
        self.shutdown.send_replace(true);
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "signal task failed");
            }
        }
        self.initialized = false;
        Ok(())
    }
}
