//! # Application Orchestrator
//!
//! [`App`] is the entry point of a binary. It collects modules and config models, then
//! drives the container through a fixed sequence:
//!
//! ```text
//! run:    prepare config -> register -> build -> wait for stop signal -> down
//! invoke: prepare config -> register -> build what the target needs, run it -> down
//! ```
//!
//! A failing stage skips the rest of the start-up sequence, but teardown always runs so
//! that every service started before the failure is stopped again. The outcome is an
//! [`Exit`], which converts into the process exit code.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wiring::{App, Declaration, Exit, Modules};
//!
//! struct Greeting(String);
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     App::new()
//!         .modules(Modules::new().with(Declaration::value(Greeting("hi".into()))))
//!         .invoke(Declaration::task(|g: Arc<Greeting>| println!("{}", g.0)))
//!         .await
//!         .into()
//! }
//! ```

use crate::config::{write_pid, ConfigError, Env, LogConfig, Sources};
use crate::container::Container;
use crate::context::AppContext;
use crate::declaration::{Declaration, Modules};
use crate::error::ContainerError;
use crate::logging::{setup_tracing, setup_tracing_with};
use crate::registry::Registry;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How a run or invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Clean,
    Failed,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Clean => ExitCode::SUCCESS,
            Exit::Failed => ExitCode::FAILURE,
        }
    }
}

type ConfigLoader = Box<dyn FnOnce(&Sources) -> Result<Declaration, ConfigError> + Send + Sync>;

pub struct App {
    modules: Modules,
    config_file: Option<PathBuf>,
    configs: Vec<(&'static str, ConfigLoader)>,
    ctx: AppContext,
    container: Container,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        let ctx = AppContext::new();
        Self {
            modules: Modules::new(),
            config_file: None,
            configs: Vec::new(),
            container: Container::new(ctx.clone()),
            ctx,
        }
    }

    pub fn modules(mut self, modules: Modules) -> Self {
        self.modules = self.modules.extend(modules);
        self
    }

    /// YAML (`.yml`, `.yaml`) or JSON (`.json`) file holding [`LogConfig`] and every model
    /// added with [`config`](Self::config).
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Decodes `T` from the config file and registers it as a ready value.
    pub fn config<T>(mut self) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let loader: ConfigLoader =
            Box::new(|sources: &Sources| Ok(Declaration::value(sources.decode::<T>()?)));
        self.configs.push((std::any::type_name::<T>(), loader));
        self
    }

    /// The root context. Closing it stops a running [`App::run`].
    pub fn context(&self) -> AppContext {
        self.ctx.clone()
    }

    /// The container's registry; it stays readable after `run` or `invoke` consume the app.
    pub fn registry(&self) -> Arc<Registry> {
        self.container.registry()
    }

    /// Builds everything and keeps it running until the context is closed, either by a
    /// termination signal or by whoever holds [`context`](Self::context).
    pub async fn run(mut self) -> Exit {
        if let Err(err) = self.prepare(false) {
            return config_failure(err);
        }
        let modules = std::mem::take(&mut self.modules);

        info!("Registering dependencies");
        let mut failed = step(
            "Registering dependencies",
            self.container.register(modules),
        );
        if !failed {
            info!("Running dependencies");
            failed = step("Running dependencies", self.container.build().await);
        }

        if failed {
            self.ctx.close();
        } else {
            tokio::spawn(watch_signals(self.ctx.clone()));
            self.ctx.done().await;
        }

        self.teardown(failed).await
    }

    /// Builds only what `target` needs, runs it once, then tears everything down.
    ///
    /// Logging goes to stdout at debug level regardless of the config file.
    pub async fn invoke(mut self, target: Declaration) -> Exit {
        if let Err(err) = self.prepare(true) {
            return config_failure(err);
        }
        let modules = std::mem::take(&mut self.modules);

        info!("Registering dependencies");
        let mut failed = step(
            "Registering dependencies",
            self.container.register(modules),
        );
        if !failed {
            info!("Running dependencies");
            failed = step("Running dependencies", self.container.invoke(target).await);
        }

        self.ctx.close();
        self.teardown(failed).await
    }

    async fn teardown(&self, mut failed: bool) -> Exit {
        if self.container.is_up() {
            info!("Stop dependencies");
            failed |= step("Stop dependencies", self.container.down().await);
        }
        if failed {
            Exit::Failed
        } else {
            Exit::Clean
        }
    }

    /// Sets up logging and turns the config file into declarations.
    fn prepare(&mut self, interactive: bool) -> Result<(), ConfigError> {
        let Some(path) = self.config_file.clone() else {
            setup_tracing_with(&LogConfig::interactive())?;
            if let Some((name, _)) = self.configs.first() {
                return Err(ConfigError::NoConfigFile(*name));
            }
            return Ok(());
        };

        let sources = Sources::open(&path)?;
        let mut config: LogConfig = sources.decode()?;
        if interactive {
            config.level = LogConfig::interactive().level;
            config.log_file = None;
        }
        setup_tracing_with(&config)?;

        let mut modules = Modules::new().with(Declaration::value(Env(config.env.clone())));
        for (name, load) in self.configs.drain(..) {
            info!(config = name, file = %path.display(), "Decode config");
            modules = modules.with(load(&sources)?);
        }
        self.modules = modules.extend(std::mem::take(&mut self.modules));

        if !interactive {
            if let Some(pid_file) = &config.pid_file {
                write_pid(pid_file)?;
            }
        }
        Ok(())
    }
}

/// Logs the outcome of one stage; true when it failed.
fn step(message: &str, result: Result<(), ContainerError>) -> bool {
    match result {
        Ok(()) => false,
        Err(err) => {
            error!(error = %err, "{message}");
            true
        }
    }
}

fn config_failure(err: ConfigError) -> Exit {
    setup_tracing();
    error!(error = %err, "Prepare config");
    Exit::Failed
}

/// Closes `ctx` on Ctrl-C or SIGTERM. Returns early if `ctx` is closed by someone else.
async fn watch_signals(ctx: AppContext) {
    tokio::select! {
        _ = ctx.done() => {}
        _ = stop_signal() => {
            info!("Stop signal received");
            ctx.close();
        }
    }
}

async fn stop_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Can't listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = interrupt => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "Can't listen for SIGTERM");
                interrupt.await;
            }
        }
    }

    #[cfg(not(unix))]
    interrupt.await;
}
