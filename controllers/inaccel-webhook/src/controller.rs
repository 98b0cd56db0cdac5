//! Main controller implementation.
//!
//! Starts the HTTPS admission webhook and, when enabled, the VirtualMachine
//! watcher, then waits until one of them stops or a shutdown signal arrives.

use crate::config::Config;
use crate::defaulter::Defaulter;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::tls::{load_server_config, TlsListener};
use crate::watcher::Watcher;
use crate::webhook;
use cloud_init::KubeSecretSource;
use crds::VirtualMachine;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Webhook server plus the optional VirtualMachine watcher.
#[derive(Debug)]
pub struct Controller {
    webhook: JoinHandle<Result<(), ControllerError>>,
    virtual_machine_watcher: Option<JoinHandle<Result<(), ControllerError>>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: &Config) -> Result<Self, ControllerError> {
        info!("Initializing InAccel Webhook");

        if config.max_devices == 0 {
            return Err(ControllerError::InvalidConfig(
                "--max-devices must be at least 1".to_string(),
            ));
        }

        let client = Client::try_default().await?;
        let secrets = Arc::new(KubeSecretSource::new(client.clone()));
        let defaulter = Arc::new(Defaulter::new(secrets, config.max_devices));

        let tls_config = load_server_config(&config.cert, &config.key)?;
        let listener = TlsListener::bind(config.listen_addr(), tls_config).await?;
        info!("Admission webhook listening on https://{}", config.listen_addr());

        let router = webhook::router(Arc::clone(&defaulter));
        let webhook = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .map_err(ControllerError::Io)
        });

        let virtual_machine_watcher = if config.enable_virtualmachine_controller {
            let virtual_machine_api: Api<VirtualMachine> = match &config.watch_namespace {
                Some(namespace) => Api::namespaced(client.clone(), namespace),
                None => Api::all(client.clone()),
            };
            let reconciler = Arc::new(Reconciler::new(client, defaulter));
            let watcher = Watcher::new(reconciler, virtual_machine_api);
            Some(tokio::spawn(async move { watcher.watch_virtual_machines().await }))
        } else {
            None
        };

        Ok(Self {
            webhook,
            virtual_machine_watcher,
        })
    }

    /// Runs until the webhook or the watcher stops.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("InAccel Webhook running");

        let Some(mut virtual_machine_watcher) = self.virtual_machine_watcher.take() else {
            return join(self.webhook.await, "Admission webhook");
        };

        tokio::select! {
            result = &mut self.webhook => {
                join(result, "Admission webhook")?;
            }
            result = &mut virtual_machine_watcher => {
                join(result, "VirtualMachine watcher")?;
            }
        }

        Ok(())
    }
}

fn join(
    result: Result<Result<(), ControllerError>, tokio::task::JoinError>,
    task: &str,
) -> Result<(), ControllerError> {
    result
        .map_err(|e| ControllerError::Watch(format!("{} panicked: {}", task, e)))?
        .map_err(|e| ControllerError::Watch(format!("{} error: {}", task, e)))?;
    info!("{} stopped", task);
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
