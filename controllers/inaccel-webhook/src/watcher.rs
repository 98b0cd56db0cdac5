//! VirtualMachine watcher.
//!
//! Drives [`Reconciler::reconcile_virtual_machine`] from a
//! `kube_runtime::Controller`, which handles reconnection and requeueing.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::VirtualMachine;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Watches VirtualMachines and reconciles their instance templates.
#[derive(Debug)]
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    virtual_machine_api: Api<VirtualMachine>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, virtual_machine_api: Api<VirtualMachine>) -> Self {
        Self {
            reconciler,
            virtual_machine_api,
        }
    }

    /// Watch VirtualMachines until the watch stream ends.
    pub async fn watch_virtual_machines(&self) -> Result<(), ControllerError> {
        info!("Starting VirtualMachine watcher");

        let error_policy = |vm: Arc<VirtualMachine>, error: &ControllerError, ctx: Arc<Reconciler>| {
            let delay = ctx.failure_backoff(&vm);
            warn!(
                "Reconciliation of VirtualMachine {}/{} failed, retrying in {}s: {}",
                vm.namespace().unwrap_or_default(),
                vm.name_any(),
                delay.as_secs(),
                error
            );
            Action::requeue(delay)
        };

        let reconcile = |vm: Arc<VirtualMachine>, ctx: Arc<Reconciler>| async move {
            debug!(
                "Reconciling VirtualMachine {}/{}",
                vm.namespace().unwrap_or_default(),
                vm.name_any()
            );
            let action = ctx.reconcile_virtual_machine(&vm).await?;
            ctx.reset_backoff(&vm);
            Ok::<_, ControllerError>(action)
        };

        // Batch bursts of updates and bound the load on the API server
        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_secs(5))
            .concurrency(3);

        Controller::new(self.virtual_machine_api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, Arc::clone(&self.reconciler))
            .for_each(|res| async move {
                if let Err(e) = res {
                    error!("VirtualMachine controller error: {}", e);
                }
            })
            .await;

        info!("VirtualMachine watcher stopped");
        Ok(())
    }
}
