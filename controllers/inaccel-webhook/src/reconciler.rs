//! VirtualMachine reconciliation.
//!
//! Runs the defaulter on the instance template of a VirtualMachine so that
//! instances started from it already carry their accelerators. Only the
//! template's host device list is written back.

use crate::backoff::BackoffTracker;
use crate::defaulter::Defaulter;
use crate::error::ControllerError;
use crds::{HostDevice, VirtualMachine};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use kube_runtime::controller::Action;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Field manager used for host device patches
pub const FIELD_MANAGER: &str = "inaccel-webhook";

/// Reconciles VirtualMachine templates against their accelerator declaration.
pub struct Reconciler {
    client: Client,
    defaulter: Arc<Defaulter>,
    backoff: BackoffTracker,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("defaulter", &self.defaulter)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler.
    pub fn new(client: Client, defaulter: Arc<Defaulter>) -> Self {
        Self {
            client,
            defaulter,
            backoff: BackoffTracker::new(),
        }
    }

    /// Reconcile a single VirtualMachine.
    ///
    /// The cached object may be stale, so the VM is read again first. A VM
    /// that no longer exists is not an error.
    pub async fn reconcile_virtual_machine(
        &self,
        vm: &VirtualMachine,
    ) -> Result<Action, ControllerError> {
        let name = vm.name_any();
        let namespace = vm.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<VirtualMachine> = Api::namespaced(self.client.clone(), &namespace);

        let Some(mut current) = api.get_opt(&name).await? else {
            debug!("VirtualMachine {}/{} no longer exists", namespace, name);
            self.reset_backoff(vm);
            return Ok(Action::await_change());
        };

        if default_virtual_machine(&self.defaulter, &mut current).await? {
            let patch = host_devices_merge_patch(
                current.spec.template.spec.host_devices(),
                current.resource_version().as_deref(),
            );
            api.patch(
                &name,
                &PatchParams {
                    field_manager: Some(FIELD_MANAGER.to_string()),
                    ..PatchParams::default()
                },
                &Patch::Merge(&patch),
            )
            .await?;
            info!("Updated host devices of VirtualMachine {}/{}", namespace, name);
        } else {
            debug!("VirtualMachine {}/{} is up to date", namespace, name);
        }

        Ok(Action::await_change())
    }

    /// Requeue delay after a failed reconcile of `vm`.
    pub fn failure_backoff(&self, vm: &VirtualMachine) -> Duration {
        self.backoff.record_failure(&object_key(vm))
    }

    /// Clear the failure count of `vm`.
    pub fn reset_backoff(&self, vm: &VirtualMachine) {
        self.backoff.reset(&object_key(vm));
    }
}

fn object_key(vm: &VirtualMachine) -> String {
    format!(
        "{}/{}",
        vm.namespace().unwrap_or_else(|| "default".to_string()),
        vm.name_any()
    )
}

/// Default the instance template of `vm` in place.
pub async fn default_virtual_machine(
    defaulter: &Defaulter,
    vm: &mut VirtualMachine,
) -> Result<bool, ControllerError> {
    let namespace = vm.namespace().unwrap_or_else(|| "default".to_string());
    defaulter
        .default_instance_spec(&namespace, &mut vm.spec.template.spec)
        .await
}

/// JSON merge patch replacing the template's host device list.
///
/// Merge patches replace lists wholesale, so devices the defaulter removed
/// disappear too. An empty list is sent as `null` to drop the field.
///
/// With a `resource_version` the API server rejects the patch with a
/// conflict if the VM changed since it was read, instead of overwriting
/// devices added in the meantime.
pub fn host_devices_merge_patch(host_devices: &[HostDevice], resource_version: Option<&str>) -> Value {
    let host_devices = if host_devices.is_empty() {
        Value::Null
    } else {
        json!(host_devices)
    };

    let mut patch = json!({
        "spec": {
            "template": {
                "spec": {
                    "domain": {
                        "devices": {
                            "hostDevices": host_devices
                        }
                    }
                }
            }
        }
    });
    if let Some(resource_version) = resource_version {
        patch["metadata"] = json!({ "resourceVersion": resource_version });
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use axum::http::{header::CONTENT_TYPE, Method, Request, Response, StatusCode};
    use cloud_init::MockSecretSource;
    use crds::VirtualMachineSpec;
    use std::sync::Mutex;

    fn virtual_machine(namespace: &str, user_data_volume: crds::Volume) -> VirtualMachine {
        let mut vm = VirtualMachine::new("fpga-vm", VirtualMachineSpec::default());
        vm.metadata.namespace = Some(namespace.to_string());
        vm.spec.template.spec = create_test_instance_spec(
            vec![HostDevice::new("gpu", "nvidia.com/T4")],
            Some(user_data_volume),
        );
        vm
    }

    #[tokio::test]
    async fn test_defaults_template_with_vm_namespace() {
        let secrets = MockSecretSource::new();
        secrets.add_secret_data("tenant-a", "vm-userdata", &[("userdata", "inaccel:\n  fpga: 1\n".as_bytes())]);
        let defaulter = create_test_defaulter(secrets.clone());
        let mut vm = virtual_machine("tenant-a", secret_cloud_init_volume("vm-userdata"));

        let changed = default_virtual_machine(&defaulter, &mut vm)
            .await
            .expect("defaulting succeeds");

        assert!(changed);
        assert_eq!(
            device_names(vm.spec.template.spec.host_devices()),
            vec![("gpu", "nvidia.com/T4"), ("inaccel0", "fpga")]
        );
        assert_eq!(secrets.lookups(), vec![("tenant-a".to_string(), "vm-userdata".to_string())]);
    }

    #[tokio::test]
    async fn test_up_to_date_template_is_unchanged() {
        let defaulter = create_test_defaulter(MockSecretSource::new());
        let mut vm = virtual_machine("default", inline_cloud_init_volume("inaccel:\n  fpga: 1\n"));
        vm.spec.template.spec.set_host_devices(vec![
            HostDevice::new("gpu", "nvidia.com/T4"),
            HostDevice::new("inaccel0", "fpga"),
        ]);

        let changed = default_virtual_machine(&defaulter, &mut vm)
            .await
            .expect("defaulting succeeds");

        assert!(!changed);
    }

    #[test]
    fn test_merge_patch_only_touches_host_devices() {
        let patch = host_devices_merge_patch(&[HostDevice::new("inaccel0", "fpga")], None);

        assert_eq!(
            patch,
            json!({"spec": {"template": {"spec": {"domain": {"devices": {
                "hostDevices": [{"name": "inaccel0", "deviceName": "fpga"}]
            }}}}}})
        );
    }

    #[test]
    fn test_merge_patch_carries_resource_version() {
        let patch = host_devices_merge_patch(&[HostDevice::new("inaccel0", "fpga")], Some("5"));

        assert_eq!(patch["metadata"], json!({"resourceVersion": "5"}));
        assert_eq!(
            patch["spec"]["template"]["spec"]["domain"]["devices"]["hostDevices"],
            json!([{"name": "inaccel0", "deviceName": "fpga"}])
        );
    }

    #[test]
    fn test_merge_patch_clears_empty_list() {
        let patch = host_devices_merge_patch(&[], None);

        assert_eq!(
            patch["spec"]["template"]["spec"]["domain"]["devices"]["hostDevices"],
            Value::Null
        );
    }

    #[test]
    fn test_object_key() {
        let vm = virtual_machine("tenant-a", inline_cloud_init_volume(""));

        assert_eq!(object_key(&vm), "tenant-a/fpga-vm");
    }

    /// Request seen by the fake API server: method, path, content type, body
    type RecordedRequest = (Method, String, Option<String>, Value);
    type BoxError = Box<dyn std::error::Error + Send + Sync>;

    const VM_PATH: &str = "/apis/kubevirt.io/v1/namespaces/default/virtualmachines/fpga-vm";

    /// Client over an in-process API server that answers every GET with
    /// `get_response` and echoes it back for every PATCH.
    fn fake_api_client(
        get_status: StatusCode,
        get_response: Value,
    ) -> (Client, Arc<Mutex<Vec<RecordedRequest>>>) {
        let recorded: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();
        let log = Arc::clone(&recorded);

        let service = tower::service_fn(move |request: Request<kube::client::Body>| {
            let log = Arc::clone(&log);
            let get_response = get_response.clone();
            async move {
                let (parts, body) = request.into_parts();
                let bytes = axum::body::to_bytes(axum::body::Body::new(body), usize::MAX).await?;
                let body = if bytes.is_empty() {
                    Value::Null
                } else {
                    serde_json::from_slice(&bytes)?
                };
                let content_type = parts
                    .headers
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let status = if parts.method == Method::GET {
                    get_status
                } else {
                    StatusCode::OK
                };
                log.lock()
                    .expect("request log")
                    .push((parts.method, parts.uri.path().to_string(), content_type, body));

                let response = Response::builder()
                    .status(status)
                    .header(CONTENT_TYPE, "application/json")
                    .body(kube::client::Body::from(serde_json::to_vec(&get_response)?))?;
                Ok::<_, BoxError>(response)
            }
        });

        (Client::new(service, "default"), recorded)
    }

    fn stored_vm(host_devices: Value) -> Value {
        json!({
            "apiVersion": "kubevirt.io/v1",
            "kind": "VirtualMachine",
            "metadata": {"name": "fpga-vm", "namespace": "default", "resourceVersion": "5"},
            "spec": {
                "running": true,
                "template": {"spec": {
                    "domain": {"devices": {"hostDevices": host_devices}},
                    "volumes": [{"name": "cloudinitdisk", "cloudInitNoCloud": {"userData": "inaccel:\n  fpga: 1\n"}}]
                }}
            }
        })
    }

    fn cached_vm() -> VirtualMachine {
        virtual_machine("default", inline_cloud_init_volume("inaccel:\n  fpga: 1\n"))
    }

    fn recorded_requests(recorded: &Arc<Mutex<Vec<RecordedRequest>>>) -> Vec<RecordedRequest> {
        recorded.lock().expect("request log").clone()
    }

    #[tokio::test]
    async fn test_deleted_vm_is_a_no_op() {
        let (client, recorded) = fake_api_client(
            StatusCode::NOT_FOUND,
            json!({
                "kind": "Status",
                "apiVersion": "v1",
                "metadata": {},
                "status": "Failure",
                "message": "virtualmachines.kubevirt.io \"fpga-vm\" not found",
                "reason": "NotFound",
                "details": {"name": "fpga-vm", "group": "kubevirt.io", "kind": "virtualmachines"},
                "code": 404
            }),
        );
        let reconciler = Reconciler::new(
            client,
            Arc::new(create_test_defaulter(MockSecretSource::new())),
        );
        let vm = cached_vm();
        for _ in 0..3 {
            reconciler.failure_backoff(&vm);
        }

        let action = reconciler
            .reconcile_virtual_machine(&vm)
            .await
            .expect("missing VM is not an error");

        assert_eq!(action, Action::await_change());
        let requests = recorded_requests(&recorded);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, Method::GET);
        assert_eq!(requests[0].1, VM_PATH);
        // Failure history of the deleted VM is dropped
        assert_eq!(reconciler.failure_backoff(&vm), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_changed_template_is_patched_once() {
        let (client, recorded) = fake_api_client(
            StatusCode::OK,
            stored_vm(json!([{"name": "gpu", "deviceName": "nvidia.com/T4"}])),
        );
        let reconciler = Reconciler::new(
            client,
            Arc::new(create_test_defaulter(MockSecretSource::new())),
        );

        let action = reconciler
            .reconcile_virtual_machine(&cached_vm())
            .await
            .expect("reconcile succeeds");

        assert_eq!(action, Action::await_change());
        let requests = recorded_requests(&recorded);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, Method::GET);

        let (method, path, content_type, body) = &requests[1];
        assert_eq!(*method, Method::PATCH);
        assert_eq!(path, VM_PATH);
        assert_eq!(content_type.as_deref(), Some("application/merge-patch+json"));
        assert_eq!(
            *body,
            json!({
                "metadata": {"resourceVersion": "5"},
                "spec": {"template": {"spec": {"domain": {"devices": {"hostDevices": [
                    {"name": "gpu", "deviceName": "nvidia.com/T4"},
                    {"name": "inaccel0", "deviceName": "fpga"}
                ]}}}}}
            })
        );
    }

    #[tokio::test]
    async fn test_up_to_date_vm_is_not_patched() {
        let (client, recorded) = fake_api_client(
            StatusCode::OK,
            stored_vm(json!([
                {"name": "gpu", "deviceName": "nvidia.com/T4"},
                {"name": "inaccel0", "deviceName": "fpga"}
            ])),
        );
        let reconciler = Reconciler::new(
            client,
            Arc::new(create_test_defaulter(MockSecretSource::new())),
        );

        reconciler
            .reconcile_virtual_machine(&cached_vm())
            .await
            .expect("reconcile succeeds");

        let requests = recorded_requests(&recorded);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, Method::GET);
    }
}
