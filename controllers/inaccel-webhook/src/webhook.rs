//! Mutating admission webhook for VirtualMachineInstance objects.
//!
//! Every admitted instance goes through the [`Defaulter`]; when its host
//! devices change the response carries a JSON patch replacing
//! `/spec/domain/devices/hostDevices`. A declaration that cannot be resolved
//! or parsed denies the request instead of admitting a half-configured guest.

use crate::defaulter::Defaulter;
use crate::error::ControllerError;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use crds::{HostDevice, VirtualMachineInstance};
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    DynamicObject,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Path segments of the host device list inside a VirtualMachineInstance
const HOST_DEVICES_PATH: [&str; 4] = ["spec", "domain", "devices", "hostDevices"];

/// Build the webhook router.
///
/// KubeVirt deployments register the webhook either at the root or at
/// `/mutate`, so both are served.
pub fn router(defaulter: Arc<Defaulter>) -> Router {
    Router::new()
        .route("/", post(mutate))
        .route("/mutate", post(mutate))
        .route("/healthz", get(healthz))
        .route("/readyz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(defaulter)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn mutate(
    State(defaulter): State<Arc<Defaulter>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid admission review: {}", e);
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    Json(admit(&defaulter, request).await.into_review())
}

/// Decide on a single admission request.
pub async fn admit(
    defaulter: &Defaulter,
    mut request: AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let Some(object) = request.object.take() else {
        debug!("{:?} request for {} carries no object, allowing", request.operation, request.name);
        return AdmissionResponse::from(&request);
    };

    let namespace = object
        .metadata
        .namespace
        .clone()
        .or_else(|| request.namespace.clone())
        .unwrap_or_else(|| "default".to_string());

    let patch = match default_object(defaulter, &namespace, object).await {
        Ok(Some(patch)) => patch,
        Ok(None) => return AdmissionResponse::from(&request),
        Err(e) => {
            warn!(
                "Denying {:?} of VirtualMachineInstance {}/{}: {}",
                request.operation, namespace, request.name, e
            );
            return AdmissionResponse::from(&request).deny(e.to_string());
        }
    };

    match AdmissionResponse::from(&request).with_patch(patch) {
        Ok(response) => {
            info!(
                "Patched host devices of VirtualMachineInstance {}/{}",
                namespace, request.name
            );
            response
        }
        Err(e) => {
            error!("Failed to serialize host devices patch: {}", e);
            AdmissionResponse::from(&request).deny(e.to_string())
        }
    }
}

/// Run the defaulter against the admitted object, returning the patch when
/// its host devices changed.
async fn default_object(
    defaulter: &Defaulter,
    namespace: &str,
    object: DynamicObject,
) -> Result<Option<json_patch::Patch>, ControllerError> {
    let original = serde_json::to_value(&object)?;
    let mut instance: VirtualMachineInstance = serde_json::from_value(original.clone())?;

    if !defaulter
        .default_instance_spec(namespace, &mut instance.spec)
        .await?
    {
        return Ok(None);
    }

    host_devices_patch(&original, instance.spec.host_devices()).map(Some)
}

/// RFC 6902 patch that turns `original` into the same object with
/// `host_devices` as its host device list.
///
/// Only the host device list differs between the two documents, so the diff
/// never touches any other field. An empty list removes the field.
pub fn host_devices_patch(
    original: &Value,
    host_devices: &[HostDevice],
) -> Result<json_patch::Patch, ControllerError> {
    let mut modified = original.clone();
    let (parents, field) = HOST_DEVICES_PATH.split_at(HOST_DEVICES_PATH.len() - 1);

    let mut target = &mut modified;
    for segment in parents {
        let object = as_object_mut(target, segment)?;
        target = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let devices = as_object_mut(target, field[0])?;

    if host_devices.is_empty() {
        devices.remove(field[0]);
    } else {
        devices.insert(field[0].to_string(), serde_json::to_value(host_devices)?);
    }

    Ok(json_patch::diff(original, &modified))
}

fn as_object_mut<'a>(
    value: &'a mut Value,
    child: &str,
) -> Result<&'a mut Map<String, Value>, ControllerError> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut().ok_or_else(|| {
        ControllerError::InvalidObject(format!("parent of {} is not an object", child))
    })
}
