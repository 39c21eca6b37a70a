//! Choosing an image from the gallery or the camera

use capgate_api::{Capability, PickedAsset, PickerOptions, PickerOverrides};
use std::sync::Arc;

use crate::backend::PickerBackend;
use crate::error::{BackendError, BackendResult};
use crate::guard::Guard;
use crate::permission::AlertKeys;

const GALLERY_ALERT: AlertKeys = AlertKeys::new("image_picker", "alert.media_library");
const CAMERA_ALERT: AlertKeys = AlertKeys::new("image_picker", "alert.camera");

/// Gallery and camera pickers
#[derive(Clone)]
pub struct ImagePicker {
    guard: Guard,
    picker: Arc<dyn PickerBackend>,
    gallery_defaults: PickerOptions,
    camera_defaults: PickerOptions,
}

impl ImagePicker {
    pub fn new(guard: Guard, picker: Arc<dyn PickerBackend>) -> Self {
        Self {
            guard,
            picker,
            gallery_defaults: PickerOptions::gallery_defaults(),
            camera_defaults: PickerOptions::camera_defaults(),
        }
    }

    /// Replace the base options caller overrides are merged into
    pub fn with_defaults(mut self, gallery: PickerOptions, camera: PickerOptions) -> Self {
        self.gallery_defaults = gallery;
        self.camera_defaults = camera;
        self
    }

    pub fn gallery_options(&self, overrides: Option<&PickerOverrides>) -> PickerOptions {
        merge(&self.gallery_defaults, overrides)
    }

    pub fn camera_options(&self, overrides: Option<&PickerOverrides>) -> PickerOptions {
        merge(&self.camera_defaults, overrides)
    }

    /// First image picked from the gallery; `Ok(None)` when refused or canceled
    pub async fn pick_from_gallery(
        &self,
        overrides: Option<&PickerOverrides>,
    ) -> BackendResult<Option<PickedAsset>> {
        let options = self.gallery_options(overrides);
        self.guard
            .run(
                Capability::MediaPicker,
                GALLERY_ALERT,
                None,
                "pick_from_gallery",
                move || async move {
                    let result = self.picker.launch_gallery(&options).await?;
                    Ok::<_, BackendError>(first_pick(result, "gallery"))
                },
            )
            .await
    }

    /// Image taken with the camera; `Ok(None)` when refused or canceled
    pub async fn pick_from_camera(
        &self,
        overrides: Option<&PickerOverrides>,
    ) -> BackendResult<Option<PickedAsset>> {
        let options = self.camera_options(overrides);
        self.guard
            .run(
                Capability::Camera,
                CAMERA_ALERT,
                None,
                "pick_from_camera",
                move || async move {
                    let result = self.picker.launch_camera(&options).await?;
                    Ok::<_, BackendError>(first_pick(result, "camera"))
                },
            )
            .await
    }
}

fn merge(defaults: &PickerOptions, overrides: Option<&PickerOverrides>) -> PickerOptions {
    match overrides {
        Some(overrides) => defaults.clone().merged(overrides),
        None => defaults.clone(),
    }
}

fn first_pick(result: capgate_api::PickerResult, source: &str) -> Option<PickedAsset> {
    if result.canceled {
        tracing::debug!(source, "Picker canceled");
    }
    result.into_first()
}

impl std::fmt::Debug for ImagePicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePicker")
            .field("gallery_defaults", &self.gallery_defaults)
            .field("camera_defaults", &self.camera_defaults)
            .finish()
    }
}
