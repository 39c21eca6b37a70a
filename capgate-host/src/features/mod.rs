//! Guarded feature entry points
//!
//! | Feature | Entry points | Capability | Alert keys |
//! |---------|--------------|------------|------------|
//! | [`CameraRoll`] | `save_from_url`, `save_from_payload` | media library | `camera_roll` / `alert` |
//! | [`ImagePicker`] | `pick_from_gallery` | media picker | `image_picker` / `alert.media_library` |
//! | [`ImagePicker`] | `pick_from_camera` | camera | `image_picker` / `alert.camera` |
//! | [`Geolocation`] | `read_current_location` | foreground location | `geolocation` / `alert` |
//! | [`MediaPicker`] | `list_recent_assets` | media library | `media_picker` / `alert.media_library` |
//!
//! Every entry point returns `Ok(None)` when access is refused or the
//! action produced nothing, and `Err` for backend failures.

pub mod camera_roll;
pub mod geolocation;
pub mod image_picker;
pub mod media_picker;

pub use camera_roll::CameraRoll;
pub use geolocation::Geolocation;
pub use image_picker::ImagePicker;
pub use media_picker::MediaPicker;

#[cfg(test)]
pub(crate) mod fixture {
    use std::sync::Arc;

    use crate::audit::MemoryAuditSink;
    use crate::backend::MemoryPermissionProvider;
    use crate::guard::Guard;
    use crate::permission::{
        DenialRecovery, PermissionOracle, RecordingRecoveryPresenter, RecordingSettingsLauncher,
        RecoveryChoice,
    };
    use crate::strings::StringTable;
    use crate::toast::RecordingNotifier;

    pub(crate) struct GuardFixture {
        pub provider: Arc<MemoryPermissionProvider>,
        pub presenter: Arc<RecordingRecoveryPresenter>,
        pub settings: Arc<RecordingSettingsLauncher>,
        pub notifier: Arc<RecordingNotifier>,
        pub audit: Arc<MemoryAuditSink>,
        pub guard: Guard,
    }

    pub(crate) fn guard_with(provider: MemoryPermissionProvider, choice: RecoveryChoice) -> GuardFixture {
        let provider = Arc::new(provider);
        let presenter = Arc::new(RecordingRecoveryPresenter::new(choice));
        let settings = Arc::new(RecordingSettingsLauncher::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let strings = Arc::new(StringTable::english());

        let recovery = DenialRecovery::new(
            presenter.clone(),
            settings.clone(),
            strings.clone(),
            audit.clone(),
        );
        let oracle = PermissionOracle::new(provider.clone(), recovery, audit.clone());
        let guard = Guard::new(oracle, notifier.clone(), strings, audit.clone());

        GuardFixture {
            provider,
            presenter,
            settings,
            notifier,
            audit,
            guard,
        }
    }

    pub(crate) fn guard(provider: MemoryPermissionProvider) -> GuardFixture {
        guard_with(provider, RecoveryChoice::Deny)
    }
}
