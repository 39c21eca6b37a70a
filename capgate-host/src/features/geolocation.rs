//! Current position reads

use capgate_api::{Capability, Position, PositionOptions};
use std::sync::Arc;

use crate::backend::LocationBackend;
use crate::error::BackendResult;
use crate::guard::Guard;
use crate::permission::AlertKeys;

const ALERT: AlertKeys = AlertKeys::new("geolocation", "alert");

#[derive(Clone)]
pub struct Geolocation {
    guard: Guard,
    location: Arc<dyn LocationBackend>,
    options: PositionOptions,
}

impl Geolocation {
    pub fn new(guard: Guard, location: Arc<dyn LocationBackend>) -> Self {
        Self {
            guard,
            location,
            options: PositionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    /// One position read; a failed read is returned as-is, never retried
    pub async fn read_current_location(&self) -> BackendResult<Option<Position>> {
        self.guard
            .run(
                Capability::ForegroundLocation,
                ALERT,
                None,
                "read_current_location",
                move || self.location.current_position(&self.options),
            )
            .await
    }
}

impl std::fmt::Debug for Geolocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geolocation")
            .field("options", &self.options)
            .finish()
    }
}
