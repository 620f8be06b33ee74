//! Continent lock report query parameters.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::service::Delivery;

/// Query parameters for the lock report endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportParams {
    /// Also broadcast the report on the configured channel.
    #[serde(default)]
    pub broadcast: bool,
}

impl ReportParams {
    /// Delivery mode requested by the caller.
    #[must_use]
    pub const fn delivery(&self) -> Delivery {
        if self.broadcast {
            Delivery::Broadcast
        } else {
            Delivery::Reply
        }
    }
}
