//! Lifecycle DTOs

use serde::Deserialize;
use validator::Validate;

use domain_subscription::SuspendRequest;

#[derive(Debug, Deserialize, Validate)]
pub struct SuspendBody {
    #[validate(length(min = 1, max = 120))]
    pub reason: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub actor: String,
}

impl From<SuspendBody> for SuspendRequest {
    fn from(body: SuspendBody) -> Self {
        SuspendRequest {
            reason: body.reason,
            notes: body.notes,
            actor: body.actor,
        }
    }
}

/// Body of reactivate and cancel
#[derive(Debug, Deserialize, Validate)]
pub struct ActorBody {
    #[validate(length(min = 1, max = 100))]
    pub actor: String,
}
