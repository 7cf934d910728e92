use std::sync::Arc;

use async_trait::async_trait;
use event_bus::{BusMessage, EventHandler, HandlerError, VendorActivated, events};

use super::{IdentityService, Role, UserStore};

/// Activates the vendor role once the vendor record is active.
pub struct VendorActivatedHandler<S: UserStore> {
    identity: Arc<IdentityService<S>>,
}

impl<S: UserStore> VendorActivatedHandler<S> {
    pub fn new(identity: Arc<IdentityService<S>>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl<S: UserStore + 'static> EventHandler for VendorActivatedHandler<S> {
    fn name(&self) -> &'static str {
        "identity.vendor_activated"
    }

    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError> {
        if !message.is(events::VENDOR_ACTIVATED) {
            return Ok(());
        }
        let payload: VendorActivated = message.decode()?;
        self.identity
            .activate_role(payload.user_id, Role::Vendor)
            .await
            .map_err(|e| HandlerError::failed(self.name(), e))?;
        Ok(())
    }
}
