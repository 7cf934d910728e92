//! Topics and event names.

use serde::{Deserialize, Serialize};

/// Coarse-grained topic per producing domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Auth,
    Vendor,
    Subscription,
    Payment,
    Order,
    Product,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Auth => "auth",
            Topic::Vendor => "vendor",
            Topic::Subscription => "subscription",
            Topic::Payment => "payment",
            Topic::Order => "order",
            Topic::Product => "product",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auth" => Ok(Topic::Auth),
            "vendor" => Ok(Topic::Vendor),
            "subscription" => Ok(Topic::Subscription),
            "payment" => Ok(Topic::Payment),
            "order" => Ok(Topic::Order),
            "product" => Ok(Topic::Product),
            other => Err(format!("unknown topic '{other}'")),
        }
    }
}

/// Event names, `<topic>.<fact>`.
pub mod events {
    pub const USER_CREATED: &str = "user.created";
    pub const USER_VERIFIED: &str = "user.verified";

    pub const VENDOR_SUBSCRIPTION_CREATED: &str = "subscription.vendor_subscription_created";
    pub const VENDOR_SUBSCRIPTION_PAID: &str = "subscription.vendor_subscription_paid";

    pub const VENDOR_SUBSCRIPTION_PAID_FOR: &str = "payment.vendor_subscription_paid_for";
    pub const ORDER_PAID_FOR: &str = "payment.order_paid_for";

    pub const ORDER_PLACED: &str = "order.order_placed";

    pub const VENDOR_ACTIVATED: &str = "vendor.vendor_activated";
}
