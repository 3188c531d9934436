use std::fmt;

/// Closed set of event types the outbox publisher knows how to route.
///
/// Adding a new event type means adding a variant here, a descriptor in
/// [`crate::registry::descriptor_for`], and a payload in
/// [`crate::payloads`] — there is no open/dynamic registration path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    OrderCreated,
    OrderDecided,
    OrderReadyForDispatch,
    OrderCanceled,
    OrderRetried,
    OrderPendingNudge,
    OrderExpired,
    CashCollected,
    PaymentFailed,
    PaymentRejected,
    OrderPaid,
    NotificationRequested,
    LicenseStatusChanged,
    LicenseExpiringSoon,
    LicenseExpired,
    CheckoutConverted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderCreated => "order.created",
            EventType::OrderDecided => "order.decided",
            EventType::OrderReadyForDispatch => "order.ready_for_dispatch",
            EventType::OrderCanceled => "order.canceled",
            EventType::OrderRetried => "order.retried",
            EventType::OrderPendingNudge => "order.pending_nudge",
            EventType::OrderExpired => "order.expired",
            EventType::CashCollected => "cash_collected",
            EventType::PaymentFailed => "payment.failed",
            EventType::PaymentRejected => "payment.rejected",
            EventType::OrderPaid => "order.paid",
            EventType::NotificationRequested => "notification.requested",
            EventType::LicenseStatusChanged => "license.status_changed",
            EventType::LicenseExpiringSoon => "license.expiring_soon",
            EventType::LicenseExpired => "license.expired",
            EventType::CheckoutConverted => "checkout.converted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "order.created" => EventType::OrderCreated,
            "order.decided" => EventType::OrderDecided,
            "order.ready_for_dispatch" => EventType::OrderReadyForDispatch,
            "order.canceled" => EventType::OrderCanceled,
            "order.retried" => EventType::OrderRetried,
            "order.pending_nudge" => EventType::OrderPendingNudge,
            "order.expired" => EventType::OrderExpired,
            "cash_collected" => EventType::CashCollected,
            "payment.failed" => EventType::PaymentFailed,
            "payment.rejected" => EventType::PaymentRejected,
            "order.paid" => EventType::OrderPaid,
            "notification.requested" => EventType::NotificationRequested,
            "license.status_changed" => EventType::LicenseStatusChanged,
            "license.expiring_soon" => EventType::LicenseExpiringSoon,
            "license.expired" => EventType::LicenseExpired,
            "checkout.converted" => EventType::CheckoutConverted,
            _ => return None,
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of aggregate types an event may be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateType {
    CheckoutGroup,
    VendorOrder,
    License,
}

impl AggregateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateType::CheckoutGroup => "checkout_group",
            AggregateType::VendorOrder => "vendor_order",
            AggregateType::License => "license",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "checkout_group" => AggregateType::CheckoutGroup,
            "vendor_order" => AggregateType::VendorOrder,
            "license" => AggregateType::License,
            _ => return None,
        })
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of destination topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Orders,
    Billing,
    Notifications,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Orders => "orders",
            Topic::Billing => "billing",
            Topic::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
