//! Closed enumerations for record statuses and categories.
//!
//! Every enum serializes, displays and parses using the human-readable label
//! stored in the database (e.g. `"Pending Label"`). Parsing is
//! case-insensitive and ignores surrounding whitespace.

use thiserror::Error;

/// A string did not name any variant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value:?} (expected one of: {expected})")]
pub struct UnknownVariant {
    /// Enumeration name, e.g. `"listing status"`.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma-separated list of accepted labels.
    pub expected: String,
}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Human-readable label, as stored in the database.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|v| v.label())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

labelled_enum! {
    /// Where an inventory item is in its listing lifecycle.
    ListingStatus ("listing status") {
        Draft => "Draft",
        Listed => "Listed",
        Sold => "Sold",
        Returned => "Returned",
        Archived => "Archived",
    }
}

labelled_enum! {
    /// Platform-side settlement state of a sale's proceeds.
    PayoutStatus ("payout status") {
        Pending => "Pending",
        Processing => "Processing",
        Paid => "Paid",
        OnHold => "On Hold",
    }
}

labelled_enum! {
    /// Carrier progress of a shipment.
    ShipmentStatus ("shipment status") {
        PendingLabel => "Pending Label",
        LabelCreated => "Label Created",
        Shipped => "Shipped",
        InTransit => "In Transit",
        Delivered => "Delivered",
        Problem => "Problem",
    }
}

labelled_enum! {
    /// Progress of a return or dispute.
    ReturnStatus ("return status") {
        Opened => "Opened",
        InProgress => "In Progress",
        Resolved => "Resolved",
        Rejected => "Rejected",
    }
}

labelled_enum! {
    /// Progress of a to-do item.
    TaskStatus ("task status") {
        Todo => "Todo",
        InProgress => "In Progress",
        Done => "Done",
        Cancelled => "Cancelled",
    }
}

labelled_enum! {
    /// Kind of work a task represents.
    TaskCategory ("task category") {
        Photography => "Photography",
        Listing => "Listing",
        Packing => "Packing",
        Shipping => "Shipping",
        CustomerService => "Customer Service",
        Sourcing => "Sourcing",
        Other => "Other",
    }
}

labelled_enum! {
    /// Task urgency.
    TaskPriority ("task priority") {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Urgent => "Urgent",
    }
}

labelled_enum! {
    /// Who pays for outbound shipping.
    ShippingPayer ("shipping payer") {
        Buyer => "Buyer",
        Seller => "Seller",
    }
}

labelled_enum! {
    /// Marketplace an item is listed or sold on.
    Platform ("platform") {
        Vinted => "Vinted",
        Ebay => "eBay",
        Depop => "Depop",
        Other => "Other",
    }
}

impl Default for ListingStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl Default for PayoutStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Default for ShipmentStatus {
    fn default() -> Self {
        Self::PendingLabel
    }
}

impl Default for ReturnStatus {
    fn default() -> Self {
        Self::Opened
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Default for ShippingPayer {
    fn default() -> Self {
        Self::Buyer
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::Other
    }
}

impl Default for TaskCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl TaskPriority {
    /// Sort rank, higher is more urgent.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }
}

impl ShipmentStatus {
    /// Shipment still needs to be handed to the carrier.
    #[must_use]
    pub const fn is_awaiting_dispatch(self) -> bool {
        matches!(self, Self::PendingLabel | Self::LabelCreated)
    }
}

impl ReturnStatus {
    /// Case still needs attention.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Opened | Self::InProgress)
    }
}

impl TaskStatus {
    /// Task still needs doing.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Todo | Self::InProgress)
    }
}

impl Platform {
    /// Settings key holding this platform's fee percentage, if it has one.
    #[must_use]
    pub const fn fee_setting_key(self) -> Option<&'static str> {
        match self {
            Self::Vinted => Some("vinted_fee_percent"),
            Self::Ebay => Some("ebay_fee_percent"),
            Self::Depop => Some("depop_fee_percent"),
            Self::Other => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for status in ShipmentStatus::ALL {
            assert_eq!(status.label().parse::<ShipmentStatus>().unwrap(), *status);
        }
        for category in TaskCategory::ALL {
            assert_eq!(category.to_string().parse::<TaskCategory>().unwrap(), *category);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trims() {
        assert_eq!(" in progress ".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("EBAY".parse::<Platform>().unwrap(), Platform::Ebay);
    }

    #[test]
    fn test_unknown_variant_lists_expected_labels() {
        let err = "Shipped".parse::<ListingStatus>().unwrap_err();
        assert_eq!(err.kind, "listing status");
        assert!(err.expected.contains("Draft"));
        assert!(err.to_string().contains("\"Shipped\""));
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&PayoutStatus::OnHold).unwrap();
        assert_eq!(json, "\"On Hold\"");
        let parsed: ShipmentStatus = serde_json::from_str("\"Label Created\"").unwrap();
        assert_eq!(parsed, ShipmentStatus::LabelCreated);
    }

    #[test]
    fn test_defaults_are_initial_states() {
        assert_eq!(ListingStatus::default(), ListingStatus::Draft);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert_eq!(ShippingPayer::default(), ShippingPayer::Buyer);
    }

    #[test]
    fn test_priority_rank_orders_urgent_first() {
        let mut priorities = TaskPriority::ALL.to_vec();
        priorities.sort_by_key(|p| std::cmp::Reverse(p.rank()));
        assert_eq!(priorities.first(), Some(&TaskPriority::Urgent));
    }

    #[test]
    fn test_platform_fee_keys() {
        assert_eq!(Platform::Ebay.fee_setting_key(), Some("ebay_fee_percent"));
        assert_eq!(Platform::Other.fee_setting_key(), None);
    }
}
