//! Status enums for various entities.
//!
//! Each enum mirrors a `PostgreSQL` enum type in the `shop` schema and
//! round-trips through its snake_case name for JSON, query strings and SQL.

use serde::{Deserialize, Serialize};

/// Implements `Display` and `FromStr` over a fixed set of snake_case names.
macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The snake_case name used in JSON and SQL.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $label, ": {}"), s)),
                }
            }
        }
    };
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at checkout, awaiting payment.
    #[default]
    Pending,
    /// Payment confirmed.
    Paid,
    /// Being prepared for shipping.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled before fulfilment; reserved stock is returned.
    Cancelled,
    /// Refunded after payment.
    Refunded,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl OrderStatus {
    /// Whether the order's money counts towards revenue.
    #[must_use]
    pub const fn counts_as_revenue(&self) -> bool {
        matches!(
            self,
            Self::Paid | Self::Processing | Self::Shipped | Self::Delivered
        )
    }

    /// Whether moving to this status releases reserved stock.
    #[must_use]
    pub const fn releases_stock(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

/// Payment status reported by the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

/// Where a banner is displayed on the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.banner_position", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BannerPosition {
    /// Full-width homepage slider.
    #[default]
    Hero,
    /// Thin announcement strip above the header.
    TopBar,
    /// Header image on category pages.
    Category,
    /// Promotional block above the footer.
    Footer,
}

string_enum!(BannerPosition, "banner position", {
    Hero => "hero",
    TopBar => "top_bar",
    Category => "category",
    Footer => "footer",
});

/// The purpose of a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.popup_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PopupKind {
    /// Newsletter signup form.
    #[default]
    Newsletter,
    /// Discount or sale promotion.
    Promotion,
    /// Informational notice.
    Announcement,
}

string_enum!(PopupKind, "popup kind", {
    Newsletter => "newsletter",
    Promotion => "promotion",
    Announcement => "announcement",
});

/// Newsletter subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.subscription_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Subscribed,
    Unsubscribed,
}

string_enum!(SubscriptionStatus, "subscription status", {
    Subscribed => "subscribed",
    Unsubscribed => "unsubscribed",
});

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access including admin user management.
    SuperAdmin,
    /// Full access to store management features.
    Admin,
    /// Read-only access to store data.
    Viewer,
}

string_enum!(AdminRole, "admin role", {
    SuperAdmin => "super_admin",
    Admin => "admin",
    Viewer => "viewer",
});

impl AdminRole {
    /// Whether this role may create, update or delete store data.
    #[must_use]
    pub const fn can_write(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_string_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        for position in BannerPosition::ALL {
            assert_eq!(
                position.to_string().parse::<BannerPosition>().unwrap(),
                *position
            );
        }
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&BannerPosition::TopBar).unwrap();
        assert_eq!(json, "\"top_bar\"");
        assert_eq!(BannerPosition::TopBar.to_string(), "top_bar");
    }

    #[test]
    fn test_invalid_value() {
        let err = "archived".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err, "invalid order status: archived");
    }

    #[test]
    fn test_revenue_statuses() {
        assert!(OrderStatus::Paid.counts_as_revenue());
        assert!(OrderStatus::Delivered.counts_as_revenue());
        assert!(!OrderStatus::Pending.counts_as_revenue());
        assert!(!OrderStatus::Refunded.counts_as_revenue());
    }

    #[test]
    fn test_admin_role_permissions() {
        assert!(AdminRole::SuperAdmin.can_write());
        assert!(AdminRole::Admin.can_write());
        assert!(!AdminRole::Viewer.can_write());
    }
}
