use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use recon_common::Cents;
use recon_common::normalize_name;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------       Deposit       ---------------------------------------------------------
/// An inbound payment credited to a holding account.
///
/// `claimed` moves from `false` to `true` exactly once, through the store's conditional claim. Once claimed, the
/// deposit is never offered to the matcher again.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Deposit {
    pub id: i64,
    pub amount: Cents,
    /// Lower-cased, whitespace-collapsed sender name. See [`normalize_name`].
    pub sender_name_normalized: String,
    pub sender_document: Option<String>,
    /// The receiving account (sub-account) that was credited.
    pub account_id: String,
    pub claimed: bool,
    pub transaction_date: DateTime<Utc>,
}

/// A deposit as delivered by an ingestion job, before it has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeposit {
    pub amount: Cents,
    pub sender_name: String,
    pub sender_document: Option<String>,
    pub account_id: String,
    pub transaction_date: DateTime<Utc>,
}

impl NewDeposit {
    pub fn new<S: Into<String>, A: Into<String>>(amount: Cents, sender_name: S, account_id: A) -> Self {
        Self {
            amount,
            sender_name: sender_name.into(),
            sender_document: None,
            account_id: account_id.into(),
            transaction_date: Utc::now(),
        }
    }

    pub fn with_document<S: Into<String>>(mut self, document: S) -> Self {
        self.sender_document = Some(document.into());
        self
    }

    pub fn with_transaction_date(mut self, date: DateTime<Utc>) -> Self {
        self.transaction_date = date;
        self
    }

    pub fn normalized_sender_name(&self) -> String {
        normalize_name(&self.sender_name)
    }

    /// Empty or blank documents are stored as NULL.
    pub fn document(&self) -> Option<String> {
        clean_document(self.sender_document.as_deref())
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// A pending obligation awaiting a funding deposit.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub amount: Cents,
    pub payer_name: String,
    pub payer_document: Option<String>,
    /// The deposit that funded this order. Set once, by the matcher.
    pub deposit_id: Option<i64>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_unlinked(&self) -> bool {
        self.deposit_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub amount: Cents,
    pub payer_name: String,
    pub payer_document: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(amount: Cents, payer_name: S) -> Self {
        Self {
            amount,
            payer_name: payer_name.into(),
            payer_document: None,
            status: OrderStatusType::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn with_document<S: Into<String>>(mut self, document: S) -> Self {
        self.payer_document = Some(document.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = status;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn document(&self) -> Option<String> {
        clean_document(self.payer_document.as_deref())
    }
}

fn clean_document(doc: Option<&str>) -> Option<String> {
    doc.map(str::trim).filter(|d| !d.is_empty()).map(String::from)
}

//--------------------------------------    ClaimOutcome     ---------------------------------------------------------
/// The result of claiming a deposit and linking it to an order in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The deposit is claimed and funds the order. Both writes were committed together.
    Linked,
    /// Another actor claimed the deposit first. Nothing was written.
    DepositTaken,
    /// The order was linked by another actor (or no longer exists) since it was loaded. Nothing was written and the
    /// deposit is still unclaimed.
    OrderUnavailable,
    /// The commit failed, and afterwards the deposit was found claimed with no order referencing it.
    Orphaned(String),
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order is waiting for a deposit. Only pending orders are offered to the matcher.
    Pending,
    /// The order has been settled by the back office.
    Paid,
    /// The order has been cancelled by the user or admin.
    Cancelled,
    /// The order has expired.
    Expired,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Paid => write!(f, "paid"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
            OrderStatusType::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct OrderStatusConversionError(String);

impl FromStr for OrderStatusType {
    type Err = OrderStatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(OrderStatusConversionError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_status_round_trip() {
        for status in [
            OrderStatusType::Pending,
            OrderStatusType::Paid,
            OrderStatusType::Cancelled,
            OrderStatusType::Expired,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("New".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn new_deposit_cleans_inputs() {
        let deposit = NewDeposit::new(Cents::from(5000), "  John   SILVA ", "acc-1").with_document("  ");
        assert_eq!(deposit.normalized_sender_name(), "john silva");
        assert_eq!(deposit.document(), None);
        let deposit = deposit.with_document(" 123 ");
        assert_eq!(deposit.document().as_deref(), Some("123"));
    }
}
