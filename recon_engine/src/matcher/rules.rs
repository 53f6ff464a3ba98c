//! Candidate rules: which orders a deposit is allowed to fund.
//!
//! A pair is a candidate when the amounts are exactly equal and either the documents agree or one name contains the
//! other. Amount equality is integer equality on [`Cents`](crate::db_types::Cents).
use recon_common::normalize_name;

use crate::db_types::{Deposit, Order};

pub fn is_candidate(deposit: &Deposit, order: &Order) -> bool {
    order.amount == deposit.amount &&
        (documents_match(order.payer_document.as_deref(), deposit.sender_document.as_deref()) ||
            names_match(&deposit.sender_name_normalized, &order.payer_name))
}

/// The order must carry a non-blank document, and it must equal the deposit's.
pub fn documents_match(order_document: Option<&str>, deposit_document: Option<&str>) -> bool {
    match (order_document.map(str::trim).filter(|d| !d.is_empty()), deposit_document.map(str::trim)) {
        (Some(order_doc), Some(deposit_doc)) => order_doc == deposit_doc,
        _ => false,
    }
}

/// Case-insensitive containment in either direction. A blank name on either side never matches, since the empty
/// string is contained in everything.
pub fn names_match(deposit_name: &str, payer_name: &str) -> bool {
    let deposit_name = normalize_name(deposit_name);
    let payer_name = normalize_name(payer_name);
    if deposit_name.is_empty() || payer_name.is_empty() {
        return false;
    }
    deposit_name.contains(&payer_name) || payer_name.contains(&deposit_name)
}
