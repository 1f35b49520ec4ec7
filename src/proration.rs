//! Proration of an order's charges across splits
//!
//! Pure functions: they read an [`Order`] and produce unpersisted [`Split`]s.
//! Tax is distributed in proportion to each split's share of the order subtotal.

use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domain::aggregates::{Order, Split, SplitItem};
use crate::domain::value_objects::PaymentStatus;
use crate::{Result, SplitBillError};

/// One requested sub-bill in a split-by-items.
#[derive(Clone, Debug)]
pub struct SplitRequest {
    pub items: Vec<SplitItemRequest>,
    pub customer_name: Option<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct SplitItemRequest { pub menu_id: Uuid, pub quantity: u32 }

/// Subtotal the tax ratio is taken against: the stored subtotal when it is set
/// and non-zero, otherwise item totals plus extras.
pub fn order_subtotal(order: &Order) -> Result<Decimal> {
    match order.subtotal {
        Some(subtotal) if !subtotal.is_zero() => Ok(subtotal),
        _ => checked_sum(order.items.iter().map(|i| i.item_total).chain(order.extra_items.iter().map(|e| e.total))),
    }
}

fn overflow() -> SplitBillError {
    SplitBillError::Validation("amount out of range".into())
}

fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(amount).ok_or_else(overflow))
}

/// `amount * (tax / base)`, or zero when the tax is absent or the base is zero.
fn prorate(amount: Decimal, tax: Option<Decimal>, base: Decimal) -> Result<Decimal> {
    let tax = tax.unwrap_or(Decimal::ZERO);
    match tax.checked_div(base) {
        Some(ratio) => amount.checked_mul(ratio).ok_or_else(overflow),
        None => Ok(Decimal::ZERO),
    }
}

fn split_with(split_number: u32, items: Vec<SplitItem>, subtotal: Decimal, gst: Decimal, sgst: Decimal, total_amount: Decimal, customer_name: Option<&str>) -> Split {
    let customer_name = customer_name.map(str::trim).filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Split::default_customer_name(split_number));
    Split {
        split_number, items, subtotal, gst, sgst, total_amount,
        payment_status: PaymentStatus::Pending, payment_details: None, customer_name,
    }
}

/// Build one split per request from the order lines it names.
///
/// Requested quantities are not checked against what other splits already
/// claimed; the same order line may be allocated more than once.
pub fn split_by_items(order: &Order, requests: &[SplitRequest]) -> Result<Vec<Split>> {
    if requests.is_empty() { return Err(SplitBillError::Validation("no splits requested".into())); }
    let base = order_subtotal(order)?;

    requests.iter().enumerate().map(|(index, request)| {
        let split_number = index as u32 + 1;
        let items = request.items.iter().map(|wanted| {
            if wanted.quantity == 0 {
                return Err(SplitBillError::Validation(format!("split {}: quantity must be at least 1", split_number)));
            }
            let line = order.find_item(wanted.menu_id).ok_or(SplitBillError::ItemNotFound(wanted.menu_id))?;
            let unit_price = line.item_total.checked_div(Decimal::from(line.quantity)).unwrap_or(Decimal::ZERO);
            let item_total = unit_price.checked_mul(Decimal::from(wanted.quantity)).ok_or_else(overflow)?;
            Ok(SplitItem { menu_id: line.menu_id, name: line.name.clone(), quantity: wanted.quantity, item_total })
        }).collect::<Result<Vec<_>>>()?;

        let subtotal = checked_sum(items.iter().map(|i| i.item_total))?;
        let gst = prorate(subtotal, order.gst, base)?;
        let sgst = prorate(subtotal, order.sgst, base)?;
        let total_amount = checked_sum([subtotal, gst, sgst])?;
        Ok(split_with(split_number, items, subtotal, gst, sgst, total_amount, request.customer_name.as_deref()))
    }).collect()
}

/// Divide every monetary field by `number_of_splits`. Remainders are not
/// redistributed.
pub fn split_equally(order: &Order, number_of_splits: u32) -> Result<Vec<Split>> {
    if number_of_splits == 0 { return Err(SplitBillError::Validation("number of splits must be positive".into())); }
    let n = Decimal::from(number_of_splits);
    let share = |amount: Decimal| amount / n;

    let subtotal = share(order_subtotal(order)?);
    let gst = share(order.gst.unwrap_or(Decimal::ZERO));
    let sgst = share(order.sgst.unwrap_or(Decimal::ZERO));
    let total_amount = share(order.total_amount);

    Ok((1..=number_of_splits)
        .map(|split_number| split_with(split_number, vec![], subtotal, gst, sgst, total_amount, None))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{ExtraItem, OrderItem};
    use crate::domain::value_objects::{money_eq, MONEY_EPSILON};

    fn dec(value: &str) -> Decimal { value.parse().unwrap() }

    fn item(name: &str, quantity: u32, total: i64) -> OrderItem {
        OrderItem { menu_id: Uuid::new_v4(), name: name.into(), quantity, item_total: Decimal::from(total) }
    }

    fn sample_order() -> Order {
        let mut order = Order::create("ORD-100", vec![item("Paneer Tikka", 2, 200), item("Lassi", 1, 70)]);
        order.subtotal = Some(Decimal::from(270));
        order.gst = Some(Decimal::from(15));
        order.sgst = Some(Decimal::from(15));
        order.total_amount = Decimal::from(300);
        order
    }

    fn wants(menu_id: Uuid, quantity: u32) -> SplitItemRequest { SplitItemRequest { menu_id, quantity } }

    #[test]
    fn test_split_by_items_prorates_tax() {
        let order = sample_order();
        let (a, b) = (order.items[0].menu_id, order.items[1].menu_id);
        let requests = vec![
            SplitRequest { items: vec![wants(a, 1)], customer_name: None },
            SplitRequest { items: vec![wants(a, 1), wants(b, 1)], customer_name: Some("Asha".into()) },
        ];
        let splits = split_by_items(&order, &requests).unwrap();

        assert_eq!(splits[0].subtotal, Decimal::from(100));
        assert_eq!(splits[0].gst.round_dp(2), dec("5.56"));
        assert_eq!(splits[0].sgst.round_dp(2), dec("5.56"));
        assert_eq!(splits[0].total_amount.round_dp(2), dec("111.11"));
        assert_eq!(splits[0].customer_name, "Split 1");

        assert_eq!(splits[1].subtotal, Decimal::from(170));
        assert_eq!(splits[1].gst.round_dp(2), dec("9.44"));
        assert_eq!(splits[1].total_amount.round_dp(2), dec("188.89"));
        assert_eq!(splits[1].customer_name, "Asha");
        assert_eq!(splits[1].items.len(), 2);

        let sum: Decimal = splits.iter().map(|s| s.total_amount).sum();
        assert!(money_eq(sum, order.total_amount));
        for s in &splits {
            assert!(money_eq(s.total_amount, s.subtotal + s.gst + s.sgst));
            assert!(money_eq(s.gst, dec("15") * s.subtotal / dec("270")));
        }
    }

    #[test]
    fn test_zero_subtotal_yields_zero_tax() {
        let mut order = Order::create("ORD-0", vec![item("Water", 1, 0)]);
        order.subtotal = Some(Decimal::ZERO);
        order.gst = Some(Decimal::from(5));
        order.sgst = None;
        let id = order.items[0].menu_id;
        let requests = vec![
            SplitRequest { items: vec![wants(id, 1)], customer_name: None },
            SplitRequest { items: vec![wants(id, 1)], customer_name: None },
        ];
        let splits = split_by_items(&order, &requests).unwrap();
        assert!(splits.iter().all(|s| s.gst.is_zero() && s.sgst.is_zero() && s.total_amount.is_zero()));
    }

    #[test]
    fn test_subtotal_falls_back_to_lines_and_extras() {
        let mut order = sample_order();
        order.subtotal = None;
        order.extra_items = vec![ExtraItem { name: "Service".into(), total: Decimal::from(30) }];
        assert_eq!(order_subtotal(&order).unwrap(), Decimal::from(300));
    }

    #[test]
    fn test_unknown_item_is_rejected() {
        let order = sample_order();
        let stranger = Uuid::new_v4();
        let requests = vec![
            SplitRequest { items: vec![wants(order.items[0].menu_id, 1)], customer_name: None },
            SplitRequest { items: vec![wants(stranger, 1)], customer_name: None },
        ];
        let err = split_by_items(&order, &requests).unwrap_err();
        assert!(matches!(err, SplitBillError::ItemNotFound(id) if id == stranger));
    }

    #[test]
    fn test_over_allocation_is_not_checked() {
        let order = sample_order();
        let b = order.items[1].menu_id;
        let requests = vec![
            SplitRequest { items: vec![wants(b, 1)], customer_name: None },
            SplitRequest { items: vec![wants(b, 1)], customer_name: None },
        ];
        let splits = split_by_items(&order, &requests).unwrap();
        assert_eq!(splits[0].subtotal + splits[1].subtotal, Decimal::from(140));
    }

    #[test]
    fn test_oversized_quantity_is_rejected() {
        let mut order = Order::create("ORD-MAX", vec![item("Banquet", 1, 0)]);
        order.items[0].item_total = Decimal::MAX;
        let id = order.items[0].menu_id;
        let requests = vec![
            SplitRequest { items: vec![wants(id, u32::MAX)], customer_name: None },
            SplitRequest { items: vec![wants(id, 1)], customer_name: None },
        ];
        let err = split_by_items(&order, &requests).unwrap_err();
        assert!(matches!(err, SplitBillError::Validation(_)));
    }

    #[test]
    fn test_split_equally() {
        let order = sample_order();
        let splits = split_equally(&order, 3).unwrap();
        assert_eq!(splits.len(), 3);
        for (i, s) in splits.iter().enumerate() {
            assert_eq!(s.split_number, i as u32 + 1);
            assert_eq!(s.total_amount, Decimal::from(100));
            assert_eq!(s.subtotal, Decimal::from(90));
            assert_eq!(s.gst, Decimal::from(5));
            assert!(s.items.is_empty());
        }
    }

    #[test]
    fn test_split_equally_conserves_total_without_remainder_distribution() {
        let mut order = sample_order();
        order.total_amount = Decimal::from(100);
        for n in 2..=10 {
            let splits = split_equally(&order, n).unwrap();
            let sum: Decimal = splits.iter().map(|s| s.total_amount).sum();
            assert!((sum - order.total_amount).abs() <= MONEY_EPSILON, "n = {}", n);
            assert!(splits.windows(2).all(|w| w[0].total_amount == w[1].total_amount));
        }
    }
}
