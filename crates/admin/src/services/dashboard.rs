//! Overview dashboard aggregation.
//!
//! The dashboard loads orders, products, customers and order lines
//! wholesale and folds them in memory. `DashboardStats::compute` is pure so
//! the arithmetic is tested without a database.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use atelier_core::pricing::round_money;
use atelier_core::{Locale, OrderStatus, ProductId};

use crate::models::{Customer, Order, OrderSummary, Product, SoldItem};

const TOP_PRODUCTS: usize = 5;
const RECENT_ORDERS: usize = 10;

/// Everything the overview page shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Sum of totals over orders that count as revenue.
    pub total_revenue: Decimal,
    pub total_orders: usize,
    /// One entry per status, zero counts included.
    pub orders_by_status: Vec<StatusCount>,
    pub average_order_value: Decimal,
    pub revenue_this_month: Decimal,
    pub revenue_last_month: Decimal,
    /// Percentage change from last month; `None` when last month had no
    /// revenue.
    pub revenue_growth: Option<Decimal>,
    pub total_customers: usize,
    pub new_customers_this_month: usize,
    pub active_subscribers: i64,
    pub total_products: usize,
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: usize,
    pub on_sale: usize,
    pub top_products: Vec<TopProduct>,
    pub recent_orders: Vec<OrderSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAlert {
    pub id: ProductId,
    pub name: String,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: Option<ProductId>,
    pub name: String,
    pub units_sold: i64,
}

/// Raw inputs for the dashboard.
#[derive(Debug, Clone, Copy)]
pub struct DashboardInput<'a> {
    pub orders: &'a [Order],
    pub products: &'a [Product],
    pub customers: &'a [Customer],
    pub sold_items: &'a [SoldItem],
    pub active_subscribers: i64,
    pub low_stock_threshold: i32,
}

impl DashboardStats {
    /// Aggregate `input` as of `now`. Months are calendar months in UTC.
    #[must_use]
    pub fn compute(input: DashboardInput<'_>, now: DateTime<Utc>) -> Self {
        let this_month = month_start(now.date_naive());
        let last_month = this_month
            .checked_sub_months(Months::new(1))
            .unwrap_or(this_month);
        let this_month = this_month.and_time(chrono::NaiveTime::MIN).and_utc();
        let last_month = last_month.and_time(chrono::NaiveTime::MIN).and_utc();

        let revenue_orders: Vec<&Order> = input
            .orders
            .iter()
            .filter(|o| o.status.counts_as_revenue())
            .collect();

        let total_revenue: Decimal = revenue_orders.iter().map(|o| o.total).sum();
        let average_order_value = if revenue_orders.is_empty() {
            Decimal::ZERO
        } else {
            round_money(total_revenue / Decimal::from(revenue_orders.len()))
        };

        let revenue_this_month: Decimal = revenue_orders
            .iter()
            .filter(|o| o.created_at >= this_month)
            .map(|o| o.total)
            .sum();
        let revenue_last_month: Decimal = revenue_orders
            .iter()
            .filter(|o| o.created_at >= last_month && o.created_at < this_month)
            .map(|o| o.total)
            .sum();

        let orders_by_status = OrderStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: input.orders.iter().filter(|o| o.status == *status).count(),
            })
            .collect();

        let mut low_stock: Vec<StockAlert> = input
            .products
            .iter()
            .filter(|p| p.stock <= input.low_stock_threshold)
            .map(|p| StockAlert {
                id: p.id,
                name: p.name.get(Locale::En).to_owned(),
                stock: p.stock,
            })
            .collect();
        low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

        let mut recent: Vec<&Order> = input.orders.iter().collect();
        recent.sort_by_key(|o| Reverse((o.created_at, o.id.as_i32())));

        Self {
            total_revenue,
            total_orders: input.orders.len(),
            orders_by_status,
            average_order_value,
            revenue_this_month,
            revenue_last_month,
            revenue_growth: growth(revenue_this_month, revenue_last_month),
            total_customers: input.customers.len(),
            new_customers_this_month: input
                .customers
                .iter()
                .filter(|c| c.created_at >= this_month)
                .count(),
            active_subscribers: input.active_subscribers,
            total_products: input.products.len(),
            low_stock,
            out_of_stock: input.products.iter().filter(|p| p.stock == 0).count(),
            on_sale: input.products.iter().filter(|p| p.on_sale()).count(),
            top_products: top_products(input.sold_items),
            recent_orders: recent
                .into_iter()
                .take(RECENT_ORDERS)
                .map(Order::summary)
                .collect(),
        }
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Percentage change from `previous` to `current`, rounded to 2 places.
fn growth(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(((current - previous) / previous * Decimal::ONE_HUNDRED).round_dp(2))
}

/// Best sellers by units over revenue-counting orders. Lines whose product
/// was deleted are grouped by their captured name.
fn top_products(items: &[SoldItem]) -> Vec<TopProduct> {
    let mut units: HashMap<(Option<ProductId>, String), i64> = HashMap::new();
    for item in items.iter().filter(|i| i.status.counts_as_revenue()) {
        let key = match item.product_id {
            Some(id) => (Some(id), String::new()),
            None => (None, item.product_name.clone()),
        };
        *units.entry(key).or_default() += i64::from(item.quantity);
    }

    // Display names come from the most recent line seen for each product.
    let mut names: HashMap<ProductId, &str> = HashMap::new();
    for item in items {
        if let Some(id) = item.product_id {
            names.insert(id, &item.product_name);
        }
    }

    let mut ranked: Vec<TopProduct> = units
        .into_iter()
        .map(|((product_id, name), units_sold)| TopProduct {
            name: product_id
                .and_then(|id| names.get(&id).map(|n| (*n).to_owned()))
                .unwrap_or(name),
            product_id,
            units_sold,
        })
        .collect();
    ranked.sort_by(|a, b| b.units_sold.cmp(&a.units_sold).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_PRODUCTS);
    ranked
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use atelier_core::{CustomerId, Email, LocalizedText, OrderId, PaymentStatus};

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn order(id: i32, total: &str, status: OrderStatus, created_at: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::new(id),
            order_number: format!("AT-{id}"),
            customer_id: None,
            email: "lina@example.com".to_owned(),
            full_name: "Lina".to_owned(),
            phone: "+33600000000".to_owned(),
            shipping_address: "1 rue de la Paix".to_owned(),
            city: "Paris".to_owned(),
            notes: None,
            currency: "EUR".to_owned(),
            subtotal: dec(total),
            shipping_fee: Decimal::ZERO,
            total: dec(total),
            status,
            payment_status: PaymentStatus::Paid,
            payment_reference: None,
            paid_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn product(id: i32, stock: i32, sale_price: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("p{id}"),
            name: LocalizedText::english(format!("Product {id}")),
            description: LocalizedText::default(),
            price: dec("50.00"),
            sale_price: sale_price.map(dec),
            discount_percent: None,
            stock,
            images: vec!["/img.jpg".to_owned()],
            colors: vec![],
            sizes: vec![],
            category_id: None,
            subcategory_id: None,
            is_featured: false,
            is_active: true,
            woo_id: None,
            created_at: at(2026, 1, 1),
            updated_at: at(2026, 1, 1),
        }
    }

    fn customer(id: i32, created_at: DateTime<Utc>) -> Customer {
        Customer {
            id: CustomerId::new(id),
            email: Email::parse(&format!("c{id}@example.com")).unwrap(),
            full_name: String::new(),
            phone: None,
            city: None,
            address: None,
            order_count: 0,
            total_spent: Decimal::ZERO,
            last_order_at: None,
            created_at,
        }
    }

    fn sold(product: i32, quantity: i32, status: OrderStatus) -> SoldItem {
        SoldItem {
            product_id: Some(ProductId::new(product)),
            product_name: format!("Product {product}"),
            quantity,
            status,
        }
    }

    fn compute(orders: &[Order], products: &[Product], sold_items: &[SoldItem]) -> DashboardStats {
        let customers = [customer(1, at(2026, 9, 30)), customer(2, at(2026, 10, 2))];
        DashboardStats::compute(
            DashboardInput {
                orders,
                products,
                customers: &customers,
                sold_items,
                active_subscribers: 12,
                low_stock_threshold: 5,
            },
            at(2026, 10, 18),
        )
    }

    #[test]
    fn test_revenue_counts_only_paid_orders() {
        let orders = [
            order(1, "100.00", OrderStatus::Paid, at(2026, 10, 1)),
            order(2, "40.00", OrderStatus::Shipped, at(2026, 10, 3)),
            order(3, "999.00", OrderStatus::Pending, at(2026, 10, 4)),
            order(4, "500.00", OrderStatus::Cancelled, at(2026, 10, 5)),
            order(5, "60.00", OrderStatus::Delivered, at(2026, 9, 10)),
        ];
        let stats = compute(&orders, &[], &[]);

        assert_eq!(stats.total_revenue, dec("200.00"));
        assert_eq!(stats.average_order_value, dec("66.67"));
        assert_eq!(stats.revenue_this_month, dec("140.00"));
        assert_eq!(stats.revenue_last_month, dec("60.00"));
        assert_eq!(stats.revenue_growth, Some(dec("133.33")));
        assert_eq!(stats.total_orders, 5);
    }

    #[test]
    fn test_growth_is_none_without_last_month_revenue() {
        let orders = [order(1, "100.00", OrderStatus::Paid, at(2026, 10, 1))];
        let stats = compute(&orders, &[], &[]);
        assert_eq!(stats.revenue_growth, None);
        assert_eq!(stats.revenue_last_month, Decimal::ZERO);
    }

    #[test]
    fn test_empty_store() {
        let stats = compute(&[], &[], &[]);
        assert_eq!(stats.total_revenue, Decimal::ZERO);
        assert_eq!(stats.average_order_value, Decimal::ZERO);
        assert!(stats.recent_orders.is_empty());
        assert_eq!(stats.orders_by_status.len(), OrderStatus::ALL.len());
        assert!(stats.orders_by_status.iter().all(|s| s.count == 0));
    }

    #[test]
    fn test_orders_by_status_and_recent() {
        let orders: Vec<Order> = (1..=12)
            .map(|i| order(i, "10.00", OrderStatus::Paid, at(2026, 10, u32::try_from(i).unwrap())))
            .collect();
        let stats = compute(&orders, &[], &[]);

        let paid = stats
            .orders_by_status
            .iter()
            .find(|s| s.status == OrderStatus::Paid)
            .unwrap();
        assert_eq!(paid.count, 12);
        assert_eq!(stats.recent_orders.len(), 10);
        assert_eq!(stats.recent_orders.first().unwrap().id, OrderId::new(12));
    }

    #[test]
    fn test_stock_and_sale_counts() {
        let products = [
            product(1, 0, None),
            product(2, 5, Some("40.00")),
            product(3, 6, Some("45.00")),
            product(4, 2, None),
        ];
        let stats = compute(&[], &products, &[]);

        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.on_sale, 2);
        let low: Vec<i32> = stats.low_stock.iter().map(|a| a.id.as_i32()).collect();
        assert_eq!(low, vec![1, 4, 2]);
    }

    #[test]
    fn test_new_customers_this_month() {
        let stats = compute(&[], &[], &[]);
        assert_eq!(stats.total_customers, 2);
        assert_eq!(stats.new_customers_this_month, 1);
        assert_eq!(stats.active_subscribers, 12);
    }

    #[test]
    fn test_top_products_by_units() {
        let items = [
            sold(1, 2, OrderStatus::Paid),
            sold(2, 5, OrderStatus::Delivered),
            sold(1, 4, OrderStatus::Shipped),
            sold(3, 50, OrderStatus::Cancelled),
            sold(4, 1, OrderStatus::Paid),
            sold(5, 1, OrderStatus::Paid),
            sold(6, 1, OrderStatus::Paid),
            sold(7, 1, OrderStatus::Processing),
        ];
        let stats = compute(&[], &[], &items);

        assert_eq!(stats.top_products.len(), 5);
        let first = stats.top_products.first().unwrap();
        assert_eq!(first.product_id, Some(ProductId::new(1)));
        assert_eq!(first.units_sold, 6);
        assert!(stats.top_products.iter().all(|p| p.product_id != Some(ProductId::new(3))));
    }

    #[test]
    fn test_growth_rounding() {
        assert_eq!(growth(dec("50"), dec("100")), Some(dec("-50.00")));
        assert_eq!(growth(dec("10"), Decimal::ZERO), None);
    }
}
