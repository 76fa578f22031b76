//! Dashboard aggregation
//!
//! Pure functions over order snapshots. Everything is recomputed from scratch
//! on each call; nothing is cached between ticks.
//!
//! Revenue only counts `delivered` orders. An order belongs to the calendar
//! day of its `created_at` in the business timezone.

use std::collections::HashMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderStatus, OrderType};

use super::range::DateRange;
use crate::utils::time::local_date;

/// Top products shown on the dashboard
pub const TOP_PRODUCTS_LIMIT: usize = 10;

// ============================================================================
// Response Types
// ============================================================================

/// Revenue of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub orders: u32,
}

/// Today's counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodayStats {
    /// Delivered orders created today
    pub completed: u32,
    /// Non-cancelled delivery orders created today
    pub deliveries: u32,
    /// Non-cancelled counter orders (dine-in, table 0) created today
    pub counter_orders: u32,
    /// Revenue of today's delivered counter orders
    pub counter_revenue: Decimal,
}

/// Top product data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

/// Full dashboard statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub range: DateRange,
    pub revenue: Decimal,
    pub daily: Vec<DailyRevenue>,
    pub daily_average: Decimal,
    pub delivered_orders: u32,
    pub average_order_value: Decimal,
    pub cancelled_orders: u32,
    pub cancelled_amount: Decimal,
    pub active_orders: u32,
    pub today: TodayStats,
    pub top_products: Vec<TopProduct>,
}

// ============================================================================
// Aggregator
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct DashboardAggregator {
    tz: Tz,
}

impl DashboardAggregator {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    fn day_of(&self, order: &Order) -> Option<NaiveDate> {
        local_date(order.created_at, self.tz)
    }

    fn delivered_in<'a>(
        &'a self,
        orders: &'a [Order],
        range: &'a DateRange,
    ) -> impl Iterator<Item = &'a Order> + 'a {
        orders.iter().filter(move |o| {
            o.status == OrderStatus::Delivered && self.day_of(o).is_some_and(|d| range.contains(d))
        })
    }

    /// Σ total of delivered orders created within the range
    pub fn revenue_in_range(&self, orders: &[Order], range: &DateRange) -> Decimal {
        self.delivered_in(orders, range).map(|o| o.total).sum()
    }

    /// One entry per day of the range, ascending; sums to `revenue_in_range`
    pub fn daily_breakdown(&self, orders: &[Order], range: &DateRange) -> Vec<DailyRevenue> {
        let mut buckets: HashMap<NaiveDate, (Decimal, u32)> = HashMap::new();
        for order in self.delivered_in(orders, range) {
            if let Some(day) = self.day_of(order) {
                let bucket = buckets.entry(day).or_insert((Decimal::ZERO, 0));
                bucket.0 += order.total;
                bucket.1 += 1;
            }
        }

        range
            .iter_days()
            .map(|date| {
                let (revenue, orders) = buckets.remove(&date).unwrap_or((Decimal::ZERO, 0));
                DailyRevenue {
                    date,
                    revenue,
                    orders,
                }
            })
            .collect()
    }

    /// `revenue / days`, divisor at least 1, rounded to cents
    pub fn daily_average(revenue: Decimal, range: &DateRange) -> Decimal {
        let days = Decimal::from(range.days().max(1));
        (revenue / days).round_dp(2)
    }

    /// Orders whose status is active
    pub fn active_count(orders: &[Order]) -> u32 {
        orders.iter().filter(|o| o.is_active()).count() as u32
    }

    pub fn today_stats(&self, orders: &[Order], today: NaiveDate) -> TodayStats {
        let mut stats = TodayStats::default();
        for order in orders.iter().filter(|o| self.day_of(o) == Some(today)) {
            let delivered = order.status == OrderStatus::Delivered;
            let cancelled = order.status == OrderStatus::Cancelled;

            if delivered {
                stats.completed += 1;
            }
            if order.order_type == OrderType::Delivery && !cancelled {
                stats.deliveries += 1;
            }
            if order.is_counter() && !cancelled {
                stats.counter_orders += 1;
                if delivered {
                    stats.counter_revenue += order.total;
                }
            }
        }
        stats
    }

    /// Best sellers among delivered orders, by quantity then revenue
    pub fn top_products(&self, orders: &[Order], range: &DateRange, limit: usize) -> Vec<TopProduct> {
        let mut by_name: HashMap<&str, (i64, Decimal)> = HashMap::new();
        for order in self.delivered_in(orders, range) {
            for item in &order.items {
                let entry = by_name
                    .entry(item.product_name.as_str())
                    .or_insert((0, Decimal::ZERO));
                entry.0 += i64::from(item.quantity);
                entry.1 += item.subtotal;
            }
        }

        let mut products: Vec<TopProduct> = by_name
            .into_iter()
            .map(|(name, (quantity, revenue))| TopProduct {
                name: name.to_string(),
                quantity,
                revenue,
            })
            .collect();
        products.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then_with(|| b.revenue.cmp(&a.revenue))
                .then_with(|| a.name.cmp(&b.name))
        });
        products.truncate(limit);
        products
    }

    /// Full statistics
    ///
    /// - `range_orders`: every order created within `range`
    /// - `active_orders`: the current active snapshot
    /// - `today_orders`: every order created today
    pub fn compute(
        &self,
        range: DateRange,
        range_orders: &[Order],
        active_orders: &[Order],
        today_orders: &[Order],
        today: NaiveDate,
    ) -> DashboardStats {
        let revenue = self.revenue_in_range(range_orders, &range);
        let delivered_orders = self.delivered_in(range_orders, &range).count() as u32;
        let average_order_value = if delivered_orders == 0 {
            Decimal::ZERO
        } else {
            (revenue / Decimal::from(delivered_orders)).round_dp(2)
        };

        let (cancelled_orders, cancelled_amount) = range_orders
            .iter()
            .filter(|o| {
                o.status == OrderStatus::Cancelled
                    && self.day_of(o).is_some_and(|d| range.contains(d))
            })
            .fold((0u32, Decimal::ZERO), |(n, sum), o| (n + 1, sum + o.total));

        DashboardStats {
            range,
            revenue,
            daily: self.daily_breakdown(range_orders, &range),
            daily_average: Self::daily_average(revenue, &range),
            delivered_orders,
            average_order_value,
            cancelled_orders,
            cancelled_amount,
            active_orders: Self::active_count(active_orders),
            today: self.today_stats(today_orders, today),
            top_products: self.top_products(range_orders, &range, TOP_PRODUCTS_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::models::OrderItem;
    use std::str::FromStr;

    const TZ: Tz = chrono_tz::America::Sao_Paulo;

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(y: i32, m: u32, day: u32, h: u32, min: u32) -> i64 {
        TZ.with_ymd_and_hms(y, m, day, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn order(id: &str, status: OrderStatus, total: &str, created_at: i64) -> Order {
        Order {
            id: id.into(),
            order_type: OrderType::Pickup,
            table_number: 0,
            status,
            total: d(total),
            customer_name: None,
            customer_phone: None,
            delivery_address: None,
            delivery_fee: Decimal::ZERO,
            notes: None,
            created_at,
            items: vec![],
        }
    }

    fn with_item(mut order: Order, name: &str, quantity: i32, subtotal: &str) -> Order {
        order.items.push(OrderItem {
            id: format!("{}-{}", order.id, order.items.len()),
            product_name: name.into(),
            quantity,
            unit_price: d(subtotal) / Decimal::from(quantity),
            subtotal: d(subtotal),
            variety: None,
            notes: None,
            extras: vec![],
        });
        order
    }

    fn sample() -> Vec<Order> {
        vec![
            order("a", OrderStatus::Delivered, "50.00", at(2025, 3, 3, 12, 0)),
            order("b", OrderStatus::Delivered, "30.50", at(2025, 3, 3, 23, 59)),
            order("c", OrderStatus::Cancelled, "99.00", at(2025, 3, 4, 10, 0)),
            order("d", OrderStatus::Preparing, "12.00", at(2025, 3, 4, 11, 0)),
            order("e", OrderStatus::Delivered, "20.00", at(2025, 3, 5, 0, 0)),
            // outside the range
            order("f", OrderStatus::Delivered, "1000.00", at(2025, 3, 6, 0, 0)),
            order("g", OrderStatus::Delivered, "1000.00", at(2025, 3, 2, 23, 59)),
        ]
    }

    fn range() -> DateRange {
        DateRange::new(date(2025, 3, 3), date(2025, 3, 5)).unwrap()
    }

    #[test]
    fn test_revenue_counts_only_delivered_in_range() {
        let agg = DashboardAggregator::new(TZ);
        assert_eq!(agg.revenue_in_range(&sample(), &range()), d("100.50"));
    }

    #[test]
    fn test_non_delivered_statuses_contribute_nothing() {
        let agg = DashboardAggregator::new(TZ);
        let orders: Vec<Order> = [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery,
            OrderStatus::Cancelled,
        ]
        .into_iter()
        .enumerate()
        .map(|(i, s)| order(&i.to_string(), s, "10.00", at(2025, 3, 4, 12, 0)))
        .collect();
        assert_eq!(agg.revenue_in_range(&orders, &range()), Decimal::ZERO);
    }

    #[test]
    fn test_daily_breakdown_matches_revenue() {
        let agg = DashboardAggregator::new(TZ);
        let orders = sample();
        let daily = agg.daily_breakdown(&orders, &range());

        assert_eq!(daily.len() as i64, range().days());
        assert_eq!(
            daily.iter().map(|d| d.date).collect::<Vec<_>>(),
            vec![date(2025, 3, 3), date(2025, 3, 4), date(2025, 3, 5)]
        );
        assert_eq!(daily[0].revenue, d("80.50"));
        assert_eq!(daily[0].orders, 2);
        assert_eq!(daily[1].revenue, Decimal::ZERO);
        assert_eq!(daily[2].revenue, d("20.00"));

        let sum: Decimal = daily.iter().map(|d| d.revenue).sum();
        assert_eq!(sum, agg.revenue_in_range(&orders, &range()));
    }

    #[test]
    fn test_daily_average() {
        assert_eq!(
            DashboardAggregator::daily_average(d("100.50"), &range()),
            d("33.50")
        );
        let single = DateRange::single(date(2025, 3, 3));
        assert_eq!(DashboardAggregator::daily_average(d("80.50"), &single), d("80.50"));
    }

    #[test]
    fn test_today_stats() {
        let agg = DashboardAggregator::new(TZ);
        let today = date(2025, 3, 4);
        let t = at(2025, 3, 4, 12, 0);

        let mut counter_done = order("c1", OrderStatus::Delivered, "15.00", t);
        counter_done.order_type = OrderType::DineIn;
        let mut counter_open = order("c2", OrderStatus::Pending, "7.00", t);
        counter_open.order_type = OrderType::DineIn;
        let mut counter_cancelled = order("c3", OrderStatus::Cancelled, "9.00", t);
        counter_cancelled.order_type = OrderType::DineIn;
        let mut seated = order("s1", OrderStatus::Delivered, "40.00", t);
        seated.order_type = OrderType::DineIn;
        seated.table_number = 5;
        let mut delivery = order("d1", OrderStatus::OutForDelivery, "60.00", t);
        delivery.order_type = OrderType::Delivery;
        let mut delivery_cancelled = order("d2", OrderStatus::Cancelled, "60.00", t);
        delivery_cancelled.order_type = OrderType::Delivery;
        let mut yesterday = order("y1", OrderStatus::Delivered, "60.00", at(2025, 3, 3, 12, 0));
        yesterday.order_type = OrderType::Delivery;

        let stats = agg.today_stats(
            &[
                counter_done,
                counter_open,
                counter_cancelled,
                seated,
                delivery,
                delivery_cancelled,
                yesterday,
            ],
            today,
        );
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.deliveries, 1);
        assert_eq!(stats.counter_orders, 2);
        assert_eq!(stats.counter_revenue, d("15.00"));
    }

    #[test]
    fn test_top_products() {
        let agg = DashboardAggregator::new(TZ);
        let t = at(2025, 3, 4, 12, 0);
        let orders = vec![
            with_item(
                with_item(order("1", OrderStatus::Delivered, "0", t), "Pizza", 2, "80.00"),
                "Soda",
                3,
                "15.00",
            ),
            with_item(order("2", OrderStatus::Delivered, "0", t), "Pizza", 1, "40.00"),
            with_item(order("3", OrderStatus::Cancelled, "0", t), "Burger", 10, "200.00"),
            with_item(order("4", OrderStatus::Delivered, "0", t), "Juice", 3, "24.00"),
        ];

        let top = agg.top_products(&orders, &range(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Pizza");
        assert_eq!(top[0].quantity, 3);
        assert_eq!(top[0].revenue, d("120.00"));
        // tie on quantity broken by revenue
        assert_eq!(top[1].name, "Juice");
    }

    #[test]
    fn test_compute_overview() {
        let agg = DashboardAggregator::new(TZ);
        let orders = sample();
        let active: Vec<Order> = orders.iter().filter(|o| o.is_active()).cloned().collect();
        let stats = agg.compute(range(), &orders, &active, &[], date(2025, 3, 5));

        assert_eq!(stats.revenue, d("100.50"));
        assert_eq!(stats.delivered_orders, 3);
        assert_eq!(stats.average_order_value, d("33.50"));
        assert_eq!(stats.cancelled_orders, 1);
        assert_eq!(stats.cancelled_amount, d("99.00"));
        assert_eq!(stats.active_orders, 1);
        assert_eq!(stats.today, TodayStats::default());
    }

    #[test]
    fn test_empty_range() {
        let agg = DashboardAggregator::new(TZ);
        let stats = agg.compute(range(), &[], &[], &[], date(2025, 3, 5));
        assert_eq!(stats.revenue, Decimal::ZERO);
        assert_eq!(stats.average_order_value, Decimal::ZERO);
        assert_eq!(stats.daily.len(), 3);
        assert!(stats.top_products.is_empty());
    }
}
