//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::str::FromStr;

use async_trait::async_trait;
use order_desk::orders::ReconcilerListener;
use order_desk::store::StoreError;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::models::{
    Order, OrderCreate, OrderItemCreate, OrderItemExtraCreate, OrderStatus, OrderType,
};

pub fn d(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

/// Bare order snapshot with no items
pub fn order(id: &str, created_at: i64) -> Order {
    Order {
        id: id.to_string(),
        order_type: OrderType::DineIn,
        table_number: 3,
        status: OrderStatus::Pending,
        total: d("20.00"),
        customer_name: None,
        customer_phone: None,
        delivery_address: None,
        delivery_fee: Decimal::ZERO,
        notes: None,
        created_at,
        items: vec![],
    }
}

/// Delivery checkout: 2 × burger (+ bacon ×2) and 1 soda, fee 5.00
pub fn delivery_checkout() -> OrderCreate {
    OrderCreate {
        order_type: OrderType::Delivery,
        table_number: None,
        customer_name: Some("Ana".into()),
        customer_phone: Some("+55 11 99999-0000".into()),
        delivery_address: Some("Rua das Flores, 10".into()),
        delivery_fee: Some(d("5.00")),
        notes: None,
        items: vec![
            OrderItemCreate {
                product_name: "X-Burger".into(),
                quantity: 2,
                unit_price: d("18.00"),
                variety: None,
                notes: Some("no onion".into()),
                extras: vec![OrderItemExtraCreate {
                    extra_name: "Bacon".into(),
                    price: d("3.50"),
                    quantity: 2,
                }],
            },
            OrderItemCreate {
                product_name: "Soda".into(),
                quantity: 1,
                unit_price: d("6.00"),
                variety: None,
                notes: None,
                extras: vec![],
            },
        ],
    }
}

/// Counter sale with a single item
pub fn counter_checkout(product: &str, price: &str) -> OrderCreate {
    OrderCreate {
        order_type: OrderType::DineIn,
        table_number: Some(0),
        customer_name: None,
        customer_phone: None,
        delivery_address: None,
        delivery_fee: None,
        notes: None,
        items: vec![OrderItemCreate {
            product_name: product.into(),
            quantity: 1,
            unit_price: d(price),
            variety: None,
            notes: None,
            extras: vec![],
        }],
    }
}

/// Records every reconciler callback
#[derive(Default)]
pub struct Recorder {
    pub refreshes: Mutex<Vec<Vec<String>>>,
    pub arrivals: Mutex<Vec<Vec<String>>>,
    pub errors: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn refresh_count(&self) -> usize {
        self.refreshes.lock().len()
    }

    pub fn last_refresh(&self) -> Option<Vec<String>> {
        self.refreshes.lock().last().cloned()
    }

    pub fn arrivals(&self) -> Vec<Vec<String>> {
        self.arrivals.lock().clone()
    }
}

fn ids(orders: &[Order]) -> Vec<String> {
    orders.iter().map(|o| o.id.clone()).collect()
}

#[async_trait]
impl ReconcilerListener for Recorder {
    async fn on_refresh(&self, orders: &[Order]) {
        self.refreshes.lock().push(ids(orders));
    }

    async fn on_new_orders(&self, arrived: &[Order]) {
        self.arrivals.lock().push(ids(arrived));
    }

    async fn on_error(&self, error: &StoreError) {
        self.errors.lock().push(error.to_string());
    }
}
