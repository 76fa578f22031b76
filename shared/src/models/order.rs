//! Order Model
//!
//! Items and extras are snapshots taken at checkout: product names and prices
//! are copied, never referenced, so later catalog edits leave historical
//! orders untouched. After creation only `status` changes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ErrorCode};
use crate::util::new_id;

/// Table number reserved for counter (balcão) sales
pub const COUNTER_TABLE: i32 = 0;

/// Maximum allowed quantity per line
const MAX_QUANTITY: i32 = 9999;

// ============================================================================
// Order Type
// ============================================================================

/// How the order reaches the customer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 堂食 (table QR code or counter)
    DineIn,
    Delivery,
    Pickup,
}

impl OrderType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderType::DineIn => "dine_in",
            OrderType::Delivery => "delivery",
            OrderType::Pickup => "pickup",
        }
    }
}

impl FromStr for OrderType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dine_in" => Ok(OrderType::DineIn),
            "delivery" => Ok(OrderType::Delivery),
            "pickup" => Ok(OrderType::Pickup),
            other => Err(AppError::with_message(
                ErrorCode::InvalidFormat,
                format!("Unknown order type: {}", other),
            )),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order Status
// ============================================================================

/// Order status
///
/// ```text
/// pending → preparing → ready → out_for_delivery → delivered
///    ↓          ↓         ↓  ↘────────────────────↗
/// cancelled  cancelled cancelled      (any active → cancelled)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses shown on live order boards
    pub const ACTIVE: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::Preparing
                | OrderStatus::Ready
                | OrderStatus::OutForDelivery
        )
    }

    pub const fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Whether `self → next` is a legal lifecycle step for this order type.
    ///
    /// `out_for_delivery` only exists for delivery orders; delivered and
    /// cancelled are terminal.
    pub fn can_transition_to(&self, next: OrderStatus, order_type: OrderType) -> bool {
        use OrderStatus::*;
        match (*self, next) {
            (Pending, Preparing | Cancelled) => true,
            (Preparing, Ready | Cancelled) => true,
            (Ready, Delivered | Cancelled) => true,
            (Ready, OutForDelivery) => order_type == OrderType::Delivery,
            (OutForDelivery, Delivered | Cancelled) => true,
            _ => false,
        }
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "out_for_delivery" => Ok(OrderStatus::OutForDelivery),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::with_message(
                ErrorCode::InvalidFormat,
                format!("Unknown order status: {}", other),
            )),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Variety chosen for an item (size, flavour...), price snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VarietySelection {
    pub name: String,
    pub price: Decimal,
}

/// Extra added to an item, name/price snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItemExtra {
    pub id: String,
    pub extra_name: String,
    /// Price per unit of the extra
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderItemExtra {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Order item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: String,
    /// Product name at the time of ordering
    pub product_name: String,
    pub quantity: i32,
    /// Effective unit price (variety price when a variety was chosen)
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub variety: Option<VarietySelection>,
    pub notes: Option<String>,
    #[serde(default)]
    pub extras: Vec<OrderItemExtra>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub order_type: OrderType,
    /// Only meaningful for dine-in; [`COUNTER_TABLE`] means counter sale
    pub table_number: i32,
    pub status: OrderStatus,
    pub total: Decimal,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_fee: Decimal,
    pub notes: Option<String>,
    /// Creation time (Unix millis)
    pub created_at: i64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Dine-in order placed at the counter rather than a seated table
    pub fn is_counter(&self) -> bool {
        self.order_type == OrderType::DineIn && self.table_number == COUNTER_TABLE
    }

    /// Total number of units across all items
    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn items_subtotal(&self) -> Decimal {
        self.items.iter().map(|i| i.subtotal).sum()
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }

    /// Build an order snapshot from a checkout payload.
    ///
    /// Validates the payload, assigns fresh IDs, and fixes subtotals and the
    /// total. The result starts in `pending`.
    pub fn from_create(input: OrderCreate, created_at: i64) -> AppResult<Order> {
        input.validate()?;

        let table_number = match input.order_type {
            OrderType::DineIn => input.table_number.unwrap_or(COUNTER_TABLE),
            _ => COUNTER_TABLE,
        };
        let delivery_fee = input.delivery_fee.unwrap_or_default();

        let items: Vec<OrderItem> = input
            .items
            .into_iter()
            .map(|item| {
                let subtotal = item.subtotal();
                OrderItem {
                    id: new_id(),
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    subtotal,
                    variety: item.variety,
                    notes: item.notes,
                    extras: item
                        .extras
                        .into_iter()
                        .map(|e| OrderItemExtra {
                            id: new_id(),
                            extra_name: e.extra_name,
                            price: e.price,
                            quantity: e.quantity,
                        })
                        .collect(),
                }
            })
            .collect();

        let total = items.iter().map(|i| i.subtotal).sum::<Decimal>() + delivery_fee;

        Ok(Order {
            id: new_id(),
            order_type: input.order_type,
            table_number,
            status: OrderStatus::Pending,
            total,
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            delivery_address: input.delivery_address,
            delivery_fee,
            notes: input.notes,
            created_at,
            items,
        })
    }
}

// ============================================================================
// Checkout Payloads
// ============================================================================

/// Create extra payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemExtraCreate {
    pub extra_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// Create item payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemCreate {
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub variety: Option<VarietySelection>,
    pub notes: Option<String>,
    #[serde(default)]
    pub extras: Vec<OrderItemExtraCreate>,
}

impl OrderItemCreate {
    /// (unit_price + Σ extra.price × extra.quantity) × quantity
    pub fn subtotal(&self) -> Decimal {
        let extras: Decimal = self
            .extras
            .iter()
            .map(|e| e.price * Decimal::from(e.quantity))
            .sum();
        (self.unit_price + extras) * Decimal::from(self.quantity)
    }
}

/// Create order payload (checkout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub order_type: OrderType,
    pub table_number: Option<i32>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_fee: Option<Decimal>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemCreate>,
}

impl OrderCreate {
    pub fn validate(&self) -> AppResult<()> {
        if self.items.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }

        if let Some(fee) = self.delivery_fee
            && fee.is_sign_negative()
        {
            return Err(AppError::validation(format!(
                "delivery_fee must be non-negative, got {}",
                fee
            )));
        }

        match self.order_type {
            OrderType::Delivery => {
                if is_blank(&self.customer_name) {
                    return Err(AppError::validation(
                        "customer_name is required for delivery orders",
                    ));
                }
                if is_blank(&self.delivery_address) {
                    return Err(AppError::validation(
                        "delivery_address is required for delivery orders",
                    ));
                }
            }
            OrderType::DineIn => {
                if let Some(table) = self.table_number
                    && table < 0
                {
                    return Err(AppError::validation(format!(
                        "table_number must be non-negative, got {}",
                        table
                    )));
                }
            }
            OrderType::Pickup => {}
        }

        for item in &self.items {
            validate_item(item)?;
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn validate_item(item: &OrderItemCreate) -> AppResult<()> {
    if item.product_name.trim().is_empty() {
        return Err(AppError::validation("product_name must not be empty"));
    }
    if item.quantity <= 0 || item.quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity must be between 1 and {}, got {}",
            MAX_QUANTITY, item.quantity
        )));
    }
    if item.unit_price.is_sign_negative() {
        return Err(AppError::validation(format!(
            "unit_price must be non-negative, got {}",
            item.unit_price
        )));
    }
    if let Some(variety) = &item.variety
        && variety.price.is_sign_negative()
    {
        return Err(AppError::validation(format!(
            "variety price must be non-negative, got {}",
            variety.price
        )));
    }
    for extra in &item.extras {
        if extra.quantity <= 0 {
            return Err(AppError::validation(format!(
                "extra '{}' quantity must be positive, got {}",
                extra.extra_name, extra.quantity
            )));
        }
        if extra.price.is_sign_negative() {
            return Err(AppError::validation(format!(
                "extra '{}' price must be non-negative, got {}",
                extra.extra_name, extra.price
            )));
        }
    }
    Ok(())
}
