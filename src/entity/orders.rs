use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    /// Statuses whose totals count as revenue in reports.
    pub const REVENUE: [OrderStatus; 2] = [OrderStatus::Confirmed, OrderStatus::Done];

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Done | OrderStatus::Cancelled)
    }

    /// Whether an order in this status keeps its items' quantities out of variant stock.
    pub fn holds_stock(self) -> bool {
        self != OrderStatus::Cancelled
    }

    /// Terminal orders may only be touched by an update that itself lands on a terminal status.
    pub fn allows_update(self, requested: Option<OrderStatus>) -> bool {
        !self.is_terminal() || requested.is_some_and(OrderStatus::is_terminal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Done => "DONE",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Done => "Done",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub delivery_time: DateTimeWithTimeZone,
    pub status: OrderStatus,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub total_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub total_profit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub discount: Decimal,
    pub note: Option<String>,
    pub customer_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedById",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id"
    )]
    Customers,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn open_orders_accept_any_update() {
        assert!(Pending.allows_update(None));
        assert!(Confirmed.allows_update(Some(Pending)));
    }

    #[test]
    fn terminal_orders_only_accept_terminal_status() {
        assert!(!Done.allows_update(None));
        assert!(!Cancelled.allows_update(Some(Confirmed)));
        assert!(Cancelled.allows_update(Some(Done)));
        assert!(Done.allows_update(Some(Cancelled)));
    }

    #[test]
    fn only_cancelled_orders_release_stock() {
        assert!(Pending.holds_stock());
        assert!(Done.holds_stock());
        assert!(!Cancelled.holds_stock());
    }
}
