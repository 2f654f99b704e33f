use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{MedicineId, Money, OrderId, OrderItemId, PharmacyId, UserId};
use domain::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{OrderItemStore, OrderStore},
};

const ORDER_COLUMNS: &str =
    "id, user_id, pharmacy_id, order_date_time, total_amount_cents, status";

const ITEM_COLUMNS: &str =
    "id, order_id, medicine_id, quantity, price_per_unit_cents, total_price_cents";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e: domain::OrderError| StoreError::Corrupt(e.to_string()))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            pharmacy_id: PharmacyId::new(row.try_get("pharmacy_id")?),
            order_date_time: row.try_get::<DateTime<Utc>, _>("order_date_time")?,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            status,
            items: Vec::new(),
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("negative item quantity {quantity}")))?;

        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            medicine_id: MedicineId::new(row.try_get::<String, _>("medicine_id")?),
            quantity,
            price_per_unit: Money::from_cents(row.try_get("price_per_unit_cents")?),
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
        })
    }

    /// Loads order headers with `filter_sql` and attaches their items.
    async fn load_orders(&self, filter_sql: &str, bind: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {filter_sql} ORDER BY order_date_time ASC, id ASC"
        ))
        .bind(bind)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut order = Self::row_to_order(row)?;
            order.items = self.find_items_by_order_id(order.id).await?;
            orders.push(order);
        }
        Ok(orders)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self))]
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let order = Order::from_new(OrderId::new(), order);

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, pharmacy_id, order_date_time, total_amount_cents, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_i64())
        .bind(order.pharmacy_id.as_i64())
        .bind(order.order_date_time)
        .bind(order.total_amount.cents())
        .bind(order.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn save(&self, order: &Order) -> Result<Order> {
        let result = sqlx::query(
            "UPDATE orders SET total_amount_cents = $2, status = $3 WHERE id = $1",
        )
        .bind(order.id.as_uuid())
        .bind(order.total_amount.cents())
        .bind(order.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(order.id));
        }

        self.find_by_id(order.id)
            .await?
            .ok_or(StoreError::NotFound(order.id))
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut order = Self::row_to_order(&row)?;
                order.items = self.find_items_by_order_id(order_id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.load_orders("user_id = $1", user_id.as_i64()).await
    }

    async fn find_by_pharmacy_id(&self, pharmacy_id: PharmacyId) -> Result<Vec<Order>> {
        self.load_orders("pharmacy_id = $1", pharmacy_id.as_i64())
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, order_id: OrderId) -> Result<()> {
        // order_items rows go with it via ON DELETE CASCADE
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderItemStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, item), fields(order_id = %item.order_id, medicine_id = %item.medicine_id))]
    async fn save_item(&self, item: NewOrderItem) -> Result<OrderItem> {
        let item = OrderItem::from_new(OrderItemId::new(), item);
        let quantity = i32::try_from(item.quantity)
            .map_err(|_| StoreError::Corrupt(format!("item quantity {} too large", item.quantity)))?;

        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, medicine_id, quantity, price_per_unit_cents, total_price_cents)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.medicine_id.as_str())
        .bind(quantity)
        .bind(item.price_per_unit.cents())
        .bind(item.total_price.cents())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::NotFound(item.order_id);
            }
            StoreError::Database(e)
        })?;

        Ok(item)
    }

    async fn find_items_by_order_id(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY seq ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_item).collect()
    }

    async fn delete_items_by_order_id(&self, order_id: OrderId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
