use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use skyseat_core::{CoreError, CoreResult, FlightKey, Order, OrderRepository};
use sqlx::PgPool;
use uuid::Uuid;

/// Partial unique index over `(flight_key, seat) WHERE NOT is_cancelled`.
const ACTIVE_SEAT_CONSTRAINT: &str = "orders_active_seat_idx";

const ORDER_COLUMNS: &str =
    "id, flight_key, passenger_id, seat, created_at, is_paid, is_cancelled, price";

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    flight_key: String,
    passenger_id: String,
    seat: i32,
    created_at: DateTime<Utc>,
    is_paid: bool,
    is_cancelled: bool,
    price: Option<BigDecimal>,
}

impl TryFrom<OrderRow> for Order {
    type Error = CoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let seat = u32::try_from(row.seat)
            .map_err(|_| CoreError::Storage(format!("order {} has invalid seat {}", row.id, row.seat)))?;
        Ok(Order {
            id: row.id,
            flight_key: FlightKey(row.flight_key),
            passenger_id: row.passenger_id,
            seat,
            created_at: row.created_at,
            is_paid: row.is_paid,
            is_cancelled: row.is_cancelled,
            price: row.price,
        })
    }
}

fn storage_err(e: sqlx::Error) -> CoreError {
    tracing::error!("Order store error: {:?}", e);
    CoreError::Storage(e.to_string())
}

fn is_active_seat_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some(ACTIVE_SEAT_CONSTRAINT)
        }
        _ => false,
    }
}

fn into_orders(rows: Vec<OrderRow>) -> CoreResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert_order(&self, order: &Order) -> CoreResult<()> {
        let seat = i32::try_from(order.seat)
            .map_err(|_| CoreError::Validation(format!("seat {} out of range", order.seat)))?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, flight_key, passenger_id, seat, created_at, is_paid, is_cancelled, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id)
        .bind(order.flight_key.as_str())
        .bind(&order.passenger_id)
        .bind(seat)
        .bind(order.created_at)
        .bind(order.is_paid)
        .bind(order.is_cancelled)
        .bind(order.price.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_active_seat_violation(&e) {
                CoreError::SeatTaken(order.seat)
            } else {
                storage_err(e)
            }
        })?;

        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(Order::try_from).transpose()
    }

    async fn count_active_orders(&self, flight_key: &FlightKey) -> CoreResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE flight_key = $1 AND NOT is_cancelled",
        )
        .bind(flight_key.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        u32::try_from(count).map_err(|_| CoreError::Storage(format!("order count {count} overflows")))
    }

    async fn taken_seats(&self, flight_key: &FlightKey) -> CoreResult<Vec<u32>> {
        let seats: Vec<i32> = sqlx::query_scalar(
            "SELECT seat FROM orders WHERE flight_key = $1 AND NOT is_cancelled ORDER BY seat",
        )
        .bind(flight_key.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(seats.into_iter().filter_map(|s| u32::try_from(s).ok()).collect())
    }

    async fn list_orders_for_passenger(&self, passenger_id: &str) -> CoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE passenger_id = $1 ORDER BY created_at DESC"
        ))
        .bind(passenger_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        into_orders(rows)
    }

    async fn list_all_orders(&self) -> CoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        into_orders(rows)
    }

    async fn mark_paid(&self, id: Uuid, price: &BigDecimal) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET is_paid = TRUE, price = $2, updated_at = NOW()
            WHERE id = $1 AND NOT is_paid AND NOT is_cancelled
            "#,
        )
        .bind(id)
        .bind(price)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_cancelled(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET is_cancelled = TRUE, updated_at = NOW()
            WHERE id = $1 AND is_paid AND NOT is_cancelled
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_flight_key(&self, flight_key: &FlightKey, public_id: &str) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flight_keys (flight_key, public_id)
            VALUES ($1, $2)
            ON CONFLICT (flight_key) DO UPDATE SET public_id = EXCLUDED.public_id
            "#,
        )
        .bind(flight_key.as_str())
        .bind(public_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn public_flight_id(&self, flight_key: &FlightKey) -> CoreResult<Option<String>> {
        sqlx::query_scalar("SELECT public_id FROM flight_keys WHERE flight_key = $1")
            .bind(flight_key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)
    }
}
