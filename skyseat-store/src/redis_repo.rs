use bigdecimal::BigDecimal;
use redis::{AsyncCommands, RedisResult};
use std::str::FromStr;
use tracing::debug;

/// Last-known prices outlive a catalog outage but not a fare change cycle.
const LAST_PRICE_TTL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn set_last_price(&self, flight_id: &str, price: &BigDecimal) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = last_price_key(flight_id);
        conn.set_ex::<_, _, ()>(key, price.to_string(), LAST_PRICE_TTL_SECONDS).await?;
        debug!("Last known price cached: {} -> {}", flight_id, price);
        Ok(())
    }

    pub async fn get_last_price(&self, flight_id: &str) -> RedisResult<Option<BigDecimal>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(last_price_key(flight_id)).await?;
        Ok(raw.and_then(|s| BigDecimal::from_str(&s).ok()))
    }

    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

fn last_price_key(flight_id: &str) -> String {
    format!("flight:{}:last_price", flight_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_price_key_layout() {
        assert_eq!(last_price_key("FL-1"), "flight:FL-1:last_price");
    }
}
