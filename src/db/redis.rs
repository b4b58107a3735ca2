use redis::aio::MultiplexedConnection;

pub async fn connect(url: &str) -> redis::RedisResult<MultiplexedConnection> {
    tracing::info!("Connecting to Redis...");

    let client = redis::Client::open(url)?;
    client.get_multiplexed_async_connection().await
}
