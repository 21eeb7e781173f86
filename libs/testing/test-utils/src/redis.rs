//! Redis Stack test infrastructure
//!
//! Plain Redis lacks the JSON and search modules the vector index needs, so
//! this starts `redis/redis-stack-server` instead.

use redis::Client;
use redis::aio::ConnectionManager;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const IMAGE: &str = "redis/redis-stack-server";
const TAG: &str = "7.4.0-v1";

/// Redis Stack container that is stopped and removed on drop.
pub struct TestRedisStack {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    connection: ConnectionManager,
    pub connection_string: String,
}

impl TestRedisStack {
    pub async fn new() -> Self {
        let container = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(6379.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await
            .expect("Failed to start Redis Stack container");

        let host_port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let connection_string = format!("redis://127.0.0.1:{}", host_port);
        let client = Client::open(connection_string.clone()).expect("Failed to create Redis client");
        let connection = ConnectionManager::new(client)
            .await
            .expect("Failed to connect to Redis");

        tracing::info!(port = host_port, "Test Redis Stack ready ({}:{})", IMAGE, TAG);

        Self {
            container,
            connection,
            connection_string,
        }
    }

    /// Cloned connection manager, ready to hand to a repository
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

impl Drop for TestRedisStack {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Redis Stack container");
    }
}
