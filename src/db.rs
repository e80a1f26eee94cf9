use anyhow::{Context as _, Result};
use sqlx::{
    MySqlPool,
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
};

use crate::{
    sensor::{NewReading, Reading, Summary, TemperatureStats},
    store::ReadingStore,
};

pub const DEFAULT_POOL_SIZE: u32 = 10;

// Numeric columns are cast so FLOAT, DOUBLE and DECIMAL schemas all decode as f64.
const SELECT_READINGS: &str = r#"
    SELECT CAST(id AS UNSIGNED) AS id,
           CAST(suhu AS DOUBLE) AS suhu,
           CAST(humidity AS DOUBLE) AS humidity,
           CAST(lux AS DOUBLE) AS lux,
           `timestamp`
    FROM data_sensor
"#;

pub async fn new_pool(options: MySqlConnectOptions, max_connections: u32) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("failed to open MySQL connection pool")
}

/// Creates `data_sensor` when it does not exist yet.
pub async fn create_schema(pool: &MySqlPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data_sensor (
            id          INT AUTO_INCREMENT PRIMARY KEY,
            suhu        DOUBLE   NOT NULL,
            humidity    DOUBLE   NOT NULL,
            lux         DOUBLE   NOT NULL,
            `timestamp` DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create data_sensor table")?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl ReadingStore for MySqlStore {
    async fn insert_reading(&self, reading: &NewReading) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO data_sensor (suhu, humidity, lux, `timestamp`) VALUES (?, ?, ?, ?)",
        )
        .bind(reading.suhu)
        .bind(reading.humidity)
        .bind(reading.lux)
        .bind(reading.timestamp)
        .execute(&self.pool)
        .await
        .context("failed to insert reading")?;

        Ok(result.last_insert_id())
    }

    async fn latest_readings(&self, limit: u32) -> Result<Vec<Reading>> {
        let sql = format!("{SELECT_READINGS} ORDER BY id ASC LIMIT ?");

        sqlx::query_as::<_, Reading>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch readings")
    }

    async fn summary(&self) -> Result<Summary> {
        let (max, min, average): (Option<f64>, Option<f64>, Option<f64>) = sqlx::query_as(
            r#"
            SELECT CAST(MAX(suhu) AS DOUBLE),
                   CAST(MIN(suhu) AS DOUBLE),
                   CAST(ROUND(AVG(suhu), 2) AS DOUBLE)
            FROM data_sensor
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("failed to aggregate temperatures")?;

        // Both maxima are taken over the whole table independently.
        let sql = format!(
            r#"{SELECT_READINGS}
            WHERE suhu = (SELECT MAX(suhu) FROM data_sensor)
              AND humidity = (SELECT MAX(humidity) FROM data_sensor)
            ORDER BY id ASC"#
        );
        let peaks = sqlx::query_as::<_, Reading>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch peak readings")?;

        Ok(Summary::new(TemperatureStats { max, min, average }, peaks))
    }
}
