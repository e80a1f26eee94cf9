use anyhow::{Context as _, Result};
use chrono_tz::Tz;
use clap::Parser;
use db_sensor_backend::{
    bridge::{BridgeConfig, DEFAULT_TOPIC},
    db::DEFAULT_POOL_SIZE,
    http::DEFAULT_PORT,
};
use sqlx::mysql::MySqlConnectOptions;

#[derive(Debug, Parser)]
#[command(about = "Stores MQTT sensor readings in MySQL and serves them over HTTP")]
pub struct Args {
    #[arg(long, env = "MYSQL_HOST", default_value = "localhost")]
    pub mysql_host: String,

    #[arg(long, env = "MYSQL_PORT", default_value_t = 3306)]
    pub mysql_port: u16,

    #[arg(long, env = "MYSQL_USER", required_unless_present = "memory_store")]
    pub mysql_user: Option<String>,

    #[arg(long, env = "MYSQL_PASSWORD", hide_env_values = true, default_value = "")]
    pub mysql_password: String,

    #[arg(long, env = "MYSQL_DATABASE", required_unless_present = "memory_store")]
    pub mysql_database: Option<String>,

    #[arg(long, env = "DB_POOL_SIZE", default_value_t = DEFAULT_POOL_SIZE)]
    pub pool_size: u32,

    #[arg(long, env = "MQTT_URL", default_value = "mqtt://localhost:1883")]
    pub mqtt_url: String,

    #[arg(long, env = "MQTT_TOPIC", default_value = DEFAULT_TOPIC)]
    pub mqtt_topic: String,

    #[arg(long, env = "MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_PORT)]
    pub http_port: u16,

    #[arg(long, env = "TZ", default_value = "UTC")]
    pub timezone: Tz,

    /// Create the data_sensor table if it is missing.
    #[arg(long)]
    pub create_schema: bool,

    /// Keep readings in memory instead of MySQL.
    #[arg(long, conflicts_with = "create_schema")]
    pub memory_store: bool,
}

impl Args {
    pub fn mysql_options(&self) -> Result<MySqlConnectOptions> {
        let user = self.mysql_user.as_deref().context("MYSQL_USER is not set")?;
        let database = self
            .mysql_database
            .as_deref()
            .context("MYSQL_DATABASE is not set")?;

        Ok(MySqlConnectOptions::new()
            .host(&self.mysql_host)
            .port(self.mysql_port)
            .username(user)
            .password(&self.mysql_password)
            .database(database))
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            broker_url: self.mqtt_url.clone(),
            topic: self.mqtt_topic.clone(),
            username: self.mqtt_username.clone(),
            password: self.mqtt_password.clone(),
            timezone: self.timezone,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_command() {
        Args::command().debug_assert();
    }

    #[test]
    fn memory_store_does_not_need_mysql() {
        let args = Args::try_parse_from([
            "db-sensor-backend",
            "--memory-store",
            "--timezone",
            "Asia/Jakarta",
            "--mqtt-topic",
            "lab/sensor",
        ])
        .unwrap();

        assert!(args.memory_store);
        let bridge = args.bridge_config();
        assert_eq!(bridge.topic, "lab/sensor");
        assert_eq!(bridge.timezone, Tz::Asia__Jakarta);
    }

    #[test]
    fn builds_mysql_options_from_flags() {
        let args = Args::try_parse_from([
            "db-sensor-backend",
            "--mysql-user",
            "sensor",
            "--mysql-database",
            "iot",
            "--timezone",
            "UTC",
        ])
        .unwrap();

        assert!(args.mysql_options().is_ok());
    }
}
