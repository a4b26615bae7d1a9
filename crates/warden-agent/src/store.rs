use sea_orm_migration::MigratorTrait;
use tokio::sync::RwLock;
use warden_db::entities::{exec_commands, settings, status};
use warden_db::sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Statement, sea_query::Expr,
};
use warden_types::{CommandRow, InstanceSettings};

use crate::logbuf::LOG_BUFFER_CAP;

/// Reconnect attempts made inside one `verify_connection` call.
const RECONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("no database connection")]
    Unavailable,
}

/// Everything the supervisor needs from the persistent store: the command
/// queue, launch settings, per-port status flags and the log sink.
///
/// Connection management is the implementation's own concern; callers only
/// gate on `verify_connection` once per tick.
pub trait FleetStore: Send + Sync {
    async fn verify_connection(&self) -> bool;
    async fn close(&self);

    async fn fetch_commands(&self) -> Result<Vec<CommandRow>, StoreError>;
    async fn set_command_status(&self, port: u16, raw: &str, status: i32)
    -> Result<(), StoreError>;
    async fn delete_command(&self, port: u16, raw: &str) -> Result<(), StoreError>;
    /// Drops every queued command. Run at startup: commands left over from a
    /// previous supervisor run are stale.
    async fn clear_commands(&self) -> Result<(), StoreError>;

    async fn fetch_settings(&self, port: u16) -> Result<Option<InstanceSettings>, StoreError>;
    /// Ports flagged to come back up when the supervisor restarts.
    async fn resume_ports(&self) -> Result<Vec<u16>, StoreError>;
    async fn set_status(
        &self,
        port: u16,
        online: bool,
        online_on_restart: bool,
    ) -> Result<(), StoreError>;

    /// Creates the per-port log table if it does not exist yet.
    async fn ensure_log_table(&self, port: u16) -> Result<(), StoreError>;
    /// Appends `lines` to the port's log and trims old rows. Returns how many
    /// lines were durably written; callers keep the rest buffered for retry.
    async fn flush_log(&self, port: u16, lines: &[String]) -> Result<usize, StoreError>;
}

fn log_table(port: u16) -> String {
    format!("server_log_{port}")
}

/// Runs on every (re)connect. A failure leaves the connection usable; the
/// next reconnect retries the migrations.
async fn migrate(conn: &DatabaseConnection) {
    if let Err(err) = warden_migration::Migrator::up(conn, None).await {
        tracing::warn!(error = %err, "migrations failed to apply");
    }
}

fn settings_from_model(m: settings::Model) -> Option<InstanceSettings> {
    let port = u16::try_from(m.server_port).ok()?;
    Some(InstanceSettings {
        port,
        jar: m.jar,
        memory_mb: m.memory.max(0) as u32,
        level_name: m.level_name,
        level_seed: m.level_seed,
        level_type: m.level_type,
        motd: m.motd,
        max_players: m.max_players.max(0) as u32,
        gamemode: m.gamemode,
        difficulty: m.difficulty,
        online_mode: m.online_mode,
        pvp: m.pvp,
        whitelist: m.whitelist,
        view_distance: m.view_distance.max(0) as u32,
        suspended_until: m.suspended_until,
    })
}

/// sea-orm backed store. The connection is re-established in place when a
/// tick's verification finds it gone, bounded to a handful of attempts so a
/// dead database degrades the tick instead of stalling it forever.
pub struct DbStore {
    url: String,
    conn: RwLock<Option<DatabaseConnection>>,
}

impl DbStore {
    /// Opens the store. A failed first connect is not fatal; the supervisor
    /// starts degraded and `verify_connection` keeps retrying.
    pub async fn connect(url: &str) -> Self {
        let conn = match warden_db::connect(url).await {
            Ok(conn) => {
                migrate(&conn).await;
                Some(conn)
            }
            Err(err) => {
                tracing::warn!(error = %err, "initial database connect failed");
                None
            }
        };
        Self {
            url: url.to_string(),
            conn: RwLock::new(conn),
        }
    }

    async fn reconnect(&self) -> bool {
        for attempt in 1..=RECONNECT_ATTEMPTS {
            match warden_db::connect(&self.url).await {
                Ok(conn) => {
                    migrate(&conn).await;
                    *self.conn.write().await = Some(conn);
                    tracing::info!(attempt, "database connection re-established");
                    return true;
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "database reconnect failed");
                }
            }
        }
        false
    }

    async fn execute_raw(&self, sql: String) -> Result<(), StoreError> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
        conn.execute(Statement::from_string(DatabaseBackend::Postgres, sql))
            .await?;
        Ok(())
    }
}

impl FleetStore for DbStore {
    async fn verify_connection(&self) -> bool {
        {
            let guard = self.conn.read().await;
            if let Some(conn) = guard.as_ref()
                && conn.ping().await.is_ok()
            {
                return true;
            }
        }
        self.reconnect().await
    }

    async fn close(&self) {
        if let Some(conn) = self.conn.write().await.take() {
            if let Err(err) = conn.close().await {
                tracing::warn!(error = %err, "failed to close database connection");
            }
        }
    }

    async fn fetch_commands(&self) -> Result<Vec<CommandRow>, StoreError> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
        let rows = exec_commands::Entity::find().all(conn).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let port = u16::try_from(row.server_port).ok()?;
                Some(CommandRow {
                    port,
                    raw: row.command,
                    status: row.status,
                })
            })
            .collect())
    }

    async fn set_command_status(
        &self,
        port: u16,
        raw: &str,
        status: i32,
    ) -> Result<(), StoreError> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
        exec_commands::Entity::update_many()
            .col_expr(exec_commands::Column::Status, Expr::value(status))
            .filter(exec_commands::Column::ServerPort.eq(port as i32))
            .filter(exec_commands::Column::Command.eq(raw))
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn delete_command(&self, port: u16, raw: &str) -> Result<(), StoreError> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
        exec_commands::Entity::delete_many()
            .filter(exec_commands::Column::ServerPort.eq(port as i32))
            .filter(exec_commands::Column::Command.eq(raw))
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn clear_commands(&self) -> Result<(), StoreError> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
        exec_commands::Entity::delete_many().exec(conn).await?;
        Ok(())
    }

    async fn fetch_settings(&self, port: u16) -> Result<Option<InstanceSettings>, StoreError> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
        let row = settings::Entity::find_by_id(port as i32).one(conn).await?;
        Ok(row.and_then(settings_from_model))
    }

    async fn resume_ports(&self) -> Result<Vec<u16>, StoreError> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
        let rows = status::Entity::find()
            .filter(status::Column::OnlineOnRestart.eq(true))
            .all(conn)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| u16::try_from(row.server_port).ok())
            .collect())
    }

    async fn set_status(
        &self,
        port: u16,
        online: bool,
        online_on_restart: bool,
    ) -> Result<(), StoreError> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
        status::Entity::update_many()
            .col_expr(status::Column::Online, Expr::value(online))
            .col_expr(status::Column::OnlineOnRestart, Expr::value(online_on_restart))
            .filter(status::Column::ServerPort.eq(port as i32))
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn ensure_log_table(&self, port: u16) -> Result<(), StoreError> {
        let table = log_table(port);
        self.execute_raw(format!(
            "CREATE TABLE IF NOT EXISTS {table} (id BIGSERIAL PRIMARY KEY, log_text TEXT NOT NULL)"
        ))
        .await
    }

    async fn flush_log(&self, port: u16, lines: &[String]) -> Result<usize, StoreError> {
        let table = log_table(port);
        let mut written = 0;

        {
            let guard = self.conn.read().await;
            let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
            for line in lines {
                let insert = Statement::from_sql_and_values(
                    DatabaseBackend::Postgres,
                    format!("INSERT INTO {table} (log_text) VALUES ($1)"),
                    [line.as_str().into()],
                );
                if let Err(err) = conn.execute(insert).await {
                    // The line stays buffered and is retried next flush.
                    tracing::error!(port, line = %line, error = %err, "log insert failed");
                    break;
                }
                written += 1;
            }
        }

        if written > 0 {
            // Retention trim: keep only the most recent rows.
            let trim = format!(
                "DELETE FROM {table} WHERE id < (SELECT MAX(id) - {LOG_BUFFER_CAP} FROM {table})"
            );
            if let Err(err) = self.execute_raw(trim).await {
                tracing::warn!(port, error = %err, "log retention trim failed");
            }
        }

        Ok(written)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_table_is_per_port() {
        assert_eq!(log_table(25565), "server_log_25565");
    }
}
