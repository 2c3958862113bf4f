use ledgerline_protocol::{
    ConnectionInfo, QueryResult, RelationalStore, ServiceError, ServiceResult,
};
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, Column, Connection, Row};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Relational lookups through sqlx's `Any` driver.
///
/// The pipeline is synchronous, so the store owns a current-thread runtime
/// and blocks on each query. One connection per query.
pub struct SqlxRelationalStore {
    runtime: Runtime,
}

impl SqlxRelationalStore {
    pub fn new() -> std::io::Result<Self> {
        sqlx::any::install_default_drivers();
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }
}

impl RelationalStore for SqlxRelationalStore {
    fn query(&self, connection: &ConnectionInfo, sql: &str) -> ServiceResult<QueryResult> {
        let url = connection_url(connection)?;
        debug!(
            engine = %connection.engine,
            host = %connection.host,
            database = %connection.database,
            "Running relational query"
        );
        self.runtime.block_on(async {
            let mut conn = AnyConnection::connect(&url)
                .await
                .map_err(|e| ServiceError::failed(format!("cannot connect to {}: {}", connection.host, e)))?;
            let rows = sqlx::query(sql)
                .fetch_all(&mut conn)
                .await
                .map_err(|e| ServiceError::failed(format!("query failed: {}", e)))?;
            conn.close()
                .await
                .map_err(|e| ServiceError::failed(format!("cannot close connection: {}", e)))?;
            Ok(to_result(&rows))
        })
    }
}

fn to_result(rows: &[AnyRow]) -> QueryResult {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|index| cell_text(row, index)).collect())
        .collect();
    QueryResult { columns, rows }
}

/// Render one cell as text, whatever its database type.
fn cell_text(row: &AnyRow, index: usize) -> Option<String> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value;
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map(|v| v.to_string());
    }
    None
}

/// Build a driver URL from the connection description.
pub fn connection_url(connection: &ConnectionInfo) -> ServiceResult<String> {
    let scheme = match connection.engine.to_ascii_lowercase().as_str() {
        "mysql" | "mariadb" => "mysql",
        "postgres" | "postgresql" => "postgres",
        "sqlite" => return Ok(format!("sqlite://{}", connection.database)),
        other => {
            return Err(ServiceError::failed(format!(
                "unsupported database engine {}",
                other
            )))
        }
    };
    Ok(format!(
        "{}://{}:{}@{}:{}/{}",
        scheme,
        urlencoding::encode(&connection.credentials.username),
        urlencoding::encode(&connection.credentials.password),
        connection.host,
        connection.port,
        connection.database
    ))
}
