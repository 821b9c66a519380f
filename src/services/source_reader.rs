use crate::config::Settings;
use crate::models::{
    ColumnMeta, ConnectionTestResult, Datasource, RemoteTableInfo, RowBatch, TablePreview,
    TestDatasourceRequest,
};
use crate::utils::error::{AppError, Result};
use crate::utils::identifier;
use crate::utils::type_mapper::TypeMapper;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use sqlx::{Connection, MySqlConnection, Row};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// 源端流式读取器
/// 服务端游标分页拉取，任何时刻内存里最多只有几批数据
pub struct SourceReader {
    rx: mpsc::Receiver<Result<RowBatch>>,
    producer: tokio::task::JoinHandle<()>,
}

impl SourceReader {
    /// 打开一个源表的流式游标
    pub async fn open(ds: &Datasource, table: &str, settings: &Settings) -> Result<Self> {
        identifier::validate(table)?;

        let mut conn = Self::connect(ds, settings).await?;
        let columns = Self::fetch_columns(&mut conn, &ds.database_name, table).await?;
        if columns.is_empty() {
            return Err(AppError::Query(format!(
                "Source table `{}` does not exist in database `{}`",
                table, ds.database_name
            )));
        }

        let columns = Arc::new(columns);
        let chunk_size = settings.effective_chunk_size(columns.len());
        let read_timeout = settings.read_timeout();

        tracing::debug!(
            "Opened source cursor on `{}`.`{}`: {} columns, chunk size {}",
            ds.database_name,
            table,
            columns.len(),
            chunk_size
        );

        // 有界通道提供背压：读取不会跑在加载前面太远
        let (tx, rx) = mpsc::channel::<Result<RowBatch>>(2);
        let table = table.to_string();

        let producer = tokio::spawn(async move {
            Self::produce_batches(conn, table, columns, chunk_size, read_timeout, tx).await;
        });

        Ok(Self { rx, producer })
    }

    /// 下一批数据；None 表示流结束。流不可重放。
    pub async fn next_batch(&mut self) -> Option<Result<RowBatch>> {
        self.rx.recv().await
    }

    /// 生产端：非预处理查询走文本协议，所有取值以原始文本到达
    async fn produce_batches(
        mut conn: MySqlConnection,
        table: String,
        columns: Arc<Vec<ColumnMeta>>,
        chunk_size: usize,
        read_timeout: std::time::Duration,
        tx: mpsc::Sender<Result<RowBatch>>,
    ) {
        let ncols = columns.len();
        let sql = format!("SELECT * FROM `{}`", table);
        let mut stream = sqlx::raw_sql(&sql).fetch(&mut conn);
        let mut rows: Vec<Vec<Option<String>>> = Vec::with_capacity(chunk_size);

        loop {
            let next = match timeout(read_timeout, stream.try_next()).await {
                Ok(Ok(next)) => next,
                Ok(Err(e)) => {
                    let _ = tx
                        .send(Err(AppError::Query(format!(
                            "Source stream error on `{}`: {}",
                            table, e
                        ))))
                        .await;
                    return;
                }
                Err(_) => {
                    let _ = tx
                        .send(Err(AppError::Query(format!(
                            "Source read timed out on `{}`",
                            table
                        ))))
                        .await;
                    return;
                }
            };

            match next {
                Some(row) => {
                    let mut cells = Vec::with_capacity(ncols);
                    for i in 0..ncols {
                        // 文本协议下跳过类型检查，按原始文本取值
                        match row.try_get_unchecked::<Option<String>, _>(i) {
                            Ok(v) => cells.push(v),
                            Err(e) => {
                                let _ = tx
                                    .send(Err(AppError::Query(format!(
                                        "Failed to decode column {} of `{}`: {}",
                                        i, table, e
                                    ))))
                                    .await;
                                return;
                            }
                        }
                    }
                    rows.push(cells);

                    if rows.len() >= chunk_size {
                        let batch = RowBatch {
                            columns: Arc::clone(&columns),
                            rows: std::mem::replace(&mut rows, Vec::with_capacity(chunk_size)),
                        };
                        if tx.send(Ok(batch)).await.is_err() {
                            // 消费端已放弃，停止读取
                            return;
                        }
                    }
                }
                None => {
                    if !rows.is_empty() {
                        let batch = RowBatch {
                            columns: Arc::clone(&columns),
                            rows,
                        };
                        let _ = tx.send(Ok(batch)).await;
                    }
                    return;
                }
            }
        }
    }

    /// 带超时的源库连接；不可达/认证失败不在此层重试
    async fn connect(ds: &Datasource, settings: &Settings) -> Result<MySqlConnection> {
        let opts = Self::build_options(
            &ds.host,
            ds.port,
            &ds.user,
            &ds.password,
            Some(&ds.database_name),
        );

        match timeout(settings.connect_timeout(), MySqlConnection::connect_with(&opts)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(AppError::Connection(format!(
                "Failed to connect to source {}:{}: {}",
                ds.host, ds.port, e
            ))),
            Err(_) => Err(AppError::Connection(format!(
                "Connection to source {}:{} timed out",
                ds.host, ds.port
            ))),
        }
    }

    /// 构建 MySQL 连接选项（避免密码特殊字符问题）
    fn build_options(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: Option<&str>,
    ) -> MySqlConnectOptions {
        let mut opts = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(user)
            .password(password)
            .ssl_mode(MySqlSslMode::Preferred);

        if let Some(db) = database {
            opts = opts.database(db);
        }

        opts
    }

    /// 列元数据：名称规范化 + 类型归类，一次确定后整个运行期冻结
    async fn fetch_columns(
        conn: &mut MySqlConnection,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnMeta>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT COLUMN_NAME, DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
             ORDER BY ORDINAL_POSITION",
        )
        .bind(database)
        .bind(table)
        .fetch_all(conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type)| ColumnMeta {
                name: identifier::normalize_column(&name),
                kind: TypeMapper::kind_from_source_type(&data_type),
            })
            .collect())
    }

    /// 测试数据源连接，成功时返回可见的数据库列表
    pub async fn test_connection(
        req: &TestDatasourceRequest,
        settings: &Settings,
    ) -> Result<ConnectionTestResult> {
        tracing::info!("Testing source connection to {}:{}", req.host, req.port);
        let opts = Self::build_options(
            &req.host,
            req.port,
            &req.user,
            &req.password,
            req.database.as_deref(),
        );

        let mut conn =
            match timeout(settings.connect_timeout(), MySqlConnection::connect_with(&opts)).await {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => return Ok(ConnectionTestResult::failure(e.to_string())),
                Err(_) => {
                    return Ok(ConnectionTestResult::failure(
                        "connection timed out".to_string(),
                    ))
                }
            };

        let databases: Vec<String> = sqlx::query_scalar(
            "SELECT SCHEMA_NAME FROM INFORMATION_SCHEMA.SCHEMATA
             WHERE SCHEMA_NAME NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
             ORDER BY SCHEMA_NAME",
        )
        .fetch_all(&mut conn)
        .await?;

        let _ = conn.close().await;
        Ok(ConnectionTestResult::success(databases))
    }

    /// 远程库的表列表（名称、行数、注释）
    pub async fn list_remote_tables(
        ds: &Datasource,
        settings: &Settings,
    ) -> Result<Vec<RemoteTableInfo>> {
        let mut conn = Self::connect(ds, settings).await?;

        let rows = sqlx::query(
            "SELECT TABLE_NAME, TABLE_ROWS, TABLE_COMMENT FROM INFORMATION_SCHEMA.TABLES
             WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
             ORDER BY TABLE_NAME",
        )
        .bind(&ds.database_name)
        .fetch_all(&mut conn)
        .await?;

        let tables = rows
            .iter()
            .map(|row| {
                Ok(RemoteTableInfo {
                    name: row.try_get(0)?,
                    row_count: row.try_get::<Option<u64>, _>(1)?.map(|v| v as i64),
                    comment: row.try_get(2)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let _ = conn.close().await;
        Ok(tables)
    }

    /// 预览远程表的前几行
    pub async fn preview(
        ds: &Datasource,
        table: &str,
        limit: usize,
        settings: &Settings,
    ) -> Result<TablePreview> {
        identifier::validate(table)?;

        let mut conn = Self::connect(ds, settings).await?;
        let columns = Self::fetch_columns(&mut conn, &ds.database_name, table).await?;
        if columns.is_empty() {
            return Err(AppError::Query(format!(
                "Source table `{}` does not exist in database `{}`",
                table, ds.database_name
            )));
        }

        let sql = format!("SELECT * FROM `{}` LIMIT {}", table, limit);
        let raw_rows = {
            let mut stream = sqlx::raw_sql(&sql).fetch(&mut conn);
            let mut raw_rows = Vec::new();
            while let Some(row) = stream
                .try_next()
                .await
                .map_err(|e| AppError::Query(format!("Preview failed on `{}`: {}", table, e)))?
            {
                let mut cells = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    cells.push(
                        row.try_get_unchecked::<Option<String>, _>(i)
                            .map_err(|e| AppError::Query(e.to_string()))?,
                    );
                }
                raw_rows.push(cells);
            }
            raw_rows
        };

        let _ = conn.close().await;
        Ok(TablePreview {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            row_count: raw_rows.len(),
            rows: raw_rows,
        })
    }
}

impl Drop for SourceReader {
    fn drop(&mut self) {
        // 提前丢弃读取器时终止生产端，释放源库连接
        self.producer.abort();
    }
}
