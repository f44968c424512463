use super::bridge::environment;
use super::column::ColumnKind;
use super::connection_string::build_connection_string;
use super::disconnect::release;
use crate::driver::{ConnectRequest, Driver, DriverConnection, ResultSet, Row, Value};
use crate::error::{ConnectError, Result};
use odbc_api::{Connection, ConnectionOptions, Cursor, IntoParameter, ResultSetMetadata};

/// psqlODBC driver loaded from the request's driver artifact.
#[derive(Debug, Default)]
pub struct OdbcDriver;

impl OdbcDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for OdbcDriver {
    fn name(&self) -> &str {
        "psqlODBC"
    }

    fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn DriverConnection>> {
        let env = environment()?;

        if !request.driver_artifact.is_file() {
            return Err(ConnectError::from_diagnostic(
                "IM003",
                0,
                &format!(
                    "Driver library could not be loaded: {}",
                    request.driver_artifact.display()
                ),
            ));
        }

        let conn_str = build_connection_string(request);
        let opts = ConnectionOptions {
            login_timeout_sec: Some(
                u32::try_from(request.target.connect_timeout_secs).unwrap_or(u32::MAX),
            ),
            ..ConnectionOptions::default()
        };

        let connection = env.connect_with_connection_string(&conn_str, opts)?;
        Ok(Box::new(OdbcConnection {
            connection,
            query_timeout_sec: usize::try_from(request.target.socket_timeout_secs).ok(),
        }))
    }
}

pub struct OdbcConnection {
    connection: Connection<'static>,
    query_timeout_sec: Option<usize>,
}

impl DriverConnection for OdbcConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let texts: Vec<Option<String>> = params.iter().map(Value::to_param_text).collect();
        let conn = &self.connection;
        let timeout = self.query_timeout_sec;

        let cursor = match texts.len() {
            0 => conn.execute(sql, (), timeout)?,
            1 => {
                let p0 = texts[0].as_deref().into_parameter();
                conn.execute(sql, (&p0,), timeout)?
            }
            2 => {
                let p0 = texts[0].as_deref().into_parameter();
                let p1 = texts[1].as_deref().into_parameter();
                conn.execute(sql, (&p0, &p1), timeout)?
            }
            3 => {
                let p0 = texts[0].as_deref().into_parameter();
                let p1 = texts[1].as_deref().into_parameter();
                let p2 = texts[2].as_deref().into_parameter();
                conn.execute(sql, (&p0, &p1, &p2), timeout)?
            }
            4 => {
                let p0 = texts[0].as_deref().into_parameter();
                let p1 = texts[1].as_deref().into_parameter();
                let p2 = texts[2].as_deref().into_parameter();
                let p3 = texts[3].as_deref().into_parameter();
                conn.execute(sql, (&p0, &p1, &p2, &p3), timeout)?
            }
            5 => {
                let p0 = texts[0].as_deref().into_parameter();
                let p1 = texts[1].as_deref().into_parameter();
                let p2 = texts[2].as_deref().into_parameter();
                let p3 = texts[3].as_deref().into_parameter();
                let p4 = texts[4].as_deref().into_parameter();
                conn.execute(sql, (&p0, &p1, &p2, &p3, &p4), timeout)?
            }
            n => {
                return Err(ConnectError::driver(format!(
                    "At most 5 parameters supported, got {}",
                    n
                )))
            }
        };

        match cursor {
            Some(mut cursor) => read_result_set(&mut cursor),
            None => Ok(ResultSet::empty()),
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        release(self.connection)
    }
}

fn read_result_set<C: Cursor>(cursor: &mut C) -> Result<ResultSet> {
    let cols: u16 = cursor
        .num_result_cols()?
        .try_into()
        .map_err(|_| ConnectError::Internal("Invalid column count".to_string()))?;

    let mut columns = Vec::with_capacity(cols.into());
    let mut kinds = Vec::with_capacity(cols.into());
    for col in 1..=cols {
        columns.push(cursor.col_name(col)?.to_string());
        kinds.push(ColumnKind::from(&cursor.col_data_type(col)?));
    }

    let mut rows: Vec<Row> = Vec::new();
    let mut buf: Vec<u8> = Vec::new();
    while let Some(mut row) = cursor.next_row()? {
        let mut values = Vec::with_capacity(kinds.len());
        for (idx, kind) in kinds.iter().enumerate() {
            let col: u16 = (idx + 1)
                .try_into()
                .map_err(|_| ConnectError::Internal("Invalid column number".to_string()))?;
            buf.clear();
            let value = if row.get_text(col, &mut buf)? {
                kind.decode(&String::from_utf8_lossy(&buf))
            } else {
                Value::Null
            };
            values.push(value);
        }
        rows.push(values);
    }

    Ok(ResultSet::new(columns, rows))
}
