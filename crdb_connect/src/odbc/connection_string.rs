use crate::driver::ConnectRequest;
use crate::target::{APPLICATION_NAME, JAAS_APPLICATION_NAME};

/// Renders a connect request as a psqlODBC connection string. libpq-only
/// settings (service principal, GSS encryption mode, connect timeout,
/// application name) go through `pqopt`.
pub fn build_connection_string(request: &ConnectRequest) -> String {
    let target = &request.target;

    let mut pqopt = vec![
        format!("krbsrvname={}", quote_libpq(&target.principal)),
        "gssencmode=disable".to_string(),
        format!("connect_timeout={}", target.connect_timeout_secs),
    ];
    if let Some(app) = request.properties.get(APPLICATION_NAME) {
        pqopt.push(format!("application_name={}", quote_libpq(app)));
    }
    if let Some(stanza) = request.properties.get(JAAS_APPLICATION_NAME) {
        log::debug!(
            "Login config stanza '{}' has no ODBC counterpart; GSSAPI uses the native ticket cache",
            stanza
        );
    }

    format!(
        "Driver={{{}}};Server={};Port={};Database={};SSLmode=require;pqopt={{{}}}",
        escape_braced(&request.driver_artifact.display().to_string()),
        target.host,
        target.port,
        target.database,
        escape_braced(&pqopt.join(" "))
    )
}

/// `}` inside a braced ODBC value is written as `}}`.
fn escape_braced(value: &str) -> String {
    value.replace('}', "}}")
}

/// libpq conninfo quoting: bare when safe, otherwise single-quoted with
/// `\` and `'` backslash-escaped.
fn quote_libpq(value: &str) -> String {
    let bare = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if bare {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}
