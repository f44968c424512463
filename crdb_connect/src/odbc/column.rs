use crate::driver::Value;

/// How a result column's text is turned into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    /// Decodes the driver's text rendering of a non-NULL cell. Text that
    /// does not parse as the column type is kept as text.
    pub fn decode(self, text: &str) -> Value {
        let trimmed = text.trim();
        match self {
            ColumnKind::Integer => trimmed
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(text.to_string())),
            ColumnKind::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::Text(text.to_string())),
            ColumnKind::Bool => match trimmed {
                "1" | "t" | "true" => Value::Bool(true),
                "0" | "f" | "false" => Value::Bool(false),
                _ => Value::Text(text.to_string()),
            },
            ColumnKind::Text => Value::Text(text.to_string()),
        }
    }
}

#[cfg(feature = "odbc")]
impl From<&odbc_api::DataType> for ColumnKind {
    fn from(data_type: &odbc_api::DataType) -> Self {
        use odbc_api::DataType;

        match data_type {
            DataType::Integer | DataType::SmallInt | DataType::TinyInt | DataType::BigInt => {
                ColumnKind::Integer
            }
            DataType::Real | DataType::Double | DataType::Float { .. } => ColumnKind::Float,
            DataType::Bit => ColumnKind::Bool,
            _ => ColumnKind::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integer() {
        assert_eq!(ColumnKind::Integer.decode("1"), Value::Int(1));
        assert_eq!(ColumnKind::Integer.decode(" -42 "), Value::Int(-42));
        assert_eq!(
            ColumnKind::Integer.decode("n/a"),
            Value::Text("n/a".to_string())
        );
    }

    #[test]
    fn test_decode_float_and_bool() {
        assert_eq!(ColumnKind::Float.decode("1.5"), Value::Float(1.5));
        assert_eq!(ColumnKind::Bool.decode("1"), Value::Bool(true));
        assert_eq!(ColumnKind::Bool.decode("f"), Value::Bool(false));
        assert_eq!(ColumnKind::Bool.decode("?"), Value::Text("?".to_string()));
    }

    #[test]
    fn test_decode_text_is_verbatim() {
        assert_eq!(
            ColumnKind::Text.decode(" root "),
            Value::Text(" root ".to_string())
        );
    }
}
