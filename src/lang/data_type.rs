/// Static type of a Cinder value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Float,
    Bool,
    Char,
    String,
    /// Only valid as a function return type.
    Void,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    /// Result type of storing a `source` value into a `self`-typed target,
    /// or `None` when the store is not allowed.
    ///
    /// Equal types pass through. An `INT` target also accepts a `FLOAT`
    /// source and the result is `INT` (implicit narrowing). The reverse
    /// direction is rejected.
    pub fn assignment_result(self, source: DataType) -> Option<DataType> {
        if self == source && self != DataType::Void {
            Some(source)
        } else if self == DataType::Int && source == DataType::Float {
            Some(DataType::Int)
        } else {
            None
        }
    }

    /// Whether storing `source` into `self` needs a float-to-int conversion.
    pub fn narrows_from(self, source: DataType) -> bool {
        self == DataType::Int && source == DataType::Float
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Int => "INT",
            DataType::Float => "FLOAT",
            DataType::Bool => "BOOL",
            DataType::Char => "CHAR",
            DataType::String => "STRING",
            DataType::Void => "VOID",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_types_assign() {
        assert_eq!(
            DataType::Bool.assignment_result(DataType::Bool),
            Some(DataType::Bool)
        );
        assert_eq!(
            DataType::String.assignment_result(DataType::String),
            Some(DataType::String)
        );
    }

    #[test]
    fn test_int_accepts_float_by_narrowing() {
        assert_eq!(
            DataType::Int.assignment_result(DataType::Float),
            Some(DataType::Int)
        );
        assert!(DataType::Int.narrows_from(DataType::Float));
    }

    #[test]
    fn test_float_rejects_int() {
        assert_eq!(DataType::Float.assignment_result(DataType::Int), None);
    }

    #[test]
    fn test_void_never_assigns() {
        assert_eq!(DataType::Void.assignment_result(DataType::Void), None);
        assert_eq!(DataType::Int.assignment_result(DataType::Void), None);
    }

    #[test]
    fn test_display_is_uppercase() {
        assert_eq!(DataType::Float.to_string(), "FLOAT");
        assert_eq!(DataType::Void.to_string(), "VOID");
    }
}
