use crate::error::BackendError;

/// A parsed table identifier of the form `dataset.table` or
/// `project.dataset.table`.
///
/// For the three-part form the project prefix stays attached to `dataset`, so
/// `dataset` is always a valid scope for an `INFORMATION_SCHEMA` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTableName {
    pub dataset: String,
    pub table: String,
}

impl QualifiedTableName {
    /// Splits a raw name into its dataset scope and table component.
    ///
    /// # Errors
    /// Returns [`BackendError::InvalidArgument`] unless the name has exactly
    /// 2 or 3 non-empty dot-separated components.
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(invalid(raw));
        }
        match parts.as_slice() {
            [dataset, table] => Ok(Self {
                dataset: (*dataset).to_string(),
                table: (*table).to_string(),
            }),
            [project, dataset, table] => Ok(Self {
                dataset: format!("{project}.{dataset}"),
                table: (*table).to_string(),
            }),
            _ => Err(invalid(raw)),
        }
    }
}

fn invalid(raw: &str) -> BackendError {
    BackendError::InvalidArgument(format!("Invalid table name: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_part_name() {
        let name = QualifiedTableName::parse("ds1.t1").expect("two parts should parse");
        assert_eq!(name.dataset, "ds1");
        assert_eq!(name.table, "t1");
    }

    #[test]
    fn parses_three_part_name_keeping_project_in_scope() {
        let name = QualifiedTableName::parse("proj.ds1.t1").expect("three parts should parse");
        assert_eq!(name.dataset, "proj.ds1");
        assert_eq!(name.table, "t1");
    }

    #[test]
    fn rejects_single_component() {
        let err = QualifiedTableName::parse("t1").expect_err("one part should fail");
        assert!(err.to_string().contains("Invalid table name"));
    }

    #[test]
    fn rejects_four_components() {
        let err = QualifiedTableName::parse("a.b.c.d").expect_err("four parts should fail");
        assert!(err.to_string().contains("Invalid table name: a.b.c.d"));
    }

    #[test]
    fn rejects_empty_component() {
        let err = QualifiedTableName::parse(".t1").expect_err("empty dataset should fail");
        assert!(err.to_string().contains("Invalid table name"));
    }
}
