use super::error::DescriptorError;
use super::layout;

/// Token access for one table row, with the row's command name attached to
/// every error.
pub struct FieldReader<'a> {
    command: &'a str,
    fields: &'a [&'a str],
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a [&'a str]) -> Self {
        let command = fields.get(layout::NAME_INDEX).copied().unwrap_or("");
        Self { command, fields }
    }

    pub fn command(&self) -> &'a str {
        self.command
    }

    pub fn require_count(&self, expected: usize) -> Result<(), DescriptorError> {
        if self.fields.len() != expected {
            return Err(DescriptorError::ParameterCount {
                command: self.command.to_string(),
                expected,
                actual: self.fields.len(),
            });
        }
        Ok(())
    }

    pub fn read_token(&self, index: usize) -> Result<&'a str, DescriptorError> {
        self.fields
            .get(index)
            .copied()
            .ok_or(DescriptorError::ParameterCount {
                command: self.command.to_string(),
                expected: layout::FIELD_COUNT,
                actual: self.fields.len(),
            })
    }

    pub fn read_bool(&self, index: usize) -> Result<bool, DescriptorError> {
        let token = self.read_token(index)?;
        match token {
            layout::TRUE_TOKEN => Ok(true),
            layout::FALSE_TOKEN => Ok(false),
            _ => Err(DescriptorError::InvalidBoolean {
                command: self.command.to_string(),
                token: token.to_string(),
            }),
        }
    }

    pub fn read_int(&self, index: usize) -> Result<i64, DescriptorError> {
        let token = self.read_token(index)?;
        token
            .trim()
            .parse::<i64>()
            .map_err(|_| DescriptorError::InvalidInteger {
                command: self.command.to_string(),
                token: token.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::FieldReader;
    use crate::command::error::DescriptorError;

    #[test]
    fn booleans_must_be_exact() {
        let fields = ["CMD", "T", "F", "t", "True"];
        let reader = FieldReader::new(&fields);
        assert!(reader.read_bool(1).unwrap());
        assert!(!reader.read_bool(2).unwrap());
        assert!(matches!(
            reader.read_bool(3),
            Err(DescriptorError::InvalidBoolean { .. })
        ));
        assert!(matches!(
            reader.read_bool(4),
            Err(DescriptorError::InvalidBoolean { .. })
        ));
    }

    #[test]
    fn integers_are_base_ten() {
        let fields = ["CMD", "-3", "0x10", " 11 "];
        let reader = FieldReader::new(&fields);
        assert_eq!(reader.read_int(1).unwrap(), -3);
        assert_eq!(reader.read_int(3).unwrap(), 11);
        let err = reader.read_int(2).unwrap_err();
        assert!(err.to_string().contains("CMD"));
    }

    #[test]
    fn count_mismatch_reports_both_sides() {
        let fields = ["CMD", "0x01"];
        let reader = FieldReader::new(&fields);
        let err = reader.require_count(10).unwrap_err();
        assert_eq!(
            err,
            DescriptorError::ParameterCount {
                command: "CMD".to_string(),
                expected: 10,
                actual: 2,
            }
        );
    }
}
