//! Typed access to command options.
//!
//! Every command declares its options as [`OptionSpec`] constants; handlers
//! read values only through those specs, so a missing required option or a
//! value of the wrong kind is reported the same way everywhere.

use lanseat_types::api::{OptionKind, OptionSpec};
use lanseat_types::events::{CommandOption, OptionValue};

use crate::error::ApiError;

pub const fn opt(name: &'static str, description: &'static str, kind: OptionKind) -> OptionSpec {
    OptionSpec {
        name,
        description,
        kind,
        required: false,
        autocomplete: false,
    }
}

pub const fn required(spec: OptionSpec) -> OptionSpec {
    OptionSpec { required: true, ..spec }
}

pub const fn autocomplete(spec: OptionSpec) -> OptionSpec {
    OptionSpec {
        autocomplete: true,
        ..spec
    }
}

pub struct Options<'a> {
    values: &'a [CommandOption],
}

impl<'a> Options<'a> {
    pub fn new(values: &'a [CommandOption]) -> Self {
        Self { values }
    }

    /// The raw value for `spec`, checked against its declared kind.
    pub fn get(&self, spec: &OptionSpec) -> Result<Option<&'a OptionValue>, ApiError> {
        let Some(option) = self.values.iter().find(|o| o.name == spec.name) else {
            if spec.required {
                return Err(ApiError::Validation(format!("Option `{}` is required.", spec.name)));
            }
            return Ok(None);
        };

        let matches = matches!(
            (&option.value, spec.kind),
            (OptionValue::String(_), OptionKind::String)
                | (OptionValue::Integer(_), OptionKind::Integer)
                | (OptionValue::Number(_), OptionKind::Number)
                | (OptionValue::Boolean(_), OptionKind::Boolean)
                | (OptionValue::User(_), OptionKind::User)
                // Platforms deliver whole numbers for number options too
                | (OptionValue::Integer(_), OptionKind::Number)
        );
        if !matches {
            return Err(ApiError::Validation(format!(
                "Option `{}` has the wrong type.",
                spec.name
            )));
        }
        Ok(Some(&option.value))
    }

    pub fn string(&self, spec: &OptionSpec) -> Result<Option<String>, ApiError> {
        Ok(match self.get(spec)? {
            Some(OptionValue::String(s)) => Some(s.trim().to_string()),
            _ => None,
        })
    }

    pub fn integer(&self, spec: &OptionSpec) -> Result<Option<i64>, ApiError> {
        Ok(match self.get(spec)? {
            Some(OptionValue::Integer(i)) => Some(*i),
            _ => None,
        })
    }

    pub fn number(&self, spec: &OptionSpec) -> Result<Option<f64>, ApiError> {
        Ok(match self.get(spec)? {
            Some(OptionValue::Number(n)) => Some(*n),
            Some(OptionValue::Integer(i)) => Some(*i as f64),
            _ => None,
        })
    }

    pub fn boolean(&self, spec: &OptionSpec) -> Result<Option<bool>, ApiError> {
        Ok(match self.get(spec)? {
            Some(OptionValue::Boolean(b)) => Some(*b),
            _ => None,
        })
    }

    pub fn user(&self, spec: &OptionSpec) -> Result<Option<String>, ApiError> {
        Ok(match self.get(spec)? {
            Some(OptionValue::User(id)) => Some(id.clone()),
            _ => None,
        })
    }

    /// Event options carry the event id as a string (the autocomplete value).
    pub fn event_id(&self, spec: &OptionSpec) -> Result<Option<i64>, ApiError> {
        match self.string(spec)? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::NotFound("Invalid event. Please select an event from the list.".into())),
            None => Ok(None),
        }
    }

    pub fn require_string(&self, spec: &OptionSpec) -> Result<String, ApiError> {
        self.string(spec)?.ok_or_else(|| missing(spec))
    }

    pub fn require_integer(&self, spec: &OptionSpec) -> Result<i64, ApiError> {
        self.integer(spec)?.ok_or_else(|| missing(spec))
    }

    pub fn require_boolean(&self, spec: &OptionSpec) -> Result<bool, ApiError> {
        self.boolean(spec)?.ok_or_else(|| missing(spec))
    }

    pub fn require_user(&self, spec: &OptionSpec) -> Result<String, ApiError> {
        self.user(spec)?.ok_or_else(|| missing(spec))
    }

    pub fn require_event_id(&self, spec: &OptionSpec) -> Result<i64, ApiError> {
        self.event_id(spec)?.ok_or_else(|| missing(spec))
    }
}

fn missing(spec: &OptionSpec) -> ApiError {
    ApiError::Validation(format!("Option `{}` is required.", spec.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: OptionSpec = required(autocomplete(opt("event", "Event", OptionKind::String)));
    const SEAT: OptionSpec = opt("seat", "Seat", OptionKind::Integer);
    const FEE: OptionSpec = opt("entryfee", "Fee", OptionKind::Number);

    fn option(name: &str, value: OptionValue) -> CommandOption {
        CommandOption { name: name.into(), value }
    }

    #[test]
    fn typed_extraction() {
        let values = vec![
            option("event", OptionValue::String(" 12 ".into())),
            option("entryfee", OptionValue::Integer(150)),
        ];
        let options = Options::new(&values);

        assert_eq!(options.require_event_id(&EVENT).unwrap(), 12);
        assert_eq!(options.integer(&SEAT).unwrap(), None);
        assert_eq!(options.number(&FEE).unwrap(), Some(150.0));
    }

    #[test]
    fn missing_required_and_wrong_kind_are_validation_errors() {
        let empty: Vec<CommandOption> = vec![];
        assert!(matches!(Options::new(&empty).get(&EVENT), Err(ApiError::Validation(_))));

        let values = vec![option("seat", OptionValue::String("three".into()))];
        assert!(matches!(Options::new(&values).integer(&SEAT), Err(ApiError::Validation(_))));
    }

    #[test]
    fn non_numeric_event_is_not_found() {
        let values = vec![option("event", OptionValue::String("LAN party".into()))];
        assert!(matches!(Options::new(&values).event_id(&EVENT), Err(ApiError::NotFound(_))));
    }
}
