//! The `timeouts` block and Go-style duration strings

use std::time::Duration;
use tfplug::validator::Validator;
use tfplug::{AttributeBuilder, BlockBuilder, Diagnostics, Dynamic, State};

/// Per-operation timeouts for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn new(create: Duration, update: Duration, delete: Duration) -> Self {
        Self {
            create,
            update,
            delete,
        }
    }

    pub const fn minutes(create: u64, update: u64, delete: u64) -> Self {
        Self::new(
            Duration::from_secs(create * 60),
            Duration::from_secs(update * 60),
            Duration::from_secs(delete * 60),
        )
    }

    /// Configured timeouts, falling back to `defaults` for unset or
    /// unparsable values.
    pub fn from_state(state: &State, defaults: Timeouts) -> Self {
        let Some(block) = state.get_block("timeouts") else {
            return defaults;
        };
        let pick = |key: &str, default: Duration| {
            block
                .get_string(key)
                .and_then(|s| parse_duration(&s).ok())
                .unwrap_or(default)
        };
        Self {
            create: pick("create", defaults.create),
            update: pick("update", defaults.update),
            delete: pick("delete", defaults.delete),
        }
    }
}

/// A single-nested `timeouts` block with one optional duration attribute
/// per operation.
pub fn block(operations: &[&str]) -> BlockBuilder {
    operations.iter().fold(
        BlockBuilder::single("timeouts").description("Operation timeouts"),
        |block, op| {
            block.attribute(
                AttributeBuilder::string(op)
                    .optional()
                    .description(&format!(
                        "Timeout for the {op} operation, e.g. \"30s\" or \"2h45m\""
                    ))
                    .validator(DurationValidator),
            )
        },
    )
}

pub struct DurationValidator;

impl Validator for DurationValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if let Err(err) = parse_duration(s) {
                diagnostics.add_error(
                    format!("Invalid duration for {attribute_path}"),
                    Some(err),
                );
            }
        }
    }
}

/// Largest duration Go can represent: `2562047h47m16.854775807s`.
const MAX_DURATION: Duration = Duration::new(9_223_372_036, 854_775_807);

/// Parses durations such as `"300ms"`, `"1.5h"` or `"2h45m"`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let invalid = || format!("time: invalid duration {input:?}");
    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total += value * seconds;
        if !total.is_finite() || total > MAX_DURATION.as_secs_f64() {
            return Err(invalid());
        }
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid())
}

/// Formats like Go's `time.Duration.String`: `"10m0s"`, `"1h30m0s"`, `"500ms"`.
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }

    if d < Duration::from_secs(1) {
        let nanos = d.subsec_nanos();
        return if nanos % 1_000_000 == 0 {
            format!("{}ms", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}µs", nanos / 1_000)
        } else {
            format!("{nanos}ns")
        };
    }

    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let nanos = d.subsec_nanos();
    let seconds = if nanos == 0 {
        format!("{seconds}s")
    } else {
        let fraction = format!("{nanos:09}");
        format!("{seconds}.{}s", fraction.trim_end_matches('0'))
    };

    match (hours, minutes) {
        (0, 0) => seconds,
        (0, m) => format!("{m}m{seconds}"),
        (h, m) => format!("{h}h{m}m{seconds}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_go_durations() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_malformed_durations() {
        for input in ["", "10", "m", "10x", "1h30", "-5m"] {
            assert!(parse_duration(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn rejects_durations_beyond_the_largest_representable() {
        for input in ["10000000000000000h", "3000000000000000h", "2562048h"] {
            assert_eq!(
                parse_duration(input).unwrap_err(),
                format!("time: invalid duration {input:?}")
            );
        }
        assert!(parse_duration("2562047h").is_ok());
    }

    #[test]
    fn formats_like_go() {
        assert_eq!(format_duration(Duration::from_secs(600)), "10m0s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_secs(5430)), "1h30m30s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(100)), "100ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn from_state_prefers_configured_values() {
        let defaults = Timeouts::minutes(20, 20, 20);

        let mut timeouts = HashMap::new();
        timeouts.insert("create".to_string(), Dynamic::String("45m".into()));
        timeouts.insert("delete".to_string(), Dynamic::Null);
        let mut state = State::new();
        state.set("timeouts", Dynamic::Map(timeouts));

        let resolved = Timeouts::from_state(&state, defaults);
        assert_eq!(resolved.create, Duration::from_secs(45 * 60));
        assert_eq!(resolved.update, defaults.update);
        assert_eq!(resolved.delete, defaults.delete);

        assert_eq!(Timeouts::from_state(&State::new(), defaults), defaults);
    }

    #[test]
    fn validator_flags_bad_durations() {
        let mut diags = Diagnostics::new();
        DurationValidator.validate(&Dynamic::String("ten minutes".into()), "timeouts.create", &mut diags);
        assert!(diags.has_errors());

        let mut diags = Diagnostics::new();
        DurationValidator.validate(
            &Dynamic::String("10000000000000000h".into()),
            "timeouts.create",
            &mut diags,
        );
        assert!(diags.has_errors());

        let mut diags = Diagnostics::new();
        DurationValidator.validate(&Dynamic::String("10m".into()), "timeouts.create", &mut diags);
        assert!(!diags.has_errors());
    }
}
