//! Positional format strings
//!
//! Supports `{}` (auto-numbered), `{N}`, `{{`/`}}` escapes and the format specifiers
//! `:d` (integer) and `:.Nf` (fixed precision float). Null arguments render
//! as an empty string.

use crate::types::render_plain;
use crate::{Error, Result};
use serde_json::Value;

/// Render `template` with positional `args`
pub fn format(template: &str, args: &[Value]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut auto_index = 0usize;
    let mut numbering: Option<bool> = None;

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(format_error(template, "single '}' encountered")),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => return Err(format_error(template, "unterminated '{'")),
                    }
                }

                let (position, spec) = match field.split_once(':') {
                    Some((position, spec)) => (position, Some(spec)),
                    None => (field.as_str(), None),
                };

                let automatic = position.is_empty();
                if numbering.is_some_and(|auto| auto != automatic) {
                    return Err(format_error(
                        template,
                        "cannot switch between automatic and manual field numbering",
                    ));
                }
                numbering = Some(automatic);

                let index = if automatic {
                    auto_index += 1;
                    auto_index - 1
                } else {
                    position.trim().parse::<usize>().map_err(|_| {
                        format_error(template, &format!("invalid field '{}'", position))
                    })?
                };
                let arg = args.get(index).ok_or_else(|| {
                    format_error(template, &format!("argument {} is out of range", index))
                })?;
                out.push_str(&render(arg, spec, template)?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn render(value: &Value, spec: Option<&str>, template: &str) -> Result<String> {
    let Some(spec) = spec.filter(|s| !s.is_empty()) else {
        return Ok(render_plain(value));
    };
    if value.is_null() {
        return Ok(String::new());
    }

    if spec == "d" {
        return match value.as_i64() {
            Some(i) => Ok(i.to_string()),
            None => Err(format_error(
                template,
                &format!("'d' requires an integer, got {}", value),
            )),
        };
    }

    if let Some(precision) = spec.strip_prefix('.').and_then(|p| p.strip_suffix('f')) {
        let precision: usize = precision
            .parse()
            .map_err(|_| format_error(template, &format!("invalid precision in '{}'", spec)))?;
        let number = value.as_f64().ok_or_else(|| {
            format_error(template, &format!("'{}' requires a number, got {}", spec, value))
        })?;
        return Ok(format!("{:.*}", precision, number));
    }

    Err(format_error(template, &format!("unsupported format spec '{}'", spec)))
}

fn format_error(template: &str, message: &str) -> Error {
    Error::transform("format", format!("{} in '{}'", message, template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positional_and_automatic() {
        assert_eq!(format("{}-{}", &[json!("A"), json!(7)]).unwrap(), "A-7");
        assert_eq!(format("{1}/{0}/{1}", &[json!("x"), json!("y")]).unwrap(), "y/x/y");
    }

    #[test]
    fn test_escapes_and_specs() {
        assert_eq!(format("{{{}}}", &[json!(3)]).unwrap(), "{3}");
        assert_eq!(format("{:d}h", &[json!(12)]).unwrap(), "12h");
        assert_eq!(format("{0:.2f}", &[json!(1.005)]).unwrap(), "1.00");
        assert_eq!(format("[{}]", &[Value::Null]).unwrap(), "[]");
    }

    #[test]
    fn test_errors() {
        assert!(format("{} {0}", &[json!(1)]).is_err());
        assert!(format("{}", &[]).is_err());
        assert!(format("{:x}", &[json!(1)]).is_err());
        assert!(format("oops }", &[]).is_err());
        assert!(format("{:d}", &[json!(1.5)]).is_err());
    }
}
