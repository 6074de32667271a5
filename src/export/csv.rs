use std::borrow::Cow;
use std::io::{self, Write};

/// Quotes a field when it holds a delimiter, quote or line break.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn write_record<W, S>(out: &mut W, fields: &[S]) -> io::Result<()>
where
    W: Write,
    S: AsRef<str>,
{
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            out.write_all(b",")?;
        }
        out.write_all(escape_field(field.as_ref()).as_bytes())?;
    }
    out.write_all(b"\n")
}

/// Splits CSV text into records, honouring quoted fields that span lines.
pub fn parse_records(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields_are_not_quoted() {
        assert_eq!(escape_field("ubuntu-latest"), "ubuntu-latest");
    }

    #[test]
    fn test_special_fields_are_quoted() {
        assert_eq!(escape_field("self-hosted,linux"), "\"self-hosted,linux\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_write_then_parse_preserves_awkward_fields() {
        let fields = ["build (ubuntu, 3.12)", "line\nbreak", "\"quoted\"", ""];
        let mut out = Vec::new();
        write_record(&mut out, &fields).unwrap();

        let text = String::from_utf8(out).unwrap();
        let records = parse_records(&text).unwrap();

        assert_eq!(records, vec![fields.map(String::from).to_vec()]);
    }

    #[test]
    fn test_parse_handles_crlf_and_missing_final_newline() {
        let records = parse_records("a,b\r\nc,d").unwrap();

        assert_eq!(records, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        assert!(parse_records("a,\"b\n").is_err());
    }
}
