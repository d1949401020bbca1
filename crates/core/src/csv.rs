//! CSV document builder for admin exports.
//!
//! Produces RFC 4180 output (CRLF line endings, `"`-quoted fields with doubled
//! quotes). Cells that a spreadsheet would evaluate as a formula are prefixed
//! with a single quote.

/// Characters that make spreadsheet applications treat a cell as a formula.
const FORMULA_PREFIXES: [char; 4] = ['=', '+', '-', '@'];

/// An in-memory CSV document.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    buffer: String,
    columns: usize,
}

impl CsvWriter {
    /// Start a document with the given header row.
    #[must_use]
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut writer = Self {
            buffer: String::new(),
            columns: 0,
        };
        writer.columns = writer.write_row(headers);
        writer
    }

    /// Append a record. Rows shorter than the header are padded with empty
    /// cells so every line has the same number of fields.
    pub fn push<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write_row(fields);
    }

    /// Number of columns in the header row.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Finish the document.
    #[must_use]
    pub fn finish(self) -> String {
        self.buffer
    }

    fn write_row<I, S>(&mut self, fields: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut count = 0;
        for field in fields {
            if count > 0 {
                self.buffer.push(',');
            }
            push_field(&mut self.buffer, field.as_ref());
            count += 1;
        }
        for _ in count..self.columns {
            self.buffer.push(',');
        }
        self.buffer.push_str("\r\n");
        count
    }
}

/// Escape a single field into `out`.
fn push_field(out: &mut String, field: &str) {
    let neutralized = field.starts_with(FORMULA_PREFIXES) && !is_plain_number(field);
    let needs_quotes = neutralized
        || field.contains([',', '"', '\r', '\n'])
        || field.starts_with(' ')
        || field.ends_with(' ');

    if !needs_quotes {
        out.push_str(field);
        return;
    }

    out.push('"');
    if neutralized {
        out.push('\'');
    }
    for c in field.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

/// Negative amounts such as `-12.50` are data, not formulas.
fn is_plain_number(field: &str) -> bool {
    let digits = field.strip_prefix(['-', '+']).unwrap_or(field);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let mut csv = CsvWriter::new(["email", "name"]);
        csv.push(["a@shop.com", "Amina"]);
        csv.push(["b@shop.com", "Leo"]);
        assert_eq!(
            csv.finish(),
            "email,name\r\na@shop.com,Amina\r\nb@shop.com,Leo\r\n"
        );
    }

    #[test]
    fn test_quotes_special_characters() {
        let mut csv = CsvWriter::new(["note"]);
        csv.push(["Paris, France"]);
        csv.push(["She said \"oui\""]);
        csv.push(["line1\nline2"]);
        assert_eq!(
            csv.finish(),
            "note\r\n\"Paris, France\"\r\n\"She said \"\"oui\"\"\"\r\n\"line1\nline2\"\r\n"
        );
    }

    #[test]
    fn test_neutralizes_formulas() {
        let mut csv = CsvWriter::new(["value"]);
        csv.push(["=HYPERLINK(\"x\")"]);
        csv.push(["@SUM(A1)"]);
        csv.push(["-12.50"]);
        assert_eq!(
            csv.finish(),
            "value\r\n\"'=HYPERLINK(\"\"x\"\")\"\r\n\"'@SUM(A1)\"\r\n-12.50\r\n"
        );
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut csv = CsvWriter::new(["a", "b", "c"]);
        csv.push(["1"]);
        assert_eq!(csv.columns(), 3);
        assert_eq!(csv.finish(), "a,b,c\r\n1,,\r\n");
    }

    #[test]
    fn test_unicode_passthrough() {
        let mut csv = CsvWriter::new(["name"]);
        csv.push(["Zoé Benali"]);
        assert_eq!(csv.finish(), "name\r\nZoé Benali\r\n");
    }
}
