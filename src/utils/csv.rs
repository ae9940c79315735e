// src/utils/csv.rs

/// Quotes a field, doubling any embedded quotes.
pub fn escape_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Renders a header line plus quoted rows.
///
/// The header is written bare and ends with a newline; rows are joined with
/// `\n` and the document has no trailing newline.
pub fn render<I, R>(header: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    let mut out = header.join(",");
    out.push('\n');

    let body: Vec<String> = rows
        .into_iter()
        .map(|row| {
            row.as_ref()
                .iter()
                .map(|field| escape_field(field))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();

    out.push_str(&body.join("\n"));
    out
}
