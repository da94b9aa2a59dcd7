//! Semicolon/comma record text shared by results files and simulator output.
//!
//! A block of records looks like `"\n1,2.5,true;\n3,4.0,false;\n"`: records
//! end with `;`, fields are separated by `,`, newlines are insignificant.

/// Split a header attribute (`"X,Y,Z"`) into column names.
pub fn split_header(header: &str) -> Vec<String> {
    header
        .split(',')
        .map(|c| c.trim().to_string())
        .collect()
}

/// Split record text into rows of raw fields. Blank records are skipped.
pub fn split_rows(text: &str) -> Vec<Vec<&str>> {
    text.split(';')
        .map(|row| row.trim_matches(|c: char| c.is_whitespace()))
        .filter(|row| !row.is_empty())
        .map(|row| row.split(',').map(|f| f.trim()).collect())
        .collect()
}

/// Render rows as record text: leading newline, one `a,b;` line per row.
pub fn join_rows<R, F>(rows: R) -> String
where
    R: IntoIterator<Item = F>,
    F: IntoIterator,
    F::Item: std::fmt::Display,
{
    let mut text = String::from("\n");
    for row in rows {
        let mut first = true;
        for field in row {
            if !first {
                text.push(',');
            }
            first = false;
            text.push_str(&field.to_string());
        }
        text.push_str(";\n");
    }
    text
}
