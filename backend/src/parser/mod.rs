//! CSV decoding for file sources, with encoding and delimiter auto-detection.
//!
//! Every row becomes a JSON object of string values keyed by header, so a CSV
//! file flows through the same flattener as an API payload.

use serde_json::{Map, Value};

use crate::error::CsvError;

/// Decoded CSV with the settings that were used.
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    /// One JSON object per data row
    pub records: Vec<Value>,
    /// Detected encoding
    pub encoding: String,
    /// Detected or explicit delimiter
    pub delimiter: char,
    /// Header row
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the given encoding. Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Pick the candidate separator that occurs most often in the header line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = ',';
    let mut best_count = 0;
    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }
    best
}

/// Parse CSV text with an explicit delimiter.
///
/// Short rows are padded with empty strings; surplus fields are ignored.
pub fn parse_str(content: &str, delimiter: char) -> Result<(Vec<String>, Vec<Value>), CsvError> {
    if !delimiter.is_ascii() {
        return Err(CsvError::InvalidDelimiter(delimiter));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::Empty);
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(malformed)?;
        let obj: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = row.get(i).unwrap_or("");
                (header.clone(), Value::String(cell.to_string()))
            })
            .collect();
        records.push(Value::Object(obj));
    }

    Ok((headers, records))
}

/// Parse CSV bytes, detecting the encoding and (unless given) the delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> Result<ParsedCsv, CsvError> {
    if bytes.is_empty() {
        return Err(CsvError::Empty);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let (headers, records) = parse_str(&content, delimiter)?;

    Ok(ParsedCsv {
        records,
        encoding,
        delimiter,
        headers,
    })
}

fn malformed(err: csv::Error) -> CsvError {
    CsvError::Malformed {
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let (headers, rows) = parse_str("name,age\nAlice,30\nBob,25", ',').unwrap();
        assert_eq!(headers, vec!["name", "age"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Alice");
        assert_eq!(rows[1]["age"], "25");
    }

    #[test]
    fn test_quoted_values_with_delimiter_inside() {
        let (_, rows) = parse_str("name;note\n\"Alice\";\"a;b\"", ';').unwrap();
        assert_eq!(rows[0]["name"], "Alice");
        assert_eq!(rows[0]["note"], "a;b");
    }

    #[test]
    fn test_short_rows_padded() {
        let (_, rows) = parse_str("a,b,c\n1,2", ',').unwrap();
        assert_eq!(rows[0]["c"], "");
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_bytes(b"", None), Err(CsvError::Empty)));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        assert!(matches!(parse_str("a§b", '§'), Err(CsvError::InvalidDelimiter('§'))));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_parse() {
        let parsed = parse_bytes(b"email;status\na@x;active\nb@x;inactive", None).unwrap();
        assert_eq!(parsed.delimiter, ';');
        assert_eq!(parsed.headers, vec!["email", "status"]);
        assert_eq!(parsed.records.len(), 2);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }
}
