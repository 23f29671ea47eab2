//! Line-oriented parser turning raw batch bytes into a [`ParsedBatch`].

use std::io::{BufRead, BufReader, Read};

/// Minimum header width; shorter headers are right-padded with spaces.
const HEADER_WIDTH: usize = 51;

/// Marker in column 1 of every card line.
const CARD_LINE_MARKER: char = 'C';

/// Columns 1-7 of a card line (marker + sub-number) precede the card field.
const CARD_FIELD_OFFSET: usize = 7;

const MIN_CARD_DIGITS: usize = 13;
const MAX_CARD_DIGITS: usize = 19;

/// Result of parsing one batch file. Produced once per call, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    /// Batch identifier, header columns 38-45, trimmed.
    pub batch_id: String,
    /// Batch date, header columns 30-37, trimmed and not validated.
    pub batch_date: String,
    /// Batch name, header columns 1-29, trimmed.
    pub batch_name: String,
    /// Declared record count, header columns 46-51. Informational only; may be signed.
    pub expected_count: i32,
    /// Valid card numbers in file order.
    pub card_numbers: Vec<String>,
    /// One message per malformed line or structural problem, in file order.
    pub diagnostics: Vec<String>,
}

/// Returns `true` if `value` is 13 to 19 ASCII digits and nothing else.
pub fn is_valid_card_number(value: &str) -> bool {
    (MIN_CARD_DIGITS..=MAX_CARD_DIGITS).contains(&value.len())
        && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a batch file from `reader`.
///
/// Never fails. Invalid UTF-8 is replaced with U+FFFD, so a corrupt byte only
/// spoils its own line. A read error is reported as a diagnostic and the batch
/// is returned empty, since lines are collected before parsing.
pub fn parse<R: Read>(reader: R) -> ParsedBatch {
    let mut batch = ParsedBatch::default();

    let lines = match read_non_blank_lines(reader) {
        Ok(lines) => lines,
        Err(e) => {
            batch
                .diagnostics
                .push(format!("error processing file: {e}"));
            return batch;
        }
    };

    let Some(header) = lines.first() else {
        batch.diagnostics.push("empty file".to_owned());
        return batch;
    };
    parse_header(header, &mut batch);

    // The last line is the footer; it is consumed without validation.
    let body_end = lines.len().saturating_sub(1);
    for (idx, line) in lines.iter().enumerate().take(body_end).skip(1) {
        parse_card_line(idx + 1, line, &mut batch);
    }

    batch
}

/// Collect the non-blank lines of `reader`.
///
/// `\n`, `\r\n` and a lone `\r` all end a line.
fn read_non_blank_lines<R: Read>(reader: R) -> std::io::Result<Vec<String>> {
    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let chunk = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        for raw in chunk.split(|&b| b == b'\r') {
            let line = String::from_utf8_lossy(raw);
            if !line.trim().is_empty() {
                lines.push(line.into_owned());
            }
        }
    }
    Ok(lines)
}

fn parse_header(line: &str, batch: &mut ParsedBatch) {
    let mut header: Vec<char> = line.chars().collect();
    if header.len() < HEADER_WIDTH {
        header.resize(HEADER_WIDTH, ' ');
    }

    batch.batch_name = column(&header, 0, 29);
    batch.batch_date = column(&header, 29, 37);
    batch.batch_id = column(&header, 37, 45);

    let count = column(&header, 45, 51);
    match count.parse::<i32>() {
        Ok(n) => batch.expected_count = n,
        Err(_) => batch
            .diagnostics
            .push(format!("invalid record count in header: {count}")),
    }
}

/// Trimmed text of the zero-based, end-exclusive character range.
fn column(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect::<String>().trim().to_owned()
}

fn parse_card_line(line_no: usize, line: &str, batch: &mut ParsedBatch) {
    if !line.starts_with(CARD_LINE_MARKER) {
        return;
    }
    if line.chars().count() <= CARD_FIELD_OFFSET {
        batch
            .diagnostics
            .push(format!("line {line_no}: invalid format"));
        return;
    }

    let card_number: String = line
        .chars()
        .skip(CARD_FIELD_OFFSET)
        .filter(|c| !is_field_whitespace(*c))
        .collect();

    if is_valid_card_number(&card_number) {
        batch.card_numbers.push(card_number);
    } else {
        batch
            .diagnostics
            .push(format!("line {line_no}: invalid card number '{card_number}'"));
    }
}

/// ASCII whitespace as stripped from the card field. Unicode spaces are kept
/// so that they fail digit validation instead of being silently removed.
fn is_field_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "DESAFIO-HYPERATIVA           20180524LOTE0001000003";

    fn parse_str(content: &str) -> ParsedBatch {
        parse(content.as_bytes())
    }

    #[test]
    fn parses_reference_batch() {
        let content = format!(
            "{HEADER}\nC1     4456897922969999\nC2     4456897999999999\nC3     4456897998199999\nLOTE0001000003\n"
        );
        let batch = parse_str(&content);
        assert_eq!(batch.batch_name, "DESAFIO-HYPERATIVA");
        assert_eq!(batch.batch_date, "20180524");
        assert_eq!(batch.batch_id, "LOTE0001");
        assert_eq!(batch.expected_count, 3);
        assert_eq!(
            batch.card_numbers,
            vec!["4456897922969999", "4456897999999999", "4456897998199999"]
        );
        assert!(batch.diagnostics.is_empty(), "{:?}", batch.diagnostics);
    }

    #[test]
    fn rejects_out_of_range_lengths_without_dropping_siblings() {
        let content = format!(
            "{HEADER}\nC1     44568979999999812123123123123\nC2     4456897999999999124\nC3     4456897922969999123123123123123\nC4     445689799999\nLOTE0001000004\n"
        );
        let batch = parse_str(&content);
        assert_eq!(batch.card_numbers, vec!["4456897999999999124"]);
        assert_eq!(
            batch.diagnostics,
            vec![
                "line 2: invalid card number '44568979999999812123123123123'",
                "line 4: invalid card number '4456897922969999123123123123123'",
                "line 5: invalid card number '445689799999'",
            ]
        );
    }

    #[test]
    fn twenty_digits_rejected_nineteen_accepted() {
        let content = format!(
            "{HEADER}\nC1     12345678901234567890\nC2     1234567890123456789\nC3     1234567890123\nFOOTER\n"
        );
        let batch = parse_str(&content);
        assert_eq!(
            batch.card_numbers,
            vec!["1234567890123456789", "1234567890123"]
        );
        assert_eq!(batch.diagnostics.len(), 1);
        assert!(batch.diagnostics[0].starts_with("line 2:"));
    }

    #[test]
    fn non_digit_card_rejected() {
        let content = format!("{HEADER}\nC1     4456-8979-2296-9999\nFOOTER\n");
        let batch = parse_str(&content);
        assert!(batch.card_numbers.is_empty());
        assert_eq!(
            batch.diagnostics,
            vec!["line 2: invalid card number '4456-8979-2296-9999'"]
        );
    }

    #[test]
    fn internal_whitespace_is_stripped() {
        let content = format!("{HEADER}\nC1     4456 8979 2296 9999   \nFOOTER\n");
        let batch = parse_str(&content);
        assert_eq!(batch.card_numbers, vec!["4456897922969999"]);
    }

    #[test]
    fn short_card_line_is_invalid_format() {
        let content = format!("{HEADER}\nC1\nC123456\nC2     4456897922969999\nFOOTER\n");
        let batch = parse_str(&content);
        assert_eq!(
            batch.diagnostics,
            vec!["line 2: invalid format", "line 3: invalid format"]
        );
        assert_eq!(batch.card_numbers, vec!["4456897922969999"]);
    }

    #[test]
    fn marker_line_with_blank_card_field_is_invalid_number() {
        let content = format!("{HEADER}\nC1          \nFOOTER\n");
        let batch = parse_str(&content);
        assert_eq!(batch.diagnostics, vec!["line 2: invalid card number ''"]);
    }

    #[test]
    fn non_card_lines_are_skipped_silently() {
        let content = format!("{HEADER}\nX1     4456897922969999\nc1     4456897922969999\nFOOTER\n");
        let batch = parse_str(&content);
        assert!(batch.card_numbers.is_empty());
        assert!(batch.diagnostics.is_empty());
    }

    #[test]
    fn blank_lines_do_not_count() {
        let content = format!(
            "\n\n{HEADER}\n\n   \nC1     4456897922969999\n\nC2     12\n\nLOTE0001000002\n\n"
        );
        let batch = parse_str(&content);
        assert_eq!(batch.batch_id, "LOTE0001");
        assert_eq!(batch.card_numbers, vec!["4456897922969999"]);
        assert_eq!(batch.diagnostics, vec!["line 3: invalid card number '12'"]);
    }

    #[test]
    fn last_line_is_footer_even_when_card_shaped() {
        let content = format!("{HEADER}\nC1     4456897922969999\nC2     4456897999999999\n");
        let batch = parse_str(&content);
        assert_eq!(batch.card_numbers, vec!["4456897922969999"]);
    }

    #[test]
    fn crlf_line_endings() {
        let content = format!("{HEADER}\r\nC1     4456897922969999\r\nFOOTER\r\n");
        let batch = parse_str(&content);
        assert_eq!(batch.card_numbers, vec!["4456897922969999"]);
        assert_eq!(batch.expected_count, 3);
    }

    #[test]
    fn empty_input() {
        let batch = parse_str("");
        assert!(batch.card_numbers.is_empty());
        assert_eq!(batch.diagnostics, vec!["empty file"]);
        assert_eq!(batch.batch_id, "");
        assert_eq!(batch.expected_count, 0);
    }

    #[test]
    fn whitespace_only_input_is_empty() {
        let batch = parse_str("  \n\t\n\n");
        assert_eq!(batch.diagnostics, vec!["empty file"]);
    }

    #[test]
    fn short_header_is_padded() {
        let batch = parse_str("SHORT NAME\nC1     4456897922969999\nFOOTER\n");
        assert_eq!(batch.batch_name, "SHORT NAME");
        assert_eq!(batch.batch_date, "");
        assert_eq!(batch.batch_id, "");
        assert_eq!(batch.expected_count, 0);
        assert_eq!(batch.diagnostics, vec!["invalid record count in header: "]);
        assert_eq!(batch.card_numbers, vec!["4456897922969999"]);
    }

    #[test]
    fn bad_record_count_is_diagnosed_not_fatal() {
        let header = "DESAFIO-HYPERATIVA           20180524LOTE0001ABC123";
        let content = format!("{header}\nC1     4456897922969999\nFOOTER\n");
        let batch = parse_str(&content);
        assert_eq!(batch.expected_count, 0);
        assert_eq!(
            batch.diagnostics,
            vec!["invalid record count in header: ABC123"]
        );
        assert_eq!(batch.batch_id, "LOTE0001");
        assert_eq!(batch.card_numbers.len(), 1);
    }

    #[test]
    fn declared_count_mismatch_is_not_an_error() {
        let header = "DESAFIO-HYPERATIVA           20180524LOTE0001000010";
        let content = format!("{header}\nC1     4456897922969999\nFOOTER\n");
        let batch = parse_str(&content);
        assert_eq!(batch.expected_count, 10);
        assert!(batch.diagnostics.is_empty());
    }

    #[test]
    fn header_only_file() {
        let batch = parse_str(HEADER);
        assert_eq!(batch.batch_id, "LOTE0001");
        assert!(batch.card_numbers.is_empty());
        assert!(batch.diagnostics.is_empty());
    }

    #[test]
    fn multibyte_header_does_not_panic() {
        let batch = parse_str("LOTE ÇÃO ÉÊ\nC1     4456897922969999\nFOOTER\n");
        assert_eq!(batch.batch_name, "LOTE ÇÃO ÉÊ");
        assert_eq!(batch.card_numbers.len(), 1);
    }

    #[test]
    fn invalid_utf8_only_spoils_its_own_line() {
        let mut bytes = format!("{HEADER}\nC1     4456897922969999\nC2     ").into_bytes();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"\nC3     4456897999999999\nFOOTER\n");
        let batch = parse(bytes.as_slice());
        assert_eq!(
            batch.card_numbers,
            vec!["4456897922969999", "4456897999999999"]
        );
        assert_eq!(
            batch.diagnostics,
            vec!["line 3: invalid card number '\u{FFFD}'"]
        );
    }

    #[test]
    fn bare_carriage_return_ends_lines() {
        let content = format!("{HEADER}\rC1     4456897922969999\rC2     12\rFOOTER\r");
        let batch = parse_str(&content);
        assert_eq!(batch.batch_id, "LOTE0001");
        assert_eq!(batch.card_numbers, vec!["4456897922969999"]);
        assert_eq!(batch.diagnostics, vec!["line 3: invalid card number '12'"]);
    }

    #[test]
    fn signed_record_count_is_accepted() {
        let header = "DESAFIO-HYPERATIVA           20180524LOTE0001-00001";
        let batch = parse_str(&format!("{header}\nFOOTER\n"));
        assert_eq!(batch.expected_count, -1);
        assert!(batch.diagnostics.is_empty());

        let header = "DESAFIO-HYPERATIVA           20180524LOTE0001+00002";
        assert_eq!(parse_str(&format!("{header}\nFOOTER\n")).expected_count, 2);
    }

    #[test]
    fn unicode_space_in_card_field_is_not_stripped() {
        let content = format!(
            "{HEADER}\nC1     4456\u{A0}897922969999\nC2     4456\t8979 99999999\nFOOTER\n"
        );
        let batch = parse_str(&content);
        assert_eq!(batch.card_numbers, vec!["4456897999999999"]);
        assert_eq!(
            batch.diagnostics,
            vec!["line 2: invalid card number '4456\u{A0}897922969999'"]
        );
    }

    #[test]
    fn read_failure_becomes_diagnostic() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"))
            }
        }
        let batch = parse(FailingReader);
        assert_eq!(batch.diagnostics, vec!["error processing file: disk on fire"]);
    }

    #[test]
    fn valid_card_number_rules() {
        assert!(is_valid_card_number("4111111111111"));
        assert!(is_valid_card_number("4111111111111111111"));
        assert!(!is_valid_card_number("411111111111"));
        assert!(!is_valid_card_number("41111111111111111111"));
        assert!(!is_valid_card_number("4111 1111 1111 1111"));
        assert!(!is_valid_card_number("411111111111111a"));
        assert!(!is_valid_card_number(""));
        assert!(!is_valid_card_number("４１１１１１１１１１１１１"));
    }
}
