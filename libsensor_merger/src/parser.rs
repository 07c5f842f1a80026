use std::fmt;
use std::path::Path;

use super::channel::ChannelName;
use super::error::ParserError;

/// Default field delimiter of the sensor logs
pub const DEFAULT_DELIMITER: char = ';';

/// UTF-8 byte order mark some loggers write at the start of a file
const BYTE_ORDER_MARK: char = '\u{feff}';

/// One channel of a parsed file: the header and the raw values in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: ChannelName,
    pub values: Vec<String>,
}

/// The raw contents of one log file, one column per channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub columns: Vec<Column>,
}

impl ParsedFile {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of data rows (the header is not counted)
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn column(&self, name: &ChannelName) -> Option<&Column> {
        self.columns.iter().find(|c| &c.name == name)
    }

    /// The column carrying the row timestamps, if any
    pub fn time_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.is_time())
    }
}

/// Repairs for known malformations of the logger output.
///
/// The header row (row 0) is never removed by a repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairRule {
    /// The first data row is dropped if it has a blank field (a broken duplicate header)
    DropBlankSecondRow,
    /// The final row is dropped if it has a blank field
    DropBlankLastRow,
    /// The final row is dropped if its length differs from the row before it (truncated write)
    DropTruncatedLastRow,
}

/// The repairs applied by the RecordParser, in order
pub const DEFAULT_REPAIR_RULES: [RepairRule; 3] = [
    RepairRule::DropBlankSecondRow,
    RepairRule::DropBlankLastRow,
    RepairRule::DropTruncatedLastRow,
];

impl RepairRule {
    /// Apply the rule. Returns true if a row was dropped.
    pub fn apply(&self, rows: &mut Vec<Vec<String>>) -> bool {
        if rows.len() < 2 {
            return false;
        }
        let last = rows.len() - 1;
        let should_drop = match self {
            Self::DropBlankSecondRow => rows[1].iter().any(|f| f.is_empty()),
            Self::DropBlankLastRow => rows[last].iter().any(|f| f.is_empty()),
            Self::DropTruncatedLastRow => rows[last].len() != rows[last - 1].len(),
        };
        if !should_drop {
            return false;
        }
        match self {
            Self::DropBlankSecondRow => rows.remove(1),
            Self::DropBlankLastRow | Self::DropTruncatedLastRow => rows.remove(last),
        };
        true
    }
}

impl fmt::Display for RepairRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropBlankSecondRow => write!(f, "drop blank second row"),
            Self::DropBlankLastRow => write!(f, "drop blank last row"),
            Self::DropTruncatedLastRow => write!(f, "drop truncated last row"),
        }
    }
}

/// Replace decimal commas with periods throughout the file.
///
/// The whole file is treated as comma-decimal if the first data line contains a comma.
/// Nothing is done when the comma is the field delimiter. Returns true if lines were changed.
pub fn normalize_decimal_separator(lines: &mut [String], delimiter: char) -> bool {
    if delimiter == ',' {
        return false;
    }
    match lines.get(1) {
        Some(line) if line.contains(',') => (),
        _ => return false,
    }
    for line in lines.iter_mut() {
        *line = line.replace(',', ".");
    }
    true
}

/// RecordParser turns the text of a log file into columns of raw values.
#[derive(Debug, Clone)]
pub struct RecordParser {
    delimiter: char,
    rules: Vec<RepairRule>,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl RecordParser {
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            rules: DEFAULT_REPAIR_RULES.to_vec(),
        }
    }

    pub fn read_file(&self, path: &Path) -> Result<ParsedFile, ParserError> {
        let text = std::fs::read_to_string(path)?;
        self.parse(&text)
    }

    /// Parse the text of a log file. Empty text gives an empty ParsedFile.
    pub fn parse(&self, text: &str) -> Result<ParsedFile, ParserError> {
        let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        if lines.is_empty() {
            return Ok(ParsedFile::default());
        }

        if normalize_decimal_separator(&mut lines, self.delimiter) {
            log::debug!("Normalized decimal commas");
        }

        let mut rows: Vec<Vec<String>> = lines
            .iter()
            .map(|line| {
                line.trim()
                    .split(self.delimiter)
                    .map(|field| field.trim().to_string())
                    .collect()
            })
            .collect();

        for rule in self.rules.iter() {
            if rule.apply(&mut rows) {
                log::debug!("Applied repair: {rule}");
            }
        }

        Self::transpose(rows)
    }

    /// Turn rows into columns, the header field of each row becoming the channel name
    fn transpose(mut rows: Vec<Vec<String>>) -> Result<ParsedFile, ParserError> {
        let expected = rows[0].len();
        if let Some(bad) = first_irregular_row(&rows) {
            if bad == rows.len() - 1 {
                log::debug!("Dropped irregular trailing row {bad}");
                rows.pop();
            }
        }
        if let Some(bad) = first_irregular_row(&rows) {
            return Err(ParserError::MalformedFile {
                row: bad,
                found: rows[bad].len(),
                expected,
            });
        }

        let mut row_iter = rows.into_iter();
        let header = row_iter.next().unwrap_or_default();
        let mut columns = Vec::with_capacity(header.len());
        for field in header {
            let name = ChannelName::new(&field);
            name.header()?;
            columns.push(Column {
                name,
                values: Vec::new(),
            });
        }
        for row in row_iter {
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Ok(ParsedFile { columns })
    }
}

fn first_irregular_row(rows: &[Vec<String>]) -> Option<usize> {
    let expected = rows.first()?.len();
    rows.iter().position(|row| row.len() != expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&str]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|l| l.split(';').map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_decimal_comma() {
        let parser = RecordParser::new(';');
        let file = parser
            .parse("Time;pH (pH)\n2024-01-01 00:00:00:000000;1,23\n")
            .unwrap();
        assert_eq!(file.row_count(), 1);
        let ph = file.column(&ChannelName::new("pH (pH)")).unwrap();
        assert_eq!(ph.values, vec!["1.23".to_string()]);
        assert_eq!(ph.values[0].parse::<f64>().unwrap(), 1.23);
    }

    #[test]
    fn test_decimal_comma_only_checks_second_line() {
        let mut lines = vec![
            "Time;pH (pH)".to_string(),
            "2024-01-01 00:00:00:000000;1.5".to_string(),
            "2024-01-01 00:00:01:000000;1,5".to_string(),
        ];
        assert!(!normalize_decimal_separator(&mut lines, ';'));
        assert_eq!(lines[2], "2024-01-01 00:00:01:000000;1,5");

        let mut lines = vec!["a,b".to_string(), "1,2".to_string()];
        assert!(!normalize_decimal_separator(&mut lines, ','));
    }

    #[test]
    fn test_repair_rules() {
        let mut r = rows(&["Nr;Time", ";", "1;a", "2;b"]);
        assert!(RepairRule::DropBlankSecondRow.apply(&mut r));
        assert_eq!(r.len(), 3);
        assert!(!RepairRule::DropBlankSecondRow.apply(&mut r));

        let mut r = rows(&["Nr;Time", "1;a", "2;"]);
        assert!(RepairRule::DropBlankLastRow.apply(&mut r));
        assert_eq!(r, rows(&["Nr;Time", "1;a"]));

        let mut r = rows(&["Nr;Time", "1;a", "2"]);
        assert!(RepairRule::DropTruncatedLastRow.apply(&mut r));
        assert_eq!(r.len(), 2);

        let mut header_only = rows(&["Nr;"]);
        assert!(!RepairRule::DropBlankLastRow.apply(&mut header_only));
        assert_eq!(header_only.len(), 1);
    }

    #[test]
    fn test_parse_repairs_in_order() {
        let text = "Nr;Time;Redox (mV)\n\
                    ;;\n\
                    1;2024-01-01 00:00:00:000000;10\n\
                    2;2024-01-01 00:00:01:000000;11\n\
                    3;2024-01-01 00:00:02:000000\n";
        let file = RecordParser::default().parse(text).unwrap();
        assert_eq!(file.columns.len(), 3);
        assert_eq!(file.row_count(), 2);
        assert_eq!(
            file.time_column().unwrap().values,
            vec![
                "2024-01-01 00:00:00:000000".to_string(),
                "2024-01-01 00:00:01:000000".to_string()
            ]
        );
    }

    #[test]
    fn test_irregular_middle_row_is_malformed() {
        let text = "Nr;Time\n1;a\n2\n3;c\n4;d\n";
        match RecordParser::default().parse(text) {
            Err(ParserError::MalformedFile { row, found, expected }) => {
                assert_eq!((row, found, expected), (2, 1, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_irregular_trailing_row_dropped_after_repairs() {
        let text = "Nr;Time;pH (pH)\n1;a;7\n2;b;7\n3;c\n4\n";
        let file = RecordParser::default().parse(text).unwrap();
        assert_eq!(file.columns.len(), 3);
        assert_eq!(file.row_count(), 2);
        assert_eq!(
            file.column(&ChannelName::new("Nr")).unwrap().values,
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        let text = "\u{feff}Time;pH (pH)\n2024-01-01 00:00:00:000000;7\n";
        let file = RecordParser::default().parse(text).unwrap();
        assert_eq!(file.columns[0].name, ChannelName::new("Time"));
        assert!(file.time_column().is_some());
    }

    #[test]
    fn test_empty_and_header_only() {
        let parser = RecordParser::default();
        assert!(parser.parse("").unwrap().is_empty());
        let file = parser.parse("Nr;Time\n").unwrap();
        assert_eq!(file.columns.len(), 2);
        assert_eq!(file.row_count(), 0);
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(
            RecordParser::default().parse("Nr;Level (m\n1;2\n"),
            Err(ParserError::BadHeader(_))
        ));
    }
}
