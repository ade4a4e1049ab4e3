use regex::Regex;
use sheetwise_infer::letter_to_index;
use std::sync::LazyLock;

static CELLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z]{1,3}\d*|\d+)(?::(?:[A-Za-z]{1,3}\d*|\d+))?$")
        .expect("valid cells regex")
});

/// An A1 range split into its tab and cell parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: Option<String>,
    pub cells: Option<String>,
}

impl A1Range {
    /// `'My tab'!A1:B2`, `Sheet1!C:C`, `A1:B2` or a bare tab name.
    ///
    /// A bare token that reads as cells (`B2`, `A:C`) is taken as cells, anything else as a tab.
    pub fn parse(range: &str) -> Self {
        let range = range.trim();
        match range.rsplit_once('!') {
            Some((sheet, cells)) => Self {
                sheet: Some(unquote(sheet)),
                cells: Some(cells.to_string()),
            },
            None if CELLS.is_match(range) => Self {
                sheet: None,
                cells: Some(range.to_string()),
            },
            None => Self {
                sheet: Some(unquote(range)),
                cells: None,
            },
        }
    }

    /// 1-based row of the top-left cell; whole-column ranges start at row 1.
    pub fn first_row(&self) -> usize {
        self.cells
            .as_deref()
            .and_then(|cells| {
                let start = cells.split(':').next()?;
                start
                    .trim_start_matches(|c: char| c.is_ascii_alphabetic())
                    .parse()
                    .ok()
            })
            .filter(|row| *row > 0)
            .unwrap_or(1)
    }

    /// 0-based column of the top-left cell; whole-row ranges start at column A.
    pub fn first_column(&self) -> usize {
        self.cells
            .as_deref()
            .and_then(|cells| {
                let start = cells.split(':').next()?;
                let letters: String = start
                    .chars()
                    .take_while(char::is_ascii_alphabetic)
                    .collect();
                letter_to_index(&letters)
            })
            .unwrap_or(0)
    }
}

fn unquote(sheet: &str) -> String {
    sheet
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.replace("''", "'"))
        .unwrap_or_else(|| sheet.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_quoted_tabs_and_cells() {
        let r = A1Range::parse("'Bob''s tab'!B4:D9");
        assert_eq!(r.sheet.as_deref(), Some("Bob's tab"));
        assert_eq!(r.cells.as_deref(), Some("B4:D9"));
        assert_eq!(r.first_row(), 4);
        assert_eq!(r.first_column(), 1);
    }

    #[test]
    fn bare_tokens() {
        assert_eq!(A1Range::parse("A:C").first_row(), 1);
        assert_eq!(A1Range::parse("C12").first_row(), 12);
        assert_eq!(A1Range::parse("AA3:AC9").first_column(), 26);
        assert_eq!(A1Range::parse("2:5").first_column(), 0);
        let tab = A1Range::parse("Expenses");
        assert_eq!(tab.sheet.as_deref(), Some("Expenses"));
        assert_eq!(tab.cells, None);
    }
}
