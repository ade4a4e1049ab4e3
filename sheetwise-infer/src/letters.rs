/// Convert a zero-based column index to base-26 letters (0 -> A, 25 -> Z, 26 -> AA).
pub fn index_to_letter(index: usize) -> String {
    let mut result = String::new();
    let mut n = index;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Convert base-26 column letters back to a zero-based index.
///
/// Accepts lower or upper case. Returns `None` for empty input, non-letters, or values
/// that would overflow `usize`.
pub fn letter_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    let mut acc: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    Some(acc - 1)
}

/// Build an A1 range covering `columns` columns starting at `first_row` (1-based).
///
/// `last_row = None` yields an open-ended range such as `A5:F`.
pub fn a1_range(
    sheet: Option<&str>,
    columns: usize,
    first_row: usize,
    last_row: Option<usize>,
) -> String {
    a1_block(sheet, 0, columns, first_row, last_row)
}

/// Like [`a1_range`], starting at the 0-based column `first_col`.
pub fn a1_block(
    sheet: Option<&str>,
    first_col: usize,
    columns: usize,
    first_row: usize,
    last_row: Option<usize>,
) -> String {
    let start_col = index_to_letter(first_col);
    let last_col = index_to_letter(first_col + columns.max(1) - 1);
    let cells = match last_row {
        Some(last) => format!("{start_col}{first_row}:{last_col}{last}"),
        None => format!("{start_col}{first_row}:{last_col}"),
    };
    match sheet {
        Some(name) => format!("{}!{cells}", quote_sheet_name(name)),
        None => cells,
    }
}

/// Quote a tab title for use in an A1 range (`My Tab` -> `'My Tab'`).
pub fn quote_sheet_name(name: &str) -> String {
    let simple = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple && !name.is_empty() {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
