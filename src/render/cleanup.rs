//! Removal of structurally empty table markup.

use std::sync::LazyLock;

use regex::Regex;

/// A row holding nothing, or only cells with no content.
static EMPTY_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<tr[^>]*>\s*(?:<td[^>]*>\s*</td>\s*)*</tr>").expect("empty-row pattern is valid")
});

static EMPTY_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<table[^>]*>\s*</table>").expect("empty-table pattern is valid")
});

/// Strip empty rows and the tables they leave empty.
///
/// Runs to a fixed point, since removing an inner table can empty the cell
/// and row around it.
pub fn remove_empty_rows(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        let rows = EMPTY_ROW.replace_all(&current, "");
        let tables = EMPTY_TABLE.replace_all(&rows, "").into_owned();
        if tables == current {
            return current;
        }
        current = tables;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_row_is_removed() {
        assert_eq!(
            remove_empty_rows("<table><tr></tr><tr><td>A</td></tr></table>"),
            "<table><tr><td>A</td></tr></table>"
        );
    }

    #[test]
    fn test_row_with_only_empty_cell_is_removed() {
        assert_eq!(
            remove_empty_rows("<table><tr><td align=\"left\"> </td></tr><tr><td>A</td></tr></table>"),
            "<table><tr><td>A</td></tr></table>"
        );
    }

    #[test]
    fn test_nested_empties_collapse_completely() {
        let html = "<table width=\"600\"><tr><td><table><tr><td></td></tr></table></td></tr></table>";
        assert_eq!(remove_empty_rows(html), "");
    }

    #[test]
    fn test_spacer_rows_survive() {
        let html = "<table><tr><td height=\"8\">&nbsp;</td></tr></table>";
        assert_eq!(remove_empty_rows(html), html);
    }
}
