use unicode_width::UnicodeWidthStr;

pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub header_padding: f64,
    /// Space between a row's name and its label.
    pub column_gap: f64,
    pub min_node_width: f64,
    pub min_node_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 20.0,
            padding_x: 12.0,
            padding_y: 8.0,
            header_padding: 4.0,
            column_gap: 24.0,
            min_node_width: 100.0,
            min_node_height: 36.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    pub fn header_height(&self) -> f64 {
        self.line_height + self.header_padding * 2.0
    }

    /// Vertical center of row `index`, relative to the node's top.
    pub fn row_center(&self, index: usize) -> f64 {
        self.header_height() + self.padding_y + (index as f64 + 0.5) * self.line_height
    }

    /// Size of a table node with a title and `(name, label)` rows.
    pub fn node_size(&self, title: &str, rows: &[(&str, &str)]) -> (f64, f64) {
        let header_width = self.text_width(title);

        let max_row_width = rows
            .iter()
            .map(|(name, label)| {
                let gap = if label.is_empty() { 0.0 } else { self.column_gap };
                self.text_width(name) + gap + self.text_width(label)
            })
            .fold(0.0, f64::max);

        let content_width = header_width.max(max_row_width) + self.padding_x * 2.0;
        let width = content_width.max(self.min_node_width);

        let body_height = if rows.is_empty() {
            0.0
        } else {
            rows.len() as f64 * self.line_height + self.padding_y * 2.0
        };

        let height = (self.header_height() + body_height).max(self.min_node_height);

        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_width() {
        let m = TextMetrics::default();
        assert_eq!(m.text_width("users"), 5.0 * 8.0);
    }

    #[test]
    fn test_unicode_width() {
        let m = TextMetrics::default();
        // Full-width characters count double
        assert_eq!(m.text_width("ユーザー"), 8.0 * 8.0);
    }

    #[test]
    fn test_node_size_no_rows() {
        let m = TextMetrics::default();
        let (w, h) = m.node_size("users", &[]);
        assert_eq!(w, m.min_node_width);
        assert_eq!(h, m.min_node_height);
    }

    #[test]
    fn test_node_size_grows_with_rows() {
        let m = TextMetrics::default();
        let rows = [("id", "INT (PK)"), ("description", "VARCHAR(255) NULL")];
        let (w, h) = m.node_size("posts", &rows);

        let widest = m.text_width("description") + m.column_gap + m.text_width("VARCHAR(255) NULL");
        assert_eq!(w, widest + m.padding_x * 2.0);
        assert_eq!(h, m.header_height() + 2.0 * m.line_height + m.padding_y * 2.0);
    }

    #[test]
    fn test_row_center() {
        let m = TextMetrics::default();
        assert_eq!(m.row_center(0), m.header_height() + m.padding_y + m.line_height / 2.0);
        assert_eq!(m.row_center(1) - m.row_center(0), m.line_height);
    }
}
