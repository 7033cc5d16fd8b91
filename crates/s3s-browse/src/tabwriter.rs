//! Elastic tabstop alignment
//!
//! Rows are sequences of cells. Every cell except the last one of a row is terminated and takes
//! part in column alignment. Consecutive rows sharing a terminated cell in the same column form a
//! column block; the block is as wide as its widest cell plus padding. The trailing cell of a row
//! is written as is.
//!
//! A cell may carry a decorated rendering (such as markup around the text). Widths are always
//! computed from the plain text, so decorations never disturb alignment.
//!
//! # Example
//! ```
//! use s3s_browse::tabwriter::TabWriter;
//!
//! let mut tw = TabWriter::new(0, 1, ' ');
//! tw.push_row(["a", "1"]);
//! tw.push_row(["bbb", "2"]);
//! assert_eq!(tw.finish(), "a   1\nbbb 2\n");
//! ```

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    text: String,
    width: usize,
    display: Option<String>,
}

impl Cell {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let width = text.chars().count();
        Self {
            text,
            width,
            display: None,
        }
    }

    /// Renders `display` in place of the text, keeping the text's width.
    #[must_use]
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    fn rendered(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.text)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone)]
pub struct TabWriter {
    min_width: usize,
    padding: usize,
    pad_char: char,
    lines: Vec<Vec<Cell>>,
}

impl TabWriter {
    #[must_use]
    pub fn new(min_width: usize, padding: usize, pad_char: char) -> Self {
        Self {
            min_width,
            padding,
            pad_char,
            lines: Vec::new(),
        }
    }

    pub fn push_row<I>(&mut self, cells: I)
    where
        I: IntoIterator,
        I::Item: Into<Cell>,
    {
        self.lines.push(cells.into_iter().map(Into::into).collect());
    }

    /// Formats all rows, each terminated by a newline.
    #[must_use]
    pub fn finish(self) -> String {
        let mut out = String::new();
        let mut widths = Vec::new();
        self.format(&mut out, &mut widths, 0, self.lines.len());
        out
    }

    fn format(&self, out: &mut String, widths: &mut Vec<usize>, mut line0: usize, line1: usize) {
        let column = widths.len();
        let mut this = line0;
        while this < line1 {
            if column + 1 >= self.lines[this].len() {
                this += 1;
                continue;
            }

            // rows before the block belong to the enclosing columns only
            self.write_lines(out, widths, line0, this);
            line0 = this;

            let mut width = self.min_width;
            while this < line1 {
                let line = &self.lines[this];
                if column + 1 >= line.len() {
                    break;
                }
                width = width.max(line[column].width + self.padding);
                this += 1;
            }

            widths.push(width);
            self.format(out, widths, line0, this);
            widths.pop();
            line0 = this;
        }
        self.write_lines(out, widths, line0, line1);
    }

    fn write_lines(&self, out: &mut String, widths: &[usize], line0: usize, line1: usize) {
        for line in &self.lines[line0..line1] {
            for (j, cell) in line.iter().enumerate() {
                out.push_str(cell.rendered());
                if let Some(&w) = widths.get(j) {
                    out.extend(std::iter::repeat_n(self.pad_char, w.saturating_sub(cell.width)));
                }
            }
            out.push('\n');
        }
    }
}
