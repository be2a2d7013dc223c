//! Plain-text console renderer.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::rc::Rc;

use crate::io_adapters::MemWriter;

/// Tabular data rendered by [`Console::print_table`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub title: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: None,
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Render as left-aligned columns separated by two spaces.
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| width(c)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(width(cell)),
                    None => widths.push(width(cell)),
                }
            }
        }

        let line = |cells: &[String]| {
            let mut out = String::new();
            for (i, w) in widths.iter().enumerate() {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let _ = write!(out, "{cell}{}  ", " ".repeat(w - width(cell)));
            }
            out.trim_end().to_string()
        };

        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push('\n');
        }
        out.push_str(&line(&self.columns));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&line(&rule));
        for row in &self.rows {
            out.push('\n');
            out.push_str(&line(row));
        }
        out
    }
}

fn width(text: &str) -> usize {
    text.chars().count()
}

/// Writes rendered text to a sink (stdout in production, memory in tests).
pub struct Console {
    out: Box<dyn Write>,
}

impl Console {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// A console writing into memory, plus the handle to read it back.
    pub fn capture() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let (writer, handle) = MemWriter::with_handle();
        (Self::new(Box::new(writer)), handle)
    }

    pub fn print(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn br(&mut self, lines: usize) -> io::Result<()> {
        write!(self.out, "{}", "\n".repeat(lines))?;
        self.out.flush()
    }

    /// Boxed, padded text with an optional title in the top border.
    pub fn print_panel(&mut self, title: &str, content: &str) -> io::Result<()> {
        let lines: Vec<&str> = content.lines().collect();
        let inner = lines
            .iter()
            .map(|l| width(l))
            .max()
            .unwrap_or(0)
            .max(width(title) + 2);

        let mut out = String::new();
        if title.is_empty() {
            let _ = writeln!(out, "╭{}╮", "─".repeat(inner + 2));
        } else {
            let _ = writeln!(out, "╭─ {title} {}╮", "─".repeat(inner - width(title) - 1));
        }
        let _ = writeln!(out, "│{}│", " ".repeat(inner + 2));
        for line in lines {
            let _ = writeln!(out, "│ {line}{} │", " ".repeat(inner - width(line)));
        }
        let _ = writeln!(out, "│{}│", " ".repeat(inner + 2));
        let _ = write!(out, "╰{}╯", "─".repeat(inner + 2));
        self.print(&out)
    }

    /// Numbered list, one item per line.
    pub fn print_list<S: AsRef<str>>(
        &mut self,
        title: Option<&str>,
        items: &[S],
    ) -> io::Result<()> {
        let mut out = String::new();
        if let Some(title) = title {
            out.push_str(title);
            out.push('\n');
        }
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = write!(out, "{}. {}", i + 1, item.as_ref());
        }
        self.print(&out)
    }

    pub fn print_table(&mut self, table: &Table) -> io::Result<()> {
        self.print(&table.render())
    }

    pub fn clear(&mut self) -> io::Result<()> {
        write!(self.out, "\x1b[2J\x1b[H")?;
        self.out.flush()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::collected;

    #[test]
    fn table_aligns_columns() {
        let mut table = Table::new(["Command", "Description"]).title("Available Commands");
        table.row(["hello", "Say hello"]);
        table.row(["x", ""]);
        assert_eq!(
            table.render(),
            "Available Commands\n\
             Command  Description\n\
             -------  -----------\n\
             hello    Say hello\n\
             x"
        );
    }

    #[test]
    fn panel_is_boxed() {
        let (mut console, handle) = Console::capture();
        console.print_panel("demo", "hi").unwrap();
        let text = collected(&handle);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "╭─ demo ─╮");
        assert_eq!(lines[2], "│ hi     │");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn list_is_numbered() {
        let (mut console, handle) = Console::capture();
        console.print_list(None, &["a", "b"]).unwrap();
        assert_eq!(collected(&handle), "1. a\n2. b\n");
    }
}
