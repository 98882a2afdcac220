use std::io::Write;

use serde::Serialize;

use crate::render::{Entry, InputState, RenderedList};

/// The result surface: the search input, the results container underneath
/// it and the optional status and error lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    pub word: String,
    /// Input foreground color. `None` is the neutral placeholder state.
    pub color: Option<String>,
    pub entries: Vec<Entry>,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl Page {
    /// Replace the results with a freshly rendered list.
    pub fn show(&mut self, list: RenderedList, exists_color: &str, not_exists_color: &str) {
        let color = match list.input {
            InputState::Exists => exists_color,
            InputState::Missing => not_exists_color,
        };
        self.color = Some(color.to_string());
        self.entries = list.entries;
        self.status = list.status;
        self.error = None;
    }

    /// Reset to the empty placeholder state. The input value is kept.
    pub fn clear(&mut self) {
        self.color = None;
        self.entries.clear();
        self.status = None;
        self.error = None;
    }

    /// Flag a failed query, leaving the previous results in place.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Target of the top entry, if anything is shown.
    pub fn first_target(&self) -> Option<&str> {
        self.entries.first().map(|e| e.href.as_str())
    }

    /// HTML markup for the page, rendered with the `results.html` template.
    pub fn markup(&self, tpl: &tera::Tera) -> Result<String, tera::Error> {
        let ctx = tera::Context::from_serialize(self)?;
        tpl.render("results.html", &ctx)
    }
}

/// Presents the page whenever it changes.
pub trait View {
    fn refresh(&mut self, page: &Page);
}

impl<V: View + ?Sized> View for Box<V> {
    fn refresh(&mut self, page: &Page) {
        (**self).refresh(page)
    }
}

/// Plain text view for terminals.
pub struct TextView<W> {
    out: W,
}

impl<W: Write> TextView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write(&mut self, page: &Page) -> std::io::Result<()> {
        let mark = match &page.color {
            Some(c) => format!(" [{}]", c),
            None => String::new(),
        };
        writeln!(self.out, "> {}{}", page.word, mark)?;

        for (n, e) in page.entries.iter().enumerate() {
            writeln!(self.out, "{:>3}. {} ({})  {}", n + 1, e.label, e.index, e.href)?;
        }
        if let Some(status) = &page.status {
            writeln!(self.out, "     {}", status)?;
        }
        if let Some(error) = &page.error {
            writeln!(self.out, "     error: {}", error)?;
        }
        self.out.flush()
    }
}

impl<W: Write> View for TextView<W> {
    fn refresh(&mut self, page: &Page) {
        if let Err(e) = self.write(page) {
            log::error!("error writing page: {}", e);
        }
    }
}

/// HTML view: prints the rendered markup of the page.
pub struct HtmlView<W> {
    tpl: tera::Tera,
    out: W,
}

impl<W: Write> HtmlView<W> {
    pub fn new(tpl: tera::Tera, out: W) -> Self {
        Self { tpl, out }
    }
}

impl<W: Write> View for HtmlView<W> {
    fn refresh(&mut self, page: &Page) {
        let html = match page.markup(&self.tpl) {
            Ok(h) => h,
            Err(e) => {
                log::error!("error rendering page: {}", e);
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{}", html).and_then(|_| self.out.flush()) {
            log::error!("error writing page: {}", e);
        }
    }
}
