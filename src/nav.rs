use std::io::Write;

use crate::page::Page;

/// Something that can send the user to a URL.
pub trait Navigator {
    fn navigate(&mut self, url: &str);
}

/// Terminal stand-in for the browser location: prints the target.
pub struct PrintNavigator<W> {
    out: W,
}

impl<W: Write> PrintNavigator<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Navigator for PrintNavigator<W> {
    fn navigate(&mut self, url: &str) {
        if let Err(e) = writeln!(self.out, "-> {}", url) {
            log::error!("error writing navigation target: {}", e);
        }
    }
}

/// Jump to the first entry on the page. Returns the target, or `None` when
/// nothing is shown and nothing happened.
pub fn activate<'a>(page: &'a Page, nav: &mut impl Navigator) -> Option<&'a str> {
    let target = page.first_target()?;
    log::info!("navigating to {}", target);
    nav.navigate(target);
    Some(target)
}
