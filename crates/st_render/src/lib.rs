pub mod pages;
pub mod richtext;
pub mod sanitize;

pub use pages::PageRenderer;
pub use richtext::{PrismicHtmlRenderer, RichTextRenderer};
pub use sanitize::Sanitizer;

pub mod prelude {
    pub use super::{PageRenderer, PrismicHtmlRenderer, RichTextRenderer, Sanitizer};
}
