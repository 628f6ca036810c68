pub mod memory;
pub mod prismic;

pub use memory::MemoryCms;
pub use prismic::PrismicClient;
