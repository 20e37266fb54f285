mod browser;
mod error;
mod page;

pub mod prelude {
    pub use crate::browser::InstrumentedBrowser;
    pub use crate::error::handle_cdp_err;
    pub use crate::page::InstrumentedPage;
}
