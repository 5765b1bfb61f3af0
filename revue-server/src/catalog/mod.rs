pub mod term_handlers;
pub mod title_handlers;
