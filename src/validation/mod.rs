//! The SQL safety gate.
//!
//! Every piece of caller text that reaches MySQL passes through this module:
//! identifiers are quoted by [`quote`], whole statements are checked by
//! [`validate_combined`], and fragments spliced into fixed templates are
//! checked by [`validate_select_columns`] and [`validate_where`].
//!
//! All validators are pure functions over `&str`. They perform no I/O and
//! keep no state between calls.

pub mod fragment;
pub mod identifier;
pub mod lexical;
pub mod literal;
pub mod parser;

pub use fragment::{MAX_WHERE_LENGTH, validate_select_columns, validate_where};
pub use identifier::{MAX_IDENTIFIER_LENGTH, quote, quote_qualified, validate_identifier};
pub use lexical::{READ_ONLY_PREFIXES, validate_sql};
pub use literal::strip_literals;
pub use parser::{
    DANGEROUS_FUNCTIONS, FORBIDDEN_SCHEMAS, StatementKind, validate_combined,
    validate_with_parser,
};
