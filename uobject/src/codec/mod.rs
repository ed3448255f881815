//! Conversions between the canonical [`Table`](crate::Table) and its external
//! representations. Codecs are pure; the container decides when they run.

pub mod delimited;
pub mod keymap;

pub use self::delimited::DelimitedOptions;
pub use self::keymap::KeyMap;
