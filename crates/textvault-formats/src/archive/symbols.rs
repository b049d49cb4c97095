//! Symbol table generation: a C header naming every block.
//!
//! The generated header gives client code compile-time names for blocks.
//! Each block yields a `T_<NAME>` macro. The full form carries both
//! bindings behind `#ifdef TEXTVAULT_TOKENS`: token numbers when the macro
//! is defined (binary index deployments), name strings otherwise (text
//! index deployments). The single form emits just one section.

use std::io::Write;

use crate::archive::constants::NAME_COLUMN_WIDTH;
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::index::BlockIndex;

/// Which binding a single-section symbol table emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolMode {
    /// `T_<NAME>` expands to the block's token number.
    Numeric,
    /// `T_<NAME>` expands to the block's name as a string literal.
    Named,
}

/// Write the dual-section symbol table for `family`.
///
/// The family name (uppercased) forms the include guard. Token numbers in
/// the numeric section are positions in the sorted index, so they agree
/// with both serialized index forms.
pub fn write_symbol_table<W: Write>(
    writer: &mut W,
    index: &mut BlockIndex,
    family: &str,
) -> ArchiveResult<()> {
    let names = collect_names(index)?;
    let guard = guard_name(family);

    writeln!(writer, "#ifndef {guard}")?;
    writeln!(writer, "#define {guard}")?;
    writeln!(writer)?;
    writeln!(writer, "#ifdef TEXTVAULT_TOKENS")?;
    write_section(writer, &names, SymbolMode::Numeric)?;
    writeln!(writer, "#else")?;
    write_section(writer, &names, SymbolMode::Named)?;
    writeln!(writer, "#endif")?;
    writeln!(writer)?;
    writeln!(writer, "#endif /* {guard} */")?;
    Ok(())
}

/// Write a single-section symbol table for `family` in one fixed mode.
pub fn write_symbol_table_single<W: Write>(
    writer: &mut W,
    index: &mut BlockIndex,
    family: &str,
    mode: SymbolMode,
) -> ArchiveResult<()> {
    let names = collect_names(index)?;
    let guard = guard_name(family);

    writeln!(writer, "#ifndef {guard}")?;
    writeln!(writer, "#define {guard}")?;
    writeln!(writer)?;
    write_section(writer, &names, mode)?;
    writeln!(writer)?;
    writeln!(writer, "#endif /* {guard} */")?;
    Ok(())
}

/// Names in token order. Sorts the index first if it is dirty.
fn collect_names(index: &mut BlockIndex) -> ArchiveResult<Vec<String>> {
    if !index.is_sorted() {
        index.sort();
    }
    if index.is_empty() {
        return Err(ArchiveError::InvalidBlockCount(0));
    }
    (0..index.len())
        .map(|token| {
            index.name_at(token).map(str::to_string).ok_or_else(|| {
                ArchiveError::InvalidFormat(
                    "symbol table requires named entries".to_string(),
                )
            })
        })
        .collect()
}

fn guard_name(family: &str) -> String {
    let mut guard = family.to_ascii_uppercase();
    guard.push_str("_H");
    guard
}

fn write_section<W: Write>(
    writer: &mut W,
    names: &[String],
    mode: SymbolMode,
) -> ArchiveResult<()> {
    for (token, name) in names.iter().enumerate() {
        let macro_name = format!("T_{name}");
        match mode {
            SymbolMode::Numeric => {
                writeln!(writer, "#define {macro_name:<NAME_COLUMN_WIDTH$} {token}")?;
            }
            SymbolMode::Named => {
                writeln!(writer, "#define {macro_name:<NAME_COLUMN_WIDTH$} \"{name}\"")?;
            }
        }
    }
    Ok(())
}
