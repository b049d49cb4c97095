//! Build a small archive from directive-style source and read it back.
//!
//! Run with:
//! ```text
//! cargo run --example build_archive
//! ```

use textvault_compiler::{BuildConfig, BuildSession, SourceKind};
use textvault_crypto::Obfuscator;
use textvault_formats::archive::{ArchiveReader, ArchiveWriter, write_symbol_table};

const SOURCE: &str = "\
!beginfile STORY
!begin ROOM_11
You are in a maze of twisty \\
little passages, all alike.
!end
!begin ROOM_12
A low corridor slopes downward.
!end
!endfile
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let dir = tempfile::tempdir()?;
    let archive_path = dir.path().join("story.tva");
    let index_path = dir.path().join("story.map");

    // Build.
    let cipher = Obfuscator::with_random_key(20);
    let writer = ArchiveWriter::create(&archive_path, cipher)?;
    let mut session = BuildSession::new(writer, BuildConfig::new("STORY"));
    session.consume_source("story.txt", SOURCE, SourceKind::Directive)?;
    let mut output = session.finish()?;

    for diagnostic in &output.diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    output
        .index
        .write_text(&mut std::fs::File::create(&index_path)?)?;

    let mut header = Vec::new();
    write_symbol_table(&mut header, &mut output.index, "story")?;
    println!("--- story.h ---\n{}", String::from_utf8(header)?);

    // Read back.
    let mut reader = ArchiveReader::open(&archive_path, &index_path)?;
    for token in 0..reader.count() {
        let name = reader.name_of(token).unwrap_or("?").to_string();
        println!("--- {name} (token {token}) ---\n{}", reader.get(token)?);
    }

    Ok(())
}
