// json_io.rs (CLI only)
use phrase_large_table::PhraseBitmapIndex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One index record with its key rendered as text, for diffable dumps.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordSerde {
    pub phrase: String,
    pub code_points: Vec<u32>,
    pub token: String,
    pub library: usize,
}

pub fn write_reference_json(
    index: &PhraseBitmapIndex,
    path: impl AsRef<Path>,
    pretty: bool,
) -> io::Result<()> {
    let dto: Vec<RecordSerde> = index
        .records()
        .into_iter()
        .map(|(code_points, token)| RecordSerde {
            // invalid scalars are shown as U+FFFD; code_points keeps the exact key
            phrase: code_points
                .iter()
                .map(|&c| char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
            code_points,
            token: format!("{:#010x}", token),
            library: phrase_large_table::library_of(token),
        })
        .collect();

    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(&mut w, &dto).map_err(to_io)?;
    } else {
        serde_json::to_writer(&mut w, &dto).map_err(to_io)?;
        // newline for POSIX-y tools
        w.write_all(b"\n")?;
    }
    w.flush()
}

// Small adapter so we can stay in io::Result
fn to_io<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}
