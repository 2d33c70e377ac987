mod json_io;

use crate::json_io::write_reference_json;
use clap::{Arg, ArgAction, Command};
use phrase_large_table::{library_of, PhraseLargeTable, PhraseTokens};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    const BLUE: &str = "\x1B[1;34m"; // Bold Blue
    const RESET: &str = "\x1B[0m"; // Reset color

    let matches = Command::new("Phrase Table Generator")
        .about(format!(
            "{BLUE}Table Generator: builds phrase index images from text dictionaries{RESET}"
        ))
        .after_help(
            "Examples:\n\
         \n\
         table-generate --input phrases.txt --output phrase_table.zstd\n\
         table-generate --input phrases.txt --dump-json phrases.json --pretty\n\
         table-generate --table phrase_table.zstd --lookup 你好\n\
         \n\
         Input lines are `phrase token`; token is decimal or 0x-prefixed hex.\n\
         The generated image can be loaded with PhraseLargeTable::load_compressed().\n",
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("filename")
                .help("Text dictionary to import"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("filename")
                .help("Write the compressed table image to <filename>"),
        )
        .arg(
            Arg::new("table")
                .short('t')
                .long("table")
                .value_name("filename")
                .conflicts_with("input")
                .help("Load an existing compressed table image instead of a text dictionary"),
        )
        .arg(
            Arg::new("lookup")
                .short('l')
                .long("lookup")
                .value_name("phrase")
                .action(ArgAction::Append)
                .help("Search the table for <phrase> and print its tokens (repeatable)"),
        )
        .arg(
            Arg::new("dump-json")
                .long("dump-json")
                .value_name("filename")
                .help("Write every record to <filename> as JSON"),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .action(ArgAction::SetTrue)
                .help("Pretty-print JSON when --dump-json is given"),
        )
        .get_matches();

    let table = match (
        matches.get_one::<String>("input"),
        matches.get_one::<String>("table"),
    ) {
        (Some(input), _) => {
            if !Path::new(input).exists() {
                eprintln!("{BLUE}Input dictionary not found: {input}{RESET}");
                return Ok(()); // Exit silently
            }
            let mut table = PhraseLargeTable::new();
            let added = table.load_text_file(input)?;
            eprintln!("{BLUE}Imported {added} entries from: {input}{RESET}");
            table
        }
        (None, Some(image)) => PhraseLargeTable::load_compressed(image)?,
        (None, None) => {
            eprintln!("{BLUE}Nothing to do: pass --input <dictionary> or --table <image>.{RESET}");
            return Ok(());
        }
    };

    if let Some(output_file) = matches.get_one::<String>("output") {
        table.save_compressed(output_file)?;
        eprintln!(
            "{BLUE}Table with {} records saved in ZSTD format at: {output_file}{RESET}",
            table.len()
        );
    }

    if let Some(json_file) = matches.get_one::<String>("dump-json") {
        let pretty_json = matches.get_flag("pretty");
        write_reference_json(table.index(), json_file, pretty_json)?;
        let style = if pretty_json { "pretty" } else { "compact" };
        eprintln!("{BLUE}Records saved in JSON ({style}) at: {json_file}{RESET}");
    }

    if let Some(phrases) = matches.get_many::<String>("lookup") {
        for phrase in phrases {
            let mut tokens = PhraseTokens::all_enabled();
            let flags = table.search(phrase, &mut tokens);
            let found: Vec<String> = tokens
                .iter()
                .map(|token| format!("{:#010x} (library {})", token, library_of(token)))
                .collect();
            println!(
                "{phrase}\tok={} continued={}\t{}",
                flags.is_ok(),
                flags.is_continued(),
                if found.is_empty() { "-".to_string() } else { found.join(", ") }
            );
        }
    }

    Ok(())
}
