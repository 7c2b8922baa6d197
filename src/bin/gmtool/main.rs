//! gmtool: list, dump and render the contents of GM1 archives.

mod render;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::debug;

use gm1::{data_class_name, Color, EntryHeader, Error, Header, OpenFlags, Reader, Result, ARGB8888};

#[derive(Parser)]
#[command(name = "gmtool", version, about = "Inspect and render GM1 sprite archives")]
struct Cli {
    /// Narrate what the tool is doing.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Reject archives whose size category disagrees with their declared
    /// dimensions.
    #[arg(long, global = true)]
    check_size_category: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tabulate every entry header of an archive.
    List { file: PathBuf },

    /// Dump the archive header.
    Header {
        file: PathBuf,

        /// Emit the raw 88 header bytes instead of text.
        #[arg(long)]
        binary: bool,

        /// Print only the image count.
        #[arg(long)]
        count: bool,

        /// Print only the encoding.
        #[arg(long)]
        encoding: bool,
    },

    /// Dump one entry header.
    Entry {
        file: PathBuf,
        index: usize,

        /// Emit the raw 16 entry bytes instead of text.
        #[arg(long)]
        binary: bool,
    },

    /// Decode one entry and render it into an image container.
    Render {
        file: PathBuf,

        /// Entry index to decode.
        #[arg(short, long)]
        index: usize,

        /// Palette index for 8-bit entries.
        #[arg(short, long, default_value_t = 0)]
        palette: usize,

        /// Output format name.
        #[arg(short, long, default_value = "bmp")]
        format: String,

        /// Output image filename.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Background color in #AARRGGBB notation.
        #[arg(long, default_value = "#FFFF00FF")]
        transparent: Color,

        /// Print the size of the resulting image in bytes instead of
        /// writing it.
        #[arg(long)]
        approximate_size: bool,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(1),
            };
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .format_timestamp(None)
    .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gmtool: {err}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn exit_code(err: &Error) -> u8 {
    match err {
        Error::InvalidArgument(_) => 1,
        Error::Io(_) | Error::ResourceExhausted(_) => 2,
        Error::UnexpectedEof | Error::MalformedStream(_) | Error::FormatMismatch(_) => 3,
        Error::IndexOutOfRange { .. } => 4,
    }
}

fn open(file: &Path, cli_flags: OpenFlags) -> Result<Reader> {
    debug!("reading file {}", file.display());
    let reader = Reader::from_file_with_flags(file, cli_flags)?;
    debug!("collection contains {} entries", reader.num_entries());
    Ok(reader)
}

fn run(cli: Cli) -> Result<()> {
    let flags = OpenFlags {
        check_size_category: cli.check_size_category,
    };

    match cli.command {
        Command::List { file } => {
            let reader = open(&file, flags)?;
            print_entry_list(&mut io::stdout().lock(), &reader)?;
        }
        Command::Header {
            file,
            binary,
            count,
            encoding,
        } => {
            let reader = open(&file, flags)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if binary {
                reader.header().write(&mut out)?;
            } else if count {
                writeln!(out, "{}", reader.header().image_count())?;
            } else if encoding {
                writeln!(out, "{}", reader.encoding())?;
            } else {
                print_header(&mut out, reader.header())?;
            }
        }
        Command::Entry { file, index, binary } => {
            let reader = open(&file, flags)?;
            let header = reader.entry_header(index)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if binary {
                header.write(&mut out)?;
            } else {
                print_entry_header(&mut out, header)?;
            }
        }
        Command::Render {
            file,
            index,
            palette,
            format,
            output,
            transparent,
            approximate_size,
        } => {
            let mut reader = open(&file, flags)?;
            reader.set_transparent_color(transparent);

            let palette = reader.palette(palette)?.clone();
            let mut entry = reader.read_entry(index)?;
            if entry.format().indexed() {
                debug!("attaching palette");
                entry.attach_palette(palette);
            }

            debug!("converting to the output format");
            let mut converted = entry.convert_to(ARGB8888)?;
            converted.set_color_key(transparent);

            let renderer = render::formats()
                .into_iter()
                .find(|f| f.name() == format)
                .ok_or(Error::InvalidArgument("no render format with that name"))?;

            if approximate_size {
                let bytes = renderer.render(&mut io::sink(), &converted)?;
                println!("{bytes}");
            } else {
                let output = output.ok_or(Error::InvalidArgument(
                    "--output is required unless --approximate-size is given",
                ))?;
                debug!("rendering to {}", output.display());
                let mut out = io::BufWriter::new(File::create(output)?);
                renderer.render(&mut out, &converted)?;
                out.flush()?;
            }
        }
    }

    Ok(())
}

const LIST_COLUMNS: [(&str, bool); 12] = [
    ("#", true),
    ("Width", true),
    ("Height", true),
    ("PosX", true),
    ("PosY", true),
    ("Group", true),
    ("GroupSize", true),
    ("TileY", true),
    ("Orientation", false),
    ("Offset", true),
    ("BoxWidth", true),
    ("Flags", false),
];

fn list_row(index: usize, header: &EntryHeader) -> [String; 12] {
    [
        index.to_string(),
        header.width.to_string(),
        header.height.to_string(),
        header.pos_x.to_string(),
        header.pos_y.to_string(),
        header.group.to_string(),
        header.group_size.to_string(),
        header.tile_y.to_string(),
        header.tile_orient.to_string(),
        header.h_offset.to_string(),
        header.box_width.to_string(),
        header.flags.to_string(),
    ]
}

fn print_entry_list<W: Write>(out: &mut W, reader: &Reader) -> Result<()> {
    let rows: Vec<[String; 12]> = (0..reader.num_entries())
        .map(|i| Ok(list_row(i, reader.entry_header(i)?)))
        .collect::<Result<_>>()?;

    let mut widths: Vec<usize> = LIST_COLUMNS.iter().map(|(name, _)| name.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header: Vec<&str> = LIST_COLUMNS.iter().map(|&(name, _)| name).collect();
    print_row(out, &header, &widths)?;
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        print_row(out, &cells, &widths)?;
    }
    Ok(())
}

fn print_row<W: Write>(out: &mut W, cells: &[&str], widths: &[usize]) -> Result<()> {
    for (i, (cell, width)) in cells.iter().zip(widths.iter().copied()).enumerate() {
        if i > 0 {
            write!(out, "  ")?;
        }
        if LIST_COLUMNS[i].1 {
            write!(out, "{cell:>width$}")?;
        } else {
            write!(out, "{cell:<width$}")?;
        }
    }
    writeln!(out)?;
    Ok(())
}

fn print_header<W: Write>(out: &mut W, header: &Header) -> Result<()> {
    for (i, &field) in header.fields().iter().enumerate() {
        if Header::field_name(i) == "dataClass" {
            writeln!(out, "dataClass: {}", data_class_name(field))?;
        } else {
            writeln!(out, "{}: {}", Header::field_name(i), field)?;
        }
    }
    Ok(())
}

fn print_entry_header<W: Write>(out: &mut W, header: &EntryHeader) -> Result<()> {
    writeln!(out, "Width: {}", header.width)?;
    writeln!(out, "Height: {}", header.height)?;
    writeln!(out, "PosX: {}", header.pos_x)?;
    writeln!(out, "PosY: {}", header.pos_y)?;
    writeln!(out, "Group: {}", header.group)?;
    writeln!(out, "GroupSize: {}", header.group_size)?;
    writeln!(out, "TileY: {}", header.tile_y)?;
    writeln!(out, "TileOrient: {}", header.tile_orient)?;
    writeln!(out, "Horiz Offset: {}", header.h_offset)?;
    writeln!(out, "Box Width: {}", header.box_width)?;
    writeln!(out, "Flags: {}", header.flags)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_error_taxonomy() {
        assert_eq!(exit_code(&Error::InvalidArgument("x")), 1);
        assert_eq!(exit_code(&Error::Io(io::Error::from(io::ErrorKind::NotFound))), 2);
        assert_eq!(exit_code(&Error::UnexpectedEof), 3);
        assert_eq!(exit_code(&Error::MalformedStream("x")), 3);
        assert_eq!(exit_code(&Error::FormatMismatch("x".into())), 3);
        assert_eq!(exit_code(&Error::IndexOutOfRange { index: 1, count: 0 }), 4);
    }

    #[test]
    fn list_aligns_columns() {
        let header = EntryHeader {
            width: 300,
            height: 4,
            ..EntryHeader::default()
        };
        let row = list_row(7, &header);
        assert_eq!(row[0], "7");
        assert_eq!(row[1], "300");
        assert_eq!(row[2], "4");
    }

    #[test]
    fn cli_parses_render_flags() {
        let cli = Cli::try_parse_from([
            "gmtool",
            "render",
            "file.gm1",
            "--index",
            "3",
            "--palette",
            "2",
            "--format",
            "tgx",
            "--transparent",
            "#80FF00FF",
            "--approximate-size",
        ])
        .unwrap();

        match cli.command {
            Command::Render {
                index,
                palette,
                format,
                transparent,
                approximate_size,
                ..
            } => {
                assert_eq!(index, 3);
                assert_eq!(palette, 2);
                assert_eq!(format, "tgx");
                assert_eq!(transparent, Color::rgba(255, 0, 255, 0x80));
                assert!(approximate_size);
            }
            _ => panic!("expected the render command"),
        }
    }
}
