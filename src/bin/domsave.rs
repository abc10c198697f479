//! Parse XML files and write them back through the serializer.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write, stdin, stdout},
    process::exit,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use const_format::concatcp;
use domsave::{
    parser::{ParserOptions, parse_reader_with},
    save::{DefaultProfile, PredefinedEntities, SaveOptions, Serializer, TableProfile},
};
use log::{LevelFilter, debug, error};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

const ABOUT: &str = concatcp!(
    "Parse the XML files and serialize them again.\n",
    env!("CARGO_PKG_NAME"),
    " ",
    env!("CARGO_PKG_VERSION")
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Predefined {
    Always,
    AsNeeded,
    Never,
}

impl From<Predefined> for PredefinedEntities {
    fn from(value: Predefined) -> Self {
        match value {
            Predefined::Always => PredefinedEntities::Always,
            Predefined::AsNeeded => PredefinedEntities::AsNeeded,
            Predefined::Never => PredefinedEntities::Never,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Profile {
    /// every element is a block
    Default,
    /// XHTML block, break and preserved elements
    Xhtml,
    /// no element is a block
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Newline {
    Lf,
    Crlf,
    Cr,
}

impl Newline {
    fn separator(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::Crlf => "\r\n",
            Newline::Cr => "\r",
        }
    }
}

#[derive(clap::Parser, Debug)]
#[command(version, name = "domsave", about = ABOUT, arg_required_else_help = true)]
struct CmdArgs {
    /// input files, `-` means the standard input
    #[clap(required = true)]
    xml_files: Vec<String>,
    /// pretty-print the output
    #[arg(long)]
    format: bool,
    /// the text written per indentation level
    #[arg(long, value_name = "str", default_value = "\t")]
    indent: String,
    /// output in the given encoding
    #[arg(long, value_name = "label", default_value = "UTF-8")]
    encoding: String,
    /// save to a given file
    #[arg(short, long, value_name = "file")]
    output: Option<String>,
    /// write a byte order mark
    #[arg(long)]
    bom: bool,
    /// do not write the XML declaration
    #[arg(long)]
    noprolog: bool,
    /// do not add missing namespace declarations
    #[arg(long)]
    nonsensure: bool,
    /// declare missing namespaces where they are used instead of on the document element
    #[arg(long)]
    nsinplace: bool,
    /// when to use the predefined entities
    #[arg(long, value_enum, default_value_t = Predefined::AsNeeded)]
    predefined: Predefined,
    /// do not use the entities declared by the document type
    #[arg(long)]
    noent_defined: bool,
    /// escape control characters
    #[arg(long)]
    encode_control: bool,
    /// escape non-ASCII characters
    #[arg(long)]
    encode_non_ascii: bool,
    /// escape private use characters
    #[arg(long)]
    encode_private_use: bool,
    /// element classification used by `--format`
    #[arg(long, value_enum, default_value_t = Profile::Default)]
    profile: Profile,
    /// line separator
    #[arg(long, value_enum)]
    newline: Option<Newline>,
    /// do not end the output with a line separator
    #[arg(long)]
    noendnewline: bool,
    /// more output, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl CmdArgs {
    fn save_options(&self) -> Result<SaveOptions> {
        let mut options = SaveOptions::default()
            .with_format_output(self.format)
            .with_indent(self.indent.clone())
            .with_bom(self.bom)
            .with_prolog(!self.noprolog)
            .with_namespace_declarations_ensured(!self.nonsensure)
            .with_document_element_declarations(!self.nsinplace)
            .with_predefined_entities(self.predefined.into())
            .with_defined_entities(!self.noent_defined)
            .with_encode_control(self.encode_control)
            .with_encode_non_ascii(self.encode_non_ascii)
            .with_encode_private_use(self.encode_private_use)
            .with_format_end_newline(!self.noendnewline)
            .with_encoding(self.encoding.clone())
            .context("invalid --encoding")?;
        if let Some(newline) = self.newline {
            options = options.with_line_separator(newline.separator());
        }
        Ok(options)
    }

    fn serializer(&self) -> Result<Serializer> {
        let options = self.save_options()?;
        Ok(match self.profile {
            Profile::Default => Serializer::new(options, DefaultProfile),
            Profile::Xhtml => Serializer::new(options, TableProfile::xhtml()),
            Profile::None => Serializer::new(options, TableProfile::new()),
        })
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn save_file(
    path: &str,
    parser_options: &ParserOptions,
    serializer: &Serializer,
    out: &mut dyn Write,
) -> Result<()> {
    let doc = if path == "-" {
        parse_reader_with(stdin().lock(), parser_options)
    } else {
        let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
        parse_reader_with(BufReader::new(file), parser_options)
    }
    .with_context(|| format!("failed to parse {path}"))?;
    debug!("{path} parsed");

    serializer
        .serialize(&doc, &mut *out)
        .with_context(|| format!("failed to serialize {path}"))
}

fn run(args: &CmdArgs) -> Result<()> {
    let serializer = args.serializer()?;
    let parser_options = ParserOptions::default();
    let mut out: Box<dyn Write> = match args.output.as_deref() {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {path}"))?,
        )),
        None => Box::new(stdout().lock()),
    };
    for path in &args.xml_files {
        save_file(path, &parser_options, &serializer, &mut *out)?;
    }
    out.flush().context("failed to flush the output")
}

fn main() {
    let args = CmdArgs::parse();
    init_logging(args.verbose);
    if let Err(err) = run(&args) {
        error!("{err:#}");
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition() {
        CmdArgs::command().debug_assert();
    }

    #[test]
    fn options_from_arguments() {
        let args = CmdArgs::parse_from([
            "domsave",
            "--format",
            "--predefined",
            "never",
            "--newline",
            "crlf",
            "--encoding",
            "ISO-8859-1",
            "a.xml",
        ]);
        let options = args.save_options().unwrap();
        assert!(options.format_output());
        assert_eq!(options.use_predefined_entities(), PredefinedEntities::Never);
        assert_eq!(options.line_separator(), "\r\n");
        assert_eq!(options.encoding_label(), "ISO-8859-1");
        assert!(options.ensure_namespace_declarations());
    }
}
