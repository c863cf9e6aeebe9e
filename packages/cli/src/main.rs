//! `i14y-struct`: I14Y data structure command-line interface.
//!
//! Provides four subcommands:
//!
//! - **`convert`**: import a CSV, XSD or Turtle file and print it as a
//!   project file or as SHACL Turtle.
//! - **`export`**: export a saved project as SHACL Turtle.
//! - **`check`**: load a project and report everything the loader repaired.
//! - **`new`**: print a project holding a single empty dataset.
//!
//! Inputs are read from a file path or from stdin (`-`); output goes to
//! stdout unless `--output` is given.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use i14y_structure::import::{
    csv::{import_csv, CsvOptions},
    ttl::{import_ttl, TtlOptions},
    xsd::{import_xsd, XsdOptions},
};
use i14y_structure::turtle::{self, ExportOptions};
use i14y_structure::{project, validate_node, GraphModel, ImportWarning, Imported, Lang, LangMap};

/// i14y-struct: I14Y data structure CLI
///
/// Convert tabular data and schemas into SHACL data structures.
#[derive(Parser)]
#[command(name = "i14y-struct", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a CSV, XSD or Turtle file.
    ///
    /// Warnings are printed to stderr; the result goes to stdout.
    ///
    /// Examples:
    ///   i14y-struct convert csv personen.csv --dataset-name Personen
    ///   i14y-struct convert xsd schema.xsd --to project -o schema.json
    Convert {
        /// Input format.
        #[arg(value_enum)]
        from: InputFormat,

        /// Path to the input file, or `-` for stdin.
        file: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Ttl)]
        to: OutputFormat,

        /// Title of the generated dataset (CSV, XSD). Defaults to the file stem.
        #[arg(long, value_name = "TITLE")]
        dataset_name: Option<String>,

        /// Language of generated or untagged labels: de | en | fr | it
        #[arg(long, env = "I14Y_DEFAULT_LANG", default_value = "de")]
        lang: Lang,

        /// Encoding of a CSV file (WHATWG label, e.g. windows-1252).
        #[arg(long, default_value = "utf-8")]
        encoding: String,

        /// CSV field delimiter; detected from the header when absent.
        #[arg(long, value_name = "CHAR")]
        delimiter: Option<char>,

        /// Date of `schema:validFrom` in Turtle output (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_name = "DATE")]
        valid_from: Option<NaiveDate>,

        /// Write the result to this file instead of stdout.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Export a project file as SHACL Turtle.
    Export {
        /// Path to a project JSON file, or `-` for stdin.
        file: PathBuf,

        /// Language of plain-string titles in older project files.
        #[arg(long, env = "I14Y_DEFAULT_LANG", default_value = "de")]
        lang: Lang,

        /// Date of `schema:validFrom` (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_name = "DATE")]
        valid_from: Option<NaiveDate>,

        /// Write the Turtle to this file instead of stdout.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Load a project file and report repairs and invalid nodes.
    ///
    /// Exits 0 when the project loads cleanly, 1 when anything was repaired
    /// or skipped.
    Check {
        /// Path to a project JSON file, or `-` for stdin.
        file: PathBuf,

        #[arg(long, env = "I14Y_DEFAULT_LANG", default_value = "de")]
        lang: Lang,
    },

    /// Print a new project with a single dataset.
    New {
        /// Dataset title.
        #[arg(short, long, default_value = "New Dataset")]
        title: String,

        #[arg(long, env = "I14Y_DEFAULT_LANG", default_value = "de")]
        lang: Lang,

        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    Csv,
    Xsd,
    Ttl,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// SHACL Turtle.
    Ttl,
    /// Project JSON, loadable by the editor.
    Project,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            from,
            file,
            to,
            dataset_name,
            lang,
            encoding,
            delimiter,
            valid_from,
            output,
        } => {
            let bytes = read_input(&file);
            let dataset_name = dataset_name.or_else(|| file_stem(&file));
            let result = match from {
                InputFormat::Csv => {
                    let delimiter = delimiter.map(|c| {
                        u8::try_from(c).unwrap_or_else(|_| {
                            fatal(&format!("delimiter {c:?} is not a single-byte character"))
                        })
                    });
                    let defaults = CsvOptions::default();
                    import_csv(
                        &bytes,
                        &CsvOptions {
                            dataset_name: dataset_name.unwrap_or(defaults.dataset_name),
                            lang,
                            encoding,
                            delimiter,
                        },
                    )
                }
                InputFormat::Xsd => {
                    let defaults = XsdOptions::default();
                    import_xsd(
                        &bytes,
                        &XsdOptions {
                            dataset_name: dataset_name.unwrap_or(defaults.dataset_name),
                            lang,
                        },
                    )
                }
                InputFormat::Ttl => import_ttl(&bytes, &TtlOptions { lang }),
            };
            let Imported { graph, warnings } =
                result.unwrap_or_else(|e| fatal(&format!("import failed: {e}")));
            report(&warnings);

            let text = match to {
                OutputFormat::Ttl => to_turtle(&graph, valid_from),
                OutputFormat::Project => to_project(&graph),
            };
            write_output(output.as_deref(), &text);
        }

        Command::Export {
            file,
            lang,
            valid_from,
            output,
        } => {
            let bytes = read_input(&file);
            let Imported { graph, warnings } = project::load(&bytes, lang)
                .unwrap_or_else(|e| fatal(&format!("cannot load project: {e}")));
            report(&warnings);
            write_output(output.as_deref(), &to_turtle(&graph, valid_from));
        }

        Command::Check { file, lang } => {
            let bytes = read_input(&file);
            let Imported { graph, warnings } = project::load(&bytes, lang)
                .unwrap_or_else(|e| fatal(&format!("cannot load project: {e}")));
            report(&warnings);

            let mut invalid = 0;
            for node in graph.nodes() {
                if let Err(e) = validate_node(node) {
                    eprintln!("invalid node {}: {e}", node.id);
                    invalid += 1;
                }
            }
            let datasets = graph
                .nodes()
                .filter(|n| n.kind == i14y_structure::NodeKind::Dataset)
                .count();
            if datasets == 0 {
                eprintln!("warning: project has no dataset and cannot be exported");
            }

            println!(
                "{} node(s), {} edge(s), {} dataset(s), {} warning(s)",
                graph.node_count(),
                graph.edge_count(),
                datasets,
                warnings.len() + invalid
            );
            if !warnings.is_empty() || invalid > 0 || datasets == 0 {
                process::exit(1);
            }
        }

        Command::New {
            title,
            lang,
            output,
        } => {
            let graph = GraphModel::with_dataset(LangMap::single(lang, title))
                .unwrap_or_else(|e| fatal(&format!("cannot create project: {e}")));
            write_output(output.as_deref(), &to_project(&graph));
        }
    }
}

fn to_turtle(graph: &GraphModel, valid_from: Option<NaiveDate>) -> String {
    let options = valid_from.map(ExportOptions::new).unwrap_or_default();
    turtle::serialize(&graph.snapshot(), &options)
        .unwrap_or_else(|e| fatal(&format!("export failed: {e}")))
}

fn to_project(graph: &GraphModel) -> String {
    project::save(graph, Utc::now())
        .to_json()
        .unwrap_or_else(|e| fatal(&format!("cannot encode project: {e}")))
}

/// Print import warnings to stderr, one per line.
fn report(warnings: &[ImportWarning]) {
    for w in warnings {
        eprintln!("warning: {w}");
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> Vec<u8> {
    if path.to_str() == Some("-") {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")));
        buf
    } else {
        fs::read(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {e}", path.display())))
    }
}

fn write_output(path: Option<&Path>, text: &str) {
    match path {
        Some(path) => fs::write(path, text)
            .unwrap_or_else(|e| fatal(&format!("failed to write {}: {e}", path.display()))),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|_| stdout.flush())
                .unwrap_or_else(|e| fatal(&format!("failed to write stdout: {e}")));
        }
    }
}

/// The file stem of an input path, or `None` for stdin.
fn file_stem(path: &Path) -> Option<String> {
    if path.to_str() == Some("-") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("i14y-struct: {msg}");
    process::exit(2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn convert_arguments_parse() {
        let cli = Cli::try_parse_from([
            "i14y-struct",
            "convert",
            "csv",
            "data.csv",
            "--delimiter",
            ";",
            "--lang",
            "fr",
            "--valid-from",
            "2024-03-01",
        ])
        .unwrap();
        match cli.command {
            Command::Convert {
                delimiter,
                lang,
                valid_from,
                to,
                ..
            } => {
                assert_eq!(delimiter, Some(';'));
                assert_eq!(lang, Lang::Fr);
                assert_eq!(valid_from, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert!(to == OutputFormat::Ttl);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn stdin_has_no_file_stem() {
        assert_eq!(file_stem(Path::new("-")), None);
        assert_eq!(file_stem(Path::new("dir/personen.csv")).as_deref(), Some("personen"));
    }
}
