use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "certforge")]
#[command(author, version, about, long_about = None)]
#[command(about = "Generate certificates from DOCX and PPTX templates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the placeholder fields of a template
    Scan {
        /// Template file path (.docx or .pptx)
        #[arg(short, long)]
        template: String,

        /// Print the fields as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fill a single certificate
    Fill {
        /// Template file path
        #[arg(short, long)]
        template: String,

        /// Output file path
        #[arg(short, long)]
        output: String,

        /// JSON file with one recipient record (optional)
        #[arg(short, long)]
        data: Option<String>,

        /// Field values in format KEY=VALUE (can be used multiple times)
        #[arg(short = 'f', long = "field", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,

        /// Generator configuration (JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Fail on placeholders without a declared field
        #[arg(long)]
        strict: bool,
    },

    /// Fill certificates from JSON file
    Batch {
        /// Template file path
        #[arg(short, long)]
        template: String,

        /// JSON file with recipient data
        #[arg(short, long)]
        json: String,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output_dir: String,

        /// Worker threads (0 = available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Generator configuration (JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Skip the merged bundle
        #[arg(long)]
        no_merge: bool,

        /// Fail on placeholders without a declared field
        #[arg(long)]
        strict: bool,
    },

    /// Merge generated documents of the same kind into one
    Merge {
        /// Input files, in order
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,

        /// Output file path
        #[arg(short, long)]
        output: String,
    },

    /// Generate example JSON file
    Example {
        /// Output path for example JSON
        #[arg(short, long, default_value = "example.json")]
        output: String,

        /// Include extended fields in example
        #[arg(short = 'x', long)]
        extended: bool,
    },
}

/// Parse a single key-value pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("Course=Rust = fun").unwrap(),
            ("Course".to_string(), "Rust = fun".to_string())
        );
        assert!(parse_key_val("Course").is_err());
    }

    #[test]
    fn test_batch_args() {
        let cli = Cli::try_parse_from([
            "certforge", "batch", "-t", "t.docx", "-j", "people.json", "-w", "4", "--no-merge",
        ])
        .unwrap();
        match cli.command {
            Commands::Batch {
                workers,
                no_merge,
                output_dir,
                ..
            } => {
                assert_eq!(workers, Some(4));
                assert!(no_merge);
                assert_eq!(output_dir, "output");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_merge_needs_inputs() {
        assert!(Cli::try_parse_from(["certforge", "merge", "-o", "out.docx"]).is_err());
    }
}
