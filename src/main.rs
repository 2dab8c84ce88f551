use certforge::generate::{merge_bytes, Outcome};
use certforge::{
    CertificateGenerator, Cli, Commands, GeneratorConfig, RecipientRecord, Result, SubstitutionMode,
    TemplateDocument,
};
use chrono::Local;
use clap::Parser;
use log::{error, info};
use serde_json::{json, Value};
use std::path::Path;

fn main() {
    if let Err(e) = run() {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Logging initialisieren
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Scan { template, json } => {
            scan(&template, json)?;
        }

        Commands::Fill {
            template,
            output,
            data,
            fields,
            config,
            strict,
        } => {
            info!("Filling single certificate");
            let config = load_config(config.as_deref(), None, false, strict)?;
            fill_single(&template, &output, data.as_deref(), fields, config)?;
            println!("✓ Certificate created: {}", output);
        }

        Commands::Batch {
            template,
            json,
            output_dir,
            workers,
            config,
            no_merge,
            strict,
        } => {
            info!("Starting batch processing");
            let config = load_config(config.as_deref(), workers, no_merge, strict)?;
            let (created, failed) = fill_batch(&template, &json, &output_dir, config)?;
            println!("✓ Created {} certificates in {}", created, output_dir);
            if failed > 0 {
                println!("✗ {} recipient(s) failed, see report.json", failed);
            }
        }

        Commands::Merge { inputs, output } => {
            info!("Merging {} document(s)", inputs.len());
            let bytes = inputs
                .iter()
                .map(std::fs::read)
                .collect::<std::io::Result<Vec<_>>>()?;
            std::fs::write(&output, merge_bytes(&bytes)?)?;
            println!("✓ Merged document created: {}", output);
        }

        Commands::Example { output, extended } => {
            info!("Generating example JSON");
            generate_example(&output, extended)?;
            println!("✓ Example file created: {}", output);
        }
    }

    Ok(())
}

/// Konfigurationsdatei laden, CLI-Flags haben Vorrang
fn load_config(path: Option<&str>, workers: Option<usize>, no_merge: bool, strict: bool) -> Result<GeneratorConfig> {
    let mut config = match path {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(workers) = workers {
        config.workers = workers;
    }
    if no_merge {
        config.merge = false;
    }
    if strict {
        config.mode = SubstitutionMode::Strict;
    }
    Ok(config)
}

fn scan(template: &str, as_json: bool) -> Result<()> {
    let doc = TemplateDocument::open(template)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(doc.fields())?);
        return Ok(());
    }

    println!("{} ({}), {} field(s):", doc.name(), doc.kind(), doc.fields().len());
    for field in doc.fields() {
        let slide = field.slide.map(|s| format!(" [slide {}]", s)).unwrap_or_default();
        println!("  {:<30} {:?}{}", field.placeholder, field.field_type, slide);
    }
    Ok(())
}

fn fill_single(
    template: &str,
    output: &str,
    data: Option<&str>,
    fields: Vec<(String, String)>,
    config: GeneratorConfig,
) -> Result<()> {
    let doc = TemplateDocument::open(template)?;

    let mut record = match data {
        Some(path) => RecipientRecord::from_json_file(path)?,
        None => RecipientRecord::new(),
    };
    for (key, value) in fields {
        info!("Adding field: {} = {}", key, value);
        record.add_field(key, value);
    }

    let generated = CertificateGenerator::with_config(&doc, config).generate(&record)?;
    std::fs::write(output, generated.bytes)?;
    Ok(())
}

/// Erzeugt alle Zertifikate; liefert (erfolgreich, fehlgeschlagen)
fn fill_batch(template: &str, json_path: &str, output_dir: &str, config: GeneratorConfig) -> Result<(usize, usize)> {
    let doc = TemplateDocument::open(template)?;
    let records = RecipientRecord::batch_from_json_file(json_path)?;

    std::fs::create_dir_all(output_dir)?;

    let outcome = CertificateGenerator::with_config(&doc, config).generate_batch(&records)?;
    let extension = doc.kind().extension();

    let mut report = Vec::with_capacity(outcome.results.len());
    for result in &outcome.results {
        let entry = match &result.outcome {
            Outcome::Generated(generated) => {
                // Index vorn, damit gleiche Namen sich nicht überschreiben
                let filename = format!(
                    "{:03}_{}.{}",
                    result.index + 1,
                    sanitize_filename(&result.recipient),
                    extension
                );
                let output_path = Path::new(output_dir).join(&filename);
                std::fs::write(&output_path, &generated.bytes)?;
                info!("Created [{}] -> {}", result.index, output_path.display());

                json!({
                    "index": result.index,
                    "recipient": result.recipient,
                    "status": "generated",
                    "sequence": generated.sequence,
                    "generated_file": output_path.to_string_lossy(),
                })
            }
            Outcome::Failed(message) => json!({
                "index": result.index,
                "recipient": result.recipient,
                "status": "failed",
                "error": message,
            }),
        };
        report.push(entry);
    }

    let mut summary = json!({ "results": report });
    if let Some(bundle) = &outcome.bundle {
        let filename = format!("batch_{}.{}", Local::now().format("%Y%m%d_%H%M%S"), bundle.kind.extension());
        let bundle_path = Path::new(output_dir).join(&filename);
        std::fs::write(&bundle_path, &bundle.bytes)?;
        println!("✓ Merged bundle: {}", bundle_path.display());

        if let Value::Object(map) = &mut summary {
            map.insert(
                "bundle".to_string(),
                json!({ "file": bundle_path.to_string_lossy(), "members": bundle.members }),
            );
        }
    }

    if let Some(message) = &outcome.merge_error {
        println!("✗ Merged bundle not created: {}", message);
        if let Value::Object(map) = &mut summary {
            map.insert("merge_error".to_string(), json!(message));
        }
    }

    let pretty = serde_json::to_string_pretty(&summary)?;
    std::fs::write(Path::new(output_dir).join("report.json"), pretty)?;

    Ok((outcome.success_count(), outcome.failure_count()))
}

fn generate_example(output: &str, extended: bool) -> Result<()> {
    let examples = if extended {
        json!([
            {
                "_index": 1,
                "full_name": "Max Mustermann",
                "course": "Rust Programmierung Intensivkurs",
                "date": "15.01.2024",
                "instructor": "Dr. Schmidt",
                "hours": 40
            },
            {
                "email": "erika@example.com",
                "certificate": {
                    "_index": 2,
                    "full_name": "Erika Musterfrau",
                    "course": "Python für Data Science",
                    "date": "20.01.2024",
                    "instructor": "Prof. Müller",
                    "hours": 8
                }
            }
        ])
    } else {
        json!([
            {
                "full_name": "Max Mustermann",
                "course": "Rust Grundlagen Workshop",
                "date": "15.01.2024"
            },
            {
                "full_name": "Erika Musterfrau",
                "course": "Python Einführung",
                "date": "20.01.2024"
            }
        ])
    };

    let json = serde_json::to_string_pretty(&examples)?;
    std::fs::write(output, json)?;

    Ok(())
}

fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            ' ' => '_',
            'ä' => 'a',
            'ö' => 'o',
            'ü' => 'u',
            'ß' => 's',
            _ => '_',
        })
        .collect()
}
